//! Services module - Business logic for moving Dota 2 configs between accounts.
//!
//! Everything here works on plain paths and settings values. Nothing depends
//! on the state layer or the command line, so each piece is testable against a
//! temporary directory tree.
//!
//! # Components
//!
//! - [`keyvalues`]: Parser for Valve's KeyValues text format (`localconfig.vdf`).
//! - [`save_file`]: Reads the per-account save file and resolves a display
//!   name and avatar id through an ordered fallback chain.
//! - [`discovery`]: Finds the Steam `userdata` root and the accounts under it
//!   that have both a config bundle and a readable save file.
//! - [`avatar`]: Best-effort avatar downloads and the connectivity probe.
//! - [`loader`]: Two-phase account loading. Discovery first, then concurrent
//!   per-account enrichment merged on the calling task.
//! - [`bundle`]: The set of config subdirectories that make up a bundle, plus
//!   tree copy and clear helpers.
//! - [`transfer`]: Import from another account or from an archive.
//! - [`export`]: Package a bundle and `metadata.json` into a `.cbd2` archive.
//!
//! # Failure model
//!
//! Discovery and enrichment never fail the caller: rejected accounts are
//! skipped and missing names or avatars fall back to defaults. Import and
//! export return [`TransferError`], and both validate their source before
//! touching the destination.
//!
//! # Usage Example
//!
//! ```ignore
//! use configbridge::services::{BundleLayout, ImportSource, import_config};
//!
//! let layout = BundleLayout::default();
//! let source = ImportSource::from_path("dota2_config_Friend.cbd2")?;
//! let report = import_config(&target_root, &source, &layout)?;
//! println!("Replaced {} folder(s)", report.replaced.len());
//! ```

pub mod avatar;
pub mod bundle;
pub mod discovery;
pub mod export;
pub mod keyvalues;
pub mod loader;
pub mod save_file;
pub mod transfer;

pub use avatar::{AvatarFetcher, check_connectivity};
pub use bundle::BundleLayout;
pub use discovery::{Discovery, discover_accounts, discover_in};
pub use export::{
    ARCHIVE_EXTENSION, ExportReport, default_export_file_name, export_config,
    read_archive_metadata,
};
pub use loader::{AccountLoader, LoadedAccounts};
pub use save_file::{AccountProfile, SaveFileError, read_profile};
pub use transfer::{ImportSource, TransferError, TransferReport, import_config};

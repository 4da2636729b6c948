//! Data models for ConfigBridge.
//!
//! - [`AppState`]: runtime state owned by [`StateManager`](crate::state::StateManager)
//! - [`DiscoveredAccount`], [`AccountEnrichment`], [`AccountRecord`]: the two-phase
//!   account value (discovery record, background enrichment, merged record)
//! - [`ArchiveMetadata`]: the `metadata.json` record inside export archives
//! - [`UserConfig`] / [`BridgeSettings`]: settings loaded from `ConfigBridge Settings.yaml`

pub mod account;
pub mod app_state;
pub mod config;
pub mod metadata;

pub use account::{AccountEnrichment, AccountRecord, DiscoveredAccount, fallback_display_name};
pub use app_state::{AppState, Operation};
pub use config::{BridgeSettings, DOTA_APP_ID, UserConfig};
pub use metadata::{ArchiveMetadata, METADATA_FILE_NAME};

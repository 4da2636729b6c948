//! Config import: mirror a config bundle from another account or an archive
//! into a target account.
//!
//! For every subdirectory present in the source the matching target
//! subdirectory is emptied and refilled (full replace, not merge). Pairs whose
//! source subdirectory is absent are left alone, so importing a bundle with
//! only `remote/cfg` replaces only `remote/cfg`.
//!
//! Both failure modes that make the import pointless are detected before the
//! target is touched:
//! - an archive that is not a readable zip container ([`TransferError::InvalidArchive`]);
//! - a source without any non-empty config subdirectory ([`TransferError::NoConfigFiles`]).

use crate::services::bundle::{BundleLayout, clear_dir, copy_tree};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io;
use tempfile::TempDir;
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

/// Errors that can occur while importing or exporting a config bundle
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("The selected file is not a valid archive: {path}")]
    InvalidArchive {
        path: Utf8PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("No config files found in {0}")]
    NoConfigFiles(Utf8PathBuf),

    #[error("Source not found: {0}")]
    SourceNotFound(Utf8PathBuf),

    #[error("Filesystem error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write archive {path}: {source}")]
    ArchiveWrite {
        path: Utf8PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("Invalid archive metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl TransferError {
    /// True for the "nothing to transfer" condition.
    pub fn is_no_config_files(&self) -> bool {
        matches!(self, TransferError::NoConfigFiles(_))
    }
}

/// Attach a path to an I/O error.
pub(crate) fn io_at(path: &Utf8Path) -> impl FnOnce(io::Error) -> TransferError + '_ {
    move |source| TransferError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Where an import reads its bundle from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// Another account's game folder.
    Account(Utf8PathBuf),

    /// An exported `.cbd2` / `.zip` archive.
    Archive(Utf8PathBuf),
}

impl ImportSource {
    /// Classify a path: files are archives, directories are account roots.
    pub fn from_path<P: AsRef<Utf8Path>>(path: P) -> Result<Self, TransferError> {
        let path = path.as_ref();
        if path.is_file() {
            Ok(ImportSource::Archive(path.to_path_buf()))
        } else if path.is_dir() {
            Ok(ImportSource::Account(path.to_path_buf()))
        } else {
            Err(TransferError::SourceNotFound(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Utf8Path {
        match self {
            ImportSource::Account(p) | ImportSource::Archive(p) => p,
        }
    }
}

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Subdirectories (relative) that were replaced in the target.
    pub replaced: Vec<Utf8PathBuf>,

    /// Files copied across all replaced subdirectories.
    pub files_copied: usize,
}

/// Import a config bundle into `target_root`.
pub fn import_config(
    target_root: &Utf8Path,
    source: &ImportSource,
    layout: &BundleLayout,
) -> Result<TransferReport, TransferError> {
    let result = match source {
        ImportSource::Account(dir) => {
            if !dir.is_dir() {
                return Err(TransferError::SourceNotFound(dir.clone()));
            }
            copy_bundle(dir, target_root, layout)
        }
        ImportSource::Archive(file) => {
            let extracted = extract_archive(file, layout)?;
            let root = temp_root(&extracted)?;

            let result = copy_bundle(&root, target_root, layout).map_err(|e| match e {
                TransferError::NoConfigFiles(_) => TransferError::NoConfigFiles(file.clone()),
                other => other,
            });

            if let Err(e) = extracted.close() {
                tracing::warn!("Failed to remove temporary extraction {}: {}", root, e);
            }
            result
        }
    };

    match &result {
        Ok(report) => tracing::info!(
            "Imported config from {} into {} ({} file(s), {} dir(s) replaced)",
            source.path(),
            target_root,
            report.files_copied,
            report.replaced.len()
        ),
        Err(e) => tracing::error!("Error during import from {}: {:?}", source.path(), e),
    }

    result
}

/// Mirror every present source subdirectory into the target.
pub fn copy_bundle(
    source_root: &Utf8Path,
    target_root: &Utf8Path,
    layout: &BundleLayout,
) -> Result<TransferReport, TransferError> {
    if !layout.is_present(source_root) {
        tracing::error!("No configuration files found in source {}", source_root);
        return Err(TransferError::NoConfigFiles(source_root.to_path_buf()));
    }

    for dir in layout.paths_under(target_root) {
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(io_at(&dir))?;
            tracing::info!("Created directory: {}", dir);
        }
    }

    let mut report = TransferReport::default();

    for subdir in layout.subdirs() {
        let src = source_root.join(subdir);
        if !src.is_dir() {
            tracing::debug!("Source has no {}, leaving target as is", subdir);
            continue;
        }

        let dst = target_root.join(subdir);
        clear_dir(&dst).map_err(io_at(&dst))?;
        let copied = copy_tree(&src, &dst).map_err(io_at(&src))?;

        tracing::debug!("Replaced {} ({} file(s))", dst, copied);
        report.replaced.push(subdir.clone());
        report.files_copied += copied;
    }

    Ok(report)
}

/// Open `archive` as a zip and extract it into a fresh scratch directory
/// from `layout`.
///
/// The archive is validated before anything is written; the returned
/// directory is deleted when dropped.
pub fn extract_archive(archive: &Utf8Path, layout: &BundleLayout) -> Result<TempDir, TransferError> {
    let file = match File::open(archive) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TransferError::SourceNotFound(archive.to_path_buf()));
        }
        Err(e) => return Err(io_at(archive)(e)),
    };

    let mut zip = ZipArchive::new(file).map_err(|source| {
        tracing::error!("Invalid zip file: {}", archive);
        TransferError::InvalidArchive {
            path: archive.to_path_buf(),
            source,
        }
    })?;

    let temp = layout.scratch_dir("temp_extract_").map_err(io_at(archive))?;

    zip.extract(temp.path()).map_err(|source| match source {
        ZipError::Io(e) => TransferError::Io {
            path: Utf8PathBuf::from(temp.path().to_string_lossy().as_ref()),
            source: e,
        },
        other => TransferError::InvalidArchive {
            path: archive.to_path_buf(),
            source: other,
        },
    })?;

    tracing::debug!("Extracted {} ({} entries)", archive, zip.len());
    Ok(temp)
}

pub(crate) fn temp_root(temp: &TempDir) -> Result<Utf8PathBuf, TransferError> {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).map_err(|p| TransferError::Io {
        path: Utf8PathBuf::from(p.to_string_lossy().as_ref()),
        source: io::Error::new(io::ErrorKind::InvalidData, "temporary path is not UTF-8"),
    })
}

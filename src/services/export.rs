//! Config export: package an account's bundle and a metadata record into a
//! single deflate zip (`.cbd2`).
//!
//! Archive layout, relative to the archive root:
//!
//! ```text
//! cfg/...
//! local/cfg/...
//! remote/cfg/...
//! metadata.json
//! ```

use crate::models::{ArchiveMetadata, METADATA_FILE_NAME};
use crate::services::bundle::{BundleLayout, copy_tree};
use crate::services::transfer::{TransferError, io_at, temp_root};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Extension used for exported archives. Plain `.zip` files import the same way.
pub const ARCHIVE_EXTENSION: &str = "cbd2";

static FILE_NAME_HOSTILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\s<>:"/\\|?*]+"#).expect("Invalid file name regex"));

/// Suggested archive name for an account, e.g. `dota2_config_Some_Name.cbd2`.
pub fn default_export_file_name(display_name: &str) -> String {
    let cleaned = FILE_NAME_HOSTILE.replace_all(display_name.trim(), "_");
    format!("dota2_config_{}.{}", cleaned, ARCHIVE_EXTENSION)
}

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub destination: Utf8PathBuf,
    /// Subdirectories (relative) included in the archive.
    pub included: Vec<Utf8PathBuf>,
    /// Files in the archive, `metadata.json` included.
    pub files_written: usize,
}

/// Export the bundle under `account_root` to `destination`.
///
/// Fails with [`TransferError::NoConfigFiles`] before creating any output when
/// the account has no non-empty config subdirectory.
pub fn export_config(
    account_root: &Utf8Path,
    destination: &Utf8Path,
    metadata: &ArchiveMetadata,
    layout: &BundleLayout,
) -> Result<ExportReport, TransferError> {
    if !layout.is_present(account_root) {
        tracing::error!("No config files to export in {}", account_root);
        return Err(TransferError::NoConfigFiles(account_root.to_path_buf()));
    }

    let staging = layout.scratch_dir("temp_export_").map_err(io_at(destination))?;
    let staging_root = temp_root(&staging)?;

    let result = stage_and_pack(account_root, &staging_root, destination, metadata, layout);

    if let Err(e) = staging.close() {
        tracing::warn!("Failed to remove staging directory {}: {}", staging_root, e);
    }

    match &result {
        Ok(report) => tracing::info!(
            "Configuration exported to {} ({} file(s))",
            report.destination,
            report.files_written
        ),
        Err(e) => tracing::error!("Error during export to {}: {:?}", destination, e),
    }

    result
}

fn stage_and_pack(
    account_root: &Utf8Path,
    staging_root: &Utf8Path,
    destination: &Utf8Path,
    metadata: &ArchiveMetadata,
    layout: &BundleLayout,
) -> Result<ExportReport, TransferError> {
    let mut included = Vec::new();

    for subdir in layout.existing_subdirs(account_root) {
        let src = account_root.join(subdir);
        copy_tree(&src, &staging_root.join(subdir)).map_err(io_at(&src))?;
        included.push(subdir.to_path_buf());
    }

    let metadata_path = staging_root.join(METADATA_FILE_NAME);
    fs::write(&metadata_path, metadata.to_json()?).map_err(io_at(&metadata_path))?;

    if let Some(parent) = destination.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_at(parent))?;
    }

    let file = File::create(destination).map_err(io_at(destination))?;
    let files_written = match write_archive(staging_root, file, destination) {
        Ok(count) => count,
        Err(e) => {
            // only the archive this export created is removed
            if let Err(remove_err) = fs::remove_file(destination) {
                tracing::warn!("Failed to remove partial archive {}: {}", destination, remove_err);
            }
            return Err(e);
        }
    };

    Ok(ExportReport {
        destination: destination.to_path_buf(),
        included,
        files_written,
    })
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Zip entry name for a path relative to the archive root.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compress the tree under `root` into `file`, opened at `destination`.
/// Returns the file count.
pub fn write_archive(
    root: &Utf8Path,
    file: File,
    destination: &Utf8Path,
) -> Result<usize, TransferError> {
    let archive_err = |source: ZipError| TransferError::ArchiveWrite {
        path: destination.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(file);
    let mut files = 0;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| TransferError::Io {
            path: root.to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(root.as_std_path())
            .map_err(|e| io_at(root)(io::Error::other(e.to_string())))?;
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(name, file_options()).map_err(archive_err)?;
        } else {
            zip.start_file(name, file_options()).map_err(archive_err)?;
            let mut source = File::open(entry.path()).map_err(io_at(root))?;
            io::copy(&mut source, &mut zip).map_err(io_at(destination))?;
            files += 1;
        }
    }

    zip.finish().map_err(archive_err)?;
    Ok(files)
}

/// Read `metadata.json` from an export archive, `None` if it has none.
pub fn read_archive_metadata(archive: &Utf8Path) -> Result<Option<ArchiveMetadata>, TransferError> {
    let file = File::open(archive).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TransferError::SourceNotFound(archive.to_path_buf()),
        _ => io_at(archive)(e),
    })?;

    let invalid = |source: ZipError| TransferError::InvalidArchive {
        path: archive.to_path_buf(),
        source,
    };

    let mut zip = ZipArchive::new(file).map_err(invalid)?;

    let mut json = String::new();
    match zip.by_name(METADATA_FILE_NAME) {
        Ok(mut entry) => {
            entry.read_to_string(&mut json).map_err(io_at(archive))?;
        }
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(invalid(e)),
    }

    Ok(Some(ArchiveMetadata::from_json(&json)?))
}

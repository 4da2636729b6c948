//! Config bundle layout and the filesystem helpers import/export share.
//!
//! A bundle is the three conventional subdirectories (`cfg`, `local/cfg`,
//! `remote/cfg`) under an account's game folder or an archive root. It is
//! only ever referenced by path; nothing is held in memory.

use crate::models::BridgeSettings;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use tempfile::TempDir;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleLayout {
    subdirs: Vec<Utf8PathBuf>,
    temp_parent: Option<Utf8PathBuf>,
}

impl Default for BundleLayout {
    fn default() -> Self {
        Self::from_settings(&BridgeSettings::default())
    }
}

impl BundleLayout {
    pub fn new(subdirs: Vec<Utf8PathBuf>) -> Self {
        Self {
            subdirs,
            temp_parent: None,
        }
    }

    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self::new(settings.config_subdirs.clone()).with_temp_parent(settings.temp_dir.clone())
    }

    /// Create extraction and staging directories under `parent` instead of
    /// the system temporary directory.
    pub fn with_temp_parent(mut self, parent: Option<Utf8PathBuf>) -> Self {
        self.temp_parent = parent;
        self
    }

    pub fn temp_parent(&self) -> Option<&Utf8Path> {
        self.temp_parent.as_deref()
    }

    /// Fresh scratch directory, deleted when the returned [`TempDir`] drops.
    pub fn scratch_dir(&self, prefix: &str) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);

        match &self.temp_parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
    }

    /// Relative subdirectory paths, in order.
    pub fn subdirs(&self) -> &[Utf8PathBuf] {
        &self.subdirs
    }

    /// Absolute subdirectory paths under `root`.
    pub fn paths_under(&self, root: &Utf8Path) -> Vec<Utf8PathBuf> {
        self.subdirs.iter().map(|s| root.join(s)).collect()
    }

    /// Subdirectories that exist as directories under `root`.
    pub fn existing_subdirs(&self, root: &Utf8Path) -> Vec<&Utf8Path> {
        self.subdirs
            .iter()
            .filter(|s| root.join(s).is_dir())
            .map(|s| s.as_path())
            .collect()
    }

    /// A bundle is present when at least one subdirectory exists and is non-empty.
    pub fn is_present(&self, root: &Utf8Path) -> bool {
        self.subdirs.iter().any(|s| dir_has_entries(&root.join(s)))
    }
}

/// True if `path` is a directory with at least one entry.
pub fn dir_has_entries(path: &Utf8Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Remove everything inside `dir`, keeping `dir` itself.
pub fn clear_dir(dir: &Utf8Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Recursively copy the contents of `src` into `dst`.
///
/// `dst` is created if missing. Returns the number of files copied.
pub fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> io::Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src.as_std_path())
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = dst.as_std_path().join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_default_layout() {
        let layout = BundleLayout::default();
        let subdirs: Vec<_> = layout.subdirs().iter().map(|s| s.as_str()).collect();
        assert_eq!(subdirs, vec!["cfg", "local/cfg", "remote/cfg"]);
    }

    #[test]
    fn test_scratch_dir_under_configured_parent() {
        let temp = TempDir::new().unwrap();
        let parent = utf8(&temp).join("scratch");
        let settings = BridgeSettings {
            temp_dir: Some(parent.clone()),
            ..BridgeSettings::default()
        };
        let layout = BundleLayout::from_settings(&settings);
        assert_eq!(layout.temp_parent(), Some(parent.as_path()));

        let scratch = layout.scratch_dir("temp_test_").unwrap();
        assert!(scratch.path().starts_with(parent.as_std_path()));
        assert!(scratch.path().is_dir());

        scratch.close().unwrap();
        assert_eq!(fs::read_dir(&parent).unwrap().count(), 0);
    }

    #[test]
    fn test_presence_requires_non_empty_subdir() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        let layout = BundleLayout::default();

        assert!(!layout.is_present(&root));

        fs::create_dir_all(root.join("remote/cfg")).unwrap();
        assert!(!layout.is_present(&root));
        assert_eq!(layout.existing_subdirs(&root), vec![Utf8Path::new("remote/cfg")]);

        fs::write(root.join("remote/cfg/autoexec.cfg"), "bind x y").unwrap();
        assert!(layout.is_present(&root));
    }

    #[test]
    fn test_copy_tree_nested() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let src = utf8(&src_dir);
        let dst = utf8(&dst_dir).join("out");

        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::write(src.join("top.cfg"), "1").unwrap();
        fs::write(src.join("a/b/deep.cfg"), "2").unwrap();

        let copied = copy_tree(&src, &dst).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dst.join("top.cfg")).unwrap(), "1");
        assert_eq!(fs::read_to_string(dst.join("a/b/deep.cfg")).unwrap(), "2");
        assert!(dst.join("empty").is_dir());
    }

    #[test]
    fn test_clear_dir_keeps_dir() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::create_dir_all(root.join("sub/inner")).unwrap();
        fs::write(root.join("file.cfg"), "x").unwrap();

        clear_dir(&root).unwrap();
        assert!(root.is_dir());
        assert!(!dir_has_entries(&root));
    }
}

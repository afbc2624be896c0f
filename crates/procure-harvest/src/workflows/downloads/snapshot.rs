use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::WatchError;

/// Suffixes browsers use while a download is still being written.
const IN_PROGRESS_EXTENSIONS: &[&str] = &["crdownload", "part", "download", "tmp"];

/// Restricts which directory entries take part in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtensionFilter {
    #[default]
    Any,
    /// Case-insensitive extension, without the leading dot.
    Only(String),
}

impl ExtensionFilter {
    pub fn only(extension: &str) -> Self {
        Self::Only(extension.trim_start_matches('.').to_ascii_lowercase())
    }

    fn accepts(&self, path: &Path) -> bool {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        if let Some(ext) = extension.as_deref() {
            if IN_PROGRESS_EXTENSIONS.contains(&ext) {
                return false;
            }
        }

        match self {
            ExtensionFilter::Any => true,
            ExtensionFilter::Only(wanted) => extension.as_deref() == Some(wanted.as_str()),
        }
    }
}

/// Files present in one directory at the moment of capture (non-recursive).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectorySnapshot {
    entries: BTreeSet<PathBuf>,
}

impl DirectorySnapshot {
    pub fn capture(directory: &Path, filter: &ExtensionFilter) -> Result<Self, WatchError> {
        let io_error = |source| WatchError::Io {
            directory: directory.to_path_buf(),
            source,
        };

        let mut entries = BTreeSet::new();
        for entry in fs::read_dir(directory).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let file_type = entry.file_type().map_err(io_error)?;
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            if filter.accepts(&path) {
                entries.insert(path);
            }
        }

        Ok(Self { entries })
    }

    /// Paths present here but absent from `baseline`, in path order.
    pub fn arrivals_since(&self, baseline: &DirectorySnapshot) -> Vec<PathBuf> {
        self.entries
            .difference(&baseline.entries)
            .cloned()
            .collect()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }
}

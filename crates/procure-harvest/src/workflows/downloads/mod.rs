//! Detection of files that a browser drops into the watched download directory.
//!
//! A caller captures a [`DirectorySnapshot`] immediately before the action that
//! triggers a download, then asks a [`DownloadWatcher`] to wait until a file that
//! is absent from that snapshot shows up.

mod snapshot;
mod watcher;

use std::path::PathBuf;
use std::time::Duration;

pub use snapshot::{DirectorySnapshot, ExtensionFilter};
pub use watcher::{DownloadEvent, DownloadWatcher};

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("no new file appeared in {} within {waited:?}", directory.display())]
    TimedOut { directory: PathBuf, waited: Duration },
    #[error("failed to list download directory {}: {source}", directory.display())]
    Io {
        directory: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WatchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WatchError::TimedOut { .. })
    }
}

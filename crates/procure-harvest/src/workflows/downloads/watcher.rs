use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use super::{DirectorySnapshot, ExtensionFilter, WatchError};

/// A file that appeared in the watched directory after the baseline was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEvent {
    pub path: PathBuf,
    /// Number of new files seen in the cycle that produced this event.
    pub candidates: usize,
}

/// Polls one directory until a file absent from a baseline snapshot appears.
#[derive(Debug, Clone)]
pub struct DownloadWatcher {
    poll_interval: Duration,
    filter: ExtensionFilter,
}

impl DownloadWatcher {
    pub fn new(poll_interval: Duration, filter: ExtensionFilter) -> Self {
        Self {
            poll_interval,
            filter,
        }
    }

    /// Captures the baseline for the next download-triggering action.
    pub fn snapshot(&self, directory: &Path) -> Result<DirectorySnapshot, WatchError> {
        DirectorySnapshot::capture(directory, &self.filter)
    }

    /// Waits for a new file relative to `baseline`.
    ///
    /// The directory is listed at least once. When several new files show up in
    /// the same cycle the most recently modified one wins, ties going to the
    /// greatest path. A timeout too large to represent waits without a deadline.
    pub fn await_new_file(
        &self,
        directory: &Path,
        baseline: &DirectorySnapshot,
        timeout: Duration,
    ) -> Result<DownloadEvent, WatchError> {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);

        loop {
            let current = DirectorySnapshot::capture(directory, &self.filter)?;
            let arrivals = current.arrivals_since(baseline);

            if let Some(event) = resolve_arrivals(arrivals) {
                if event.candidates > 1 {
                    warn!(
                        directory = %directory.display(),
                        candidates = event.candidates,
                        chosen = %event.path.display(),
                        "several new files appeared at once, keeping the most recent"
                    );
                }
                debug!(path = %event.path.display(), "download detected");
                return Ok(event);
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    return Err(WatchError::TimedOut {
                        directory: directory.to_path_buf(),
                        waited: now.duration_since(started),
                    });
                }
                Some(deadline) => self.poll_interval.min(deadline - now),
                None => self.poll_interval,
            };

            thread::sleep(pause);
        }
    }
}

fn resolve_arrivals(arrivals: Vec<PathBuf>) -> Option<DownloadEvent> {
    let candidates = arrivals.len();
    arrivals
        .into_iter()
        // A file can vanish between listing and stat; it is simply not a candidate.
        .filter_map(|path| modified_at(&path).map(|modified| (modified, path)))
        .max()
        .map(|(_, path)| DownloadEvent { path, candidates })
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn watcher() -> DownloadWatcher {
        DownloadWatcher::new(Duration::from_millis(10), ExtensionFilter::Any)
    }

    #[test]
    fn returns_file_present_on_first_listing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let watcher = watcher();
        let baseline = watcher.snapshot(dir.path()).expect("baseline");
        fs::write(dir.path().join("doc.pdf"), "x").expect("write");

        let event = watcher
            .await_new_file(dir.path(), &baseline, Duration::ZERO)
            .expect("detected");
        assert_eq!(event.path, dir.path().join("doc.pdf"));
        assert_eq!(event.candidates, 1);
    }

    #[test]
    fn unrepresentable_timeout_still_returns_arrivals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let watcher = watcher();
        let baseline = watcher.snapshot(dir.path()).expect("baseline");
        assert!(baseline.is_empty());
        fs::write(dir.path().join("late.xls"), "x").expect("write");

        let event = watcher
            .await_new_file(dir.path(), &baseline, Duration::from_secs(u64::MAX))
            .expect("detected");
        assert_eq!(event.path, dir.path().join("late.xls"));
    }

    #[test]
    fn newest_file_wins_when_several_arrive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let watcher = watcher();
        let baseline = watcher.snapshot(dir.path()).expect("baseline");

        let older = dir.path().join("z-older.pdf");
        let newer = dir.path().join("a-newer.pdf");
        fs::write(&older, "old").expect("write older");
        fs::write(&newer, "new").expect("write newer");
        let now = SystemTime::now();
        File::options()
            .write(true)
            .open(&older)
            .and_then(|file| file.set_modified(now - Duration::from_secs(60)))
            .expect("age older file");
        File::options()
            .write(true)
            .open(&newer)
            .and_then(|file| file.set_modified(now))
            .expect("touch newer file");

        let event = watcher
            .await_new_file(dir.path(), &baseline, Duration::from_millis(50))
            .expect("detected");
        assert_eq!(event.path, newer);
        assert_eq!(event.candidates, 2);
    }

    #[test]
    fn equal_modification_times_resolve_to_greatest_path() {
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.pdf", "c.pdf", "a.pdf"] {
            let path = dir.path().join(name);
            fs::write(&path, name).expect("write");
            File::options()
                .write(true)
                .open(&path)
                .and_then(|file| file.set_modified(stamp))
                .expect("set mtime");
        }

        let arrivals = vec![
            dir.path().join("a.pdf"),
            dir.path().join("b.pdf"),
            dir.path().join("c.pdf"),
        ];
        let event = resolve_arrivals(arrivals).expect("resolved");
        assert_eq!(event.path, dir.path().join("c.pdf"));
    }
}

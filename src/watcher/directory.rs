//! Non-recursive `notify` watches over the configured directories.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::error::WatchError;

/// Owns the platform watcher and the set of directories registered on it.
pub struct DirectoryWatcher {
    watcher: notify::RecommendedWatcher,
    watched: BTreeSet<PathBuf>,
}

impl DirectoryWatcher {
    /// Create a watcher forwarding raw events into `tx`.
    pub fn new(tx: mpsc::Sender<notify::Result<Event>>) -> Result<Self, WatchError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;
        Ok(Self {
            watcher,
            watched: BTreeSet::new(),
        })
    }

    pub fn watch(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.watched.insert(dir.to_path_buf());
        crate::debug_event!("watcher", "watching", "{}", dir.display());
        Ok(())
    }

    /// Drop and re-register the watch on `dir` (after it was recreated).
    pub fn rewatch(&mut self, dir: &Path) -> Result<(), WatchError> {
        if self.watched.remove(dir) {
            // The old registration may already be gone with the directory
            let _ = self.watcher.unwatch(dir);
        }
        self.watch(dir)
    }

    pub fn is_watching(&self, dir: &Path) -> bool {
        self.watched.contains(dir)
    }
}

/// Whether an event can change a directory listing.
///
/// Content writes and access events never do; the listing only depends on
/// names and attributes.
pub fn affects_listing(kind: &EventKind) -> bool {
    !matches!(
        kind,
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Data(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RenameMode};

    #[test]
    fn test_affects_listing() {
        assert!(affects_listing(&EventKind::Create(CreateKind::File)));
        assert!(affects_listing(&EventKind::Modify(ModifyKind::Name(
            RenameMode::Both
        ))));
        assert!(!affects_listing(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
    }

    #[tokio::test]
    async fn test_watch_missing_directory_fails() {
        let (tx, _rx) = mpsc::channel(8);
        let mut watcher = DirectoryWatcher::new(tx).unwrap();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        assert!(matches!(
            watcher.watch(&missing),
            Err(WatchError::PathWatchFailed { .. })
        ));
        assert!(!watcher.is_watching(&missing));

        watcher.watch(temp_dir.path()).unwrap();
        assert!(watcher.is_watching(temp_dir.path()));
    }
}

//! Trailing-edge debouncing of reload requests, keyed by watched directory.
//!
//! A burst of notifications for one directory (a download writing a temp
//! file, renaming it, touching metadata) collapses into a single reload that
//! runs once the directory has been quiet for the configured duration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer {
    /// Pending reloads: directory -> last notification.
    pending: BTreeMap<PathBuf, Instant>,
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: BTreeMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record a notification for `dir`, restarting its quiet period.
    pub fn record(&mut self, dir: PathBuf) {
        self.pending.insert(dir, Instant::now());
    }

    /// Drop a pending reload that has been superseded (a reload for `dir`
    /// already ran). Returns true if one was pending.
    pub fn cancel(&mut self, dir: &Path) -> bool {
        self.pending.remove(dir).is_some()
    }

    /// Take every directory that has been quiet for the debounce duration.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|dir, last_change| {
            if now.duration_since(*last_change) >= self.duration {
                ready.push(dir.clone());
                false
            } else {
                true
            }
        });

        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_pending(&self, dir: &Path) -> bool {
        self.pending.contains_key(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_burst_collapses_to_one_reload() {
        let mut debouncer = Debouncer::new(50);
        let desk = PathBuf::from("/desk");

        for _ in 0..5 {
            debouncer.record(desk.clone());
        }
        assert!(debouncer.take_ready().is_empty());

        sleep(Duration::from_millis(60));
        assert_eq!(debouncer.take_ready(), vec![desk]);
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn test_record_restarts_quiet_period() {
        let mut debouncer = Debouncer::new(80);
        let desk = PathBuf::from("/desk");

        debouncer.record(desk.clone());
        sleep(Duration::from_millis(50));
        debouncer.record(desk.clone());
        sleep(Duration::from_millis(50));

        assert!(debouncer.take_ready().is_empty());
        assert!(debouncer.is_pending(&desk));
    }

    #[test]
    fn test_directories_are_independent() {
        let mut debouncer = Debouncer::new(0);
        debouncer.record(PathBuf::from("/a"));
        debouncer.record(PathBuf::from("/b"));

        assert!(debouncer.cancel(Path::new("/a")));
        assert!(!debouncer.cancel(Path::new("/a")));
        assert_eq!(debouncer.take_ready(), vec![PathBuf::from("/b")]);
    }
}

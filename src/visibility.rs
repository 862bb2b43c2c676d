//! Visibility projection and the sink it is delivered to.
//!
//! The projection of a directory is the set of file names owned by a
//! *visible* bucket: those are hidden from the desktop and shown inside
//! their bucket instead. Only the difference between two projections is
//! sent to the sink; the core never checks whether hiding succeeded.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::bucket::BucketSet;
use crate::classify::Membership;

/// Files to hide and files to show again in one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityDiff {
    pub dir: PathBuf,
    pub hide: Vec<String>,
    pub show: Vec<String>,
}

impl VisibilityDiff {
    /// Diff two projections. Both lists come out sorted.
    pub fn between(dir: &Path, previous: &BTreeSet<String>, next: &BTreeSet<String>) -> Self {
        Self {
            dir: dir.to_path_buf(),
            hide: next.difference(previous).cloned().collect(),
            show: previous.difference(next).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hide.is_empty() && self.show.is_empty()
    }
}

/// Names owned by a visible bucket.
pub fn project(membership: &Membership, buckets: &BucketSet) -> BTreeSet<String> {
    membership
        .iter()
        .filter(|(_, owner)| {
            owner
                .and_then(|id| buckets.get(id))
                .is_some_and(|bucket| bucket.visible)
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Receiver of visibility diffs (the desktop shell layer).
#[async_trait]
pub trait VisibilitySink: Send + Sync {
    async fn apply(&self, diff: &VisibilityDiff);
}

/// Logs each diff.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl VisibilitySink for LogSink {
    async fn apply(&self, diff: &VisibilityDiff) {
        crate::log_event!(
            "visibility",
            "diff",
            "{}: hide {:?} show {:?}",
            diff.dir.display(),
            diff.hide,
            diff.show
        );
    }
}

/// Writes each diff as one JSON line.
pub struct JsonLinesSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

#[async_trait]
impl VisibilitySink for JsonLinesSink {
    async fn apply(&self, diff: &VisibilityDiff) {
        let line = match serde_json::to_string(diff) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("[visibility] failed to serialize diff: {e}");
                return;
            }
        };
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            tracing::warn!("[visibility] failed to write diff: {e}");
        }
    }
}

/// Keeps every diff it receives. For tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingSink {
    diffs: Mutex<Vec<VisibilityDiff>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diffs(&self) -> Vec<VisibilityDiff> {
        self.diffs.lock().clone()
    }

    pub fn take(&self) -> Vec<VisibilityDiff> {
        std::mem::take(&mut *self.diffs.lock())
    }
}

#[async_trait]
impl VisibilitySink for RecordingSink {
    async fn apply(&self, diff: &VisibilityDiff) {
        self.diffs.lock().push(diff.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucket;
    use crate::types::BucketId;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_between_projections() {
        let diff = VisibilityDiff::between(
            Path::new("/desk"),
            &names(&["a.jpg", "b.pdf"]),
            &names(&["b.pdf", "c.txt"]),
        );
        assert_eq!(diff.hide, vec!["c.txt"]);
        assert_eq!(diff.show, vec!["a.jpg"]);

        let same = VisibilityDiff::between(Path::new("/desk"), &names(&["a"]), &names(&["a"]));
        assert!(same.is_empty());
    }

    #[test]
    fn test_projection_skips_hidden_buckets() {
        let shown = BucketId::new(1).unwrap();
        let collapsed = BucketId::new(2).unwrap();
        let mut off = Bucket::new(collapsed, "Off");
        off.visible = false;
        let buckets = BucketSet::from_buckets([Bucket::new(shown, "On"), off]);

        let membership: Membership = [
            ("a.jpg".to_string(), Some(shown)),
            ("b.pdf".to_string(), Some(collapsed)),
            ("c.txt".to_string(), None),
        ]
        .into_iter()
        .collect();

        assert_eq!(project(&membership, &buckets), names(&["a.jpg"]));
    }

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingSink::new();
        let diff = VisibilityDiff {
            dir: PathBuf::from("/desk"),
            hide: vec!["a".to_string()],
            show: vec![],
        };
        sink.apply(&diff).await;
        assert_eq!(sink.take(), vec![diff]);
        assert!(sink.diffs().is_empty());
    }
}

//! Per-directory sync state: listing, resolving and projecting.
//!
//! ```text
//! Idle -> Listing -> Resolving -> Projecting -> Idle
//!            |
//!            +-- listing failed --> Degraded (last projection kept)
//! ```
//!
//! The controller holds no bucket configuration of its own. Every pass is
//! handed the current [`BucketSet`] by the engine, so a pass always sees one
//! consistent configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::bucket::BucketSet;
use crate::classify::{Membership, Resolver};
use crate::notifications::{BucketEvent, EventBroadcaster};
use crate::types::{BucketId, FileObservation};
use crate::visibility::{self, VisibilityDiff, VisibilitySink};

use super::listing::list_directory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Listing,
    Resolving,
    Projecting,
    /// The last listing failed; the previous projection is still in effect.
    Degraded,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Listing => "listing",
            SyncPhase::Resolving => "resolving",
            SyncPhase::Projecting => "projecting",
            SyncPhase::Degraded => "degraded",
        };
        f.write_str(name)
    }
}

/// Snapshot of one watched directory for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryStatus {
    pub dir: PathBuf,
    pub phase: SyncPhase,
    pub watched: bool,
    pub files: usize,
    pub hidden: usize,
    pub degraded_reason: Option<String>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    phase: Option<SyncPhase>,
    watched: bool,
    membership: Membership,
    projection: BTreeSet<String>,
    degraded: Option<String>,
}

impl DirectoryState {
    fn phase(&self) -> SyncPhase {
        self.phase.unwrap_or(SyncPhase::Idle)
    }
}

/// What one reload pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// Buckets whose member set in this directory changed.
    pub changed_buckets: BTreeSet<BucketId>,
    /// The diff sent to the sink, if it was not empty.
    pub diff: Option<VisibilityDiff>,
    /// The directory was degraded before this pass and listed fine now.
    pub recovered: bool,
    /// The listing failed.
    pub degraded: bool,
}

pub struct SyncController {
    dirs: BTreeMap<PathBuf, DirectoryState>,
    include_hidden: bool,
}

impl SyncController {
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>, include_hidden: bool) -> Self {
        Self {
            dirs: dirs
                .into_iter()
                .map(|dir| (dir, DirectoryState::default()))
                .collect(),
            include_hidden,
        }
    }

    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.dirs.keys().map(PathBuf::as_path)
    }

    pub fn is_tracked(&self, dir: &Path) -> bool {
        self.dirs.contains_key(dir)
    }

    /// The watched directory an event path belongs to.
    ///
    /// Watches are non-recursive, so that is the path itself (the directory
    /// was removed or renamed) or its parent.
    pub fn directory_for(&self, path: &Path) -> Option<PathBuf> {
        if self.dirs.contains_key(path) {
            return Some(path.to_path_buf());
        }
        path.parent()
            .filter(|parent| self.dirs.contains_key(*parent))
            .map(Path::to_path_buf)
    }

    pub fn phase(&self, dir: &Path) -> Option<SyncPhase> {
        self.dirs.get(dir).map(DirectoryState::phase)
    }

    pub fn membership(&self, dir: &Path) -> Option<&Membership> {
        self.dirs.get(dir).map(|state| &state.membership)
    }

    /// Members of `bucket` across every watched directory.
    pub fn members_of(&self, bucket: BucketId) -> BTreeSet<String> {
        self.dirs
            .values()
            .flat_map(|state| state.membership.members_of(bucket))
            .collect()
    }

    pub fn set_watched(&mut self, dir: &Path, watched: bool) {
        if let Some(state) = self.dirs.get_mut(dir) {
            state.watched = watched;
        }
    }

    /// Directories the fallback poll has to cover.
    pub fn needs_poll(&self) -> Vec<PathBuf> {
        self.dirs
            .iter()
            .filter(|(_, state)| state.degraded.is_some() || !state.watched)
            .map(|(dir, _)| dir.clone())
            .collect()
    }

    pub fn status(&self) -> Vec<DirectoryStatus> {
        self.dirs
            .iter()
            .map(|(dir, state)| DirectoryStatus {
                dir: dir.clone(),
                phase: state.phase(),
                watched: state.watched,
                files: state.membership.len(),
                hidden: state.projection.len(),
                degraded_reason: state.degraded.clone(),
            })
            .collect()
    }

    /// Run one full pass over `dir`.
    pub async fn reload(
        &mut self,
        dir: &Path,
        buckets: &BucketSet,
        sink: &dyn VisibilitySink,
        events: &EventBroadcaster,
    ) -> ReloadOutcome {
        let include_hidden = self.include_hidden;
        let Some(state) = self.dirs.get_mut(dir) else {
            tracing::warn!("[sync] reload requested for untracked {}", dir.display());
            return ReloadOutcome::default();
        };

        state.phase = Some(SyncPhase::Listing);
        let files = match list_off_thread(dir, include_hidden).await {
            Ok(files) => files,
            Err(reason) => {
                state.phase = Some(SyncPhase::Degraded);
                if state.degraded.as_deref() != Some(reason.as_str()) {
                    tracing::warn!("[sync] {} unavailable: {reason}", dir.display());
                    events.send(BucketEvent::DirectoryDegraded {
                        dir: dir.to_path_buf(),
                        reason: reason.clone(),
                    });
                }
                state.degraded = Some(reason);
                return ReloadOutcome {
                    degraded: true,
                    ..Default::default()
                };
            }
        };

        let recovered = state.degraded.take().is_some();
        if recovered {
            crate::log_event!("sync", "recovered", "{}", dir.display());
            events.send(BucketEvent::DirectoryRecovered {
                dir: dir.to_path_buf(),
            });
        }

        state.phase = Some(SyncPhase::Resolving);
        let membership = Resolver::new(buckets).resolve_all(&files);

        state.phase = Some(SyncPhase::Projecting);
        let projection = visibility::project(&membership, buckets);
        let diff = VisibilityDiff::between(dir, &state.projection, &projection);
        let changed_buckets = membership.changed_buckets(&state.membership);

        let diff = if diff.is_empty() {
            None
        } else {
            sink.apply(&diff).await;
            Some(diff)
        };

        state.membership = membership;
        state.projection = projection;
        state.phase = Some(SyncPhase::Idle);

        crate::debug_event!(
            "sync",
            "reloaded",
            "{} ({} files, {} changed buckets)",
            dir.display(),
            files.len(),
            changed_buckets.len()
        );
        events.send(BucketEvent::Reloaded {
            dir: dir.to_path_buf(),
            files: files.len(),
        });

        ReloadOutcome {
            changed_buckets,
            diff,
            recovered,
            degraded: false,
        }
    }
}

/// Listing touches the filesystem; keep it off the async worker.
async fn list_off_thread(dir: &Path, include_hidden: bool) -> Result<Vec<FileObservation>, String> {
    let owned = dir.to_path_buf();
    match tokio::task::spawn_blocking(move || list_directory(&owned, include_hidden)).await {
        Ok(Ok(files)) => Ok(files),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("listing task failed: {e}")),
    }
}

//! Engine: single owner of the bucket configuration and sync state.
//!
//! One tokio task owns the [`Enforcer`], the [`SyncController`], the
//! directory watches and the debouncer. Everything that reads or writes that
//! state goes through one command queue:
//!
//! ```text
//! EngineHandle (clone per caller) --Command--> +--------+
//! notify events ----------------------------->| Engine |--> VisibilitySink
//! debounce tick / fallback poll -------------->+--------+--> EventBroadcaster
//! ```
//!
//! A mutation is applied, persisted and immediately followed by a reload of
//! every watched directory before the next command is accepted, so callers
//! only ever observe the state before or after a mutation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::Event;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::bucket::Bucket;
use crate::config::Settings;
use crate::enforcer::{Changes, Enforcer, NewBucket};
use crate::error::{BucketError, BucketResult};
use crate::notifications::{BucketEvent, EventBroadcaster};
use crate::storage::BucketStore;
use crate::types::{BucketId, Extension};
use crate::visibility::{LogSink, VisibilitySink};
use crate::watcher::{
    Debouncer, DirectoryStatus, DirectoryWatcher, SyncController, affects_listing,
};

/// One-shot channel for returning results from the engine
pub type Responder<T> = oneshot::Sender<BucketResult<T>>;

const TICK: Duration = Duration::from_millis(100);

/// What a mutating command changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Buckets whose stored configuration changed (including deleted ones).
    pub changed_config: BTreeSet<BucketId>,
    /// Buckets whose visible membership changed, for UI refresh.
    pub membership_changed: BTreeSet<BucketId>,
}

/// Commands sent to the engine task
#[derive(Debug)]
pub enum Command {
    ClaimExtension {
        bucket: BucketId,
        extension: Extension,
        respond: Responder<MutationOutcome>,
    },
    ReleaseExtension {
        bucket: BucketId,
        extension: Extension,
        respond: Responder<MutationOutcome>,
    },
    ForceInclude {
        bucket: BucketId,
        name: String,
        respond: Responder<MutationOutcome>,
    },
    ForceExclude {
        bucket: BucketId,
        name: String,
        respond: Responder<MutationOutcome>,
    },
    ClearOverride {
        bucket: BucketId,
        name: String,
        respond: Responder<MutationOutcome>,
    },
    CreateBucket {
        new: NewBucket,
        respond: Responder<(BucketId, MutationOutcome)>,
    },
    DeleteBucket {
        bucket: BucketId,
        respond: Responder<MutationOutcome>,
    },
    Rename {
        bucket: BucketId,
        name: String,
        respond: Responder<MutationOutcome>,
    },
    SetVisible {
        bucket: BucketId,
        visible: bool,
        respond: Responder<MutationOutcome>,
    },
    SetPriority {
        bucket: BucketId,
        priority: i32,
        respond: Responder<MutationOutcome>,
    },
    AddPattern {
        bucket: BucketId,
        pattern: String,
        respond: Responder<MutationOutcome>,
    },
    RemovePattern {
        bucket: BucketId,
        pattern: String,
        respond: Responder<MutationOutcome>,
    },
    ApplyTemplate {
        name: String,
        respond: Responder<(Vec<BucketId>, MutationOutcome)>,
    },

    /// Re-list one watched directory, or all of them
    Reload {
        dir: Option<PathBuf>,
        respond: Responder<BTreeSet<BucketId>>,
    },
    GetMembership {
        bucket: BucketId,
        respond: Responder<BTreeSet<String>>,
    },
    ListBuckets {
        respond: Responder<Vec<Bucket>>,
    },
    /// Resolve an id (`3`, `#3`) or a name to a bucket id
    ResolveBucket {
        reference: String,
        respond: Responder<BucketId>,
    },
    Status {
        respond: Responder<Vec<DirectoryStatus>>,
    },
    Shutdown {
        respond: Responder<()>,
    },
}

/// Handle for talking to a running engine.
///
/// Can be cloned and shared. Every call enqueues a command and waits for
/// its response.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<Command>,
    events: EventBroadcaster,
}

impl EngineHandle {
    async fn send_and_wait<T>(
        &self,
        make_cmd: impl FnOnce(Responder<T>) -> Command,
    ) -> BucketResult<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make_cmd(tx))
            .await
            .map_err(|_| BucketError::EngineClosed)?;
        rx.await.map_err(|_| BucketError::EngineClosed)?
    }

    /// Subscribe to change and status notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<BucketEvent> {
        self.events.subscribe()
    }

    pub async fn claim_extension(
        &self,
        bucket: BucketId,
        extension: &str,
    ) -> BucketResult<MutationOutcome> {
        let extension = Extension::parse(extension)?;
        self.send_and_wait(|respond| Command::ClaimExtension {
            bucket,
            extension,
            respond,
        })
        .await
    }

    pub async fn release_extension(
        &self,
        bucket: BucketId,
        extension: &str,
    ) -> BucketResult<MutationOutcome> {
        let extension = Extension::parse(extension)?;
        self.send_and_wait(|respond| Command::ReleaseExtension {
            bucket,
            extension,
            respond,
        })
        .await
    }

    pub async fn force_include(&self, bucket: BucketId, name: &str) -> BucketResult<MutationOutcome> {
        let name = name.to_string();
        self.send_and_wait(|respond| Command::ForceInclude {
            bucket,
            name,
            respond,
        })
        .await
    }

    pub async fn force_exclude(&self, bucket: BucketId, name: &str) -> BucketResult<MutationOutcome> {
        let name = name.to_string();
        self.send_and_wait(|respond| Command::ForceExclude {
            bucket,
            name,
            respond,
        })
        .await
    }

    pub async fn clear_override(&self, bucket: BucketId, name: &str) -> BucketResult<MutationOutcome> {
        let name = name.to_string();
        self.send_and_wait(|respond| Command::ClearOverride {
            bucket,
            name,
            respond,
        })
        .await
    }

    pub async fn create_bucket(&self, new: NewBucket) -> BucketResult<(BucketId, MutationOutcome)> {
        self.send_and_wait(|respond| Command::CreateBucket { new, respond })
            .await
    }

    pub async fn delete_bucket(&self, bucket: BucketId) -> BucketResult<MutationOutcome> {
        self.send_and_wait(|respond| Command::DeleteBucket { bucket, respond })
            .await
    }

    pub async fn rename(&self, bucket: BucketId, name: &str) -> BucketResult<MutationOutcome> {
        let name = name.to_string();
        self.send_and_wait(|respond| Command::Rename {
            bucket,
            name,
            respond,
        })
        .await
    }

    pub async fn set_visible(&self, bucket: BucketId, visible: bool) -> BucketResult<MutationOutcome> {
        self.send_and_wait(|respond| Command::SetVisible {
            bucket,
            visible,
            respond,
        })
        .await
    }

    pub async fn set_priority(&self, bucket: BucketId, priority: i32) -> BucketResult<MutationOutcome> {
        self.send_and_wait(|respond| Command::SetPriority {
            bucket,
            priority,
            respond,
        })
        .await
    }

    pub async fn add_pattern(&self, bucket: BucketId, pattern: &str) -> BucketResult<MutationOutcome> {
        let pattern = pattern.to_string();
        self.send_and_wait(|respond| Command::AddPattern {
            bucket,
            pattern,
            respond,
        })
        .await
    }

    pub async fn remove_pattern(
        &self,
        bucket: BucketId,
        pattern: &str,
    ) -> BucketResult<MutationOutcome> {
        let pattern = pattern.to_string();
        self.send_and_wait(|respond| Command::RemovePattern {
            bucket,
            pattern,
            respond,
        })
        .await
    }

    pub async fn apply_template(&self, name: &str) -> BucketResult<(Vec<BucketId>, MutationOutcome)> {
        let name = name.to_string();
        self.send_and_wait(|respond| Command::ApplyTemplate { name, respond })
            .await
    }

    /// Re-list `dir` (or every watched directory). Returns the buckets whose
    /// membership changed.
    pub async fn reload(&self, dir: Option<&Path>) -> BucketResult<BTreeSet<BucketId>> {
        let dir = dir.map(Path::to_path_buf);
        self.send_and_wait(|respond| Command::Reload { dir, respond })
            .await
    }

    /// Members of `bucket` across every watched directory, ordered by name.
    pub async fn membership(&self, bucket: BucketId) -> BucketResult<BTreeSet<String>> {
        self.send_and_wait(|respond| Command::GetMembership { bucket, respond })
            .await
    }

    pub async fn buckets(&self) -> BucketResult<Vec<Bucket>> {
        self.send_and_wait(|respond| Command::ListBuckets { respond })
            .await
    }

    pub async fn resolve_bucket(&self, reference: &str) -> BucketResult<BucketId> {
        let reference = reference.to_string();
        self.send_and_wait(|respond| Command::ResolveBucket { reference, respond })
            .await
    }

    pub async fn status(&self) -> BucketResult<Vec<DirectoryStatus>> {
        self.send_and_wait(|respond| Command::Status { respond })
            .await
    }

    /// Ask the engine to stop after the commands already queued.
    pub async fn shutdown(&self) -> BucketResult<()> {
        self.send_and_wait(|respond| Command::Shutdown { respond })
            .await
    }
}

pub struct Engine {
    enforcer: Enforcer,
    controller: SyncController,
    debouncer: Debouncer,
    watcher: Option<DirectoryWatcher>,
    fs_rx: mpsc::Receiver<notify::Result<Event>>,
    cmd_rx: mpsc::Receiver<Command>,
    sink: Arc<dyn VisibilitySink>,
    events: EventBroadcaster,
    poll_interval: Duration,
}

impl Engine {
    /// Create a builder for configuring the engine.
    pub fn builder(store: Arc<dyn BucketStore>) -> EngineBuilder {
        EngineBuilder::new(store)
    }

    /// Run the engine on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The engine loop. Returns once [`EngineHandle::shutdown`] is called or
    /// every handle has been dropped.
    pub async fn run(mut self) {
        let dirs: Vec<PathBuf> = self.controller.directories().map(Path::to_path_buf).collect();
        if let Some(watcher) = self.watcher.as_mut() {
            for dir in &dirs {
                match watcher.watch(dir) {
                    Ok(()) => self.controller.set_watched(dir, true),
                    Err(e) => tracing::warn!("[engine] {e}, falling back to polling"),
                }
            }
        }
        crate::log_event!("engine", "started", "{} directories", dirs.len());

        self.reload_all().await;

        let mut tick = tokio::time::interval(TICK);
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.reset();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown { respond }) => {
                            let _ = respond.send(Ok(()));
                            break;
                        }
                        Some(cmd) => self.handle(cmd).await,
                        None => break,
                    }
                }

                Some(res) = self.fs_rx.recv() => {
                    match res {
                        Ok(event) => self.on_fs_event(event),
                        Err(e) => tracing::error!("[watcher] file watch error: {e}"),
                    }
                }

                _ = tick.tick(), if self.debouncer.has_pending() => {
                    let ready = self.debouncer.take_ready();
                    let mut changed = BTreeSet::new();
                    for dir in ready {
                        changed.extend(self.reload_dir(&dir).await);
                    }
                    self.announce_membership(&changed);
                }

                _ = poll.tick() => {
                    self.poll().await;
                }
            }
        }

        crate::log_event!("engine", "stopped");
    }

    fn on_fs_event(&mut self, event: Event) {
        if !affects_listing(&event.kind) {
            return;
        }
        for path in &event.paths {
            if let Some(dir) = self.controller.directory_for(path) {
                crate::debug_event!("watcher", "changed", "{:?} {}", event.kind, path.display());
                self.debouncer.record(dir);
            }
        }
    }

    async fn poll(&mut self) {
        let mut changed = BTreeSet::new();
        for dir in self.controller.needs_poll() {
            if let Some(watcher) = self.watcher.as_mut() {
                if !watcher.is_watching(&dir) && watcher.watch(&dir).is_ok() {
                    self.controller.set_watched(&dir, true);
                }
            }
            changed.extend(self.reload_dir(&dir).await);
        }
        self.announce_membership(&changed);
    }

    async fn reload_dir(&mut self, dir: &Path) -> BTreeSet<BucketId> {
        // This pass supersedes any reload still waiting for the quiet period
        self.debouncer.cancel(dir);

        let outcome = self
            .controller
            .reload(dir, self.enforcer.buckets(), self.sink.as_ref(), &self.events)
            .await;

        if outcome.degraded {
            self.controller.set_watched(dir, false);
        }
        if outcome.recovered {
            if let Some(watcher) = self.watcher.as_mut() {
                match watcher.rewatch(dir) {
                    Ok(()) => self.controller.set_watched(dir, true),
                    Err(e) => tracing::warn!("[engine] {e}"),
                }
            }
        }

        // Hidden buckets have nothing on screen to refresh
        let buckets = self.enforcer.buckets();
        outcome
            .changed_buckets
            .into_iter()
            .filter(|id| buckets.get(*id).is_some_and(|b| b.visible))
            .collect()
    }

    async fn reload_all(&mut self) -> BTreeSet<BucketId> {
        let dirs: Vec<PathBuf> = self.controller.directories().map(Path::to_path_buf).collect();
        let mut changed = BTreeSet::new();
        for dir in dirs {
            changed.extend(self.reload_dir(&dir).await);
        }
        self.announce_membership(&changed);
        changed
    }

    fn announce_membership(&self, changed: &BTreeSet<BucketId>) {
        if !changed.is_empty() {
            self.events.send(BucketEvent::MembershipChanged {
                buckets: changed.iter().copied().collect(),
            });
        }
    }

    /// Publish a committed mutation and fold in the reload it implies.
    async fn commit<T>(
        &mut self,
        result: BucketResult<(T, Changes)>,
    ) -> BucketResult<(T, MutationOutcome)> {
        let (value, changes) = result?;
        let mut outcome = MutationOutcome {
            changed_config: changes.all(),
            ..Default::default()
        };
        if !changes.is_empty() {
            self.events.send(BucketEvent::BucketsChanged {
                buckets: outcome.changed_config.iter().copied().collect(),
            });
            outcome.membership_changed = self.reload_all().await;
        }
        Ok((value, outcome))
    }

    async fn commit_unit(&mut self, result: BucketResult<Changes>) -> BucketResult<MutationOutcome> {
        self.commit(result.map(|changes| ((), changes)))
            .await
            .map(|((), outcome)| outcome)
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::ClaimExtension {
                bucket,
                extension,
                respond,
            } => {
                let result = self.enforcer.claim_extension(bucket, &extension);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::ReleaseExtension {
                bucket,
                extension,
                respond,
            } => {
                let result = self.enforcer.release_extension(bucket, &extension);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::ForceInclude {
                bucket,
                name,
                respond,
            } => {
                let result = self.enforcer.force_include(bucket, &name);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::ForceExclude {
                bucket,
                name,
                respond,
            } => {
                let result = self.enforcer.force_exclude(bucket, &name);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::ClearOverride {
                bucket,
                name,
                respond,
            } => {
                let result = self.enforcer.clear_override(bucket, &name);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::CreateBucket { new, respond } => {
                let result = self.enforcer.create_bucket(new);
                let _ = respond.send(self.commit(result).await);
            }
            Command::DeleteBucket { bucket, respond } => {
                let result = self.enforcer.delete_bucket(bucket);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::Rename {
                bucket,
                name,
                respond,
            } => {
                let result = self.enforcer.rename(bucket, &name);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::SetVisible {
                bucket,
                visible,
                respond,
            } => {
                let result = self.enforcer.set_visible(bucket, visible);
                let outcome = self.commit_unit(result).await.map(|mut outcome| {
                    // Members did not move, but whether they are shown did
                    if outcome.changed_config.contains(&bucket) {
                        outcome.membership_changed.insert(bucket);
                    }
                    outcome
                });
                let _ = respond.send(outcome);
            }
            Command::SetPriority {
                bucket,
                priority,
                respond,
            } => {
                let result = self.enforcer.set_priority(bucket, priority);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::AddPattern {
                bucket,
                pattern,
                respond,
            } => {
                let result = self.enforcer.add_pattern(bucket, &pattern);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::RemovePattern {
                bucket,
                pattern,
                respond,
            } => {
                let result = self.enforcer.remove_pattern(bucket, &pattern);
                let _ = respond.send(self.commit_unit(result).await);
            }
            Command::ApplyTemplate { name, respond } => {
                let result = self.enforcer.apply_template(&name);
                let _ = respond.send(self.commit(result).await);
            }
            Command::Reload { dir, respond } => {
                let result = match dir {
                    Some(dir) if !self.controller.is_tracked(&dir) => {
                        Err(BucketError::DirectoryUnavailable {
                            path: dir,
                            reason: "not a watched directory".to_string(),
                        })
                    }
                    Some(dir) => {
                        let changed = self.reload_dir(&dir).await;
                        self.announce_membership(&changed);
                        Ok(changed)
                    }
                    None => Ok(self.reload_all().await),
                };
                let _ = respond.send(result);
            }
            Command::GetMembership { bucket, respond } => {
                let result = if self.enforcer.buckets().contains(bucket) {
                    Ok(self.controller.members_of(bucket))
                } else {
                    Err(BucketError::BucketNotFound(bucket))
                };
                let _ = respond.send(result);
            }
            Command::ListBuckets { respond } => {
                let _ = respond.send(Ok(self.enforcer.buckets().iter().cloned().collect()));
            }
            Command::ResolveBucket { reference, respond } => {
                let _ = respond.send(self.enforcer.buckets().resolve_ref(&reference));
            }
            Command::Status { respond } => {
                let _ = respond.send(Ok(self.controller.status()));
            }
            Command::Shutdown { respond } => {
                // Handled by the run loop
                let _ = respond.send(Ok(()));
            }
        }
    }
}

/// Builder for constructing an [`Engine`] and its handle.
pub struct EngineBuilder {
    store: Arc<dyn BucketStore>,
    sink: Arc<dyn VisibilitySink>,
    watch_dirs: Vec<PathBuf>,
    debounce_ms: u64,
    poll_interval_ms: u64,
    include_hidden: bool,
    watch: bool,
    bootstrap_template: Option<String>,
    event_capacity: usize,
}

impl EngineBuilder {
    /// Create a new builder with defaults.
    pub fn new(store: Arc<dyn BucketStore>) -> Self {
        Self {
            store,
            sink: Arc::new(LogSink),
            watch_dirs: Vec::new(),
            debounce_ms: 300,
            poll_interval_ms: 5000,
            include_hidden: false,
            watch: true,
            bootstrap_template: None,
            event_capacity: 256,
        }
    }

    /// Take directories, timings and bootstrap template from settings.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.watch_dirs = settings.sync.resolved_watch_dirs();
        self.debounce_ms = settings.sync.debounce_ms;
        self.poll_interval_ms = settings.sync.poll_interval_ms;
        self.include_hidden = settings.sync.include_hidden;
        // An empty template name disables bootstrapping
        self.bootstrap_template = settings
            .bootstrap
            .template
            .clone()
            .filter(|name| !name.trim().is_empty());
        self
    }

    pub fn sink(mut self, sink: Arc<dyn VisibilitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn watch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.watch_dirs.push(dir.into());
        self
    }

    pub fn watch_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.watch_dirs = dirs.into_iter().collect();
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Disable `notify` watches; directories are then only polled.
    pub fn watch(mut self, enabled: bool) -> Self {
        self.watch = enabled;
        self
    }

    pub fn bootstrap_template(mut self, template: Option<String>) -> Self {
        self.bootstrap_template = template;
        self
    }

    /// Load the store, bootstrap it if needed and wire up the channels.
    pub fn build(self) -> BucketResult<(Engine, EngineHandle)> {
        let mut enforcer = Enforcer::load(self.store)?;
        if let Some(ids) = enforcer.bootstrap(self.bootstrap_template.as_deref())? {
            crate::log_event!("engine", "bootstrapped", "{} buckets", ids.len());
        }

        let (fs_tx, fs_rx) = mpsc::channel(256);
        let watcher = if self.watch {
            match DirectoryWatcher::new(fs_tx) {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!("[engine] {e}, falling back to polling");
                    None
                }
            }
        } else {
            None
        };

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let events = EventBroadcaster::new(self.event_capacity);

        let engine = Engine {
            enforcer,
            controller: SyncController::new(self.watch_dirs, self.include_hidden),
            debouncer: Debouncer::new(self.debounce_ms),
            watcher,
            fs_rx,
            cmd_rx,
            sink: self.sink,
            events: events.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        };
        let handle = EngineHandle { cmd_tx, events };
        Ok((engine, handle))
    }
}

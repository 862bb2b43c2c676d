//! Command implementations for the CLI.
//!
//! Each command group lives in its own module. Commands that read or change
//! buckets run a short-lived [`Session`] against the configured store.

pub mod buckets;
pub mod classify;
pub mod init;
pub mod rules;
pub mod watch;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::engine::{Engine, EngineHandle, MutationOutcome};
use crate::notifications::BucketEvent;
use crate::storage::{BucketStore, JsonBucketStore};
use crate::types::BucketId;
use crate::visibility::{LogSink, VisibilitySink};

/// Open the JSON store configured in `settings`.
pub fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn BucketStore>> {
    let path = settings.store_path();
    let store = JsonBucketStore::open(&path)
        .with_context(|| format!("Failed to open bucket store at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// A running engine owned by one CLI invocation.
pub struct Session {
    handle: EngineHandle,
    task: JoinHandle<()>,
    events: Option<broadcast::Receiver<BucketEvent>>,
}

impl Session {
    /// Start an engine with `sink`; `watch` enables filesystem notifications.
    pub fn start(
        settings: &Settings,
        sink: Arc<dyn VisibilitySink>,
        watch: bool,
    ) -> anyhow::Result<Self> {
        let store = open_store(settings)?;
        let (engine, handle) = Engine::builder(store)
            .settings(settings)
            .sink(sink)
            .watch(watch)
            .build()?;
        // Subscribe before the first reload so no event is missed
        let events = handle.subscribe();
        Ok(Self {
            handle,
            task: engine.spawn(),
            events: Some(events),
        })
    }

    /// Session for a single query or mutation: no watches, diffs only logged.
    pub fn oneshot(settings: &Settings) -> anyhow::Result<Self> {
        Self::start(settings, Arc::new(LogSink), false)
    }

    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    /// Events from the start of the session. Only the first call returns them.
    pub fn take_events(&mut self) -> Option<broadcast::Receiver<BucketEvent>> {
        self.events.take()
    }

    /// Resolve a bucket id (`3`, `#3`) or name.
    pub async fn bucket(&self, reference: &str) -> anyhow::Result<BucketId> {
        Ok(self.handle.resolve_bucket(reference).await?)
    }

    /// Stop the engine and wait for its task to finish.
    pub async fn close(self) -> anyhow::Result<()> {
        self.handle.shutdown().await?;
        self.task.await.context("Engine task failed")?;
        Ok(())
    }
}

/// One-line summary of what a mutation touched.
pub(crate) fn describe_outcome(outcome: &MutationOutcome) -> String {
    let list = |ids: &std::collections::BTreeSet<BucketId>| {
        ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    };
    match (
        outcome.changed_config.is_empty(),
        outcome.membership_changed.is_empty(),
    ) {
        (true, _) => "No changes".to_string(),
        (false, true) => format!("Updated {}", list(&outcome.changed_config)),
        (false, false) => format!(
            "Updated {}; membership changed in {}",
            list(&outcome.changed_config),
            list(&outcome.membership_changed)
        ),
    }
}

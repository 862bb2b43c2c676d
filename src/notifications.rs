//! Status and change notifications.
//!
//! A broadcast channel shared between the engine and any number of
//! subscribers (UI layer, CLI `watch`). Subscribers are told *that*
//! something changed and re-query the engine for details.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::BucketId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BucketEvent {
    /// Visible membership of these buckets changed.
    MembershipChanged { buckets: Vec<BucketId> },
    /// Bucket configuration changed (created, deleted, renamed, rules).
    BucketsChanged { buckets: Vec<BucketId> },
    /// A watched directory could not be listed. The last projection is kept.
    DirectoryDegraded { dir: PathBuf, reason: String },
    DirectoryRecovered { dir: PathBuf },
    /// A reload pass completed for `dir`.
    Reloaded { dir: PathBuf, files: usize },
}

/// Fans events out to every subscriber.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<BucketEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn send(&self, event: BucketEvent) {
        match self.sender.send(event.clone()) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "{event:?} to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event:?}");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BucketEvent> {
        self.sender.subscribe()
    }
}

/// Drain `receiver`, handing each event to `on_event` until the channel
/// closes. Lagged receivers log and keep going.
pub async fn forward_events<F>(mut receiver: broadcast::Receiver<BucketEvent>, mut on_event: F)
where
    F: FnMut(BucketEvent),
{
    crate::debug_event!("notify", "listening");
    loop {
        match receiver.recv().await {
            Ok(event) => on_event(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("[notify] lagged by {n} messages");
            }
            Err(broadcast::error::RecvError::Closed) => {
                crate::debug_event!("notify", "channel closed");
                break;
            }
        }
    }
}

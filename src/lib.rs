//! Rule-based desktop file buckets.
//!
//! Files in a watched directory are classified into user-defined buckets by
//! extension ownership, name patterns and per-file overrides. A catch-all
//! bucket collects everything else. The [`engine`] keeps classification and
//! the visibility projection in sync with the filesystem and with
//! configuration changes.

pub mod bucket;
pub mod classify;
pub mod cli;
pub mod config;
pub mod enforcer;
pub mod engine;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod registry;
pub mod storage;
pub mod templates;
pub mod types;
pub mod visibility;
pub mod watcher;

pub use bucket::{Bucket, BucketSet, NamePattern};
pub use classify::{Membership, Resolver, classify};
pub use config::Settings;
pub use enforcer::{Changes, Enforcer, NewBucket};
pub use engine::{Engine, EngineBuilder, EngineHandle, MutationOutcome};
pub use error::{BucketError, BucketResult};
pub use notifications::{BucketEvent, EventBroadcaster};
pub use storage::{BucketStore, JsonBucketStore, MemoryStore, StorageError};
pub use types::{BucketId, Extension, FileObservation};
pub use visibility::{JsonLinesSink, LogSink, RecordingSink, VisibilityDiff, VisibilitySink};

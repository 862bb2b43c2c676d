//! Persisted configuration store.
//!
//! The store is the source of truth at startup and the sink after every
//! ownership mutation. It knows nothing about classification: it loads,
//! saves and deletes whole bucket records.

mod error;
mod memory;
pub mod metadata;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use metadata::StoreMetadata;
pub use persistence::JsonBucketStore;

use crate::bucket::Bucket;
use crate::types::BucketId;

/// Load-all / save-one / delete-one over bucket records.
pub trait BucketStore: Send + Sync {
    /// Every persisted bucket. Order is unspecified.
    fn load_all(&self) -> StorageResult<Vec<Bucket>>;

    /// Insert or replace one bucket record.
    fn save_one(&self, bucket: &Bucket) -> StorageResult<()>;

    /// Remove one bucket record. Deleting a missing record is not an error.
    fn delete_one(&self, id: BucketId) -> StorageResult<()>;

    /// Whether buckets were ever bootstrapped into this store.
    ///
    /// Distinguishes a first run from a user who deleted every bucket.
    fn is_initialized(&self) -> StorageResult<bool> {
        Ok(true)
    }

    /// Record that the store has been bootstrapped.
    fn mark_initialized(&self) -> StorageResult<()> {
        Ok(())
    }
}

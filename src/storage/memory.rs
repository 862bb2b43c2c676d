//! In-memory bucket store.
//!
//! Used by tests and by embedders without a disk store. A single write can be made
//! to fail after a number of successful ones to exercise rollback paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{BucketStore, StorageError, StorageResult};
use crate::bucket::Bucket;
use crate::types::BucketId;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<BucketId, Bucket>>,
    initialized: AtomicBool,
    /// Successful writes remaining before the injected failure.
    fail_after: Mutex<Option<usize>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buckets(buckets: impl IntoIterator<Item = Bucket>) -> Self {
        let store = Self::new();
        {
            let mut records = store.records.lock();
            for bucket in buckets {
                records.insert(bucket.id, bucket);
            }
        }
        store.initialized.store(true, Ordering::SeqCst);
        store
    }

    /// Let `successes` more writes through, then fail the next one.
    pub fn fail_once_after(&self, successes: usize) {
        *self.fail_after.lock() = Some(successes);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get(&self, id: BucketId) -> Option<Bucket> {
        self.records.lock().get(&id).cloned()
    }

    fn check_write(&self) -> StorageResult<()> {
        let mut fail_after = self.fail_after.lock();
        match fail_after.as_mut() {
            Some(0) => {
                *fail_after = None;
                Err(StorageError::Rejected("injected write failure".to_string()))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl BucketStore for MemoryStore {
    fn load_all(&self) -> StorageResult<Vec<Bucket>> {
        Ok(self.records.lock().values().cloned().collect())
    }

    fn save_one(&self, bucket: &Bucket) -> StorageResult<()> {
        self.check_write()?;
        self.records.lock().insert(bucket.id, bucket.clone());
        self.initialized.store(true, Ordering::SeqCst);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete_one(&self, id: BucketId) -> StorageResult<()> {
        self.check_write()?;
        self.records.lock().remove(&id);
        Ok(())
    }

    fn is_initialized(&self) -> StorageResult<bool> {
        Ok(self.initialized.load(Ordering::SeqCst))
    }

    fn mark_initialized(&self) -> StorageResult<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injected_failure() {
        let store = MemoryStore::new();
        let bucket = Bucket::new(BucketId::new(1).unwrap(), "Docs");

        store.fail_once_after(1);
        store.save_one(&bucket).unwrap();
        assert!(store.save_one(&bucket).is_err());
        store.save_one(&bucket).unwrap();
        assert_eq!(store.save_count(), 2);
    }
}

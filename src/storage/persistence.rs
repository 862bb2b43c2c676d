//! JSON-file persistence for bucket records.
//!
//! One pretty-printed JSON file per bucket (`bucket-<id>.json`) under the
//! store directory, plus a `store.meta` file. Writes go to a temporary file
//! in the same directory and are renamed into place, so a crash never leaves
//! a half-written record behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::metadata::StoreMetadata;
use super::{BucketStore, StorageError, StorageResult};
use crate::bucket::Bucket;
use crate::types::BucketId;

const RECORD_PREFIX: &str = "bucket-";
const RECORD_SUFFIX: &str = ".json";

/// Directory-backed bucket store.
#[derive(Debug)]
pub struct JsonBucketStore {
    base_path: PathBuf,
    /// Serializes metadata read-modify-write cycles.
    meta_lock: Mutex<()>,
}

impl JsonBucketStore {
    /// Open (creating if needed) a store rooted at `base_path`.
    pub fn open(base_path: impl AsRef<Path>) -> StorageResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            meta_lock: Mutex::new(()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Whether any bucket record exists
    pub fn exists(&self) -> bool {
        self.record_paths().map(|p| !p.is_empty()).unwrap_or(false)
    }

    fn record_path(&self, id: BucketId) -> PathBuf {
        self.base_path
            .join(format!("{RECORD_PREFIX}{}{RECORD_SUFFIX}", id.value()))
    }

    fn record_paths(&self) -> StorageResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(RECORD_PREFIX) && name.ends_with(RECORD_SUFFIX) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> StorageResult<()> {
        let mut temp = NamedTempFile::new_in(&self.base_path)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| StorageError::AtomicWrite {
            path: path.to_path_buf(),
            reason: e.error.to_string(),
        })?;
        Ok(())
    }

    fn touch_metadata(&self, mark_initialized: bool) -> StorageResult<()> {
        let _guard = self.meta_lock.lock();
        let mut metadata = StoreMetadata::load(&self.base_path)?;
        if mark_initialized {
            metadata.initialized = true;
        }
        let count = self.record_paths()?.len() as u32;
        metadata.update_count(count);
        metadata.save(&self.base_path)
    }
}

impl BucketStore for JsonBucketStore {
    fn load_all(&self) -> StorageResult<Vec<Bucket>> {
        let mut buckets = Vec::new();
        for path in self.record_paths()? {
            let json = fs::read_to_string(&path)?;
            let bucket: Bucket =
                serde_json::from_str(&json).map_err(|e| StorageError::CorruptRecord {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            buckets.push(bucket);
        }
        crate::debug_event!("store", "loaded", "{} buckets", buckets.len());
        Ok(buckets)
    }

    fn save_one(&self, bucket: &Bucket) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(bucket)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize bucket: {e}")))?;
        self.write_atomic(&self.record_path(bucket.id), &json)?;
        self.touch_metadata(true)?;
        crate::debug_event!("store", "saved", "{} {}", bucket.id, bucket.name);
        Ok(())
    }

    fn delete_one(&self, id: BucketId) -> StorageResult<()> {
        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.touch_metadata(false)?;
        crate::debug_event!("store", "deleted", "{id}");
        Ok(())
    }

    fn is_initialized(&self) -> StorageResult<bool> {
        let metadata = StoreMetadata::load(&self.base_path)?;
        Ok(metadata.initialized || self.exists())
    }

    fn mark_initialized(&self) -> StorageResult<()> {
        self.touch_metadata(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extension;
    use tempfile::TempDir;

    fn bucket(id: u32, name: &str) -> Bucket {
        let mut bucket = Bucket::new(BucketId::new(id).unwrap(), name);
        bucket.extensions.insert(Extension::parse(".pdf").unwrap());
        bucket.overrides.exclude("report.pdf");
        bucket
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonBucketStore::open(temp_dir.path()).unwrap();

        store.save_one(&bucket(1, "Docs")).unwrap();
        store.save_one(&bucket(2, "More Docs")).unwrap();

        let mut loaded = store.load_all().unwrap();
        loaded.sort_by_key(|b| b.id);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], bucket(1, "Docs"));
        assert!(temp_dir.path().join("bucket-1.json").exists());
        assert!(temp_dir.path().join("store.meta").exists());
    }

    #[test]
    fn test_save_replaces_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonBucketStore::open(temp_dir.path()).unwrap();

        store.save_one(&bucket(1, "Docs")).unwrap();
        store.save_one(&bucket(1, "Documents")).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Documents");
    }

    #[test]
    fn test_delete_one() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonBucketStore::open(temp_dir.path()).unwrap();
        let id = BucketId::new(1).unwrap();

        store.save_one(&bucket(1, "Docs")).unwrap();
        store.delete_one(id).unwrap();
        assert!(store.load_all().unwrap().is_empty());

        // Deleting again is not an error
        store.delete_one(id).unwrap();
    }

    #[test]
    fn test_initialized_survives_deleting_everything() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonBucketStore::open(temp_dir.path()).unwrap();
        assert!(!store.is_initialized().unwrap());

        store.save_one(&bucket(1, "Docs")).unwrap();
        store.delete_one(BucketId::new(1).unwrap()).unwrap();

        assert!(!store.exists());
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn test_corrupt_record_reported() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonBucketStore::open(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("bucket-7.json"), "{ not json").unwrap();

        let err = store.load_all().unwrap_err();
        assert!(matches!(err, StorageError::CorruptRecord { .. }));
    }
}

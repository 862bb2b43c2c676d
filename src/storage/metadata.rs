//! Metadata tracking for the bucket store.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{StorageError, StorageResult};

const METADATA_FILE: &str = "store.meta";

/// Metadata about the store state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// Version of the record format
    pub version: u32,

    /// Set once buckets have been bootstrapped (template or manual creation)
    #[serde(default)]
    pub initialized: bool,

    /// Number of bucket records at the last write
    #[serde(default)]
    pub bucket_count: u32,

    /// Last modification timestamp (unix seconds, UTC)
    #[serde(default)]
    pub last_modified: i64,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        Self {
            version: 1,
            initialized: false,
            bucket_count: 0,
            last_modified: 0,
        }
    }
}

impl StoreMetadata {
    /// Update the record count and touch the timestamp
    pub fn update_count(&mut self, bucket_count: u32) {
        self.bucket_count = bucket_count;
        self.last_modified = chrono::Utc::now().timestamp();
    }

    /// Save metadata next to the records
    pub fn save(&self, base_path: &Path) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize metadata: {e}")))?;
        fs::write(base_path.join(METADATA_FILE), json)?;
        Ok(())
    }

    /// Load metadata, or defaults when the store is new
    pub fn load(base_path: &Path) -> StorageResult<Self> {
        let metadata_path = base_path.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&metadata_path)?;
        serde_json::from_str(&json).map_err(|e| StorageError::CorruptRecord {
            path: metadata_path,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_metadata_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let metadata = StoreMetadata::load(temp_dir.path()).unwrap();
        assert_eq!(metadata, StoreMetadata::default());
        assert!(!metadata.initialized);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut metadata = StoreMetadata {
            initialized: true,
            ..Default::default()
        };
        metadata.update_count(4);
        metadata.save(temp_dir.path()).unwrap();

        let loaded = StoreMetadata::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.bucket_count, 4);
        assert!(loaded.initialized);
        assert!(loaded.last_modified > 0);
    }
}

//! Error taxonomy for bucket operations.
//!
//! Every failure a caller of a mutating operation can observe is a
//! [`BucketError`]. The resolver and the catch-all projector are total
//! functions and never produce one.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;
use crate::types::BucketId;

#[derive(Error, Debug)]
pub enum BucketError {
    #[error("Bucket not found: {0}")]
    BucketNotFound(BucketId),

    #[error("No bucket named '{0}'")]
    BucketNameNotFound(String),

    #[error("Directory unavailable: {path}: {reason}")]
    DirectoryUnavailable { path: PathBuf, reason: String },

    #[error("Invalid extension '{0}'")]
    InvalidExtension(String),

    #[error("Invalid bucket name: {0}")]
    InvalidName(String),

    #[error("A bucket named '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid file name '{0}'")]
    InvalidFileName(String),

    #[error("Invalid name pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("A catch-all bucket already exists: {0}")]
    DuplicateCatchAll(BucketId),

    #[error("Unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("No free bucket id left")]
    IdsExhausted,

    #[error("Bucket id {0} is already in use")]
    IdInUse(BucketId),

    #[error("Failed to persist bucket configuration: {0}")]
    PersistenceFailure(#[source] StorageError),

    #[error("Failed to load bucket configuration: {0}")]
    LoadFailure(#[source] StorageError),

    #[error("Bucket engine is not running")]
    EngineClosed,
}

impl BucketError {
    /// Whether the caller should refresh its bucket list before retrying.
    pub fn is_stale_reference(&self) -> bool {
        matches!(
            self,
            BucketError::BucketNotFound(_) | BucketError::BucketNameNotFound(_)
        )
    }
}

pub type BucketResult<T> = Result<T, BucketError>;

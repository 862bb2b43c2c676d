use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt bucket record {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("Failed to replace {path}: {reason}")]
    AtomicWrite { path: PathBuf, reason: String },

    #[error("Store rejected write: {0}")]
    Rejected(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

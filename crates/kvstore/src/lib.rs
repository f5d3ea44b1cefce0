//! String key/value storage backends.
//!
//! The dashboard keeps its cached snapshots in one of these. Keys and values
//! are plain strings, mirroring a browser's local storage.

mod file;
mod storage;

pub use file::FileBackedStorage;
pub use storage::{InMemoryStorage, Storage, UnreachableStorage};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage unreachable: {0}")]
    Unreachable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

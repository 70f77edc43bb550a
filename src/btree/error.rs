use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum BTreeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Duplicate key: {0}")]
    DuplicateKey(i32),

    #[error("Corrupt index node: {0}")]
    CorruptNode(String),
}

pub type BTreeResult<T> = Result<T, BTreeError>;

use thiserror::Error;

use crate::btree::BTreeError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Index error: {0}")]
    BTree(#[from] BTreeError),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Comparator {0} requires integer attributes")]
    OrderedComparator(String),

    #[error("Attribute position {0} is out of range")]
    InvalidPosition(usize),

    #[error("Operator is not open")]
    NotOpen,

    #[error("Record does not fit in an empty page")]
    RecordOverflow,
}

pub type ExecResult<T> = Result<T, ExecError>;

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid page id: {0:?}")]
    InvalidPageId(String),

    #[error("Invalid record id: {0:?}")]
    InvalidRecordId(String),

    #[error("Page file is not page-sized: {0}")]
    TruncatedPage(String),

    #[error("Page not in buffer pool: {0}")]
    PageNotCached(String),

    #[error("Page has no outstanding pins: {0}")]
    UnpinUnderflow(String),

    #[error("All buffered pages are pinned")]
    AllPagesPinned,

    #[error("Metadata page is corrupt")]
    MetadataCorrupt,
}

pub type StorageResult<T> = Result<T, StorageError>;

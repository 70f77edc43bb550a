//! Page storage: slotted fixed-size pages on disk, one file per page,
//! cached through a pin-counted buffer pool.

mod buffer_pool;
mod error;
mod ids;
mod page;

pub use buffer_pool::{BufferPool, SharedBufferPool};
pub use error::{StorageError, StorageResult};
pub use ids::{PageId, RecordId, PAGE_ID_LEN, RECORD_ID_LEN};
pub use page::Page;

/// Page size in bytes; pages are the granularity of disk I/O and caching.
pub const PAGE_SIZE: usize = 4096;

/// Number of record slots per page.
pub const MAX_RECORDS: usize = 64;

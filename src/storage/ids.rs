use std::fmt;

use super::error::{StorageError, StorageResult};
use super::MAX_RECORDS;

/// Length of a page id in bytes.
pub const PAGE_ID_LEN: usize = 5;

/// Length of a record id in bytes (page id followed by slot index).
pub const RECORD_ID_LEN: usize = 10;

/// Identifier of a page: five ASCII bytes, doubling as the page's file name
/// under the data directory and as its cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId([u8; PAGE_ID_LEN]);

impl PageId {
    /// Id of the buffer pool's metadata page.
    pub const METADATA: PageId = PageId(*b"bfmgr");

    /// Build a page id from a page number, zero-padded to five digits.
    pub fn from_number(number: u32) -> StorageResult<Self> {
        if number > 99_999 {
            return Err(StorageError::InvalidPageId(number.to_string()));
        }
        let text = format!("{:05}", number);
        let mut bytes = [0u8; PAGE_ID_LEN];
        bytes.copy_from_slice(text.as_bytes());
        Ok(PageId(bytes))
    }

    /// Parse a page id from text; the text must be exactly five bytes.
    pub fn parse(text: &str) -> StorageResult<Self> {
        if text.len() != PAGE_ID_LEN {
            return Err(StorageError::InvalidPageId(text.to_string()));
        }
        let mut bytes = [0u8; PAGE_ID_LEN];
        bytes.copy_from_slice(text.as_bytes());
        Ok(PageId(bytes))
    }

    pub(crate) fn from_bytes(bytes: [u8; PAGE_ID_LEN]) -> Self {
        PageId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PAGE_ID_LEN] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("?????")
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a record: the owning page's id in the first five bytes,
/// the zero-padded slot index in the last five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId([u8; RECORD_ID_LEN]);

impl RecordId {
    /// Compose a record id from its page and slot index.
    pub fn new(page_id: &PageId, slot: usize) -> Self {
        debug_assert!(slot < MAX_RECORDS);
        let mut bytes = [0u8; RECORD_ID_LEN];
        bytes[..PAGE_ID_LEN].copy_from_slice(page_id.as_bytes());
        bytes[PAGE_ID_LEN..].copy_from_slice(format!("{:05}", slot).as_bytes());
        RecordId(bytes)
    }

    /// Parse a record id from text; the text must be exactly ten bytes.
    pub fn parse(text: &str) -> StorageResult<Self> {
        if text.len() != RECORD_ID_LEN {
            return Err(StorageError::InvalidRecordId(text.to_string()));
        }
        let mut bytes = [0u8; RECORD_ID_LEN];
        bytes.copy_from_slice(text.as_bytes());
        Ok(RecordId(bytes))
    }

    pub(crate) fn from_bytes(bytes: [u8; RECORD_ID_LEN]) -> Self {
        RecordId(bytes)
    }

    /// The owning page's id.
    pub fn page_id(&self) -> PageId {
        let mut bytes = [0u8; PAGE_ID_LEN];
        bytes.copy_from_slice(&self.0[..PAGE_ID_LEN]);
        PageId(bytes)
    }

    /// The slot index within the owning page. Placeholder ids (non-decimal
    /// slot text) carry no slot.
    pub fn slot_index(&self) -> Option<usize> {
        std::str::from_utf8(&self.0[PAGE_ID_LEN..])
            .ok()?
            .parse::<usize>()
            .ok()
            .filter(|slot| *slot < MAX_RECORDS)
    }

    pub fn as_bytes(&self) -> &[u8; RECORD_ID_LEN] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("??????????")
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::EngineConfig;
use crate::record::{Attribute, Record};

use super::error::{StorageError, StorageResult};
use super::ids::{PageId, RecordId};
use super::page::Page;

/// Buffer pool handle shared between the index and the query operators.
pub type SharedBufferPool = Arc<Mutex<BufferPool>>;

struct Frame {
    page: Page,
    pins: usize,
}

/// A bounded cache of pages keyed by page id.
///
/// Pinned pages are immune to eviction; once a page's pin count drops to
/// zero it joins the back of the unpinned queue, and the victim is always
/// the front of that queue (the page unpinned longest ago). Dirty victims
/// are written back before they leave the cache.
pub struct BufferPool {
    data_dir: PathBuf,
    capacity: usize,
    frames: HashMap<PageId, Frame>,
    /// Pages with zero pins in the order they first became evictable.
    unpinned: VecDeque<PageId>,
}

impl BufferPool {
    /// Create a pool over `data_dir` holding at most `capacity` resident
    /// pages. The metadata page is created on first use of the directory.
    pub fn new<P: AsRef<Path>>(data_dir: P, capacity: usize) -> StorageResult<Self> {
        let mut pool = Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            capacity,
            frames: HashMap::new(),
            unpinned: VecDeque::new(),
        };

        if !pool.exists(&PageId::METADATA) {
            // slot 0 tracks the number of allocated pages
            let page = pool.pin(&PageId::METADATA)?;
            let created = page.add_record(&[Attribute::Int(0)]).is_some();
            pool.unpin(&PageId::METADATA)?;
            if !created {
                return Err(StorageError::MetadataCorrupt);
            }
        }
        Ok(pool)
    }

    /// Create a pool from an engine configuration.
    pub fn from_config(config: &EngineConfig) -> StorageResult<Self> {
        Self::new(&config.data_dir, config.buffer_pool_pages)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Pin a page, loading or creating it if absent. The returned reference
    /// is valid until the matching `unpin`; every pin must be paired with
    /// exactly one unpin.
    pub fn pin(&mut self, page_id: &PageId) -> StorageResult<&mut Page> {
        if !self.frames.contains_key(page_id) {
            self.load_frame(page_id)?;
        } else if self.frames.get(page_id).map(|frame| frame.pins) == Some(0) {
            // a pinned page must never be an eviction candidate
            self.unpinned.retain(|id| id != page_id);
        }

        let frame = self
            .frames
            .get_mut(page_id)
            .ok_or_else(|| StorageError::PageNotCached(page_id.to_string()))?;
        frame.pins += 1;
        Ok(&mut frame.page)
    }

    /// Release one pin. When the count reaches zero the page joins the back
    /// of the unpinned queue.
    pub fn unpin(&mut self, page_id: &PageId) -> StorageResult<()> {
        let frame = self
            .frames
            .get_mut(page_id)
            .ok_or_else(|| StorageError::PageNotCached(page_id.to_string()))?;
        if frame.pins == 0 {
            return Err(StorageError::UnpinUnderflow(page_id.to_string()));
        }
        frame.pins -= 1;

        if frame.pins == 0 && !self.unpinned.contains(page_id) {
            self.unpinned.push_back(*page_id);
        }
        Ok(())
    }

    /// Whether the page is resident or backed by a file on disk.
    pub fn exists(&self, page_id: &PageId) -> bool {
        self.frames.contains_key(page_id) || self.data_dir.join(page_id.as_str()).exists()
    }

    /// Reserve a fresh page id through the metadata page counter.
    pub fn allocate(&mut self) -> StorageResult<PageId> {
        let counter_id = RecordId::new(&PageId::METADATA, 0);

        let page = self.pin(&PageId::METADATA)?;
        let mut next = None;
        if let Some(record) = page.get_record(&counter_id) {
            let number = record.int_attribute(1) + 1;
            let updated = Record::new(&counter_id, &[Attribute::Int(number)]);
            if page.update_record(&updated) {
                next = Some(number);
            }
        }
        self.unpin(&PageId::METADATA)?;

        let number = next.ok_or(StorageError::MetadataCorrupt)?;
        PageId::from_number(number as u32)
    }

    /// Drop a page from the cache and delete its backing file. Used by the
    /// operators to dispose of temporary pages.
    pub fn erase(&mut self, page_id: &PageId) -> StorageResult<()> {
        self.frames.remove(page_id);
        self.unpinned.retain(|id| id != page_id);

        let path = self.data_dir.join(page_id.as_str());
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Write every dirty resident page to disk.
    pub fn flush_all(&mut self) -> StorageResult<()> {
        for frame in self.frames.values_mut() {
            if frame.page.is_dirty() {
                frame.page.write_data()?;
            }
        }
        Ok(())
    }

    /// Number of pages currently resident.
    pub fn resident_pages(&self) -> usize {
        self.frames.len()
    }

    pub fn is_cached(&self, page_id: &PageId) -> bool {
        self.frames.contains_key(page_id)
    }

    /// Current pin count of a resident page.
    pub fn pin_count(&self, page_id: &PageId) -> Option<usize> {
        self.frames.get(page_id).map(|frame| frame.pins)
    }

    fn load_frame(&mut self, page_id: &PageId) -> StorageResult<()> {
        if self.frames.len() >= self.capacity {
            self.evict_one()?;
        }
        let page = Page::open(&self.data_dir, page_id)?;
        self.frames.insert(*page_id, Frame { page, pins: 0 });
        Ok(())
    }

    fn evict_one(&mut self) -> StorageResult<()> {
        let victim = self
            .unpinned
            .pop_front()
            .ok_or(StorageError::AllPagesPinned)?;
        if let Some(mut frame) = self.frames.remove(&victim) {
            if frame.page.is_dirty() {
                frame.page.write_data()?;
            }
        }
        Ok(())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let _ = self.flush_all();
    }
}

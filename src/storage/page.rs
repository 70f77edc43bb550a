use std::fs;
use std::path::{Path, PathBuf};

use crate::record::{Attribute, Record};

use super::error::{StorageError, StorageResult};
use super::ids::{PageId, RecordId, PAGE_ID_LEN};
use super::{MAX_RECORDS, PAGE_SIZE};

/// Directory entry for a slot that has never held a record.
const SLOT_UNUSED: i32 = -1;

/// Directory entry for a slot whose record was deleted. Tombstoned slots
/// are never reclaimed within a page's life.
const SLOT_TOMBSTONE: i32 = -2;

/// First byte past the page header (page id plus slot directory).
const HEAP_START: usize = PAGE_ID_LEN + MAX_RECORDS * 4;

/// A fixed 4096-byte page holding up to 64 variable-length records behind
/// a slotted directory.
///
/// Layout: bytes `0..5` hold the page id, the next `64 * 4` bytes the
/// signed slot directory (−1 unused, −2 tombstoned, otherwise the byte
/// offset of the slot's record), and the remainder the record heap,
/// appended in increasing offset order.
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
    path: PathBuf,
    dirty: bool,
}

impl Page {
    /// Load the page from `<data_dir>/<page_id>`, creating the data
    /// directory if missing. A missing file yields a fresh zeroed page
    /// marked dirty; an existing file must be exactly one page long.
    pub fn open(data_dir: &Path, page_id: &PageId) -> StorageResult<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(page_id.as_str());

        if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.len() != PAGE_SIZE {
                return Err(StorageError::TruncatedPage(page_id.to_string()));
            }
            let mut data = Box::new([0u8; PAGE_SIZE]);
            data.copy_from_slice(&bytes);
            return Ok(Page {
                data,
                path,
                dirty: false,
            });
        }

        let mut page = Page {
            data: Box::new([0u8; PAGE_SIZE]),
            path,
            dirty: true,
        };
        page.data[..PAGE_ID_LEN].copy_from_slice(page_id.as_bytes());
        for slot in 0..MAX_RECORDS {
            page.set_slot_entry(slot, SLOT_UNUSED);
        }
        Ok(page)
    }

    /// The page's id, read back from its first five bytes.
    pub fn page_id(&self) -> PageId {
        let mut bytes = [0u8; PAGE_ID_LEN];
        bytes.copy_from_slice(&self.data[..PAGE_ID_LEN]);
        PageId::from_bytes(bytes)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Append a record into the first never-used slot. Returns `None` when
    /// the slot directory is exhausted or the record does not fit into the
    /// remaining bytes.
    pub fn add_record(&mut self, attributes: &[Attribute]) -> Option<Record> {
        let slot = (0..MAX_RECORDS).find(|slot| self.slot_entry(*slot) == SLOT_UNUSED)?;

        let start = self.append_offset(slot);
        let record_id = RecordId::new(&self.page_id(), slot);
        let record = Record::new(&record_id, attributes);

        if start + record.size() > PAGE_SIZE {
            return None;
        }

        self.data[start..start + record.size()].copy_from_slice(record.as_bytes());
        self.set_slot_entry(slot, start as i32);
        self.dirty = true;
        Some(record)
    }

    /// Read the record referenced by `record_id`. Returns `None` for ids of
    /// other pages, unused or tombstoned slots.
    pub fn get_record(&self, record_id: &RecordId) -> Option<Record> {
        if record_id.page_id() != self.page_id() {
            return None;
        }
        let slot = record_id.slot_index()?;
        let entry = self.slot_entry(slot);
        if entry < 0 {
            return None;
        }

        let offset = entry as usize;
        let size = self.record_size_at(offset);
        Some(Record::from_bytes(self.data[offset..offset + size].to_vec()))
    }

    /// Replace the stored record in place. The new bytes must fit in the
    /// span up to the next valid slot offset (or the page end); the spare
    /// tail of the span is zeroed.
    pub fn update_record(&mut self, record: &Record) -> bool {
        let record_id = record.record_id();
        if record_id.page_id() != self.page_id() {
            return false;
        }
        let slot = match record_id.slot_index() {
            Some(slot) => slot,
            None => return false,
        };
        let entry = self.slot_entry(slot);
        if entry < 0 {
            return false;
        }
        let offset = entry as usize;

        let mut span_end = PAGE_SIZE;
        for next in slot + 1..MAX_RECORDS {
            let next_entry = self.slot_entry(next);
            if next_entry >= 0 {
                span_end = (next_entry as usize).min(PAGE_SIZE);
                break;
            }
        }
        if record.size() > span_end - offset {
            return false;
        }

        self.data[offset..span_end].fill(0);
        self.data[offset..offset + record.size()].copy_from_slice(record.as_bytes());
        self.dirty = true;
        true
    }

    /// Tombstone the slot and zero the record's bytes.
    pub fn delete_record(&mut self, record_id: &RecordId) -> bool {
        if record_id.page_id() != self.page_id() {
            return false;
        }
        let slot = match record_id.slot_index() {
            Some(slot) => slot,
            None => return false,
        };
        let entry = self.slot_entry(slot);
        if entry < 0 {
            return false;
        }

        let offset = entry as usize;
        let size = self.record_size_at(offset);
        self.data[offset..offset + size].fill(0);
        self.set_slot_entry(slot, SLOT_TOMBSTONE);
        self.dirty = true;
        true
    }

    /// Write the full page to its backing file and clear the dirty flag.
    pub fn write_data(&mut self) -> StorageResult<()> {
        fs::write(&self.path, &self.data[..])?;
        self.dirty = false;
        Ok(())
    }

    /// Offset where a record for `slot` would start: right after the last
    /// record still referenced by an earlier slot. Tombstoned slots no
    /// longer point anywhere, so they are skipped.
    fn append_offset(&self, slot: usize) -> usize {
        for prev in (0..slot).rev() {
            let entry = self.slot_entry(prev);
            if entry >= 0 {
                let offset = entry as usize;
                return offset + self.record_size_at(offset);
            }
        }
        HEAP_START
    }

    fn slot_entry(&self, slot: usize) -> i32 {
        let at = PAGE_ID_LEN + slot * 4;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[at..at + 4]);
        i32::from_le_bytes(bytes)
    }

    fn set_slot_entry(&mut self, slot: usize, value: i32) {
        let at = PAGE_ID_LEN + slot * 4;
        self.data[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn record_size_at(&self, offset: usize) -> usize {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(bytes) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_attributes(i: i32) -> Vec<Attribute> {
        vec![
            Attribute::Int(i),
            Attribute::Str("Test".to_string()),
            Attribute::Bool(true),
        ]
    }

    fn open_page(dir: &TempDir, id: &str) -> Page {
        Page::open(dir.path(), &PageId::parse(id).unwrap()).unwrap()
    }

    #[test]
    fn test_fresh_page_layout() {
        let dir = tempfile::tempdir().unwrap();
        let page = open_page(&dir, "00000");

        assert_eq!(page.page_id().as_str(), "00000");
        assert!(page.is_dirty());
        for slot in 0..MAX_RECORDS {
            assert_eq!(page.slot_entry(slot), SLOT_UNUSED);
        }
    }

    #[test]
    fn test_fill_page_to_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = open_page(&dir, "00000");
        let mut record_ids = Vec::new();

        for i in 0..MAX_RECORDS {
            let record = page.add_record(&test_attributes(i as i32)).unwrap();
            record_ids.push(record.record_id());
        }
        assert!(page.is_dirty());
        assert!(page.add_record(&[Attribute::Int(-1)]).is_none());

        for (i, record_id) in record_ids.iter().enumerate() {
            let record = page.get_record(record_id).unwrap();
            assert_eq!(record.record_id(), *record_id);
            assert_eq!(record.int_attribute(1), i as i32);
            assert_eq!(record.str_attribute(2), "Test");
            assert!(record.bool_attribute(3));
        }
    }

    #[test]
    fn test_update_and_delete_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = open_page(&dir, "00000");
        let mut record_ids = Vec::new();

        for i in 0..MAX_RECORDS {
            let record = page.add_record(&test_attributes(i as i32)).unwrap();
            record_ids.push(record.record_id());
        }

        for (i, record_id) in record_ids.iter().enumerate() {
            let updated = Record::new(
                record_id,
                &[
                    Attribute::Int(i as i32),
                    Attribute::Str("test".to_string()),
                    Attribute::Bool(false),
                ],
            );
            assert!(page.update_record(&updated));

            let record = page.get_record(record_id).unwrap();
            assert_eq!(record.str_attribute(2), "test");
            assert!(!record.bool_attribute(3));

            assert!(page.delete_record(record_id));
            assert!(page.get_record(record_id).is_none());
        }

        // tombstoned slots are not reclaimed
        for record_id in &record_ids {
            assert!(!page.delete_record(record_id));
        }
    }

    #[test]
    fn test_oversized_update_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = open_page(&dir, "00000");

        let first = page.add_record(&[Attribute::Str("ab".to_string())]).unwrap();
        page.add_record(&[Attribute::Int(1)]).unwrap();

        // the slot is boxed in by the next record's offset
        let oversized = Record::new(
            &first.record_id(),
            &[Attribute::Str("much longer than before".to_string())],
        );
        assert!(!page.update_record(&oversized));

        let same_size = Record::new(&first.record_id(), &[Attribute::Str("cd".to_string())]);
        assert!(page.update_record(&same_size));
        assert_eq!(
            page.get_record(&first.record_id()).unwrap().str_attribute(1),
            "cd"
        );
    }

    #[test]
    fn test_add_after_tail_delete_skips_tombstone() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = open_page(&dir, "00000");

        let first = page.add_record(&[Attribute::Int(1)]).unwrap();
        let second = page.add_record(&[Attribute::Int(2)]).unwrap();
        assert!(page.delete_record(&second.record_id()));

        let third = page.add_record(&[Attribute::Int(3)]).unwrap();
        assert_eq!(third.record_id().slot_index(), Some(2));

        assert_eq!(
            page.get_record(&first.record_id()).unwrap().int_attribute(1),
            1
        );
        assert_eq!(
            page.get_record(&third.record_id()).unwrap().int_attribute(1),
            3
        );
    }

    #[test]
    fn test_get_record_of_other_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = open_page(&dir, "00000");
        page.add_record(&[Attribute::Int(1)]).unwrap();

        let foreign = RecordId::parse("0000100000").unwrap();
        assert!(page.get_record(&foreign).is_none());
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = open_page(&dir, "00001");
        let mut record_ids = Vec::new();

        for i in 0..MAX_RECORDS {
            let record = page.add_record(&test_attributes(i as i32)).unwrap();
            record_ids.push(record.record_id());
        }

        assert!(page.is_dirty());
        page.write_data().unwrap();
        assert!(!page.is_dirty());

        let reloaded = open_page(&dir, "00001");
        assert!(!reloaded.is_dirty());
        for (i, record_id) in record_ids.iter().enumerate() {
            let record = reloaded.get_record(record_id).unwrap();
            assert_eq!(record.int_attribute(1), i as i32);
            assert_eq!(record.str_attribute(2), "Test");
            assert!(record.bool_attribute(3));
        }
    }

    #[test]
    fn test_truncated_page_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let page_id = PageId::parse("00002").unwrap();
        fs::write(dir.path().join(page_id.as_str()), b"short").unwrap();

        assert!(matches!(
            Page::open(dir.path(), &page_id),
            Err(StorageError::TruncatedPage(_))
        ));
    }
}

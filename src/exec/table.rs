use crate::record::Record;
use crate::storage::{PageId, RecordId, SharedBufferPool, MAX_RECORDS};

use super::error::ExecResult;
use super::QueryOperator;

/// Full scan over a fixed list of table pages, producing records in
/// (page, slot) order. Each `next` pins the current page just long enough
/// to read one slot.
pub struct Table {
    pool: SharedBufferPool,
    page_ids: Vec<PageId>,
    current_page: usize,
    current_slot: usize,
}

impl Table {
    pub fn new(pool: SharedBufferPool, page_ids: Vec<PageId>) -> Self {
        Self {
            pool,
            page_ids,
            current_page: 0,
            current_slot: 0,
        }
    }
}

impl QueryOperator for Table {
    fn open(&mut self) -> ExecResult<()> {
        self.current_page = 0;
        self.current_slot = 0;
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Record>> {
        while self.current_page < self.page_ids.len() {
            let page_id = self.page_ids[self.current_page];

            let record = {
                let mut pool = self.pool.lock().unwrap();
                let page = pool.pin(&page_id)?;
                let record = page.get_record(&RecordId::new(&page_id, self.current_slot));
                pool.unpin(&page_id)?;
                record
            };

            if self.current_slot == MAX_RECORDS - 1 {
                self.current_slot = 0;
                self.current_page += 1;
            } else {
                self.current_slot += 1;
            }

            // unused and tombstoned slots leave holes; skip them
            if let Some(record) = record {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> ExecResult<()> {
        self.current_page = 0;
        self.current_slot = 0;
        Ok(())
    }
}

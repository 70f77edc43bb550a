use crate::btree::BPlusTree;
use crate::record::Record;
use crate::storage::{RecordId, SharedBufferPool};

use super::error::{ExecError, ExecResult};
use super::QueryOperator;

/// Value stored under every hash key; Distinct never reads it back.
const PLACEHOLDER: &str = "----------";

/// Emits each distinct upstream record once. Seen records are tracked by
/// their attribute hash in a temporary tree that is erased on close.
pub struct Distinct {
    pool: SharedBufferPool,
    source: Box<dyn QueryOperator>,
    seen: Option<BPlusTree>,
}

impl Distinct {
    pub fn new(pool: SharedBufferPool, source: Box<dyn QueryOperator>) -> Self {
        Self {
            pool,
            source,
            seen: None,
        }
    }
}

impl QueryOperator for Distinct {
    fn open(&mut self) -> ExecResult<()> {
        let root_id = self.pool.lock().unwrap().allocate()?;
        self.seen = Some(BPlusTree::new(self.pool.clone(), root_id)?);
        self.source.open()
    }

    fn next(&mut self) -> ExecResult<Option<Record>> {
        let seen = self.seen.as_mut().ok_or(ExecError::NotOpen)?;
        let placeholder = RecordId::parse(PLACEHOLDER)?;

        while let Some(record) = self.source.next()? {
            let key = record.hash();
            if seen.search(key)?.is_none() {
                seen.insert(key, &placeholder)?;
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> ExecResult<()> {
        if let Some(seen) = self.seen.take() {
            seen.erase()?;
        }
        self.source.close()
    }
}

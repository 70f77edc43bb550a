use crate::record::{Attribute, AttributeType, Record};
use crate::storage::{PageId, SharedBufferPool};

use super::error::{ExecError, ExecResult};
use super::table::Table;
use super::{Comparator, QueryOperator};

/// Nested-loop join, materialized through temporary pages.
///
/// `open` iterates the full outer × inner cross product, re-opening the
/// inner source per outer record; every matching pair is concatenated
/// (the user attributes of the outer record followed by those of the
/// inner record) and appended to a chain of pages allocated through the
/// buffer pool. `next` and `close` delegate to a table scan over that
/// chain; `close` erases the chain.
pub struct Join {
    pool: SharedBufferPool,
    outer: Box<dyn QueryOperator>,
    inner: Box<dyn QueryOperator>,
    outer_position: usize,
    inner_position: usize,
    outer_schema: Vec<AttributeType>,
    inner_schema: Vec<AttributeType>,
    join_type: AttributeType,
    comparator: Comparator,
    page_ids: Vec<PageId>,
    output: Option<Table>,
}

impl Join {
    /// The join attributes must share a type; ordering comparators require
    /// integer join attributes. Positions index the record directory, so
    /// position 1 names the first entry of the corresponding schema.
    pub fn new(
        pool: SharedBufferPool,
        outer: Box<dyn QueryOperator>,
        inner: Box<dyn QueryOperator>,
        outer_position: usize,
        inner_position: usize,
        outer_schema: Vec<AttributeType>,
        inner_schema: Vec<AttributeType>,
        comparator: Comparator,
    ) -> ExecResult<Self> {
        let outer_type = schema_type(&outer_schema, outer_position)?;
        let inner_type = schema_type(&inner_schema, inner_position)?;

        if outer_type != inner_type {
            return Err(ExecError::TypeMismatch {
                expected: format!("{:?}", outer_type),
                actual: format!("{:?}", inner_type),
            });
        }
        if comparator.is_ordering() && outer_type != AttributeType::Int {
            return Err(ExecError::OrderedComparator(comparator.to_string()));
        }

        Ok(Self {
            pool,
            outer,
            inner,
            outer_position,
            inner_position,
            outer_schema,
            inner_schema,
            join_type: outer_type,
            comparator,
            page_ids: Vec::new(),
            output: None,
        })
    }

    fn append(&mut self, attributes: &[Attribute]) -> ExecResult<()> {
        let mut pool = self.pool.lock().unwrap();

        if let Some(page_id) = self.page_ids.last().copied() {
            let page = pool.pin(&page_id)?;
            let added = page.add_record(attributes).is_some();
            pool.unpin(&page_id)?;
            if added {
                return Ok(());
            }
        }

        // the current page is full (or none exists yet): chain a fresh one
        let page_id = pool.allocate()?;
        self.page_ids.push(page_id);
        let page = pool.pin(&page_id)?;
        let added = page.add_record(attributes).is_some();
        pool.unpin(&page_id)?;
        if added {
            Ok(())
        } else {
            Err(ExecError::RecordOverflow)
        }
    }
}

impl QueryOperator for Join {
    fn open(&mut self) -> ExecResult<()> {
        // a rerun starts from a clean chain
        let stale = std::mem::take(&mut self.page_ids);
        {
            let mut pool = self.pool.lock().unwrap();
            for page_id in &stale {
                pool.erase(page_id)?;
            }
        }
        self.output = None;

        self.outer.open()?;
        while let Some(outer_record) = self.outer.next()? {
            let outer_attribute = outer_record.attribute(self.outer_position, self.join_type);

            self.inner.open()?;
            while let Some(inner_record) = self.inner.next()? {
                let inner_attribute = inner_record.attribute(self.inner_position, self.join_type);
                if !self.comparator.evaluate(&outer_attribute, &inner_attribute) {
                    continue;
                }

                let mut attributes =
                    Vec::with_capacity(self.outer_schema.len() + self.inner_schema.len());
                for (i, attribute_type) in self.outer_schema.iter().enumerate() {
                    attributes.push(outer_record.attribute(i + 1, *attribute_type));
                }
                for (i, attribute_type) in self.inner_schema.iter().enumerate() {
                    attributes.push(inner_record.attribute(i + 1, *attribute_type));
                }
                self.append(&attributes)?;
            }
            self.inner.close()?;
        }
        self.outer.close()?;

        let mut output = Table::new(self.pool.clone(), self.page_ids.clone());
        output.open()?;
        self.output = Some(output);
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Record>> {
        match self.output.as_mut() {
            Some(table) => table.next(),
            None => Err(ExecError::NotOpen),
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        if let Some(mut output) = self.output.take() {
            output.close()?;
        }

        let mut pool = self.pool.lock().unwrap();
        for page_id in self.page_ids.drain(..) {
            pool.erase(&page_id)?;
        }
        Ok(())
    }
}

fn schema_type(schema: &[AttributeType], position: usize) -> ExecResult<AttributeType> {
    position
        .checked_sub(1)
        .and_then(|index| schema.get(index))
        .copied()
        .ok_or(ExecError::InvalidPosition(position))
}

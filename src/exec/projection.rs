use crate::record::{Attribute, AttributeType, Record};

use super::error::ExecResult;
use super::QueryOperator;

/// Projects each upstream record onto a list of (position, type) columns.
/// The source record id is preserved on the output record.
pub struct Projection {
    source: Box<dyn QueryOperator>,
    columns: Vec<(usize, AttributeType)>,
}

impl Projection {
    pub fn new(source: Box<dyn QueryOperator>, columns: Vec<(usize, AttributeType)>) -> Self {
        Self { source, columns }
    }
}

impl QueryOperator for Projection {
    fn open(&mut self) -> ExecResult<()> {
        self.source.open()
    }

    fn next(&mut self) -> ExecResult<Option<Record>> {
        let record = match self.source.next()? {
            Some(record) => record,
            None => return Ok(None),
        };

        let attributes: Vec<Attribute> = self
            .columns
            .iter()
            .map(|(position, attribute_type)| record.attribute(*position, *attribute_type))
            .collect();
        Ok(Some(Record::new(&record.record_id(), &attributes)))
    }

    fn close(&mut self) -> ExecResult<()> {
        self.source.close()
    }
}

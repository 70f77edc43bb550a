use crate::record::{Attribute, AttributeType, Record};

use super::error::{ExecError, ExecResult};
use super::{Comparator, QueryOperator};

/// Filters upstream records by comparing one attribute against a literal.
pub struct Selection {
    source: Box<dyn QueryOperator>,
    position: usize,
    attribute_type: AttributeType,
    value: Attribute,
    comparator: Comparator,
}

impl Selection {
    /// The literal must match the attribute type, and ordering comparators
    /// are only defined over integer attributes.
    pub fn new(
        source: Box<dyn QueryOperator>,
        position: usize,
        attribute_type: AttributeType,
        value: Attribute,
        comparator: Comparator,
    ) -> ExecResult<Self> {
        if value.attribute_type() != attribute_type {
            return Err(ExecError::TypeMismatch {
                expected: format!("{:?}", attribute_type),
                actual: format!("{:?}", value.attribute_type()),
            });
        }
        if comparator.is_ordering() && attribute_type != AttributeType::Int {
            return Err(ExecError::OrderedComparator(comparator.to_string()));
        }

        Ok(Self {
            source,
            position,
            attribute_type,
            value,
            comparator,
        })
    }
}

impl QueryOperator for Selection {
    fn open(&mut self) -> ExecResult<()> {
        self.source.open()
    }

    fn next(&mut self) -> ExecResult<Option<Record>> {
        while let Some(record) = self.source.next()? {
            let attribute = record.attribute(self.position, self.attribute_type);
            if self.comparator.evaluate(&attribute, &self.value) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> ExecResult<()> {
        self.source.close()
    }
}

use crate::storage::{RecordId, RECORD_ID_LEN};

use super::value::{Attribute, AttributeType};

/// Width of the leading size field.
const SIZE_FIELD: usize = 4;

/// Width of one offset-directory entry.
const OFFSET_ENTRY: usize = 4;

/// A self-framed record: a size field, an offset directory with one entry
/// per attribute plus a sentinel, and the concatenated attribute payloads.
/// Attribute 0 is always the ten-byte record id; string lengths are implicit
/// in consecutive offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    data: Vec<u8>,
}

impl Record {
    /// Serialize a record from its id and attribute values.
    pub fn new(record_id: &RecordId, attributes: &[Attribute]) -> Self {
        // one directory entry per attribute, plus the record id and the sentinel
        let directory = (attributes.len() + 2) * OFFSET_ENTRY;
        let payload: usize = attributes.iter().map(Attribute::byte_len).sum();
        let size = SIZE_FIELD + directory + RECORD_ID_LEN + payload;

        let mut data = Vec::with_capacity(size);
        data.extend_from_slice(&(size as u32).to_le_bytes());

        let mut offset = SIZE_FIELD + directory;
        data.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += RECORD_ID_LEN;
        for attribute in attributes {
            data.extend_from_slice(&(offset as u32).to_le_bytes());
            offset += attribute.byte_len();
        }
        data.extend_from_slice(&(offset as u32).to_le_bytes());

        data.extend_from_slice(record_id.as_bytes());
        for attribute in attributes {
            attribute.write_to(&mut data);
        }

        debug_assert_eq!(data.len(), size);
        Record { data }
    }

    /// Wrap an already-serialized record buffer without copying.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Record { data }
    }

    /// Total size in bytes, as stored in the leading size field.
    pub fn size(&self) -> usize {
        self.read_u32(0) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The record's own id, stored as attribute 0.
    pub fn record_id(&self) -> RecordId {
        let start = self.offset(0);
        let mut bytes = [0u8; RECORD_ID_LEN];
        bytes.copy_from_slice(&self.data[start..start + RECORD_ID_LEN]);
        RecordId::from_bytes(bytes)
    }

    pub fn int_attribute(&self, index: usize) -> i32 {
        let start = self.offset(index);
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[start..start + 4]);
        i32::from_le_bytes(bytes)
    }

    pub fn str_attribute(&self, index: usize) -> String {
        let start = self.offset(index);
        let end = self.offset(index + 1);
        String::from_utf8_lossy(&self.data[start..end]).into_owned()
    }

    pub fn bool_attribute(&self, index: usize) -> bool {
        self.data[self.offset(index)] != 0
    }

    /// Read an attribute through its caller-supplied type tag.
    pub fn attribute(&self, index: usize, attribute_type: AttributeType) -> Attribute {
        match attribute_type {
            AttributeType::Int => Attribute::Int(self.int_attribute(index)),
            AttributeType::Str => Attribute::Str(self.str_attribute(index)),
            AttributeType::Bool => Attribute::Bool(self.bool_attribute(index)),
        }
    }

    /// Deterministic hash over the attribute payload. The record id and the
    /// offset directory are excluded, so records with equal attribute
    /// vectors hash equally regardless of where they are stored.
    pub fn hash(&self) -> i32 {
        let start = self.offset(1);
        let mut hash: u32 = 0x811c_9dc5;
        for byte in &self.data[start..] {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
        hash as i32
    }

    fn offset(&self, index: usize) -> usize {
        self.read_u32(SIZE_FIELD + index * OFFSET_ENTRY) as usize
    }

    fn read_u32(&self, at: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[at..at + 4]);
        u32::from_le_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_id(text: &str) -> RecordId {
        RecordId::parse(text).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let id = record_id("0000000001");
        let record = Record::new(
            &id,
            &[
                Attribute::Int(1),
                Attribute::Str("Test".to_string()),
                Attribute::Bool(true),
            ],
        );

        assert_eq!(record.record_id(), id);
        assert_eq!(record.int_attribute(1), 1);
        assert_eq!(record.str_attribute(2), "Test");
        assert!(record.bool_attribute(3));
    }

    #[test]
    fn test_size_accounts_for_all_fields() {
        let record = Record::new(
            &record_id("0000000000"),
            &[Attribute::Int(7), Attribute::Str("abc".to_string())],
        );

        // size + 4 directory entries + id + int + string
        assert_eq!(record.size(), 4 + 16 + 10 + 4 + 3);
        assert_eq!(record.as_bytes().len(), record.size());
    }

    #[test]
    fn test_from_bytes_wraps_without_copying() {
        let original = Record::new(
            &record_id("0004200007"),
            &[Attribute::Int(-5), Attribute::Bool(false)],
        );

        let wrapped = Record::from_bytes(original.as_bytes().to_vec());
        assert_eq!(wrapped, original);
        assert_eq!(wrapped.int_attribute(1), -5);
        assert!(!wrapped.bool_attribute(2));
    }

    #[test]
    fn test_typed_accessor() {
        let record = Record::new(
            &record_id("0000000001"),
            &[Attribute::Str("hello".to_string())],
        );

        assert_eq!(
            record.attribute(1, AttributeType::Str),
            Attribute::Str("hello".to_string())
        );
    }

    #[test]
    fn test_empty_string_attribute() {
        let record = Record::new(
            &record_id("0000000001"),
            &[Attribute::Str(String::new()), Attribute::Int(3)],
        );

        assert_eq!(record.str_attribute(1), "");
        assert_eq!(record.int_attribute(2), 3);
    }

    #[test]
    fn test_hash_ignores_record_id() {
        let attributes = [Attribute::Int(5), Attribute::Str("Test".to_string())];
        let first = Record::new(&record_id("0000000001"), &attributes);
        let second = Record::new(&record_id("0009900063"), &attributes);

        assert_eq!(first.hash(), second.hash());
    }

    #[test]
    fn test_hash_differs_across_attributes() {
        let base = Record::new(&record_id("0000000001"), &[Attribute::Int(5)]);
        let other = Record::new(&record_id("0000000001"), &[Attribute::Int(6)]);

        assert_ne!(base.hash(), other.hash());
    }
}

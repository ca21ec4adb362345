//! Union values and union vectors
//!
//! A union in a table is a `u8` tag slot coupled with a value slot;
//! in a vector it is two parallel vectors (tags and value offsets) of
//! equal length. Tag 0 is NONE. Tags above the schema's variant count
//! are *not* errors: they classify as unknown so a reader built
//! against an older schema can skip newer variants.

use super::buffer;
use super::errors::{DecodeError, DecodeResult};
use super::table::TableView;
use super::vector::Vector;

/// A decoded union slot, before the schema's variant list is applied.
#[derive(Debug, Clone, Copy)]
pub enum UnionValue<'a> {
    None,
    Present { tag: u8, table: TableView<'a> },
}

impl<'a> UnionValue<'a> {
    pub fn tag(&self) -> u8 {
        match self {
            UnionValue::None => 0,
            UnionValue::Present { tag, .. } => *tag,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, UnionValue::None)
    }

    /// Applies the schema's variant count: tags beyond it are unknown
    /// rather than fatal.
    pub fn classify(self, variant_count: u8) -> UnionVariant<'a> {
        match self {
            UnionValue::None => UnionVariant::None,
            UnionValue::Present { tag, table } => {
                if tag <= variant_count {
                    UnionVariant::Known { tag, table }
                } else {
                    UnionVariant::Unknown(tag)
                }
            }
        }
    }
}

/// A union slot interpreted against a schema.
#[derive(Debug, Clone, Copy)]
pub enum UnionVariant<'a> {
    None,
    Known { tag: u8, table: TableView<'a> },
    /// A tag this schema does not know; carried so callers can skip
    /// it without failing the decode.
    Unknown(u8),
}

/// The paired type/value vectors of a vector-of-unions field, read as
/// one unit.
#[derive(Debug, Clone, Copy)]
pub struct UnionVector<'a> {
    buf: &'a [u8],
    tags: Vector<'a, u8>,
    /// First element of the value vector, past its length prefix.
    values_base: usize,
}

impl<'a> UnionVector<'a> {
    /// Reads both halves and insists their lengths agree.
    pub(crate) fn new(
        buf: &'a [u8],
        tags_pos: usize,
        values_pos: usize,
    ) -> DecodeResult<Self> {
        let tags = Vector::<u8>::at(buf, tags_pos)?;
        let values_len = buffer::read_u32(buf, values_pos)? as usize;
        if tags.len() != values_len {
            return Err(DecodeError::malformed(format!(
                "union vector halves disagree: {} types, {} values",
                tags.len(),
                values_len
            )));
        }
        let values_base = values_pos + 4;
        buffer::bytes_at(buf, values_base, values_len * 4)?;
        Ok(UnionVector {
            buf,
            tags,
            values_base,
        })
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Reads the element at `index`. A zero tag is NONE regardless of
    /// the value slot; a nonzero tag with a zero offset is malformed.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> DecodeResult<UnionValue<'a>> {
        let tag = self.tags.get(index)?;
        if tag == 0 {
            return Ok(UnionValue::None);
        }
        let slot = self.values_base + index * 4;
        if buffer::read_u32(self.buf, slot)? == 0 {
            return Err(DecodeError::malformed(format!(
                "union vector element {} has tag {} but no value",
                index, tag
            )));
        }
        let target = buffer::read_uoffset(self.buf, slot)?;
        let table = TableView::at(self.buf, target)?;
        Ok(UnionValue::Present { tag, table })
    }

    pub fn iter(&self) -> UnionVectorIter<'a> {
        UnionVectorIter {
            vector: *self,
            index: 0,
        }
    }
}

pub struct UnionVectorIter<'a> {
    vector: UnionVector<'a>,
    index: usize,
}

impl<'a> Iterator for UnionVectorIter<'a> {
    type Item = DecodeResult<UnionValue<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.vector.len() {
            return None;
        }
        let item = self.vector.get(self.index);
        self.index += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_none_known_unknown() {
        let buf = [0u8; 0];
        let none = UnionValue::None;
        assert!(matches!(none.classify(2), UnionVariant::None));

        let table = TableView::raw_for_tests(&buf);
        let known = UnionValue::Present { tag: 2, table };
        assert!(matches!(
            known.classify(2),
            UnionVariant::Known { tag: 2, .. }
        ));

        let newer = UnionValue::Present { tag: 3, table };
        assert!(matches!(newer.classify(2), UnionVariant::Unknown(3)));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        // tags: [len=2][1, 1]  values: [len=1][...]
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[1, 1]);
        buf.extend_from_slice(&[0, 0]); // padding
        let values_pos = buf.len();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        let err = UnionVector::new(&buf, 0, values_pos).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedBuffer(_)));
    }

    #[test]
    fn test_none_entry_has_zero_tag_and_zero_offset() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(0);
        buf.extend_from_slice(&[0, 0, 0]); // padding
        let values_pos = buf.len();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        let vec = UnionVector::new(&buf, 0, values_pos).unwrap();
        assert_eq!(vec.len(), 1);
        assert!(vec.get(0).unwrap().is_none());
    }

    #[test]
    fn test_tag_without_value_is_malformed() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(1);
        buf.extend_from_slice(&[0, 0, 0]);
        let values_pos = buf.len();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());

        let vec = UnionVector::new(&buf, 0, values_pos).unwrap();
        assert!(matches!(
            vec.get(0).unwrap_err(),
            DecodeError::MalformedBuffer(_)
        ));
    }
}

//! Zero-copy reading of encoded buffers
//!
//! Views borrow the caller's byte buffer and decode nothing until a
//! field is read. A view never outlives its buffer, and any number of
//! views over the same buffer may be read concurrently as long as the
//! buffer itself is not mutated.
//!
//! Decoding starts at [`decode`], which follows the root uoffset in
//! the first four bytes. Everything else hangs off [`TableView`].

pub mod buffer;
mod errors;
mod structs;
mod table;
mod union;
mod vector;

pub use errors::{DecodeError, DecodeResult};
pub use structs::StructView;
pub use table::TableView;
pub use union::{UnionValue, UnionVariant, UnionVector, UnionVectorIter};
pub use vector::{StructVector, StructVectorIter, Vector, VectorElement, VectorIter};

use crate::wire::{FILE_IDENTIFIER_LEN, UOFFSET_SIZE};

/// Resolves the root table of an encoded buffer.
pub fn decode(buf: &[u8]) -> DecodeResult<TableView<'_>> {
    let root = buffer::read_uoffset(buf, 0)?;
    TableView::at(buf, root)
}

/// True iff the buffer carries `expected` as its file identifier in
/// the four bytes after the root uoffset. Decoding does not require
/// this check; callers that care invoke it explicitly.
pub fn check_file_identifier(buf: &[u8], expected: &[u8; FILE_IDENTIFIER_LEN]) -> bool {
    buf.len() >= UOFFSET_SIZE + FILE_IDENTIFIER_LEN
        && &buf[UOFFSET_SIZE..UOFFSET_SIZE + FILE_IDENTIFIER_LEN] == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root uoffset, identifier, then a vtable + one-field table.
    fn rooted_buffer() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&14u32.to_le_bytes()); // root -> table at 14
        buf.extend_from_slice(b"TEST");
        buf.extend_from_slice(&6u16.to_le_bytes());
        buf.extend_from_slice(&8u16.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&6i32.to_le_bytes()); // table at 14, vtable at 8
        buf.extend_from_slice(&77u32.to_le_bytes());
        buf
    }

    #[test]
    fn test_decode_follows_root_offset() {
        let buf = rooted_buffer();
        let table = decode(&buf).unwrap();
        assert_eq!(table.position(), 14);
        assert_eq!(table.u32_field(0, 0).unwrap(), 77);
    }

    #[test]
    fn test_file_identifier_check() {
        let buf = rooted_buffer();
        assert!(check_file_identifier(&buf, b"TEST"));
        assert!(!check_file_identifier(&buf, b"ELSE"));
        assert!(!check_file_identifier(&[0, 0, 0, 0], b"TEST"));
    }

    #[test]
    fn test_decode_empty_buffer_fails() {
        assert!(decode(&[]).is_err());
        assert!(decode(&[1, 2]).is_err());
    }

    #[test]
    fn test_decode_does_not_require_identifier() {
        let buf = rooted_buffer();
        // A wrong identifier does not stop decoding.
        assert!(!check_file_identifier(&buf, b"XXXX"));
        assert!(decode(&buf).is_ok());
    }
}

//! Forward assembly of inline struct bytes
//!
//! Structs are written front to back with the padding the validator
//! computed, then handed to the builder as an opaque block (a table
//! field or a struct-vector element). Keeping this separate from the
//! back-to-front builder keeps both simple.

/// Assembles one struct's bytes in field order.
///
/// The caller supplies padding explicitly, typically from the
/// validated struct's per-field padding counts:
///
/// ```
/// use aerobuf::write::StructWriter;
///
/// // struct M { a: bool; b: double; } has alignment 8, paddings [7, 0]
/// let bytes = StructWriter::with_capacity(16)
///     .push_bool(true)
///     .pad(7)
///     .push_f64(2.5)
///     .finish();
/// assert_eq!(bytes.len(), 16);
/// ```
#[derive(Debug, Default, Clone)]
pub struct StructWriter {
    bytes: Vec<u8>,
}

impl StructWriter {
    pub fn new() -> Self {
        StructWriter::default()
    }

    pub fn with_capacity(size: usize) -> Self {
        StructWriter {
            bytes: Vec::with_capacity(size),
        }
    }

    pub fn push_u8(mut self, value: u8) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_u16(mut self, value: u16) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_u32(mut self, value: u32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_u64(mut self, value: u64) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_i8(mut self, value: i8) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_i16(mut self, value: i16) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_i32(mut self, value: i32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_i64(mut self, value: i64) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_f32(mut self, value: f32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_f64(mut self, value: f64) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn push_bool(self, value: bool) -> Self {
        self.push_u8(value as u8)
    }

    /// Appends `count` zero bytes of padding.
    pub fn pad(mut self, count: usize) -> Self {
        self.bytes.resize(self.bytes.len() + count, 0);
        self
    }

    /// Appends a nested struct's already-assembled bytes.
    pub fn push_struct(mut self, nested: &[u8]) -> Self {
        self.bytes.extend_from_slice(nested);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

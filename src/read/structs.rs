//! Struct views
//!
//! Structs are fixed-layout and inline, so a view is nothing but a
//! raw position; field access is by byte offset, as computed by the
//! validator. Every read is bounds-checked against the buffer.

use super::buffer;
use super::errors::DecodeResult;

/// A borrowed view of an inline struct.
#[derive(Debug, Clone, Copy)]
pub struct StructView<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> StructView<'a> {
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        StructView { buf, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn u8_at(&self, offset: usize) -> DecodeResult<u8> {
        buffer::read_u8(self.buf, self.pos + offset)
    }

    pub fn u16_at(&self, offset: usize) -> DecodeResult<u16> {
        buffer::read_u16(self.buf, self.pos + offset)
    }

    pub fn u32_at(&self, offset: usize) -> DecodeResult<u32> {
        buffer::read_u32(self.buf, self.pos + offset)
    }

    pub fn u64_at(&self, offset: usize) -> DecodeResult<u64> {
        buffer::read_u64(self.buf, self.pos + offset)
    }

    pub fn i8_at(&self, offset: usize) -> DecodeResult<i8> {
        buffer::read_i8(self.buf, self.pos + offset)
    }

    pub fn i16_at(&self, offset: usize) -> DecodeResult<i16> {
        buffer::read_i16(self.buf, self.pos + offset)
    }

    pub fn i32_at(&self, offset: usize) -> DecodeResult<i32> {
        buffer::read_i32(self.buf, self.pos + offset)
    }

    pub fn i64_at(&self, offset: usize) -> DecodeResult<i64> {
        buffer::read_i64(self.buf, self.pos + offset)
    }

    pub fn f32_at(&self, offset: usize) -> DecodeResult<f32> {
        buffer::read_f32(self.buf, self.pos + offset)
    }

    pub fn f64_at(&self, offset: usize) -> DecodeResult<f64> {
        buffer::read_f64(self.buf, self.pos + offset)
    }

    pub fn bool_at(&self, offset: usize) -> DecodeResult<bool> {
        buffer::read_bool(self.buf, self.pos + offset)
    }

    /// A nested struct at a fixed offset.
    pub fn struct_at(&self, offset: usize) -> StructView<'a> {
        StructView::at(self.buf, self.pos + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_at_offsets() {
        // bool at 0, 7 bytes padding, double at 8.
        let mut buf = vec![0u8; 16];
        buf[0] = 1;
        buf[8..16].copy_from_slice(&2.5f64.to_le_bytes());

        let view = StructView::at(&buf, 0);
        assert!(view.bool_at(0).unwrap());
        assert_eq!(view.f64_at(8).unwrap(), 2.5);
    }

    #[test]
    fn test_nested_struct_offset() {
        let mut buf = vec![0u8; 12];
        buf[8..12].copy_from_slice(&7u32.to_le_bytes());

        let outer = StructView::at(&buf, 4);
        let inner = outer.struct_at(4);
        assert_eq!(inner.u32_at(0).unwrap(), 7);
    }

    #[test]
    fn test_out_of_buffer_read_fails() {
        let buf = [0u8; 4];
        let view = StructView::at(&buf, 0);
        assert!(view.u64_at(0).is_err());
    }
}

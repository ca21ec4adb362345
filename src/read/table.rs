//! Table views and vtable navigation
//!
//! A table starts with a signed 32-bit offset back to its vtable; the
//! vtable is a `u16` byte size, a `u16` table byte size, and one
//! `u16` voffset per slot. A voffset of zero, or a slot beyond the
//! vtable, means the field is absent: scalar reads then yield the
//! caller-supplied default, reference reads yield `None`.

use super::buffer;
use super::errors::{DecodeError, DecodeResult};
use super::structs::StructView;
use super::union::{UnionValue, UnionVector};
use super::vector::{StructVector, Vector, VectorElement};
use crate::wire::{VOFFSET_SIZE, VTABLE_HEADER_FIELDS};

/// A borrowed view of an encoded table.
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TableView<'a> {
    /// Resolves a table at an absolute position, validating that its
    /// vtable is reachable and well-formed.
    pub fn at(buf: &'a [u8], pos: usize) -> DecodeResult<Self> {
        let table = TableView { buf, pos };
        table.vtable()?;
        Ok(table)
    }

    #[cfg(test)]
    pub(crate) fn raw_for_tests(buf: &'a [u8]) -> Self {
        TableView { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Locates this table's vtable. The soffset is subtracted from
    /// the table position: a positive soffset places the vtable at a
    /// lower address.
    fn vtable(&self) -> DecodeResult<Vtable<'a>> {
        let soffset = buffer::read_i32(self.buf, self.pos)? as i64;
        let vt = self.pos as i64 - soffset;
        if vt < 0 || vt as usize >= self.buf.len() {
            return Err(DecodeError::malformed(format!(
                "vtable offset {} out of bounds at table {}",
                soffset, self.pos
            )));
        }
        let vt = vt as usize;
        let byte_size = buffer::read_u16(self.buf, vt)? as usize;
        let header = VTABLE_HEADER_FIELDS * VOFFSET_SIZE;
        if byte_size < header {
            return Err(DecodeError::malformed(format!(
                "vtable of {} bytes is smaller than its header",
                byte_size
            )));
        }
        buffer::bytes_at(self.buf, vt, byte_size)?;
        Ok(Vtable {
            buf: self.buf,
            pos: vt,
            slot_count: byte_size / VOFFSET_SIZE - VTABLE_HEADER_FIELDS,
        })
    }

    /// Absolute position of a field, or `None` when the slot is
    /// absent or beyond this table's vtable.
    pub fn field_pos(&self, slot: u16) -> DecodeResult<Option<usize>> {
        let vtable = self.vtable()?;
        if slot as usize >= vtable.slot_count {
            return Ok(None);
        }
        let voffset = vtable.voffset(slot)?;
        if voffset == 0 {
            return Ok(None);
        }
        Ok(Some(self.pos + voffset as usize))
    }

    pub fn u8_field(&self, slot: u16, default: u8) -> DecodeResult<u8> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_u8(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn u16_field(&self, slot: u16, default: u16) -> DecodeResult<u16> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_u16(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn u32_field(&self, slot: u16, default: u32) -> DecodeResult<u32> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_u32(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn u64_field(&self, slot: u16, default: u64) -> DecodeResult<u64> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_u64(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn i8_field(&self, slot: u16, default: i8) -> DecodeResult<i8> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_i8(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn i16_field(&self, slot: u16, default: i16) -> DecodeResult<i16> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_i16(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn i32_field(&self, slot: u16, default: i32) -> DecodeResult<i32> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_i32(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn i64_field(&self, slot: u16, default: i64) -> DecodeResult<i64> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_i64(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn f32_field(&self, slot: u16, default: f32) -> DecodeResult<f32> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_f32(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn f64_field(&self, slot: u16, default: f64) -> DecodeResult<f64> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_f64(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn bool_field(&self, slot: u16, default: bool) -> DecodeResult<bool> {
        match self.field_pos(slot)? {
            Some(pos) => buffer::read_bool(self.buf, pos),
            None => Ok(default),
        }
    }

    pub fn string_field(&self, slot: u16) -> DecodeResult<Option<&'a str>> {
        match self.field_pos(slot)? {
            Some(pos) => {
                let target = buffer::read_uoffset(self.buf, pos)?;
                Ok(Some(buffer::read_str(self.buf, target)?))
            }
            None => Ok(None),
        }
    }

    pub fn required_string_field(
        &self,
        slot: u16,
        name: &'static str,
    ) -> DecodeResult<&'a str> {
        self.string_field(slot)?
            .ok_or(DecodeError::MissingField(name))
    }

    pub fn table_field(&self, slot: u16) -> DecodeResult<Option<TableView<'a>>> {
        match self.field_pos(slot)? {
            Some(pos) => {
                let target = buffer::read_uoffset(self.buf, pos)?;
                Ok(Some(TableView::at(self.buf, target)?))
            }
            None => Ok(None),
        }
    }

    pub fn required_table_field(
        &self,
        slot: u16,
        name: &'static str,
    ) -> DecodeResult<TableView<'a>> {
        self.table_field(slot)?
            .ok_or(DecodeError::MissingField(name))
    }

    /// Structs are inline: the field position is the struct itself.
    pub fn struct_field(&self, slot: u16) -> DecodeResult<Option<StructView<'a>>> {
        Ok(self
            .field_pos(slot)?
            .map(|pos| StructView::at(self.buf, pos)))
    }

    pub fn required_struct_field(
        &self,
        slot: u16,
        name: &'static str,
    ) -> DecodeResult<StructView<'a>> {
        self.struct_field(slot)?
            .ok_or(DecodeError::MissingField(name))
    }

    pub fn vector_field<T: VectorElement<'a>>(
        &self,
        slot: u16,
    ) -> DecodeResult<Option<Vector<'a, T>>> {
        match self.field_pos(slot)? {
            Some(pos) => {
                let target = buffer::read_uoffset(self.buf, pos)?;
                Ok(Some(Vector::at(self.buf, target)?))
            }
            None => Ok(None),
        }
    }

    pub fn required_vector_field<T: VectorElement<'a>>(
        &self,
        slot: u16,
        name: &'static str,
    ) -> DecodeResult<Vector<'a, T>> {
        self.vector_field(slot)?
            .ok_or(DecodeError::MissingField(name))
    }

    pub fn struct_vector_field(
        &self,
        slot: u16,
        stride: usize,
    ) -> DecodeResult<Option<StructVector<'a>>> {
        match self.field_pos(slot)? {
            Some(pos) => {
                let target = buffer::read_uoffset(self.buf, pos)?;
                Ok(Some(StructVector::at(self.buf, target, stride)?))
            }
            None => Ok(None),
        }
    }

    pub fn required_struct_vector_field(
        &self,
        slot: u16,
        stride: usize,
        name: &'static str,
    ) -> DecodeResult<StructVector<'a>> {
        self.struct_vector_field(slot, stride)?
            .ok_or(DecodeError::MissingField(name))
    }

    /// Reads the union at `value_slot`, coupling it with the `u8` tag
    /// at `value_slot - 1`. A zero tag is NONE; a nonzero tag with an
    /// absent value slot is malformed.
    ///
    /// # Panics
    ///
    /// Panics if `value_slot` is 0; a union value slot always has a
    /// type slot before it.
    pub fn union_field(&self, value_slot: u16) -> DecodeResult<UnionValue<'a>> {
        assert!(value_slot > 0, "union value slot cannot be slot 0");
        let tag = self.u8_field(value_slot - 1, 0)?;
        if tag == 0 {
            return Ok(UnionValue::None);
        }
        let pos = self.field_pos(value_slot)?.ok_or_else(|| {
            DecodeError::malformed(format!(
                "union tag {} at slot {} has no value",
                tag,
                value_slot - 1
            ))
        })?;
        let target = buffer::read_uoffset(self.buf, pos)?;
        Ok(UnionValue::Present {
            tag,
            table: TableView::at(self.buf, target)?,
        })
    }

    pub fn required_union_field(
        &self,
        value_slot: u16,
        name: &'static str,
    ) -> DecodeResult<UnionValue<'a>> {
        let value = self.union_field(value_slot)?;
        if value.is_none() {
            return Err(DecodeError::MissingField(name));
        }
        Ok(value)
    }

    /// Reads the paired type/value vectors of a vector-of-unions
    /// field. The tag vector lives at `value_slot - 1`.
    ///
    /// # Panics
    ///
    /// Panics if `value_slot` is 0.
    pub fn union_vector_field(
        &self,
        value_slot: u16,
    ) -> DecodeResult<Option<UnionVector<'a>>> {
        assert!(value_slot > 0, "union value slot cannot be slot 0");
        let tags_pos = self.field_pos(value_slot - 1)?;
        let values_pos = self.field_pos(value_slot)?;
        match (tags_pos, values_pos) {
            (Some(tags), Some(values)) => {
                let tags = buffer::read_uoffset(self.buf, tags)?;
                let values = buffer::read_uoffset(self.buf, values)?;
                Ok(Some(UnionVector::new(self.buf, tags, values)?))
            }
            (None, None) => Ok(None),
            _ => Err(DecodeError::malformed(
                "union vector present in only one of its two slots",
            )),
        }
    }

    pub fn required_union_vector_field(
        &self,
        value_slot: u16,
        name: &'static str,
    ) -> DecodeResult<UnionVector<'a>> {
        self.union_vector_field(value_slot)?
            .ok_or(DecodeError::MissingField(name))
    }
}

struct Vtable<'a> {
    buf: &'a [u8],
    pos: usize,
    slot_count: usize,
}

impl<'a> Vtable<'a> {
    fn voffset(&self, slot: u16) -> DecodeResult<u16> {
        let at = self.pos + (VTABLE_HEADER_FIELDS + slot as usize) * VOFFSET_SIZE;
        buffer::read_u16(self.buf, at)
    }
}

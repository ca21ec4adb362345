//! Back-to-front buffer construction
//!
//! Values are written from the end of the buffer toward the front, so
//! the final address of every object is known before any offset to it
//! is written. Positions under construction are tracked as *rev*
//! positions (distance from the end of the buffer), which stay valid
//! as the buffer grows at the front.
//!
//! The alignment discipline: before pushing an object of `size`
//! bytes, pad so that `used + size` is a multiple of the object's
//! alignment. At [`Builder::finish`] the whole buffer is padded to
//! the largest alignment seen, which lands every object on a final
//! address divisible by its alignment.

use std::collections::HashMap;

use crate::wire::{
    padding_for, FILE_IDENTIFIER_LEN, MAX_BUFFER_BYTES, SOFFSET_SIZE, UOFFSET_SIZE,
    VOFFSET_SIZE, VTABLE_HEADER_FIELDS,
};

use super::errors::{EncodeError, EncodeResult};

/// A finished table, addressable by rev position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipTable(pub(crate) u32);

/// A finished string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipString(pub(crate) u32);

/// A finished vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WipVector(pub(crate) u32);

/// A slot the schema marks required; checked when its table ends.
#[derive(Debug, Clone, Copy)]
pub struct RequiredField {
    pub slot: u16,
    pub name: &'static str,
}

/// One element of a union vector. A zero tag must pair with no value
/// and a nonzero tag with one.
#[derive(Debug, Clone, Copy)]
pub struct UnionEntry {
    pub tag: u8,
    pub value: Option<WipTable>,
}

impl UnionEntry {
    pub fn none() -> Self {
        UnionEntry {
            tag: 0,
            value: None,
        }
    }

    pub fn new(tag: u8, value: WipTable) -> Self {
        assert!(tag != 0, "tag 0 is reserved for NONE");
        UnionEntry {
            tag,
            value: Some(value),
        }
    }
}

/// A scalar writable into the buffer at its natural width.
pub trait Scalar: Copy {
    const SIZE: usize;
    fn write_le(self, dst: &mut [u8]);
}

macro_rules! scalar {
    ($ty:ty, $size:expr) => {
        impl Scalar for $ty {
            const SIZE: usize = $size;

            fn write_le(self, dst: &mut [u8]) {
                dst.copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

scalar!(u8, 1);
scalar!(u16, 2);
scalar!(u32, 4);
scalar!(u64, 8);
scalar!(i8, 1);
scalar!(i16, 2);
scalar!(i32, 4);
scalar!(i64, 8);
scalar!(f32, 4);
scalar!(f64, 8);

impl Scalar for bool {
    const SIZE: usize = 1;

    fn write_le(self, dst: &mut [u8]) {
        dst[0] = self as u8;
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldLoc {
    slot: u16,
    rev: u32,
}

/// Builds one buffer. Exclusive owner of its bytes until
/// [`Builder::finished_bytes`]; never shared between threads.
#[derive(Debug)]
pub struct Builder {
    buf: Vec<u8>,
    /// Index of the lowest written byte; `buf[head..]` is the data.
    head: usize,
    /// Largest alignment pushed so far.
    min_align: usize,
    /// Slots of the table currently under construction.
    field_locs: Vec<FieldLoc>,
    /// Rev position at `start_table`, `Some` while a table is open.
    table_start: Option<u32>,
    /// Byte-equal vtables already emitted, by rev position.
    vtables: HashMap<Vec<u8>, u32>,
    finished: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Builder::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(32);
        Builder {
            buf: vec![0; capacity],
            head: capacity,
            min_align: 1,
            field_locs: Vec::new(),
            table_start: None,
            vtables: HashMap::new(),
            finished: false,
        }
    }

    /// Clears the builder for reuse, keeping its allocation.
    pub fn reset(&mut self) {
        self.head = self.buf.len();
        self.min_align = 1;
        self.field_locs.clear();
        self.table_start = None;
        self.vtables.clear();
        self.finished = false;
    }

    /// Bytes written so far.
    fn used(&self) -> usize {
        self.buf.len() - self.head
    }

    fn assert_not_nested(&self, what: &str) {
        assert!(
            self.table_start.is_none(),
            "{} is not allowed while a table is under construction",
            what
        );
        assert!(!self.finished, "builder is finished; call reset first");
    }

    fn assert_nested(&self) {
        assert!(
            self.table_start.is_some(),
            "field slots can only be pushed between start_table and end_table"
        );
    }

    /// Moves the head down by `bytes`, growing the buffer if needed.
    fn make_space(&mut self, bytes: usize) {
        assert!(
            self.used() + bytes <= MAX_BUFFER_BYTES,
            "buffer exceeds the {} byte limit",
            MAX_BUFFER_BYTES
        );
        while self.head < bytes {
            self.grow();
        }
        self.head -= bytes;
    }

    fn grow(&mut self) {
        let old_len = self.buf.len();
        let new_len = (old_len * 2).clamp(64, MAX_BUFFER_BYTES);
        assert!(new_len > old_len, "buffer exceeds the {} byte limit", MAX_BUFFER_BYTES);

        let used = self.used();
        let mut grown = vec![0; new_len];
        grown[new_len - used..].copy_from_slice(&self.buf[self.head..]);
        self.buf = grown;
        self.head = new_len - used;
    }

    /// Writes `count` zero bytes. Explicit zeroing keeps padding
    /// deterministic across `reset`.
    fn pad(&mut self, count: usize) {
        self.make_space(count);
        self.buf[self.head..self.head + count].fill(0);
    }

    fn track_align(&mut self, align: usize) {
        debug_assert!(align.is_power_of_two());
        self.min_align = self.min_align.max(align);
    }

    /// Pads so the object about to be pushed ends `used` at a
    /// multiple of `align`, which lands its final address on an
    /// `align` boundary.
    fn align_before(&mut self, size: usize, align: usize) {
        self.track_align(align);
        let padding = padding_for(self.used() + size, align);
        if padding > 0 {
            self.pad(padding);
        }
    }

    /// Pushes one scalar and returns its rev position.
    fn push_scalar<T: Scalar>(&mut self, value: T) -> u32 {
        self.make_space(T::SIZE);
        value.write_le(&mut self.buf[self.head..self.head + T::SIZE]);
        self.used() as u32
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> u32 {
        self.make_space(bytes.len());
        self.buf[self.head..self.head + bytes.len()].copy_from_slice(bytes);
        self.used() as u32
    }

    /// Writes a uoffset pointing at the object at rev `target`.
    fn push_uoffset_to(&mut self, target: u32) -> u32 {
        let value = (self.used() + UOFFSET_SIZE) as u32 - target;
        self.push_scalar(value)
    }

    // ----- standalone objects ------------------------------------

    /// Writes a string: `u32` length, UTF-8 bytes, then a zero byte
    /// for C interop that the length does not count.
    pub fn create_string(&mut self, value: &str) -> WipString {
        self.assert_not_nested("create_string");
        let bytes = value.as_bytes();
        self.align_before(bytes.len() + 1, UOFFSET_SIZE);
        self.push_scalar(0u8);
        self.push_bytes(bytes);
        let rev = self.push_scalar(bytes.len() as u32);
        WipString(rev)
    }

    /// Writes a vector of scalars (or bools).
    pub fn create_vector<T: Scalar>(&mut self, items: &[T]) -> WipVector {
        self.assert_not_nested("create_vector");
        self.align_before(items.len() * T::SIZE, T::SIZE.max(UOFFSET_SIZE));
        for item in items.iter().rev() {
            self.push_scalar(*item);
        }
        let rev = self.push_scalar(items.len() as u32);
        WipVector(rev)
    }

    pub fn create_string_vector(&mut self, items: &[WipString]) -> WipVector {
        self.assert_not_nested("create_string_vector");
        self.create_offset_vector(items.iter().map(|s| s.0).collect())
    }

    pub fn create_table_vector(&mut self, items: &[WipTable]) -> WipVector {
        self.assert_not_nested("create_table_vector");
        self.create_offset_vector(items.iter().map(|t| t.0).collect())
    }

    fn create_offset_vector(&mut self, targets: Vec<u32>) -> WipVector {
        self.align_before(targets.len() * UOFFSET_SIZE, UOFFSET_SIZE);
        for target in targets.iter().rev() {
            self.push_uoffset_to(*target);
        }
        let rev = self.push_scalar(targets.len() as u32);
        WipVector(rev)
    }

    /// Writes a vector of inline structs. Every element must be
    /// exactly `size` bytes, assembled with the validated layout.
    pub fn create_struct_vector(
        &mut self,
        size: usize,
        align: usize,
        items: &[&[u8]],
    ) -> WipVector {
        self.assert_not_nested("create_struct_vector");
        self.align_before(items.len() * size, align.max(UOFFSET_SIZE));
        for item in items.iter().rev() {
            assert!(item.len() == size, "struct element must be {} bytes", size);
            self.push_bytes(item);
        }
        let rev = self.push_scalar(items.len() as u32);
        WipVector(rev)
    }

    /// Writes the two halves of a union vector: the `u8` tag vector
    /// and the value vector, always together and of equal length.
    /// NONE entries carry a zero value slot.
    pub fn create_union_vector(&mut self, entries: &[UnionEntry]) -> (WipVector, WipVector) {
        self.assert_not_nested("create_union_vector");
        for entry in entries {
            assert!(
                (entry.tag == 0) == entry.value.is_none(),
                "a union entry's tag and value must agree"
            );
        }

        self.align_before(entries.len() * UOFFSET_SIZE, UOFFSET_SIZE);
        for entry in entries.iter().rev() {
            match entry.value {
                Some(table) => {
                    self.push_uoffset_to(table.0);
                }
                None => {
                    self.push_scalar(0u32);
                }
            }
        }
        let values = WipVector(self.push_scalar(entries.len() as u32));

        let tags: Vec<u8> = entries.iter().map(|e| e.tag).collect();
        let types = self.create_vector(&tags);

        (types, values)
    }

    // ----- tables ------------------------------------------------

    /// Opens a table. Payload objects (strings, vectors, child
    /// tables) must already be written; only slot pushes are legal
    /// until [`Builder::end_table`].
    pub fn start_table(&mut self) {
        self.assert_not_nested("start_table");
        self.field_locs.clear();
        self.table_start = Some(self.used() as u32);
    }

    fn record_slot(&mut self, slot: u16, rev: u32) {
        debug_assert!(
            self.field_locs.iter().all(|f| f.slot != slot),
            "slot {} pushed twice",
            slot
        );
        self.field_locs.push(FieldLoc { slot, rev });
    }

    fn push_slot_scalar<T: Scalar>(&mut self, slot: u16, value: T) {
        self.assert_nested();
        self.align_before(T::SIZE, T::SIZE);
        let rev = self.push_scalar(value);
        self.record_slot(slot, rev);
    }

    fn push_slot_uoffset(&mut self, slot: u16, target: u32) {
        self.assert_nested();
        self.align_before(UOFFSET_SIZE, UOFFSET_SIZE);
        let rev = self.push_uoffset_to(target);
        self.record_slot(slot, rev);
    }

    pub fn push_slot_u8(&mut self, slot: u16, value: u8, default: u8) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_u16(&mut self, slot: u16, value: u16, default: u16) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_u32(&mut self, slot: u16, value: u32, default: u32) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_u64(&mut self, slot: u16, value: u64, default: u64) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_i8(&mut self, slot: u16, value: i8, default: i8) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_i16(&mut self, slot: u16, value: i16, default: i16) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_i32(&mut self, slot: u16, value: i32, default: i32) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_i64(&mut self, slot: u16, value: i64, default: i64) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_f32(&mut self, slot: u16, value: f32, default: f32) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_f64(&mut self, slot: u16, value: f64, default: f64) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    pub fn push_slot_bool(&mut self, slot: u16, value: bool, default: bool) {
        if value != default {
            self.push_slot_scalar(slot, value);
        }
    }

    /// Inlines a struct into the table body. `bytes` is the complete
    /// struct block, `align` its validated alignment.
    pub fn push_slot_struct(&mut self, slot: u16, bytes: &[u8], align: usize) {
        self.assert_nested();
        self.align_before(bytes.len(), align);
        let rev = self.push_bytes(bytes);
        self.record_slot(slot, rev);
    }

    pub fn push_slot_string(&mut self, slot: u16, value: WipString) {
        self.push_slot_uoffset(slot, value.0);
    }

    pub fn push_slot_table(&mut self, slot: u16, value: WipTable) {
        self.push_slot_uoffset(slot, value.0);
    }

    pub fn push_slot_vector(&mut self, slot: u16, value: WipVector) {
        self.push_slot_uoffset(slot, value.0);
    }

    /// Pushes a union's two coupled slots: the value uoffset at
    /// `value_slot` and the tag byte at `value_slot - 1`. NONE (tag
    /// 0, no value) elides both.
    pub fn push_slot_union(&mut self, value_slot: u16, tag: u8, value: Option<WipTable>) {
        assert!(value_slot > 0, "union value slot cannot be slot 0");
        assert!(
            (tag == 0) == value.is_none(),
            "a union's tag and value must agree"
        );
        if let Some(table) = value {
            self.push_slot_uoffset(value_slot, table.0);
        }
        self.push_slot_u8(value_slot - 1, tag, 0);
    }

    /// Pushes the two coupled slots of a vector-of-unions field.
    pub fn push_slot_union_vector(
        &mut self,
        value_slot: u16,
        types: WipVector,
        values: WipVector,
    ) {
        assert!(value_slot > 0, "union value slot cannot be slot 0");
        self.push_slot_uoffset(value_slot, values.0);
        self.push_slot_uoffset(value_slot - 1, types.0);
    }

    /// Closes the table: writes its soffset, assembles its vtable,
    /// reuses a byte-equal vtable when one was already emitted, and
    /// refuses to finish if a required slot is missing.
    pub fn end_table(&mut self, required: &[RequiredField]) -> EncodeResult<WipTable> {
        self.assert_nested();

        for requirement in required {
            if !self
                .field_locs
                .iter()
                .any(|f| f.slot == requirement.slot)
            {
                // The table cannot be completed; drop its state so the
                // builder stays coherent for a caller that resets.
                self.table_start = None;
                self.field_locs.clear();
                return Err(EncodeError::MissingRequired(requirement.name.to_string()));
            }
        }

        let table_start = self.table_start.take().expect("table is open");

        self.align_before(SOFFSET_SIZE, SOFFSET_SIZE);
        let table_rev = self.push_scalar(0i32);

        let slot_count = self
            .field_locs
            .iter()
            .map(|f| f.slot as usize + 1)
            .max()
            .unwrap_or(0);
        let vtable_len = (VTABLE_HEADER_FIELDS + slot_count) * VOFFSET_SIZE;
        let table_size = table_rev - table_start;
        assert!(table_size <= u16::MAX as u32, "table body exceeds 64 KiB");

        let mut vtable = vec![0u8; vtable_len];
        vtable[0..2].copy_from_slice(&(vtable_len as u16).to_le_bytes());
        vtable[2..4].copy_from_slice(&(table_size as u16).to_le_bytes());
        for loc in &self.field_locs {
            let voffset = table_rev - loc.rev;
            assert!(voffset <= u16::MAX as u32, "field offset exceeds voffset range");
            let at = (VTABLE_HEADER_FIELDS + loc.slot as usize) * VOFFSET_SIZE;
            vtable[at..at + 2].copy_from_slice(&(voffset as u16).to_le_bytes());
        }
        self.field_locs.clear();

        let vt_rev = match self.vtables.get(&vtable) {
            Some(&rev) => rev,
            None => {
                self.align_before(vtable_len, VOFFSET_SIZE);
                let rev = self.push_bytes(&vtable);
                self.vtables.insert(vtable, rev);
                rev
            }
        };

        // soffset: the vtable lives at table_pos - soffset.
        let soffset = vt_rev as i64 - table_rev as i64;
        let at = self.buf.len() - table_rev as usize;
        self.buf[at..at + SOFFSET_SIZE].copy_from_slice(&(soffset as i32).to_le_bytes());

        Ok(WipTable(table_rev))
    }

    // ----- finishing ---------------------------------------------

    /// Writes the root uoffset (and file identifier, if any) and
    /// seals the buffer.
    pub fn finish(&mut self, root: WipTable, file_identifier: Option<&[u8; FILE_IDENTIFIER_LEN]>) {
        self.assert_not_nested("finish");
        self.track_align(UOFFSET_SIZE);

        let trailing = UOFFSET_SIZE
            + if file_identifier.is_some() {
                FILE_IDENTIFIER_LEN
            } else {
                0
            };
        let padding = padding_for(self.used() + trailing, self.min_align);
        if padding > 0 {
            self.pad(padding);
        }
        if let Some(identifier) = file_identifier {
            self.push_bytes(identifier);
        }
        self.push_uoffset_to(root.0);
        self.finished = true;

        tracing::trace!(bytes = self.used(), "buffer finished");
    }

    /// The completed buffer. Only valid after [`Builder::finish`].
    pub fn finished_bytes(&self) -> &[u8] {
        assert!(self.finished, "buffer is not finished");
        &self.buf[self.head..]
    }

    /// Consumes the builder, returning the completed buffer.
    pub fn into_bytes(mut self) -> Vec<u8> {
        assert!(self.finished, "buffer is not finished");
        self.buf.split_off(self.head)
    }
}

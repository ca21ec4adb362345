//! Layout-resolved schema types
//!
//! Everything in this module is the *output* of validation: names are
//! resolved, enum values bounded, struct layouts computed, table
//! slots assigned and union tags fixed. Validated values are
//! immutable once emitted and serializable so external code
//! generators can consume them as data.

use serde::Serialize;

use crate::schema::{QualifiedName, Type};

/// The eight integer primitives an enum may use as its underlying
/// type, also the integer scalars of table and struct fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl IntType {
    /// Size in bytes: 1, 2, 4 or 8. Alignment equals size.
    pub fn size(self) -> usize {
        match self {
            IntType::Int8 | IntType::UInt8 => 1,
            IntType::Int16 | IntType::UInt16 => 2,
            IntType::Int32 | IntType::UInt32 => 4,
            IntType::Int64 | IntType::UInt64 => 8,
        }
    }

    pub fn align(self) -> usize {
        self.size()
    }

    pub fn name(self) -> &'static str {
        match self {
            IntType::Int8 => "int8",
            IntType::Int16 => "int16",
            IntType::Int32 => "int32",
            IntType::Int64 => "int64",
            IntType::UInt8 => "uint8",
            IntType::UInt16 => "uint16",
            IntType::UInt32 => "uint32",
            IntType::UInt64 => "uint64",
        }
    }

    /// True if `value` is representable in this type.
    pub fn contains(self, value: i128) -> bool {
        match self {
            IntType::Int8 => value >= i8::MIN as i128 && value <= i8::MAX as i128,
            IntType::Int16 => value >= i16::MIN as i128 && value <= i16::MAX as i128,
            IntType::Int32 => value >= i32::MIN as i128 && value <= i32::MAX as i128,
            IntType::Int64 => value >= i64::MIN as i128 && value <= i64::MAX as i128,
            IntType::UInt8 => value >= 0 && value <= u8::MAX as i128,
            IntType::UInt16 => value >= 0 && value <= u16::MAX as i128,
            IntType::UInt32 => value >= 0 && value <= u32::MAX as i128,
            IntType::UInt64 => value >= 0 && value <= u64::MAX as i128,
        }
    }

    /// Maps a syntax-level type to an integer primitive, if it is one.
    pub fn from_type(ty: &Type) -> Option<IntType> {
        match ty {
            Type::Int8 => Some(IntType::Int8),
            Type::Int16 => Some(IntType::Int16),
            Type::Int32 => Some(IntType::Int32),
            Type::Int64 => Some(IntType::Int64),
            Type::UInt8 => Some(IntType::UInt8),
            Type::UInt16 => Some(IntType::UInt16),
            Type::UInt32 => Some(IntType::UInt32),
            Type::UInt64 => Some(IntType::UInt64),
            _ => None,
        }
    }
}

/// A validated enum: bounded, strictly ascending variants over an
/// integer underlying type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    pub ident: String,
    pub underlying: IntType,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVariant {
    pub ident: String,
    pub value: i128,
}

impl Enum {
    pub fn variant_value(&self, ident: &str) -> Option<i128> {
        self.variants
            .iter()
            .find(|v| v.ident == ident)
            .map(|v| v.value)
    }

    pub fn variant_with_value(&self, value: i128) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }

    /// The variant with value 0, used as the implicit default.
    pub fn zero_variant(&self) -> Option<&EnumVariant> {
        self.variant_with_value(0)
    }
}

/// A field type legal inside a struct: fixed size, fixed alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StructFieldType {
    Int(IntType),
    Float,
    Double,
    Bool,
    Enum(Enum),
    Struct(Box<Struct>),
}

impl StructFieldType {
    pub fn size(&self) -> usize {
        match self {
            StructFieldType::Int(ty) => ty.size(),
            StructFieldType::Float => 4,
            StructFieldType::Double => 8,
            StructFieldType::Bool => 1,
            // An enum occupies exactly its underlying integer.
            StructFieldType::Enum(e) => e.underlying.size(),
            StructFieldType::Struct(s) => s.size,
        }
    }

    pub fn align(&self) -> usize {
        match self {
            StructFieldType::Int(ty) => ty.align(),
            StructFieldType::Float => 4,
            StructFieldType::Double => 8,
            StructFieldType::Bool => 1,
            StructFieldType::Enum(e) => e.underlying.align(),
            StructFieldType::Struct(s) => s.align,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructField {
    pub ident: String,
    pub ty: StructFieldType,
    /// Bytes of padding after this field.
    pub padding: usize,
}

/// A validated struct: fixed layout, every field naturally aligned,
/// total size a multiple of the alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Struct {
    pub ident: String,
    /// One of 1, 2, 4, 8, 16.
    pub align: usize,
    pub size: usize,
    pub fields: Vec<StructField>,
}

impl Struct {
    /// Byte offset of each field, in declaration order.
    pub fn field_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.fields.len());
        let mut offset = 0usize;
        for field in &self.fields {
            offsets.push(offset);
            offset += field.ty.size() + field.padding;
        }
        offsets
    }
}

/// Element type of a table-field vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VectorElement {
    Int(IntType),
    Float,
    Double,
    Bool,
    String,
    Enum(Enum),
    Struct(Struct),
    Table(QualifiedName),
    Union(QualifiedName),
}

impl VectorElement {
    pub fn is_union(&self) -> bool {
        matches!(self, VectorElement::Union(_))
    }
}

/// The closed set of table field types, each with its default or its
/// required flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableFieldType {
    Int { ty: IntType, default: i128 },
    Float { default: f32 },
    Double { default: f64 },
    Bool { default: bool },
    Enum { decl: Enum, default: String },
    String { required: bool },
    Struct { decl: Struct, required: bool },
    Table { name: QualifiedName, required: bool },
    Union { name: QualifiedName, required: bool },
    Vector { element: VectorElement, required: bool },
}

impl TableFieldType {
    /// Scalars take inline defaults; everything else is a reference.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TableFieldType::Int { .. }
                | TableFieldType::Float { .. }
                | TableFieldType::Double { .. }
                | TableFieldType::Bool { .. }
                | TableFieldType::Enum { .. }
        )
    }

    pub fn is_required(&self) -> bool {
        match self {
            TableFieldType::String { required }
            | TableFieldType::Struct { required, .. }
            | TableFieldType::Table { required, .. }
            | TableFieldType::Union { required, .. }
            | TableFieldType::Vector { required, .. } => *required,
            _ => false,
        }
    }

    /// Union fields and vector-of-union fields occupy two consecutive
    /// slots: the type byte, then the value.
    pub fn occupies_two_slots(&self) -> bool {
        match self {
            TableFieldType::Union { .. } => true,
            TableFieldType::Vector { element, .. } => element.is_union(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableField {
    pub ident: String,
    pub ty: TableFieldType,
    pub deprecated: bool,
    /// The value slot id. For unions this is the second of the two
    /// slots; the type byte lives at `slot - 1`.
    pub slot: u16,
}

/// A validated table; fields are in ascending slot order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub ident: String,
    pub fields: Vec<TableField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionVariant {
    pub ident: String,
    pub table: QualifiedName,
    /// 1-based; tag 0 is the implicit NONE.
    pub tag: u8,
}

/// A validated union over table types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Union {
    pub ident: String,
    pub variants: Vec<UnionVariant>,
}

impl Union {
    pub fn variant_for_tag(&self, tag: u8) -> Option<&UnionVariant> {
        if tag == 0 {
            return None;
        }
        self.variants.get(tag as usize - 1)
    }
}

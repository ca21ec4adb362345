//! Property tests for struct layout and codec round-trips

use std::path::PathBuf;

use proptest::prelude::*;

use aerobuf::read;
use aerobuf::schema::{
    Declaration, FileTree, Metadata, Schema, StructDecl, StructFieldDecl, Type,
};
use aerobuf::semantics::validate;
use aerobuf::write::Builder;

fn scalar_type() -> impl Strategy<Value = Type> {
    prop::sample::select(vec![
        Type::Int8,
        Type::Int16,
        Type::Int32,
        Type::Int64,
        Type::UInt8,
        Type::UInt16,
        Type::UInt32,
        Type::UInt64,
        Type::Float,
        Type::Double,
        Type::Bool,
    ])
}

fn struct_tree(field_types: Vec<Type>) -> FileTree<Schema> {
    let fields = field_types
        .into_iter()
        .enumerate()
        .map(|(i, ty)| StructFieldDecl {
            ident: format!("f{}", i),
            ty,
            metadata: Metadata::default(),
        })
        .collect();
    FileTree::new(
        PathBuf::from("/mem/prop.abs"),
        Schema::new(
            Vec::new(),
            vec![Declaration::Struct(StructDecl {
                ident: "P".into(),
                metadata: Metadata::default(),
                fields,
            })],
        ),
    )
}

proptest! {
    /// Any sequence of scalar fields yields a layout where the size
    /// is a multiple of the alignment, every field is naturally
    /// aligned, and sizes plus paddings sum to the total.
    #[test]
    fn prop_struct_layout_invariants(field_types in prop::collection::vec(scalar_type(), 1..12)) {
        let validated = validate(&struct_tree(field_types)).unwrap();
        let s = &validated.structs[0].decl;

        prop_assert!(s.align.is_power_of_two());
        prop_assert!(s.align <= 8);
        prop_assert_eq!(s.size % s.align, 0);

        let offsets = s.field_offsets();
        let mut sum = 0usize;
        for (field, offset) in s.fields.iter().zip(&offsets) {
            prop_assert_eq!(offset % field.ty.align(), 0);
            sum += field.ty.size() + field.padding;
        }
        prop_assert_eq!(sum, s.size);

        // Declaration order is layout order.
        let idents: Vec<&str> = s.fields.iter().map(|f| f.ident.as_str()).collect();
        let expected: Vec<String> = (0..s.fields.len()).map(|i| format!("f{}", i)).collect();
        prop_assert_eq!(idents, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    /// Scalar vectors survive a write/read cycle exactly.
    #[test]
    fn prop_i64_vector_roundtrip(values in prop::collection::vec(any::<i64>(), 0..64)) {
        let mut builder = Builder::new();
        let vector = builder.create_vector(&values);
        builder.start_table();
        builder.push_slot_vector(0, vector);
        let table = builder.end_table(&[]).unwrap();
        builder.finish(table, None);

        let view = read::decode(builder.finished_bytes()).unwrap();
        let read_back = view.vector_field::<i64>(0).unwrap().unwrap().to_vec().unwrap();
        prop_assert_eq!(read_back, values);
    }

    /// Strings of arbitrary content survive a write/read cycle.
    #[test]
    fn prop_string_roundtrip(value in ".*") {
        let mut builder = Builder::new();
        let s = builder.create_string(&value);
        builder.start_table();
        builder.push_slot_string(0, s);
        let table = builder.end_table(&[]).unwrap();
        builder.finish(table, None);

        let view = read::decode(builder.finished_bytes()).unwrap();
        prop_assert_eq!(view.string_field(0).unwrap(), Some(value.as_str()));
    }

    /// A scalar equal to its default is elided; any other value is
    /// stored. Reading yields the written value either way.
    #[test]
    fn prop_scalar_default_elision(value in any::<u32>(), default in any::<u32>()) {
        let mut builder = Builder::new();
        builder.start_table();
        builder.push_slot_u32(0, value, default);
        let table = builder.end_table(&[]).unwrap();
        builder.finish(table, None);

        let view = read::decode(builder.finished_bytes()).unwrap();
        let present = view.field_pos(0).unwrap().is_some();
        prop_assert_eq!(present, value != default);
        prop_assert_eq!(view.u32_field(0, default).unwrap(), value);
    }

    /// Buffers decode from any byte position the root offset points
    /// at; total length stays under the signed-32 cap for every input
    /// this harness can produce.
    #[test]
    fn prop_buffer_stays_within_offset_cap(values in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut builder = Builder::new();
        let vector = builder.create_vector(&values);
        builder.start_table();
        builder.push_slot_vector(0, vector);
        let table = builder.end_table(&[]).unwrap();
        builder.finish(table, None);

        let buf = builder.finished_bytes();
        prop_assert!(buf.len() <= aerobuf::wire::MAX_BUFFER_BYTES);
        let root = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        prop_assert!(root as usize <= i32::MAX as usize);
    }
}

//! Struct validation
//!
//! Runs in two phases. The cycle check walks struct→struct references
//! depth-first with a visited stack, so the emission phase can
//! recurse freely. Emission is memoised by qualified name: a struct
//! referenced from three places is validated once.
//!
//! Layout: every field is placed at the next offset aligned for its
//! type; the trailing padding of each field absorbs the gap. The
//! final field pads the struct out to a multiple of the struct
//! alignment.

use std::collections::{HashMap, HashSet};

use crate::schema::{Literal, Namespace, StructDecl, Type};
use crate::wire::round_up;

use super::enums::check_duplicate_idents;
use super::errors::{Context, SchemaError, SchemaErrorKind, SemanticResult};
use super::resolve::{resolve, SymbolKind};
use super::symbols::{EnumsValidated, Symbol};
use super::validated::{Struct, StructField, StructFieldType};

/// Attributes that are meaningless on fixed-layout struct fields.
const REJECTED_FIELD_ATTRIBUTES: [&str; 3] = ["deprecated", "required", "id"];

/// Validates every struct in the symbol table, preserving order.
pub fn validate_structs(symbols: &EnumsValidated) -> SemanticResult<Vec<Symbol<Struct>>> {
    check_cycles(symbols)?;

    let mut memo = HashMap::new();
    let mut out = Vec::with_capacity(symbols.structs.len());
    for symbol in &symbols.structs {
        let validated = validate_struct(symbols, symbol, &mut memo)?;
        out.push(Symbol::new(symbol.namespace.clone(), validated));
    }
    Ok(out)
}

/// Depth-first traversal over struct-typed fields. Enum fields (and
/// anything unresolvable, which the emission phase will report with
/// proper context) terminate the descent.
fn check_cycles(symbols: &EnumsValidated) -> SemanticResult<()> {
    let mut done = HashSet::new();
    for symbol in &symbols.structs {
        let mut stack = Vec::new();
        visit(symbols, symbol, &mut stack, &mut done)?;
    }
    Ok(())
}

fn visit(
    symbols: &EnumsValidated,
    symbol: &Symbol<StructDecl>,
    stack: &mut Vec<String>,
    done: &mut HashSet<String>,
) -> SemanticResult<()> {
    let qualified = symbol.namespace.qualify(&symbol.decl.ident).to_string();

    if let Some(first) = stack.iter().position(|name| *name == qualified) {
        let mut chain = stack[first..].to_vec();
        chain.push(qualified);
        return Err(SchemaError::new(
            Context::namespace(&symbol.namespace).child(&symbol.decl.ident),
            SchemaErrorKind::CyclicStruct { chain },
        ));
    }
    if done.contains(&qualified) {
        return Ok(());
    }

    stack.push(qualified.clone());
    for field in &symbol.decl.fields {
        if let Type::Named(reference) = &field.ty {
            if let Ok(found) = resolve(symbols, &symbol.namespace, reference) {
                if found.kind == SymbolKind::Struct {
                    visit(symbols, &symbols.structs[found.index], stack, done)?;
                }
            }
        }
    }
    stack.pop();
    done.insert(qualified);
    Ok(())
}

fn validate_struct(
    symbols: &EnumsValidated,
    symbol: &Symbol<StructDecl>,
    memo: &mut HashMap<String, Struct>,
) -> SemanticResult<Struct> {
    let qualified = symbol.namespace.qualify(&symbol.decl.ident).to_string();
    if let Some(cached) = memo.get(&qualified) {
        return Ok(cached.clone());
    }

    let ctx = Context::namespace(&symbol.namespace).child(&symbol.decl.ident);
    let decl = &symbol.decl;

    if decl.fields.is_empty() {
        return Err(SchemaError::new(ctx, SchemaErrorKind::Empty { what: "field" }));
    }
    check_duplicate_idents(&ctx, decl.fields.iter().map(|f| f.ident.as_str()))?;

    let mut resolved = Vec::with_capacity(decl.fields.len());
    for field in &decl.fields {
        let field_ctx = ctx.child(&field.ident);
        for attribute in REJECTED_FIELD_ATTRIBUTES {
            if field.metadata.has(attribute) {
                return Err(SchemaError::new(
                    field_ctx,
                    SchemaErrorKind::StructFieldAttribute {
                        name: attribute.to_string(),
                    },
                ));
            }
        }
        let ty = field_type(symbols, &symbol.namespace, &field.ty, &field_ctx, memo)?;
        resolved.push((field.ident.clone(), ty));
    }

    let natural = resolved
        .iter()
        .map(|(_, ty)| ty.align())
        .max()
        .expect("struct has at least one field");
    let align = final_alignment(decl, natural, &ctx)?;

    // Padding pass: each field absorbs the gap before its successor;
    // the last field pads out to the struct alignment.
    let aligns: Vec<usize> = resolved.iter().map(|(_, ty)| ty.align()).collect();
    let mut fields = Vec::with_capacity(resolved.len());
    let mut size = 0usize;
    let count = resolved.len();
    for (index, (ident, ty)) in resolved.into_iter().enumerate() {
        size += ty.size();
        let next_align = if index + 1 < count {
            aligns[index + 1]
        } else {
            align
        };
        let padding = round_up(size, next_align) - size;
        size += padding;
        fields.push(StructField { ident, ty, padding });
    }

    let validated = Struct {
        ident: decl.ident.clone(),
        align,
        size,
        fields,
    };
    memo.insert(qualified, validated.clone());
    Ok(validated)
}

fn final_alignment(decl: &StructDecl, natural: usize, ctx: &Context) -> SemanticResult<usize> {
    if !decl.metadata.has("force_align") {
        return Ok(natural);
    }
    let value = match decl.metadata.value("force_align") {
        Some(Literal::Int(v)) => *v,
        _ => {
            return Err(SchemaError::new(
                ctx.clone(),
                SchemaErrorKind::InvalidForceAlign { value: 0, natural },
            ))
        }
    };
    let valid = value > 0
        && value <= 16
        && (value as usize).is_power_of_two()
        && value as usize >= natural;
    if !valid {
        return Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::InvalidForceAlign { value, natural },
        ));
    }
    Ok(value as usize)
}

fn field_type(
    symbols: &EnumsValidated,
    namespace: &Namespace,
    ty: &Type,
    ctx: &Context,
    memo: &mut HashMap<String, Struct>,
) -> SemanticResult<StructFieldType> {
    use super::validated::IntType;

    if let Some(int) = IntType::from_type(ty) {
        return Ok(StructFieldType::Int(int));
    }
    match ty {
        Type::Float => Ok(StructFieldType::Float),
        Type::Double => Ok(StructFieldType::Double),
        Type::Bool => Ok(StructFieldType::Bool),
        Type::String | Type::Vector(_) => Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::InvalidStructFieldType { ty: ty.to_string() },
        )),
        Type::Named(reference) => {
            let found = resolve(symbols, namespace, reference)
                .map_err(|kind| SchemaError::new(ctx.clone(), kind))?;
            match found.kind {
                SymbolKind::Enum => Ok(StructFieldType::Enum(
                    symbols.enums[found.index].decl.clone(),
                )),
                SymbolKind::Struct => {
                    let nested = validate_struct(symbols, &symbols.structs[found.index], memo)?;
                    Ok(StructFieldType::Struct(Box::new(nested)))
                }
                SymbolKind::Table | SymbolKind::Union => Err(SchemaError::new(
                    ctx.clone(),
                    SchemaErrorKind::InvalidStructFieldType {
                        ty: reference.to_string(),
                    },
                )),
            }
        }
        _ => unreachable!("integer primitives handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Metadata, Reference, StructFieldDecl};

    fn struct_decl(ident: &str, fields: Vec<(&str, Type)>) -> StructDecl {
        StructDecl {
            ident: ident.into(),
            metadata: Metadata::default(),
            fields: fields
                .into_iter()
                .map(|(ident, ty)| StructFieldDecl {
                    ident: ident.into(),
                    ty,
                    metadata: Metadata::default(),
                })
                .collect(),
        }
    }

    fn symbols_with(structs: Vec<StructDecl>) -> EnumsValidated {
        EnumsValidated {
            enums: Vec::new(),
            structs: structs
                .into_iter()
                .map(|decl| Symbol::new(Namespace::root(), decl))
                .collect(),
            tables: Vec::new(),
            unions: Vec::new(),
        }
    }

    fn paddings(s: &Struct) -> Vec<usize> {
        s.fields.iter().map(|f| f.padding).collect()
    }

    #[test]
    fn test_vec3_layout() {
        let symbols = symbols_with(vec![struct_decl(
            "V3",
            vec![("x", Type::Float), ("y", Type::Float), ("z", Type::Float)],
        )]);
        let out = validate_structs(&symbols).unwrap();
        let v3 = &out[0].decl;
        assert_eq!(v3.align, 4);
        assert_eq!(v3.size, 12);
        assert_eq!(paddings(v3), vec![0, 0, 0]);
    }

    #[test]
    fn test_mixed_alignment_layout() {
        let symbols = symbols_with(vec![struct_decl(
            "M",
            vec![("a", Type::Bool), ("b", Type::Double)],
        )]);
        let out = validate_structs(&symbols).unwrap();
        let m = &out[0].decl;
        assert_eq!(m.align, 8);
        assert_eq!(m.size, 16);
        assert_eq!(paddings(m), vec![7, 0]);
    }

    #[test]
    fn test_trailing_padding_to_struct_alignment() {
        let symbols = symbols_with(vec![struct_decl(
            "T",
            vec![("a", Type::Double), ("b", Type::Bool)],
        )]);
        let out = validate_structs(&symbols).unwrap();
        let t = &out[0].decl;
        assert_eq!(t.align, 8);
        assert_eq!(t.size, 16);
        assert_eq!(paddings(t), vec![0, 7]);
    }

    #[test]
    fn test_nested_struct_layout() {
        let symbols = symbols_with(vec![
            struct_decl("Inner", vec![("v", Type::Double)]),
            struct_decl(
                "Outer",
                vec![
                    ("flag", Type::Bool),
                    ("inner", Type::Named(Reference::plain("Inner"))),
                ],
            ),
        ]);
        let out = validate_structs(&symbols).unwrap();
        let outer = &out[1].decl;
        assert_eq!(outer.align, 8);
        assert_eq!(outer.size, 16);
        assert_eq!(paddings(outer), vec![7, 0]);
        assert_eq!(outer.field_offsets(), vec![0, 8]);
    }

    #[test]
    fn test_enum_field_uses_true_underlying_size() {
        let mut symbols = symbols_with(vec![struct_decl(
            "S",
            vec![
                ("tag", Type::Named(Reference::plain("Wide"))),
                ("value", Type::UInt8),
            ],
        )]);
        symbols.enums.push(Symbol::new(
            Namespace::root(),
            super::super::validated::Enum {
                ident: "Wide".into(),
                underlying: super::super::validated::IntType::UInt32,
                variants: vec![super::super::validated::EnumVariant {
                    ident: "A".into(),
                    value: 0,
                }],
            },
        ));

        let out = validate_structs(&symbols).unwrap();
        let s = &out[0].decl;
        // A 32-bit enum is exactly 4 bytes, so the struct is 4-aligned
        // and 8 bytes, not the 3-byte rendering of the old toolchain.
        assert_eq!(s.align, 4);
        assert_eq!(s.size, 8);
        assert_eq!(s.field_offsets(), vec![0, 4]);
        assert_eq!(paddings(s), vec![0, 3]);
    }

    #[test]
    fn test_force_align_widens() {
        let mut decl = struct_decl("S", vec![("a", Type::UInt32)]);
        decl.metadata = Metadata::new(vec![("force_align".into(), Some(Literal::Int(16)))]);
        let symbols = symbols_with(vec![decl]);
        let out = validate_structs(&symbols).unwrap();
        assert_eq!(out[0].decl.align, 16);
        assert_eq!(out[0].decl.size, 16);
    }

    #[test]
    fn test_force_align_below_natural_rejected() {
        let mut decl = struct_decl("S", vec![("a", Type::Double)]);
        decl.metadata = Metadata::new(vec![("force_align".into(), Some(Literal::Int(4)))]);
        let symbols = symbols_with(vec![decl]);
        let err = validate_structs(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::InvalidForceAlign {
                value: 4,
                natural: 8
            }
        ));
    }

    #[test]
    fn test_force_align_not_power_of_two_rejected() {
        let mut decl = struct_decl("S", vec![("a", Type::UInt8)]);
        decl.metadata = Metadata::new(vec![("force_align".into(), Some(Literal::Int(6)))]);
        let symbols = symbols_with(vec![decl]);
        assert!(validate_structs(&symbols).is_err());
    }

    #[test]
    fn test_self_cycle_detected() {
        let symbols = symbols_with(vec![struct_decl(
            "S",
            vec![("next", Type::Named(Reference::plain("S")))],
        )]);
        let err = validate_structs(&symbols).unwrap_err();
        assert_eq!(err.to_string(), "[S]: cyclic dependency [S -> S]");
    }

    #[test]
    fn test_mutual_cycle_detected() {
        let symbols = symbols_with(vec![
            struct_decl("S", vec![("a", Type::Named(Reference::plain("T")))]),
            struct_decl("T", vec![("b", Type::Named(Reference::plain("S")))]),
        ]);
        let err = validate_structs(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::CyclicStruct { chain }
                if chain == &["S".to_string(), "T".to_string(), "S".to_string()]
        ));
    }

    #[test]
    fn test_diamond_reference_is_not_a_cycle() {
        let symbols = symbols_with(vec![
            struct_decl("Leaf", vec![("v", Type::UInt32)]),
            struct_decl(
                "A",
                vec![("l", Type::Named(Reference::plain("Leaf")))],
            ),
            struct_decl(
                "B",
                vec![("l", Type::Named(Reference::plain("Leaf")))],
            ),
            struct_decl(
                "Top",
                vec![
                    ("a", Type::Named(Reference::plain("A"))),
                    ("b", Type::Named(Reference::plain("B"))),
                ],
            ),
        ]);
        assert!(validate_structs(&symbols).is_ok());
    }

    #[test]
    fn test_string_field_rejected() {
        let symbols = symbols_with(vec![struct_decl("S", vec![("s", Type::String)])]);
        let err = validate_structs(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::InvalidStructFieldType { .. }
        ));
        assert_eq!(err.context().as_str(), "S.s");
    }

    #[test]
    fn test_vector_field_rejected() {
        let symbols = symbols_with(vec![struct_decl(
            "S",
            vec![("v", Type::Vector(Box::new(Type::UInt8)))],
        )]);
        assert!(validate_structs(&symbols).is_err());
    }

    #[test]
    fn test_field_attributes_rejected() {
        let mut decl = struct_decl("S", vec![("a", Type::UInt8)]);
        decl.fields[0].metadata = Metadata::new(vec![("deprecated".into(), None)]);
        let symbols = symbols_with(vec![decl]);
        let err = validate_structs(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::StructFieldAttribute { name } if name == "deprecated"
        ));
    }

    #[test]
    fn test_empty_struct_rejected() {
        let symbols = symbols_with(vec![struct_decl("S", vec![])]);
        let err = validate_structs(&symbols).unwrap_err();
        assert!(matches!(err.kind(), SchemaErrorKind::Empty { .. }));
    }

    #[test]
    fn test_memoised_validation_is_consistent() {
        // Leaf is referenced twice; both references must see the same
        // validated layout.
        let symbols = symbols_with(vec![
            struct_decl("Leaf", vec![("v", Type::Double)]),
            struct_decl(
                "Pair",
                vec![
                    ("a", Type::Named(Reference::plain("Leaf"))),
                    ("b", Type::Named(Reference::plain("Leaf"))),
                ],
            ),
        ]);
        let out = validate_structs(&symbols).unwrap();
        let pair = &out[1].decl;
        assert_eq!(pair.size, 16);
        match (&pair.fields[0].ty, &pair.fields[1].ty) {
            (StructFieldType::Struct(a), StructFieldType::Struct(b)) => assert_eq!(a, b),
            other => panic!("unexpected field types: {:?}", other),
        }
    }
}

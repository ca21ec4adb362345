//! Table validation
//!
//! Checks field identifiers, resolves field types, validates default
//! values against the field type, and assigns vtable slots. A union
//! or vector-of-unions field consumes two consecutive slots (the type
//! byte precedes the value), which the id rules must respect.

use crate::schema::{Literal, Namespace, TableDecl, TableFieldDecl, Type};

use super::enums::check_duplicate_idents;
use super::errors::{Context, SchemaError, SchemaErrorKind, SemanticResult};
use super::resolve::{resolve, SymbolKind};
use super::symbols::{StructsValidated, Symbol};
use super::validated::{Enum, IntType, Table, TableField, TableFieldType, VectorElement};

/// Validates every table in the symbol table, preserving order.
pub fn validate_tables(symbols: &StructsValidated) -> SemanticResult<Vec<Symbol<Table>>> {
    let mut out = Vec::with_capacity(symbols.tables.len());
    for symbol in &symbols.tables {
        let validated = validate_table(symbols, symbol)?;
        out.push(Symbol::new(symbol.namespace.clone(), validated));
    }
    Ok(out)
}

fn validate_table(
    symbols: &StructsValidated,
    symbol: &Symbol<TableDecl>,
) -> SemanticResult<Table> {
    let ctx = Context::namespace(&symbol.namespace).child(&symbol.decl.ident);
    let decl = &symbol.decl;

    check_duplicate_idents(&ctx, decl.fields.iter().map(|f| f.ident.as_str()))?;

    let mut fields = Vec::with_capacity(decl.fields.len());
    for field in &decl.fields {
        let field_ctx = ctx.child(&field.ident);
        let ty = field_type(symbols, &symbol.namespace, field, &field_ctx)?;
        let id = explicit_id(field, &field_ctx)?;
        fields.push(PendingField {
            ident: field.ident.clone(),
            ty,
            deprecated: field.metadata.has("deprecated"),
            id,
        });
    }

    let fields = assign_slots(fields, &ctx)?;
    Ok(Table {
        ident: decl.ident.clone(),
        fields,
    })
}

struct PendingField {
    ident: String,
    ty: TableFieldType,
    deprecated: bool,
    id: Option<u16>,
}

fn explicit_id(field: &TableFieldDecl, ctx: &Context) -> SemanticResult<Option<u16>> {
    if !field.metadata.has("id") {
        return Ok(None);
    }
    match field.metadata.value("id") {
        Some(Literal::Int(v)) if *v >= 0 && *v <= u16::MAX as i128 => Ok(Some(*v as u16)),
        _ => Err(SchemaError::new(ctx.clone(), SchemaErrorKind::InvalidId)),
    }
}

/// Orders fields by slot id and checks contiguity. Without explicit
/// ids, slots are assigned in source order by the same stepping rule.
fn assign_slots(fields: Vec<PendingField>, ctx: &Context) -> SemanticResult<Vec<TableField>> {
    let with_ids = fields.iter().filter(|f| f.id.is_some()).count();
    if with_ids != 0 && with_ids != fields.len() {
        return Err(SchemaError::new(ctx.clone(), SchemaErrorKind::PartialIds));
    }

    let mut fields = fields;
    if with_ids != 0 {
        fields.sort_by_key(|f| f.id.expect("all fields carry ids"));
    }

    let mut out = Vec::with_capacity(fields.len());
    let mut previous: i64 = -1;
    for field in fields {
        let step = if field.ty.occupies_two_slots() { 2 } else { 1 };
        let expected = previous + step;
        let slot = match field.id {
            Some(id) => {
                let field_ctx = ctx.child(&field.ident);
                if (id as i64) != expected {
                    if step == 2 && (id as i64) == previous + 1 {
                        return Err(SchemaError::new(
                            field_ctx,
                            SchemaErrorKind::UnionIdGap {
                                expected: expected as u32,
                                found: id as u32,
                            },
                        ));
                    }
                    return Err(SchemaError::new(
                        field_ctx,
                        SchemaErrorKind::NonContiguousIds {
                            expected: expected as u32,
                            found: id as u32,
                        },
                    ));
                }
                id
            }
            None => expected as u16,
        };
        previous = slot as i64;
        out.push(TableField {
            ident: field.ident,
            ty: field.ty,
            deprecated: field.deprecated,
            slot,
        });
    }
    Ok(out)
}

fn field_type(
    symbols: &StructsValidated,
    namespace: &Namespace,
    field: &TableFieldDecl,
    ctx: &Context,
) -> SemanticResult<TableFieldType> {
    let required = field.metadata.has("required");
    let default = field.default.as_ref();

    // Scalars reject `required`; references reject defaults. Both
    // checks live beside the type dispatch so every arm stays honest.
    if let Some(int) = IntType::from_type(&field.ty) {
        reject_required(required, ctx)?;
        let default = int_default(int, default, ctx)?;
        return Ok(TableFieldType::Int { ty: int, default });
    }

    match &field.ty {
        Type::Float => {
            reject_required(required, ctx)?;
            let default = number_default(default, "float", ctx)? as f32;
            Ok(TableFieldType::Float { default })
        }
        Type::Double => {
            reject_required(required, ctx)?;
            let default = number_default(default, "double", ctx)?;
            Ok(TableFieldType::Double { default })
        }
        Type::Bool => {
            reject_required(required, ctx)?;
            let default = match default {
                None => false,
                Some(Literal::Bool(b)) => *b,
                Some(_) => {
                    return Err(SchemaError::new(
                        ctx.clone(),
                        SchemaErrorKind::DefaultTypeMismatch {
                            field_ty: "bool".into(),
                            expected: "a boolean",
                        },
                    ))
                }
            };
            Ok(TableFieldType::Bool { default })
        }
        Type::String => {
            reject_default(default, ctx)?;
            Ok(TableFieldType::String { required })
        }
        Type::Vector(inner) => {
            reject_default(default, ctx)?;
            let element = vector_element(symbols, namespace, inner, ctx)?;
            Ok(TableFieldType::Vector { element, required })
        }
        Type::Named(reference) => {
            let found = resolve(symbols, namespace, reference)
                .map_err(|kind| SchemaError::new(ctx.clone(), kind))?;
            match found.kind {
                SymbolKind::Enum => {
                    reject_required(required, ctx)?;
                    let decl = symbols.enums[found.index].decl.clone();
                    let default = enum_default(&decl, default, ctx)?;
                    Ok(TableFieldType::Enum { decl, default })
                }
                SymbolKind::Struct => {
                    reject_default(default, ctx)?;
                    Ok(TableFieldType::Struct {
                        decl: symbols.structs[found.index].decl.clone(),
                        required,
                    })
                }
                SymbolKind::Table => {
                    reject_default(default, ctx)?;
                    let target = &symbols.tables[found.index];
                    Ok(TableFieldType::Table {
                        name: target.namespace.qualify(&target.decl.ident),
                        required,
                    })
                }
                SymbolKind::Union => {
                    reject_default(default, ctx)?;
                    let target = &symbols.unions[found.index];
                    Ok(TableFieldType::Union {
                        name: target.namespace.qualify(&target.decl.ident),
                        required,
                    })
                }
            }
        }
        _ => unreachable!("integer primitives handled above"),
    }
}

fn vector_element(
    symbols: &StructsValidated,
    namespace: &Namespace,
    inner: &Type,
    ctx: &Context,
) -> SemanticResult<VectorElement> {
    if let Some(int) = IntType::from_type(inner) {
        return Ok(VectorElement::Int(int));
    }
    match inner {
        Type::Float => Ok(VectorElement::Float),
        Type::Double => Ok(VectorElement::Double),
        Type::Bool => Ok(VectorElement::Bool),
        Type::String => Ok(VectorElement::String),
        Type::Vector(_) => Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::InvalidVectorElement {
                ty: inner.to_string(),
            },
        )),
        Type::Named(reference) => {
            let found = resolve(symbols, namespace, reference)
                .map_err(|kind| SchemaError::new(ctx.clone(), kind))?;
            Ok(match found.kind {
                SymbolKind::Enum => {
                    VectorElement::Enum(symbols.enums[found.index].decl.clone())
                }
                SymbolKind::Struct => {
                    VectorElement::Struct(symbols.structs[found.index].decl.clone())
                }
                SymbolKind::Table => {
                    let target = &symbols.tables[found.index];
                    VectorElement::Table(target.namespace.qualify(&target.decl.ident))
                }
                SymbolKind::Union => {
                    let target = &symbols.unions[found.index];
                    VectorElement::Union(target.namespace.qualify(&target.decl.ident))
                }
            })
        }
        _ => unreachable!("integer primitives handled above"),
    }
}

fn reject_required(required: bool, ctx: &Context) -> SemanticResult<()> {
    if required {
        return Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::RequiredOnScalar,
        ));
    }
    Ok(())
}

fn reject_default(default: Option<&Literal>, ctx: &Context) -> SemanticResult<()> {
    if default.is_some() {
        return Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::DefaultOnNonScalar,
        ));
    }
    Ok(())
}

fn int_default(
    int: IntType,
    default: Option<&Literal>,
    ctx: &Context,
) -> SemanticResult<i128> {
    match default {
        None => Ok(0),
        Some(Literal::Int(v)) => {
            if !int.contains(*v) {
                return Err(SchemaError::new(
                    ctx.clone(),
                    SchemaErrorKind::OutOfRange {
                        value: *v,
                        ty: int.name(),
                    },
                ));
            }
            Ok(*v)
        }
        Some(_) => Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::DefaultTypeMismatch {
                field_ty: int.name().into(),
                expected: "an integer",
            },
        )),
    }
}

fn number_default(
    default: Option<&Literal>,
    field_ty: &'static str,
    ctx: &Context,
) -> SemanticResult<f64> {
    match default {
        None => Ok(0.0),
        Some(Literal::Float(f)) => Ok(*f),
        Some(Literal::Int(v)) => Ok(*v as f64),
        Some(_) => Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::DefaultTypeMismatch {
                field_ty: field_ty.into(),
                expected: "a number",
            },
        )),
    }
}

/// Resolves an enum field's default to a variant identifier. Absent
/// defaults fall back to the variant with value 0.
fn enum_default(
    decl: &Enum,
    default: Option<&Literal>,
    ctx: &Context,
) -> SemanticResult<String> {
    match default {
        None => decl
            .zero_variant()
            .map(|v| v.ident.clone())
            .ok_or_else(|| SchemaError::new(ctx.clone(), SchemaErrorKind::NoZeroVariant)),
        Some(Literal::Int(value)) => decl
            .variant_with_value(*value)
            .map(|v| v.ident.clone())
            .ok_or_else(|| {
                SchemaError::new(
                    ctx.clone(),
                    SchemaErrorKind::UnknownDefaultVariant {
                        value: value.to_string(),
                    },
                )
            }),
        Some(Literal::Ident(name)) => {
            if decl.variant_value(name).is_some() {
                Ok(name.clone())
            } else {
                Err(SchemaError::new(
                    ctx.clone(),
                    SchemaErrorKind::UnknownDefaultVariant {
                        value: name.clone(),
                    },
                ))
            }
        }
        Some(_) => Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::DefaultTypeMismatch {
                field_ty: decl.ident.clone(),
                expected: "a variant name or value",
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Metadata, Reference, UnionDecl};
    use super::super::validated::EnumVariant;

    fn field(ident: &str, ty: Type) -> TableFieldDecl {
        TableFieldDecl {
            ident: ident.into(),
            ty,
            default: None,
            metadata: Metadata::default(),
        }
    }

    fn field_with_id(ident: &str, ty: Type, id: i128) -> TableFieldDecl {
        let mut f = field(ident, ty);
        f.metadata = Metadata::new(vec![("id".into(), Some(Literal::Int(id)))]);
        f
    }

    fn table_decl(fields: Vec<TableFieldDecl>) -> TableDecl {
        TableDecl {
            ident: "T".into(),
            metadata: Metadata::default(),
            fields,
        }
    }

    fn symbols_with(tables: Vec<TableDecl>) -> StructsValidated {
        StructsValidated {
            enums: Vec::new(),
            structs: Vec::new(),
            tables: tables
                .into_iter()
                .map(|decl| Symbol::new(Namespace::root(), decl))
                .collect(),
            unions: vec![Symbol::new(
                Namespace::root(),
                UnionDecl {
                    ident: "Any".into(),
                    metadata: Metadata::default(),
                    variants: Vec::new(),
                },
            )],
        }
    }

    fn color() -> Enum {
        Enum {
            ident: "Color".into(),
            underlying: IntType::UInt8,
            variants: vec![
                EnumVariant {
                    ident: "Red".into(),
                    value: 0,
                },
                EnumVariant {
                    ident: "Blue".into(),
                    value: 5,
                },
            ],
        }
    }

    #[test]
    fn test_slots_assigned_in_source_order() {
        let symbols = symbols_with(vec![table_decl(vec![
            field("x", Type::Int32),
            field("y", Type::String),
        ])]);
        let out = validate_tables(&symbols).unwrap();
        let slots: Vec<u16> = out[0].decl.fields.iter().map(|f| f.slot).collect();
        assert_eq!(slots, vec![0, 1]);
    }

    #[test]
    fn test_union_field_skips_type_slot() {
        let symbols = symbols_with(vec![table_decl(vec![
            field("u", Type::Named(Reference::plain("Any"))),
            field("x", Type::Int32),
        ])]);
        let out = validate_tables(&symbols).unwrap();
        let slots: Vec<u16> = out[0].decl.fields.iter().map(|f| f.slot).collect();
        // The union value sits at slot 1 (type byte at 0); x follows.
        assert_eq!(slots, vec![1, 2]);
    }

    #[test]
    fn test_explicit_ids_reordered() {
        let symbols = symbols_with(vec![table_decl(vec![
            field_with_id("b", Type::Int32, 1),
            field_with_id("a", Type::Int32, 0),
        ])]);
        let out = validate_tables(&symbols).unwrap();
        let order: Vec<&str> = out[0]
            .decl
            .fields
            .iter()
            .map(|f| f.ident.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_explicit_union_id_must_skip_type_slot() {
        // A lone union field takes the pair of slots [0, 1]: type byte
        // at 0, value at 1. Its explicit id is the value slot, so 0 is
        // one short.
        let symbols = symbols_with(vec![table_decl(vec![field_with_id(
            "u",
            Type::Named(Reference::plain("Any")),
            0,
        )])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::UnionIdGap {
                expected: 1,
                found: 0
            }
        ));
    }

    #[test]
    fn test_explicit_union_id_accepted_at_value_slot() {
        let symbols = symbols_with(vec![table_decl(vec![field_with_id(
            "u",
            Type::Named(Reference::plain("Any")),
            1,
        )])]);
        let out = validate_tables(&symbols).unwrap();
        assert_eq!(out[0].decl.fields[0].slot, 1);
    }

    #[test]
    fn test_explicit_union_gap_accepted() {
        let symbols = symbols_with(vec![table_decl(vec![
            field_with_id("x", Type::Int32, 0),
            field_with_id("u", Type::Named(Reference::plain("Any")), 2),
        ])]);
        let out = validate_tables(&symbols).unwrap();
        let slots: Vec<u16> = out[0].decl.fields.iter().map(|f| f.slot).collect();
        assert_eq!(slots, vec![0, 2]);
    }

    #[test]
    fn test_partial_ids_rejected() {
        let symbols = symbols_with(vec![table_decl(vec![
            field_with_id("a", Type::Int32, 0),
            field("b", Type::Int32),
        ])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(err.kind(), SchemaErrorKind::PartialIds));
    }

    #[test]
    fn test_id_hole_rejected() {
        let symbols = symbols_with(vec![table_decl(vec![
            field_with_id("a", Type::Int32, 0),
            field_with_id("b", Type::Int32, 2),
        ])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::NonContiguousIds {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let symbols = symbols_with(vec![table_decl(vec![
            field("x", Type::Int32),
            field("x", Type::Int64),
        ])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::DuplicateIdentifiers { .. }
        ));
    }

    #[test]
    fn test_required_on_scalar_rejected() {
        let mut f = field("x", Type::Int32);
        f.metadata = Metadata::new(vec![("required".into(), None)]);
        let symbols = symbols_with(vec![table_decl(vec![f])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(err.kind(), SchemaErrorKind::RequiredOnScalar));
        assert_eq!(err.context().as_str(), "T.x");
    }

    #[test]
    fn test_required_string_accepted() {
        let mut f = field("y", Type::String);
        f.metadata = Metadata::new(vec![("required".into(), None)]);
        let symbols = symbols_with(vec![table_decl(vec![f])]);
        let out = validate_tables(&symbols).unwrap();
        assert!(out[0].decl.fields[0].ty.is_required());
    }

    #[test]
    fn test_default_on_string_rejected() {
        let mut f = field("y", Type::String);
        f.default = Some(Literal::Str("hi".into()));
        let symbols = symbols_with(vec![table_decl(vec![f])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(err.kind(), SchemaErrorKind::DefaultOnNonScalar));
    }

    #[test]
    fn test_int_default_range_checked() {
        let mut f = field("x", Type::UInt8);
        f.default = Some(Literal::Int(300));
        let symbols = symbols_with(vec![table_decl(vec![f])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::OutOfRange {
                value: 300,
                ty: "uint8"
            }
        ));
    }

    #[test]
    fn test_int_default_stored() {
        let mut f = field("x", Type::Int32);
        f.default = Some(Literal::Int(-7));
        let symbols = symbols_with(vec![table_decl(vec![f])]);
        let out = validate_tables(&symbols).unwrap();
        assert!(matches!(
            out[0].decl.fields[0].ty,
            TableFieldType::Int {
                ty: IntType::Int32,
                default: -7
            }
        ));
    }

    #[test]
    fn test_float_default_accepts_integer_literal() {
        let mut f = field("x", Type::Double);
        f.default = Some(Literal::Int(3));
        let symbols = symbols_with(vec![table_decl(vec![f])]);
        let out = validate_tables(&symbols).unwrap();
        assert!(matches!(
            out[0].decl.fields[0].ty,
            TableFieldType::Double { default } if default == 3.0
        ));
    }

    fn symbols_with_enum(fields: Vec<TableFieldDecl>) -> StructsValidated {
        let mut symbols = symbols_with(vec![table_decl(fields)]);
        symbols
            .enums
            .push(Symbol::new(Namespace::root(), color()));
        symbols
    }

    #[test]
    fn test_enum_default_by_name() {
        let mut f = field("c", Type::Named(Reference::plain("Color")));
        f.default = Some(Literal::Ident("Blue".into()));
        let symbols = symbols_with_enum(vec![f]);
        let out = validate_tables(&symbols).unwrap();
        assert!(matches!(
            &out[0].decl.fields[0].ty,
            TableFieldType::Enum { default, .. } if default == "Blue"
        ));
    }

    #[test]
    fn test_enum_default_by_value() {
        let mut f = field("c", Type::Named(Reference::plain("Color")));
        f.default = Some(Literal::Int(5));
        let symbols = symbols_with_enum(vec![f]);
        let out = validate_tables(&symbols).unwrap();
        assert!(matches!(
            &out[0].decl.fields[0].ty,
            TableFieldType::Enum { default, .. } if default == "Blue"
        ));
    }

    #[test]
    fn test_enum_default_unknown_value_rejected() {
        let mut f = field("c", Type::Named(Reference::plain("Color")));
        f.default = Some(Literal::Int(3));
        let symbols = symbols_with_enum(vec![f]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::UnknownDefaultVariant { value } if value == "3"
        ));
    }

    #[test]
    fn test_enum_without_zero_needs_explicit_default() {
        let shifted = Enum {
            ident: "Shifted".into(),
            underlying: IntType::UInt8,
            variants: vec![EnumVariant {
                ident: "One".into(),
                value: 1,
            }],
        };
        let mut symbols =
            symbols_with(vec![table_decl(vec![field(
                "c",
                Type::Named(Reference::plain("Shifted")),
            )])]);
        symbols.enums.push(Symbol::new(Namespace::root(), shifted));
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(err.kind(), SchemaErrorKind::NoZeroVariant));
    }

    #[test]
    fn test_implicit_enum_default_is_zero_variant() {
        let f = field("c", Type::Named(Reference::plain("Color")));
        let symbols = symbols_with_enum(vec![f]);
        let out = validate_tables(&symbols).unwrap();
        assert!(matches!(
            &out[0].decl.fields[0].ty,
            TableFieldType::Enum { default, .. } if default == "Red"
        ));
    }

    #[test]
    fn test_vector_of_vector_rejected() {
        let f = field(
            "vv",
            Type::Vector(Box::new(Type::Vector(Box::new(Type::Int32)))),
        );
        let symbols = symbols_with(vec![table_decl(vec![f])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::InvalidVectorElement { .. }
        ));
    }

    #[test]
    fn test_vector_of_union_takes_two_slots() {
        let symbols = symbols_with(vec![table_decl(vec![
            field("us", Type::Vector(Box::new(Type::Named(Reference::plain("Any"))))),
            field("x", Type::Int32),
        ])]);
        let out = validate_tables(&symbols).unwrap();
        let slots: Vec<u16> = out[0].decl.fields.iter().map(|f| f.slot).collect();
        assert_eq!(slots, vec![1, 2]);
    }

    #[test]
    fn test_unknown_type_reported_with_searched_namespaces() {
        let symbols = symbols_with(vec![table_decl(vec![field(
            "m",
            Type::Named(Reference::plain("Missing")),
        )])]);
        let err = validate_tables(&symbols).unwrap_err();
        assert!(matches!(err.kind(), SchemaErrorKind::TypeNotFound { .. }));
    }

    #[test]
    fn test_deprecated_field_keeps_slot() {
        let mut f = field("old", Type::Int32);
        f.metadata = Metadata::new(vec![("deprecated".into(), None)]);
        let symbols = symbols_with(vec![table_decl(vec![f, field("new", Type::Int32)])]);
        let out = validate_tables(&symbols).unwrap();
        assert!(out[0].decl.fields[0].deprecated);
        assert_eq!(out[0].decl.fields[1].slot, 1);
    }
}

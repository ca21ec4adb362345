//! Semantic validation of a loaded schema tree
//!
//! Four ordered passes refine the raw symbol table cell by cell:
//! enums first (bounds and sequencing), then structs (cycles and
//! layout), then tables (types, defaults, slots), then unions
//! (membership and tags). The order is load-bearing: struct layout
//! needs validated enums, table fields need validated structs, and
//! union variants need validated tables.
//!
//! The validator is pure. Given the same file tree it produces the
//! same validated schema or the same first error, and it performs no
//! I/O.

mod enums;
mod errors;
mod resolve;
mod structs;
mod symbols;
mod tables;
mod unions;
pub mod validated;

pub use errors::{Context, SchemaError, SchemaErrorKind, SemanticResult};
pub use resolve::{SymbolKind, SymbolRef};
pub use symbols::{Named, SchemaMeta, Symbol, SymbolTable};

use serde::Serialize;

use crate::schema::{FileTree, Metadata, QualifiedName, Schema};
use crate::wire::FILE_IDENTIFIER_LEN;

use resolve::resolve;
use validated::{Enum, Struct, Table, Union};

/// The fully validated schema: every name resolved, every layout
/// computed, ready for a code generator to consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedSchema {
    pub enums: Vec<Symbol<Enum>>,
    pub structs: Vec<Symbol<Struct>>,
    pub tables: Vec<Symbol<Table>>,
    pub unions: Vec<Symbol<Union>>,
    /// The declared root table, if any.
    pub root_type: Option<QualifiedName>,
    pub file_identifier: Option<[u8; 4]>,
    pub file_extension: Option<String>,
    /// User attribute names declared in the tree.
    pub attributes: Vec<String>,
}

/// Attributes with built-in meaning; anything else must be declared.
const BUILTIN_ATTRIBUTES: [&str; 5] = ["id", "deprecated", "required", "force_align", "bit_flags"];

/// Runs the full validation pipeline over a loaded file tree.
pub fn validate(tree: &FileTree<Schema>) -> SemanticResult<ValidatedSchema> {
    let (raw, meta) = symbols::gather(tree)?;
    check_attribute_usage(&raw, &meta.attributes)?;

    let mut enums = Vec::with_capacity(raw.enums.len());
    for symbol in &raw.enums {
        enums.push(Symbol::new(
            symbol.namespace.clone(),
            enums::validate_enum(&symbol.namespace, &symbol.decl)?,
        ));
    }
    let after_enums = raw.with_enums(enums);
    tracing::debug!(count = after_enums.enums.len(), "enum pass complete");

    let structs = structs::validate_structs(&after_enums)?;
    let after_structs = after_enums.with_structs(structs);
    tracing::debug!(count = after_structs.structs.len(), "struct pass complete");

    let tables = tables::validate_tables(&after_structs)?;
    let after_tables = after_structs.with_tables(tables);
    tracing::debug!(count = after_tables.tables.len(), "table pass complete");

    let unions = unions::validate_unions(&after_tables)?;
    tracing::debug!(count = unions.len(), "union pass complete");

    let root_type = match &meta.root_type {
        Some((namespace, reference)) => {
            let found = resolve(&after_tables, namespace, reference)
                .map_err(|kind| SchemaError::new(Context::root(), kind))?;
            if found.kind != SymbolKind::Table {
                return Err(SchemaError::new(
                    Context::root(),
                    SchemaErrorKind::RootTypeNotTable {
                        reference: reference.to_string(),
                    },
                ));
            }
            let target = &after_tables.tables[found.index];
            Some(target.namespace.qualify(&target.decl.ident))
        }
        None => None,
    };

    let file_identifier = meta
        .file_identifier
        .as_deref()
        .map(check_file_identifier)
        .transpose()?;

    Ok(ValidatedSchema {
        enums: after_tables.enums,
        structs: after_tables.structs,
        tables: after_tables.tables,
        unions,
        root_type,
        file_identifier,
        file_extension: meta.file_extension,
        attributes: meta.attributes,
    })
}

fn check_file_identifier(value: &str) -> SemanticResult<[u8; 4]> {
    let bytes = value.as_bytes();
    if bytes.len() != FILE_IDENTIFIER_LEN || !bytes.iter().all(u8::is_ascii) {
        return Err(SchemaError::new(
            Context::root(),
            SchemaErrorKind::InvalidFileIdentifier {
                value: value.to_string(),
            },
        ));
    }
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Every attribute key used anywhere must be a built-in or declared
/// via an `attribute` declaration.
fn check_attribute_usage(
    raw: &symbols::RawSymbols,
    declared: &[String],
) -> SemanticResult<()> {
    let known = |name: &str| {
        BUILTIN_ATTRIBUTES.contains(&name) || declared.iter().any(|d| d == name)
    };
    let check = |metadata: &Metadata, ctx: Context| -> SemanticResult<()> {
        for (name, _) in metadata.entries() {
            if !known(name) {
                return Err(SchemaError::new(
                    ctx.clone(),
                    SchemaErrorKind::UnknownAttribute { name: name.clone() },
                ));
            }
        }
        Ok(())
    };

    for symbol in &raw.enums {
        let ctx = Context::namespace(&symbol.namespace).child(&symbol.decl.ident);
        check(&symbol.decl.metadata, ctx)?;
    }
    for symbol in &raw.structs {
        let ctx = Context::namespace(&symbol.namespace).child(&symbol.decl.ident);
        check(&symbol.decl.metadata, ctx.clone())?;
        for field in &symbol.decl.fields {
            check(&field.metadata, ctx.child(&field.ident))?;
        }
    }
    for symbol in &raw.tables {
        let ctx = Context::namespace(&symbol.namespace).child(&symbol.decl.ident);
        check(&symbol.decl.metadata, ctx.clone())?;
        for field in &symbol.decl.fields {
            check(&field.metadata, ctx.child(&field.ident))?;
        }
    }
    for symbol in &raw.unions {
        let ctx = Context::namespace(&symbol.namespace).child(&symbol.decl.ident);
        check(&symbol.decl.metadata, ctx)?;
    }
    Ok(())
}

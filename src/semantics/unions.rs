//! Union validation
//!
//! Every variant must resolve to a table. Tag 0 is reserved for the
//! implicit NONE variant; declared variants take tags 1, 2, … in
//! declaration order.

use crate::schema::UnionDecl;

use super::enums::check_duplicate_idents;
use super::errors::{Context, SchemaError, SchemaErrorKind, SemanticResult};
use super::resolve::{resolve, SymbolKind};
use super::symbols::{Symbol, TablesValidated};
use super::validated::{Union, UnionVariant};

/// Validates every union in the symbol table, preserving order.
pub fn validate_unions(symbols: &TablesValidated) -> SemanticResult<Vec<Symbol<Union>>> {
    let mut out = Vec::with_capacity(symbols.unions.len());
    for symbol in &symbols.unions {
        let validated = validate_union(symbols, symbol)?;
        out.push(Symbol::new(symbol.namespace.clone(), validated));
    }
    Ok(out)
}

fn validate_union(
    symbols: &TablesValidated,
    symbol: &Symbol<UnionDecl>,
) -> SemanticResult<Union> {
    let ctx = Context::namespace(&symbol.namespace).child(&symbol.decl.ident);
    let decl = &symbol.decl;

    if decl.variants.is_empty() {
        return Err(SchemaError::new(
            ctx,
            SchemaErrorKind::Empty { what: "variant" },
        ));
    }
    // Tags are a single byte and 0 is NONE.
    if decl.variants.len() > u8::MAX as usize {
        return Err(SchemaError::new(
            ctx,
            SchemaErrorKind::OutOfRange {
                value: decl.variants.len() as i128,
                ty: "uint8",
            },
        ));
    }

    let mut variants = Vec::with_capacity(decl.variants.len());
    for (index, variant) in decl.variants.iter().enumerate() {
        let found = resolve(symbols, &symbol.namespace, &variant.ty)
            .map_err(|kind| SchemaError::new(ctx.clone(), kind))?;
        if found.kind != SymbolKind::Table {
            return Err(SchemaError::new(
                ctx.clone(),
                SchemaErrorKind::UnionOfNonTable {
                    reference: variant.ty.to_string(),
                },
            ));
        }

        let target = &symbols.tables[found.index];
        let table = target.namespace.qualify(&target.decl.ident);
        let ident = match &variant.ident {
            Some(explicit) => explicit.clone(),
            None => table.to_string().replace('.', "_"),
        };

        variants.push(UnionVariant {
            ident,
            table,
            tag: (index + 1) as u8,
        });
    }

    // NONE participates in the uniqueness check alongside the
    // declared variants.
    check_duplicate_idents(
        &ctx,
        std::iter::once("NONE").chain(variants.iter().map(|v| v.ident.as_str())),
    )?;

    Ok(Union {
        ident: decl.ident.clone(),
        variants,
    })
}

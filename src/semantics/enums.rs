//! Enum validation
//!
//! Variant values are threaded left to right: an explicit literal
//! takes effect, an implicit variant continues from the previous
//! value, and the first variant defaults to 0. The result must be
//! strictly ascending and fit the underlying type.

use std::collections::HashSet;

use crate::schema::{EnumDecl, Namespace};

use super::errors::{Context, SchemaError, SchemaErrorKind, SemanticResult};
use super::validated::{Enum, EnumVariant, IntType};

pub fn validate_enum(namespace: &Namespace, decl: &EnumDecl) -> SemanticResult<Enum> {
    let ctx = Context::namespace(namespace).child(&decl.ident);

    let underlying = IntType::from_type(&decl.underlying).ok_or_else(|| {
        SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::InvalidUnderlyingType {
                ty: decl.underlying.to_string(),
            },
        )
    })?;

    if decl.metadata.has("bit_flags") {
        return Err(SchemaError::new(
            ctx,
            SchemaErrorKind::BitFlagsUnsupported,
        ));
    }

    if decl.variants.is_empty() {
        return Err(SchemaError::new(
            ctx,
            SchemaErrorKind::Empty { what: "variant" },
        ));
    }

    check_duplicate_idents(&ctx, decl.variants.iter().map(|v| v.ident.as_str()))?;

    let mut variants = Vec::with_capacity(decl.variants.len());
    let mut last: Option<i128> = None;
    for variant in &decl.variants {
        let variant_ctx = ctx.child(&variant.ident);
        let value = match variant.value {
            Some(explicit) => explicit,
            None => match last {
                Some(previous) => previous + 1,
                None => 0,
            },
        };

        if let Some(previous) = last {
            if value <= previous {
                return Err(SchemaError::new(
                    variant_ctx,
                    SchemaErrorKind::NotAscending { previous, value },
                ));
            }
        }
        if !underlying.contains(value) {
            return Err(SchemaError::new(
                variant_ctx,
                SchemaErrorKind::OutOfRange {
                    value,
                    ty: underlying.name(),
                },
            ));
        }

        variants.push(EnumVariant {
            ident: variant.ident.clone(),
            value,
        });
        last = Some(value);
    }

    Ok(Enum {
        ident: decl.ident.clone(),
        underlying,
        variants,
    })
}

/// Collects every identifier that occurs more than once, preserving
/// first-occurrence order.
pub(super) fn check_duplicate_idents<'a>(
    ctx: &Context,
    idents: impl Iterator<Item = &'a str>,
) -> SemanticResult<()> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for ident in idents {
        if !seen.insert(ident) && !duplicates.contains(&ident.to_string()) {
            duplicates.push(ident.to_string());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::new(
            ctx.clone(),
            SchemaErrorKind::DuplicateIdentifiers { idents: duplicates },
        ))
    }
}

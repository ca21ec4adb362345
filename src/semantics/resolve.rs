//! Cross-namespace type reference resolution
//!
//! A reference `P.Q.X` written inside namespace `a.b.c` is searched
//! in `a.b.c.P.Q`, `a.b.P.Q`, `a.P.Q` and `P.Q`, in that order. Within
//! each candidate namespace, enums are searched first, then structs,
//! tables and unions. The first match wins.

use crate::schema::{Namespace, Reference};

use super::errors::SchemaErrorKind;
use super::symbols::{Named, SymbolTable};

/// Which of the four symbol lists a reference resolved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Enum,
    Struct,
    Table,
    Union,
}

/// A resolved reference: the list it hit and the index within it.
/// Indices are stable across validation stages, so a reference
/// resolved against a raw table still points at the right symbol
/// after refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolRef {
    pub kind: SymbolKind,
    pub index: usize,
}

/// Resolves `reference` as seen from `current`. On failure, the error
/// lists every namespace that was searched.
pub fn resolve<E, S, T, U>(
    symbols: &SymbolTable<E, S, T, U>,
    current: &Namespace,
    reference: &Reference,
) -> Result<SymbolRef, SchemaErrorKind>
where
    E: Named,
    S: Named,
    T: Named,
    U: Named,
{
    let mut searched = Vec::new();

    for prefix in current.prefixes() {
        let candidate = prefix.join(&reference.path);
        if let Some(found) = lookup(symbols, &candidate, &reference.ident) {
            return Ok(found);
        }
        searched.push(candidate.to_string());
    }

    Err(SchemaErrorKind::TypeNotFound {
        reference: reference.to_string(),
        searched,
    })
}

fn lookup<E, S, T, U>(
    symbols: &SymbolTable<E, S, T, U>,
    namespace: &Namespace,
    ident: &str,
) -> Option<SymbolRef>
where
    E: Named,
    S: Named,
    T: Named,
    U: Named,
{
    fn find<D: Named>(list: &[super::symbols::Symbol<D>], ns: &Namespace, ident: &str) -> Option<usize> {
        list.iter()
            .position(|s| s.namespace == *ns && s.decl.ident() == ident)
    }

    if let Some(index) = find(&symbols.enums, namespace, ident) {
        return Some(SymbolRef {
            kind: SymbolKind::Enum,
            index,
        });
    }
    if let Some(index) = find(&symbols.structs, namespace, ident) {
        return Some(SymbolRef {
            kind: SymbolKind::Struct,
            index,
        });
    }
    if let Some(index) = find(&symbols.tables, namespace, ident) {
        return Some(SymbolRef {
            kind: SymbolKind::Table,
            index,
        });
    }
    if let Some(index) = find(&symbols.unions, namespace, ident) {
        return Some(SymbolRef {
            kind: SymbolKind::Union,
            index,
        });
    }
    None
}

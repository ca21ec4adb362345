//! Symbol table shared by the validation passes
//!
//! Four lists (enums, structs, tables, unions), each carrying the
//! declaring namespace next to the declaration. The four type
//! parameters are refined pass by pass (raw declaration in, validated
//! type out), so a half-validated table is unrepresentable.

use serde::Serialize;
use std::collections::HashSet;

use crate::schema::{
    Declaration, EnumDecl, FileTree, Namespace, Reference, Schema, StructDecl, TableDecl,
    UnionDecl,
};

use super::errors::{Context, SchemaError, SchemaErrorKind, SemanticResult};
use super::validated;

/// A declaration paired with the namespace it was declared in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol<D> {
    pub namespace: Namespace,
    pub decl: D,
}

impl<D> Symbol<D> {
    pub fn new(namespace: Namespace, decl: D) -> Self {
        Symbol { namespace, decl }
    }
}

/// Anything that can be looked up by identifier.
pub trait Named {
    fn ident(&self) -> &str;
}

impl Named for EnumDecl {
    fn ident(&self) -> &str {
        &self.ident
    }
}

impl Named for StructDecl {
    fn ident(&self) -> &str {
        &self.ident
    }
}

impl Named for TableDecl {
    fn ident(&self) -> &str {
        &self.ident
    }
}

impl Named for UnionDecl {
    fn ident(&self) -> &str {
        &self.ident
    }
}

impl Named for validated::Enum {
    fn ident(&self) -> &str {
        &self.ident
    }
}

impl Named for validated::Struct {
    fn ident(&self) -> &str {
        &self.ident
    }
}

impl Named for validated::Table {
    fn ident(&self) -> &str {
        &self.ident
    }
}

impl Named for validated::Union {
    fn ident(&self) -> &str {
        &self.ident
    }
}

/// The four symbol lists at one validation stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable<E, S, T, U> {
    pub enums: Vec<Symbol<E>>,
    pub structs: Vec<Symbol<S>>,
    pub tables: Vec<Symbol<T>>,
    pub unions: Vec<Symbol<U>>,
}

/// Everything still raw, as gathered from the file tree.
pub type RawSymbols = SymbolTable<EnumDecl, StructDecl, TableDecl, UnionDecl>;
/// After the enum pass.
pub type EnumsValidated = SymbolTable<validated::Enum, StructDecl, TableDecl, UnionDecl>;
/// After the struct pass.
pub type StructsValidated = SymbolTable<validated::Enum, validated::Struct, TableDecl, UnionDecl>;
/// After the table pass.
pub type TablesValidated =
    SymbolTable<validated::Enum, validated::Struct, validated::Table, UnionDecl>;

impl<E, S, T, U> SymbolTable<E, S, T, U> {
    /// Replaces the enum cell, refining the table to the next stage.
    pub fn with_enums<E2>(self, enums: Vec<Symbol<E2>>) -> SymbolTable<E2, S, T, U> {
        SymbolTable {
            enums,
            structs: self.structs,
            tables: self.tables,
            unions: self.unions,
        }
    }

    pub fn with_structs<S2>(self, structs: Vec<Symbol<S2>>) -> SymbolTable<E, S2, T, U> {
        SymbolTable {
            enums: self.enums,
            structs,
            tables: self.tables,
            unions: self.unions,
        }
    }

    pub fn with_tables<T2>(self, tables: Vec<Symbol<T2>>) -> SymbolTable<E, S, T2, U> {
        SymbolTable {
            enums: self.enums,
            structs: self.structs,
            tables,
            unions: self.unions,
        }
    }

    pub fn with_unions<U2>(self, unions: Vec<Symbol<U2>>) -> SymbolTable<E, S, T, U2> {
        SymbolTable {
            enums: self.enums,
            structs: self.structs,
            tables: self.tables,
            unions,
        }
    }
}

/// Schema-level declarations gathered alongside the symbols.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMeta {
    pub root_type: Option<(Namespace, Reference)>,
    pub file_identifier: Option<String>,
    pub file_extension: Option<String>,
    /// User attribute names declared anywhere in the tree.
    pub attributes: Vec<String>,
}

/// Walks the file tree once, threading the positional namespace, and
/// splits declarations into the four symbol lists plus schema-level
/// metadata. Duplicate type declarations are rejected here.
pub fn gather(tree: &FileTree<Schema>) -> SemanticResult<(RawSymbols, SchemaMeta)> {
    let mut symbols = RawSymbols {
        enums: Vec::new(),
        structs: Vec::new(),
        tables: Vec::new(),
        unions: Vec::new(),
    };
    let mut meta = SchemaMeta::default();
    let mut seen = HashSet::new();

    for (_path, schema) in tree.iter() {
        let mut namespace = Namespace::root();
        for declaration in &schema.declarations {
            match declaration {
                Declaration::Namespace(ns) => namespace = ns.clone(),
                Declaration::Enum(decl) => {
                    check_unique(&mut seen, &namespace, &decl.ident)?;
                    symbols.enums.push(Symbol::new(namespace.clone(), decl.clone()));
                }
                Declaration::Struct(decl) => {
                    check_unique(&mut seen, &namespace, &decl.ident)?;
                    symbols
                        .structs
                        .push(Symbol::new(namespace.clone(), decl.clone()));
                }
                Declaration::Table(decl) => {
                    check_unique(&mut seen, &namespace, &decl.ident)?;
                    symbols
                        .tables
                        .push(Symbol::new(namespace.clone(), decl.clone()));
                }
                Declaration::Union(decl) => {
                    check_unique(&mut seen, &namespace, &decl.ident)?;
                    symbols
                        .unions
                        .push(Symbol::new(namespace.clone(), decl.clone()));
                }
                Declaration::RootType(reference) => {
                    if meta.root_type.is_some() {
                        return Err(duplicate_meta("root_type"));
                    }
                    meta.root_type = Some((namespace.clone(), reference.clone()));
                }
                Declaration::FileIdentifier(value) => {
                    if meta.file_identifier.is_some() {
                        return Err(duplicate_meta("file_identifier"));
                    }
                    meta.file_identifier = Some(value.clone());
                }
                Declaration::FileExtension(value) => {
                    if meta.file_extension.is_some() {
                        return Err(duplicate_meta("file_extension"));
                    }
                    meta.file_extension = Some(value.clone());
                }
                Declaration::Attribute(name) => {
                    if !meta.attributes.contains(name) {
                        meta.attributes.push(name.clone());
                    }
                }
            }
        }
    }

    Ok((symbols, meta))
}

fn check_unique(
    seen: &mut HashSet<String>,
    namespace: &Namespace,
    ident: &str,
) -> SemanticResult<()> {
    let qualified = namespace.qualify(ident).to_string();
    if !seen.insert(qualified.clone()) {
        return Err(SchemaError::new(
            Context::namespace(namespace),
            SchemaErrorKind::DuplicateDeclaration { name: qualified },
        ));
    }
    Ok(())
}

fn duplicate_meta(what: &str) -> SchemaError {
    SchemaError::new(
        Context::root(),
        SchemaErrorKind::DuplicateDeclaration {
            name: what.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Metadata, TableDecl};
    use std::path::PathBuf;

    fn table(ident: &str) -> Declaration {
        Declaration::Table(TableDecl {
            ident: ident.into(),
            metadata: Metadata::default(),
            fields: Vec::new(),
        })
    }

    #[test]
    fn test_namespaces_are_positional() {
        let schema = Schema::new(
            Vec::new(),
            vec![
                table("RootTable"),
                Declaration::Namespace(Namespace::parse("a.b")),
                table("Nested"),
                Declaration::Namespace(Namespace::parse("c")),
                table("Other"),
            ],
        );
        let tree = FileTree::new(PathBuf::from("/mem/root.abs"), schema);
        let (symbols, _meta) = gather(&tree).unwrap();

        let namespaces: Vec<String> = symbols
            .tables
            .iter()
            .map(|s| s.namespace.to_string())
            .collect();
        assert_eq!(namespaces, vec!["", "a.b", "c"]);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let schema = Schema::new(Vec::new(), vec![table("T"), table("T")]);
        let tree = FileTree::new(PathBuf::from("/mem/root.abs"), schema);

        let err = gather(&tree).unwrap_err();
        assert!(matches!(
            err.kind(),
            SchemaErrorKind::DuplicateDeclaration { name } if name == "T"
        ));
    }

    #[test]
    fn test_same_ident_in_distinct_namespaces_is_fine() {
        let schema = Schema::new(
            Vec::new(),
            vec![
                table("T"),
                Declaration::Namespace(Namespace::parse("other")),
                table("T"),
            ],
        );
        let tree = FileTree::new(PathBuf::from("/mem/root.abs"), schema);
        assert!(gather(&tree).is_ok());
    }

    #[test]
    fn test_meta_declarations_collected() {
        let schema = Schema::new(
            Vec::new(),
            vec![
                Declaration::Attribute("priority".into()),
                Declaration::Namespace(Namespace::parse("game")),
                table("Monster"),
                Declaration::RootType(Reference::plain("Monster")),
                Declaration::FileIdentifier("MONS".into()),
                Declaration::FileExtension("mon".into()),
            ],
        );
        let tree = FileTree::new(PathBuf::from("/mem/root.abs"), schema);
        let (_symbols, meta) = gather(&tree).unwrap();

        assert_eq!(meta.attributes, vec!["priority".to_string()]);
        assert_eq!(meta.file_identifier.as_deref(), Some("MONS"));
        assert_eq!(meta.file_extension.as_deref(), Some("mon"));
        let (ns, reference) = meta.root_type.unwrap();
        assert_eq!(ns.to_string(), "game");
        assert_eq!(reference.ident, "Monster");
    }
}

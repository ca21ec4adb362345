//! Syntax model for parsed schema files
//!
//! These types are produced by an external parser and consumed by the
//! loader and the semantic validator. They mirror the source text as
//! written: nothing here is resolved, sized or checked.

use serde::Serialize;
use std::fmt;

/// An ordered sequence of identifier segments. The empty sequence is
/// the root namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Namespace(Vec<String>);

impl Namespace {
    /// The root namespace.
    pub fn root() -> Self {
        Namespace(Vec::new())
    }

    pub fn new(segments: Vec<String>) -> Self {
        Namespace(segments)
    }

    /// Builds a namespace from a dotted string such as `"a.b.c"`.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Namespace::root();
        }
        Namespace(dotted.split('.').map(str::to_string).collect())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns this namespace with `extra` segments appended.
    pub fn join(&self, extra: &[String]) -> Namespace {
        let mut segments = self.0.clone();
        segments.extend_from_slice(extra);
        Namespace(segments)
    }

    /// Enumerates this namespace and every prefix of it, longest
    /// first, ending with the root namespace.
    pub fn prefixes(&self) -> impl Iterator<Item = Namespace> + '_ {
        (0..=self.0.len())
            .rev()
            .map(move |n| Namespace(self.0[..n].to_vec()))
    }

    /// Qualifies `ident` with this namespace.
    pub fn qualify(&self, ident: &str) -> QualifiedName {
        QualifiedName {
            namespace: self.clone(),
            ident: ident.to_string(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A namespace plus an identifier, joined with `.` when displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    pub namespace: Namespace,
    pub ident: String,
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_root() {
            write!(f, "{}", self.ident)
        } else {
            write!(f, "{}.{}", self.namespace, self.ident)
        }
    }
}

/// A possibly-qualified reference to a declared type, as spelled in
/// the source (`Other.Type` keeps `path = ["Other"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Namespace segments written before the identifier; may be empty.
    pub path: Vec<String>,
    pub ident: String,
}

impl Reference {
    pub fn new(path: Vec<String>, ident: impl Into<String>) -> Self {
        Reference {
            path,
            ident: ident.into(),
        }
    }

    /// An unqualified reference.
    pub fn plain(ident: impl Into<String>) -> Self {
        Reference::new(Vec::new(), ident)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.path {
            write!(f, "{}.", segment)?;
        }
        write!(f, "{}", self.ident)
    }
}

/// A type expression as written in a field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Type {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Bool,
    String,
    /// `[T]`
    Vector(Box<Type>),
    /// A reference to an enum, struct, table or union.
    Named(Reference),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int8 => write!(f, "int8"),
            Type::Int16 => write!(f, "int16"),
            Type::Int32 => write!(f, "int32"),
            Type::Int64 => write!(f, "int64"),
            Type::UInt8 => write!(f, "uint8"),
            Type::UInt16 => write!(f, "uint16"),
            Type::UInt32 => write!(f, "uint32"),
            Type::UInt64 => write!(f, "uint64"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Vector(inner) => write!(f, "[{}]", inner),
            Type::Named(reference) => write!(f, "{}", reference),
        }
    }
}

/// A literal value attached to a default or an attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i128),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A bare identifier, used for enum-variant defaults.
    Ident(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Str(v) => write!(f, "{:?}", v),
            Literal::Ident(v) => write!(f, "{}", v),
        }
    }
}

/// Parenthesised key/value attributes attached to a declaration or a
/// field, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata(Vec<(String, Option<Literal>)>);

impl Metadata {
    pub fn new(entries: Vec<(String, Option<Literal>)>) -> Self {
        Metadata(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[(String, Option<Literal>)] {
        &self.0
    }

    /// True if the attribute is present, with or without a value.
    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// The attribute's value, if the attribute is present and carries
    /// one.
    pub fn value(&self, name: &str) -> Option<&Literal> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// The attribute's value as an integer, if it is one.
    pub fn int_value(&self, name: &str) -> Option<i128> {
        match self.value(name) {
            Some(Literal::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// One enum variant as written: `Name` or `Name = 3`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVariantDecl {
    pub ident: String,
    pub value: Option<i128>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDecl {
    pub ident: String,
    /// The declared underlying type; must name an integer primitive.
    pub underlying: Type,
    pub metadata: Metadata,
    pub variants: Vec<EnumVariantDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructFieldDecl {
    pub ident: String,
    pub ty: Type,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructDecl {
    pub ident: String,
    pub metadata: Metadata,
    pub fields: Vec<StructFieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFieldDecl {
    pub ident: String,
    pub ty: Type,
    pub default: Option<Literal>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDecl {
    pub ident: String,
    pub metadata: Metadata,
    pub fields: Vec<TableFieldDecl>,
}

/// One union variant: `A` or `A: Other.Type`. The identifier is
/// optional in source; the validator derives one from the referenced
/// type when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionVariantDecl {
    pub ident: Option<String>,
    pub ty: Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionDecl {
    pub ident: String,
    pub metadata: Metadata,
    pub variants: Vec<UnionVariantDecl>,
}

/// A top-level declaration. Namespace declarations are positional:
/// every declaration after one belongs to it until the next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Declaration {
    Namespace(Namespace),
    Enum(EnumDecl),
    Struct(StructDecl),
    Table(TableDecl),
    Union(UnionDecl),
    RootType(Reference),
    FileExtension(String),
    FileIdentifier(String),
    Attribute(String),
}

/// One parsed schema file: its include strings in declared order and
/// its declarations in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub includes: Vec<String>,
    pub declarations: Vec<Declaration>,
}

impl Schema {
    pub fn new(includes: Vec<String>, declarations: Vec<Declaration>) -> Self {
        Schema {
            includes,
            declarations,
        }
    }
}

//! Validator error types
//!
//! Every validation failure pairs a *kind* with the dotted context
//! path (`Namespace.Type.field`) the validator was working in when it
//! failed. The context prefixes the rendered message in brackets.

use std::fmt;
use thiserror::Error;

/// Result type for semantic validation.
pub type SemanticResult<T> = Result<T, SchemaError>;

/// The dotted path identifying where in the schema an error applies.
///
/// Contexts are cheap immutable values: passing one down a call and
/// extending it with [`Context::child`] never mutates the caller's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(String);

impl Context {
    /// The empty context.
    pub fn root() -> Self {
        Context(String::new())
    }

    /// A context rooted at a namespace (empty for the root namespace).
    pub fn namespace(ns: &crate::schema::Namespace) -> Self {
        Context(ns.to_string())
    }

    /// This context extended by one segment.
    pub fn child(&self, segment: &str) -> Context {
        if self.0.is_empty() {
            Context(segment.to_string())
        } else {
            Context(format!("{}.{}", self.0, segment))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaErrorKind {
    #[error("duplicate identifiers: {}", .idents.join(", "))]
    DuplicateIdentifiers { idents: Vec<String> },

    #[error("duplicate declaration of {name}")]
    DuplicateDeclaration { name: String },

    #[error("at least one {what} is required")]
    Empty { what: &'static str },

    #[error("enum underlying type must be an integer primitive, not {ty}")]
    InvalidUnderlyingType { ty: String },

    #[error("bit_flags enums are not supported")]
    BitFlagsUnsupported,

    #[error("values must be ascending: {value} follows {previous}")]
    NotAscending { previous: i128, value: i128 },

    #[error("value {value} is out of range for {ty}")]
    OutOfRange { value: i128, ty: &'static str },

    #[error("{ty} is not allowed in a struct field")]
    InvalidStructFieldType { ty: String },

    #[error("attribute \"{name}\" is not allowed on struct fields")]
    StructFieldAttribute { name: String },

    #[error("force_align {value} must be a power of two between {natural} and 16")]
    InvalidForceAlign { value: i128, natural: usize },

    #[error("cyclic dependency [{}]", .chain.join(" -> "))]
    CyclicStruct { chain: Vec<String> },

    #[error("type {reference} not found; searched namespaces: {}", format_namespaces(.searched))]
    TypeNotFound {
        reference: String,
        searched: Vec<String>,
    },

    #[error("union variant {reference} must refer to a table")]
    UnionOfNonTable { reference: String },

    #[error("attribute \"required\" is only allowed on non-scalar fields")]
    RequiredOnScalar,

    #[error("default values are only allowed on scalar, bool, float and enum fields")]
    DefaultOnNonScalar,

    #[error("default for a {field_ty} field must be {expected}")]
    DefaultTypeMismatch {
        field_ty: String,
        expected: &'static str,
    },

    #[error("default {value} does not name an enum variant")]
    UnknownDefaultVariant { value: String },

    #[error("enum has no variant with value 0; an explicit default is required")]
    NoZeroVariant,

    #[error("attribute \"id\" must be a non-negative integer")]
    InvalidId,

    #[error("either all fields carry an \"id\" attribute or none do")]
    PartialIds,

    #[error("field ids must be contiguous: expected {expected}, found {found}")]
    NonContiguousIds { expected: u32, found: u32 },

    #[error("union field id {found} must leave a free id for the type slot (expected {expected})")]
    UnionIdGap { expected: u32, found: u32 },

    #[error("vectors of {ty} are not supported")]
    InvalidVectorElement { ty: String },

    #[error("unknown attribute \"{name}\"; user attributes must be declared")]
    UnknownAttribute { name: String },

    #[error("root_type {reference} must be a table")]
    RootTypeNotTable { reference: String },

    #[error("file_identifier {value:?} must be exactly 4 ASCII characters")]
    InvalidFileIdentifier { value: String },
}

fn format_namespaces(searched: &[String]) -> String {
    let shown: Vec<&str> = searched
        .iter()
        .map(|ns| if ns.is_empty() { "<root>" } else { ns.as_str() })
        .collect();
    shown.join(", ")
}

/// A validation failure: a kind plus the context it occurred in.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    context: Context,
    kind: SchemaErrorKind,
}

impl SchemaError {
    pub fn new(context: Context, kind: SchemaErrorKind) -> Self {
        SchemaError { context, kind }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn kind(&self) -> &SchemaErrorKind {
        &self.kind
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "[{}]: {}", self.context, self.kind)
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

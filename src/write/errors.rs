//! Encode error types

use thiserror::Error;

/// Result type for encoding.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Errors surfaced while building a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A schema-required reference field was never pushed before the
    /// table was finished.
    #[error("missing required field {0}")]
    MissingRequired(String),
}

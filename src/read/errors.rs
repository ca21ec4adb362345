//! Decode error types

use thiserror::Error;

/// Result type for decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors surfaced while navigating an encoded buffer.
///
/// Unknown union tags are deliberately *not* an error; they decode to
/// a value so newer-schema buffers stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Truncation, an impossible offset, or a union type/value
    /// mismatch.
    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),

    /// A schema-required field was absent.
    #[error("missing required field {0}")]
    MissingField(&'static str),

    /// A string was not valid UTF-8.
    #[error("invalid utf-8 at byte {byte:#04x}: {reason}")]
    Utf8 { reason: String, byte: u8 },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::MalformedBuffer(reason.into())
    }
}

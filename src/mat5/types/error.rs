//! Custom error types for the mat5 crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Every variant is unrecoverable for the variable being read or written:
/// the codec never tries to resynchronise past a corrupt element.
#[derive(Debug, Error)]
pub enum MatError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// An embedded (small) element declared more than 4 payload bytes,
    /// or a matrix element was found in embedded form.
    #[error("Malformed tag: {0}")]
    MalformedTag(String),

    /// The data type code of an element is not one this codec knows.
    #[error("Unsupported element data type: {0}")]
    UnsupportedWireType(u32),

    /// The array class code of a matrix is not one this codec knows.
    #[error("Unsupported array class code: {0}")]
    UnsupportedClassCode(u8),

    /// A text codec was requested that is not available, or text could not
    /// be represented in the selected codec.
    #[error("Unsupported text codec: {0}")]
    UnsupportedTextCodec(String),

    /// Character data could not be decoded with its codec.
    #[error("Invalid {codec} text: {reason}")]
    InvalidText {
        codec: &'static str,
        reason: String,
    },

    /// Declared dimensions do not agree with the decoded element length.
    #[error("Shape mismatch for {context}: expected {expected} elements, but found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: u64,
        found: u64,
    },

    /// Fewer bytes remain in the stream than a tag declares.
    #[error("Truncated stream while reading {context}: needed {expected} bytes, only {available} available")]
    TruncatedStream {
        context: &'static str,
        expected: u64,
        available: u64,
    },

    /// A nested matrix element was required but another data type was found.
    #[error("Expected a matrix element, found data type {0}")]
    NotAMatrix(u32),

    /// A compressed variable could not be inflated.
    #[error("Decompression failed: {0}")]
    DecompressionError(String),

    /// Cell/struct/object nesting exceeded the configured depth.
    #[error("Nesting depth exceeds the limit of {0}")]
    RecursionLimit(usize),

    /// The stream is not a level 5 MAT-file (e.g. the legacy level 4 layout).
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The stream is structurally invalid.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A struct field name cannot be stored in the field-name table.
    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),
}

/// A convenience `Result` type alias using the crate's `MatError` type.
pub type Result<T> = std::result::Result<T, MatError>;

//! # Codec Errors
//!
//! Error types for detail flattening and hydration.

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors from the detail codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Typed details did not serialize to a JSON object
    #[error("Typed details must serialize to an object, got {0}")]
    NotAnObject(&'static str),

    /// The same key appears in both the details and secure-details maps
    #[error("Key present in both detail maps: {0}")]
    DuplicateKey(String),

    /// A persisted key has no corresponding field on the typed details
    #[error("Unknown detail field: {0}")]
    UnknownField(String),

    /// Deserialization into the typed details failed (missing or
    /// wrongly-typed field)
    #[error("Hydration failed: {0}")]
    Hydration(#[from] serde_json::Error),
}

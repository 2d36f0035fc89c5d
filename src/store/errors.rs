//! # Store Errors
//!
//! Error types for the instance/binding store contract.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the instance/binding store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the given ID
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A record already exists for the given ID
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// A persisted record could not be decoded
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    /// Backend I/O failure
    #[error("Store I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_id() {
        let err = StoreError::NotFound("inst-1".to_string());
        assert!(err.to_string().contains("inst-1"));

        let err = StoreError::CorruptRecord {
            id: "inst-2".to_string(),
            reason: "truncated".to_string(),
        };
        assert!(err.to_string().contains("inst-2"));
        assert!(err.to_string().contains("truncated"));
    }
}

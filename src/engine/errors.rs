//! # Engine Errors
//!
//! Error taxonomy for the operation executor, matching how failures
//! propagate: validation and conflict errors are synchronous and never
//! touch persisted state; step and hydration errors settle the instance
//! as failed and surface through polling instead.

use thiserror::Error;

use crate::broker::BrokerError;
use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced synchronously by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or unacceptable request; never reaches the pipeline
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The single-writer invariant or a uniqueness constraint refused the
    /// request; the client may retry once the in-flight operation settles
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No such instance or binding
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource no longer exists (terminal for deprovision polling)
    #[error("Gone")]
    Gone,

    /// Module lookup or capability call failed
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The store contract failed underneath the engine
    #[error(transparent)]
    Store(#[from] StoreError),
}

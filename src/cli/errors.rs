//! # CLI Errors

use thiserror::Error;

use crate::broker::BrokerError;
use crate::engine::EngineError;
use crate::store::StoreError;

/// Result type for CLI commands
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by the CLI front end
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store could not be opened
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Module registration failed
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Boot-time recovery sweep failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Server or runtime I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

//! # Pipeline Errors
//!
//! Error types for pipeline construction, cursor resolution, and step
//! execution.

use thiserror::Error;

/// Result type for pipeline construction and cursor resolution
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors from building a pipeline or resolving a resume cursor
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Step names are resume-cursor tokens and must be unique
    #[error("Duplicate step name in pipeline: {0}")]
    DuplicateStepName(String),

    /// A step was registered with an empty name
    #[error("Step name must not be empty")]
    EmptyStepName,

    /// The persisted cursor names a step this pipeline no longer has.
    /// Fatal and operator-visible; the executor never silently restarts
    /// from step 0.
    #[error("Resume cursor {cursor:?} names no step in the current pipeline")]
    CursorInvalid { cursor: String },
}

/// Failure returned by an executing step.
///
/// Modules reduce their own error types to a message here; the executor
/// persists it on the instance for pollers.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StepError {
    message: String,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for StepError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for StepError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Result type for step execution
pub type StepResult<T> = Result<T, StepError>;

//! # Broker Errors
//!
//! Error types for module lookup and module capability calls.

use thiserror::Error;

use crate::pipeline::PipelineError;

/// Result type for module registry and capability calls
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors from the module registry or a module implementation
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No module is registered for the service ID
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// A module is already registered for the service ID
    #[error("Module already registered for service: {0}")]
    DuplicateService(String),

    /// The module does not recognize the plan
    #[error("Unknown plan {plan_id:?} for service {service_id}")]
    UnknownPlan {
        service_id: String,
        plan_id: String,
    },

    /// A module-built pipeline failed validation
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Failure inside a module capability call (bind, unbind, credentials)
    #[error("Module failure: {0}")]
    Module(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_plan_names_both_ids() {
        let err = BrokerError::UnknownPlan {
            service_id: "postgres".to_string(),
            plan_id: "xxl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("postgres"));
        assert!(msg.contains("xxl"));
    }
}

//! Status Adapter / polling protocol
//!
//! Maps the persisted instance status into the client-visible vocabulary
//! driving the polling loop. Deprovision has a terminal `gone` outcome
//! that collapses "succeeded" and "not found": the record is purged on
//! success, so an unknown ID polled for a deprovision reports gone rather
//! than a not-found error.

use std::fmt;

use serde::Serialize;

use crate::model::{OperationStatus, OperationType};

use super::errors::{EngineError, EngineResult};
use super::Engine;

/// Client-visible operation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PollState::InProgress => "in progress",
            PollState::Succeeded => "succeeded",
            PollState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Poll outcome for a live instance.
#[derive(Debug, Clone, Serialize)]
pub struct PollResponse {
    pub state: PollState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Engine {
    /// Report progress of the current or last operation.
    ///
    /// `requested` is the operation type the client believes is running;
    /// a mismatch with the actual one is an input error, not a status
    /// value. Unknown IDs are `Gone` when the client is polling a
    /// deprovision, `NotFound` otherwise.
    pub fn poll(
        &self,
        instance_id: &str,
        requested: Option<OperationType>,
    ) -> EngineResult<PollResponse> {
        let Some(record) = self.store().get_instance(instance_id)? else {
            return match requested {
                Some(OperationType::Deprovision) => Err(EngineError::Gone),
                _ => Err(EngineError::NotFound(instance_id.to_string())),
            };
        };

        if let (Some(requested), Some(actual)) = (requested, record.last_operation) {
            if requested != actual {
                return Err(EngineError::Validation(format!(
                    "operation mismatch: requested {}, instance is running {}",
                    requested, actual
                )));
            }
        }

        let state = match record.status {
            OperationStatus::InProgress => PollState::InProgress,
            OperationStatus::Succeeded => PollState::Succeeded,
            OperationStatus::Failed => PollState::Failed,
            OperationStatus::Idle => {
                return Err(EngineError::Validation(format!(
                    "no operation has run for instance {}",
                    instance_id
                )));
            }
        };

        Ok(PollResponse {
            state,
            description: record.last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::ModuleRegistry;
    use crate::model::{InstanceRecord, ParamMap};
    use crate::store::{BrokerStore, MemoryStore};
    use std::sync::Arc;

    fn engine_with(records: Vec<InstanceRecord>) -> Engine {
        let store = Arc::new(MemoryStore::new());
        for record in &records {
            store.create_instance(record).unwrap();
        }
        Engine::new(store, Arc::new(ModuleRegistry::new()))
    }

    fn record(id: &str, status: OperationStatus, op: OperationType) -> InstanceRecord {
        let mut record = InstanceRecord::new(id, "svc-1", "plan-a", ParamMap::new());
        record.status = status;
        record.last_operation = Some(op);
        record
    }

    #[test]
    fn test_poll_maps_statuses() {
        let engine = engine_with(vec![
            record("a", OperationStatus::InProgress, OperationType::Provision),
            record("b", OperationStatus::Succeeded, OperationType::Provision),
            record("c", OperationStatus::Failed, OperationType::Provision),
        ]);

        assert_eq!(engine.poll("a", None).unwrap().state, PollState::InProgress);
        assert_eq!(engine.poll("b", None).unwrap().state, PollState::Succeeded);
        assert_eq!(engine.poll("c", None).unwrap().state, PollState::Failed);
    }

    #[test]
    fn test_poll_failed_carries_description() {
        let mut failed = record("a", OperationStatus::Failed, OperationType::Provision);
        failed.last_error = Some("step create-server failed".to_string());
        let engine = engine_with(vec![failed]);

        let response = engine.poll("a", Some(OperationType::Provision)).unwrap();
        assert_eq!(response.state, PollState::Failed);
        assert!(response.description.unwrap().contains("create-server"));
    }

    #[test]
    fn test_poll_unknown_id_for_deprovision_is_gone() {
        let engine = engine_with(vec![]);
        let err = engine
            .poll("vanished", Some(OperationType::Deprovision))
            .unwrap_err();
        assert!(matches!(err, EngineError::Gone));
    }

    #[test]
    fn test_poll_unknown_id_otherwise_not_found() {
        let engine = engine_with(vec![]);
        let err = engine
            .poll("vanished", Some(OperationType::Provision))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_poll_operation_mismatch_is_input_error() {
        let engine = engine_with(vec![record(
            "a",
            OperationStatus::InProgress,
            OperationType::Update,
        )]);
        let err = engine.poll("a", Some(OperationType::Provision)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_poll_state_wire_serialization() {
        let response = PollResponse {
            state: PollState::InProgress,
            description: None,
        };
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body, serde_json::json!({"state": "in progress"}));
    }
}

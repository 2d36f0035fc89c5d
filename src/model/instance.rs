//! Instance records and step-visible snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DetailMap, OperationStatus, OperationType, ParamMap};

/// Persisted record for one provisioned instance.
///
/// The executor is the only writer after creation. `details` and
/// `resume_cursor` are always persisted in the same write, so the cursor
/// never points past state that is not yet durable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub service_id: String,
    pub plan_id: String,

    /// Client-supplied provision/update parameters.
    #[serde(default)]
    pub parameters: ParamMap,

    /// Module-defined state accumulated by pipeline steps.
    #[serde(default)]
    pub details: DetailMap,

    /// Sensitive subset of module state, segregated at rest.
    #[serde(default)]
    pub secure_details: DetailMap,

    pub status: OperationStatus,

    /// Operation that is running or last ran. `None` only before the first
    /// provision claim is recorded.
    pub last_operation: Option<OperationType>,

    /// Name of the last step whose output has been persisted.
    pub resume_cursor: Option<String>,

    /// Message from the step that settled the instance as failed.
    pub last_error: Option<String>,

    /// Owning instance for hierarchical services (e.g. database-under-server).
    pub parent_instance_id: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    /// Create a fresh record for a provision request, not yet claimed.
    pub fn new(
        instance_id: impl Into<String>,
        service_id: impl Into<String>,
        plan_id: impl Into<String>,
        parameters: ParamMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            instance_id: instance_id.into(),
            service_id: service_id.into(),
            plan_id: plan_id.into(),
            parameters,
            details: DetailMap::new(),
            secure_details: DetailMap::new(),
            status: OperationStatus::Idle,
            last_operation: None,
            resume_cursor: None,
            last_error: None,
            parent_instance_id: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_instance_id: impl Into<String>) -> Self {
        self.parent_instance_id = Some(parent_instance_id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Read-only view handed to pipeline steps and module calls.
    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            instance_id: self.instance_id.clone(),
            service_id: self.service_id.clone(),
            plan_id: self.plan_id.clone(),
            parameters: self.parameters.clone(),
            details: self.details.clone(),
            secure_details: self.secure_details.clone(),
        }
    }
}

/// Immutable view of an instance as seen by steps and module calls.
///
/// Secure details are included here because the module's own steps and
/// credential construction are the one place they may flow; nothing else
/// in the broker serializes this type.
#[derive(Debug, Clone)]
pub struct InstanceSnapshot {
    pub instance_id: String,
    pub service_id: String,
    pub plan_id: String,
    pub parameters: ParamMap,
    pub details: DetailMap,
    pub secure_details: DetailMap,
}

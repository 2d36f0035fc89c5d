//! Operation Executor
//!
//! Turns an accepted lifecycle request into a durable, resumable pipeline
//! run. Entry points validate synchronously, claim the instance through
//! the store's conditional write (single writer per instance), then spawn
//! the run as an independent task and return immediately; progress is
//! observed out of band through `poll`.
//!
//! Validation and conflict errors never touch persisted state. Step,
//! hydration, and cursor errors settle the record as failed for pollers.
//!
//! `recover` is the boot-time sweep: records a previous process left
//! claimed are respawned from their persisted cursor, or settled failed
//! when their pipeline can no longer be built.

mod errors;
mod executor;
mod poll;

pub use errors::{EngineError, EngineResult};
pub use poll::{PollResponse, PollState};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::broker::{BrokerError, CredentialMap, ModuleRegistry, ServiceModule};
use crate::model::{
    BindingRecord, InstanceRecord, InstanceSnapshot, OperationStatus, OperationType, ParamMap,
};
use crate::observability::{Logger, Severity};
use crate::pipeline::Pipeline;
use crate::store::{BrokerStore, StoreError};

/// A provision request as seen by the engine (already authenticated and
/// parsed by the HTTP layer).
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub instance_id: String,
    pub service_id: String,
    pub plan_id: String,
    pub parameters: ParamMap,
    pub parent_instance_id: Option<String>,
    pub tags: Vec<String>,
}

/// An update request. A missing plan keeps the instance's current plan.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub instance_id: String,
    pub plan_id: Option<String>,
    pub parameters: ParamMap,
}

/// Marker returned when an operation has been accepted for asynchronous
/// execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptedOperation {
    pub operation: OperationType,
}

/// The lifecycle orchestration engine.
///
/// Cheap to clone; all state lives behind the store and registry.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn BrokerStore>,
    registry: Arc<ModuleRegistry>,
}

impl Engine {
    pub fn new(store: Arc<dyn BrokerStore>, registry: Arc<ModuleRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<dyn BrokerStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Accept a provision request and start its pipeline.
    ///
    /// A brand-new instance ID is claimed by the atomic create; exactly one
    /// of two racing requests wins it. Re-issuing a provision that
    /// previously failed resumes from the persisted cursor.
    pub fn provision(&self, request: ProvisionRequest) -> EngineResult<AcceptedOperation> {
        if request.instance_id.is_empty() {
            return Err(EngineError::Validation("instance_id must not be empty".into()));
        }
        if request.service_id.is_empty() || request.plan_id.is_empty() {
            return Err(EngineError::Validation(
                "service_id and plan_id are required".into(),
            ));
        }

        let module = self.registry.get(&request.service_id).map_err(reject_unknown)?;
        if let Some(parent_id) = &request.parent_instance_id {
            self.validate_parent(&request.instance_id, parent_id)?;
        }
        let pipeline = module.provisioner(&request.plan_id).map_err(reject_unknown)?;

        let record = match self.store.get_instance(&request.instance_id)? {
            None => {
                let mut record = InstanceRecord::new(
                    &request.instance_id,
                    &request.service_id,
                    &request.plan_id,
                    request.parameters,
                )
                .with_tags(request.tags);
                record.parent_instance_id = request.parent_instance_id;
                record.status = OperationStatus::InProgress;
                record.last_operation = Some(OperationType::Provision);
                match self.store.create_instance(&record) {
                    Ok(()) => record,
                    Err(StoreError::AlreadyExists(id)) => {
                        return Err(EngineError::Conflict(format!(
                            "instance {} is being provisioned by another request",
                            id
                        )));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Some(existing) => {
                if existing.service_id != request.service_id
                    || existing.plan_id != request.plan_id
                {
                    return Err(EngineError::Conflict(format!(
                        "instance {} already exists with a different service or plan",
                        existing.instance_id
                    )));
                }
                match (existing.status, existing.last_operation) {
                    (OperationStatus::Failed, Some(OperationType::Provision)) => {
                        self.claim(existing, OperationType::Provision)?
                    }
                    (OperationStatus::InProgress, _) => {
                        return Err(EngineError::Conflict(format!(
                            "an operation is already in flight for instance {}",
                            existing.instance_id
                        )));
                    }
                    _ => {
                        return Err(EngineError::Conflict(format!(
                            "instance {} already exists",
                            existing.instance_id
                        )));
                    }
                }
            }
        };

        executor::spawn_run(
            Arc::clone(&self.store),
            record.instance_id,
            OperationType::Provision,
            pipeline,
        );
        Ok(AcceptedOperation {
            operation: OperationType::Provision,
        })
    }

    /// Accept an update request and start its pipeline.
    pub fn update(&self, request: UpdateRequest) -> EngineResult<AcceptedOperation> {
        let mut record = self
            .store
            .get_instance(&request.instance_id)?
            .ok_or_else(|| EngineError::NotFound(request.instance_id.clone()))?;

        if let Some(plan_id) = request.plan_id {
            record.plan_id = plan_id;
        }
        for (key, value) in request.parameters {
            record.parameters.insert(key, value);
        }

        let module = self.registry.get(&record.service_id).map_err(reject_unknown)?;
        let pipeline = module.updater(&record.plan_id).map_err(reject_unknown)?;

        let record = self.claim(record, OperationType::Update)?;
        executor::spawn_run(
            Arc::clone(&self.store),
            record.instance_id,
            OperationType::Update,
            pipeline,
        );
        Ok(AcceptedOperation {
            operation: OperationType::Update,
        })
    }

    /// Accept a deprovision request and start its pipeline.
    ///
    /// Unknown IDs are `Gone` (the resource no longer exists, which is
    /// what the client wanted). A parent with live children is refused
    /// before any step executes.
    pub fn deprovision(&self, instance_id: &str) -> EngineResult<AcceptedOperation> {
        let record = self
            .store
            .get_instance(instance_id)?
            .ok_or(EngineError::Gone)?;

        let module = self.registry.get(&record.service_id).map_err(reject_unknown)?;
        let pipeline = module.deprovisioner(&record.plan_id).map_err(reject_unknown)?;

        let settled = record.clone();
        let record = self.claim(record, OperationType::Deprovision)?;

        // Checked under the claim: a child provisioned concurrently is
        // either visible here or sees the deprovision claim in its own
        // parent validation. Refusal releases the claim untouched.
        let children = self.store.list_child_instances(instance_id)?;
        if !children.is_empty() {
            self.store.update_instance(&settled)?;
            return Err(EngineError::Conflict(format!(
                "instance {} has child instances: {}",
                instance_id,
                children.join(", ")
            )));
        }
        executor::spawn_run(
            Arc::clone(&self.store),
            record.instance_id,
            OperationType::Deprovision,
            pipeline,
        );
        Ok(AcceptedOperation {
            operation: OperationType::Deprovision,
        })
    }

    /// Create a binding synchronously and return its credentials.
    pub fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        parameters: ParamMap,
    ) -> EngineResult<CredentialMap> {
        if binding_id.is_empty() {
            return Err(EngineError::Validation("binding_id must not be empty".into()));
        }
        let record = self
            .store
            .get_instance(instance_id)?
            .ok_or_else(|| EngineError::NotFound(instance_id.to_string()))?;
        if record.status != OperationStatus::Succeeded {
            return Err(EngineError::Conflict(format!(
                "instance {} is not ready for binding (status: {})",
                instance_id, record.status
            )));
        }

        let module = self.registry.get(&record.service_id).map_err(reject_unknown)?;
        let snapshot = record.snapshot();
        let (details, secure_details) = module.bind(&snapshot, &parameters)?;

        let binding = BindingRecord::new(
            binding_id,
            instance_id,
            parameters,
            details,
            secure_details,
        );

        // Credentials are built before the record is persisted: a failure
        // here must not leave a stored binding the client can never
        // redeem. Every refusal past this point revokes the module grant.
        let credentials = match module.credentials(&snapshot, &binding) {
            Ok(credentials) => credentials,
            Err(e) => {
                revoke_grant(module.as_ref(), &snapshot, &binding);
                return Err(e.into());
            }
        };

        match self.store.create_binding(&binding) {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(id)) => {
                revoke_grant(module.as_ref(), &snapshot, &binding);
                return Err(EngineError::Conflict(format!("binding {} already exists", id)));
            }
            Err(e) => {
                revoke_grant(module.as_ref(), &snapshot, &binding);
                return Err(e.into());
            }
        }

        Logger::log(
            Severity::Info,
            "binding_created",
            &[("binding_id", binding_id), ("instance_id", instance_id)],
        );
        Ok(credentials)
    }

    /// Destroy a binding synchronously.
    pub fn unbind(&self, instance_id: &str, binding_id: &str) -> EngineResult<()> {
        let record = self
            .store
            .get_instance(instance_id)?
            .ok_or(EngineError::Gone)?;
        let binding = self
            .store
            .get_binding(binding_id)?
            .filter(|b| b.instance_id == instance_id)
            .ok_or(EngineError::Gone)?;

        let module = self.registry.get(&record.service_id).map_err(reject_unknown)?;
        module.unbind(&record.snapshot(), &binding)?;
        self.store.delete_binding(binding_id)?;
        Logger::log(
            Severity::Info,
            "binding_deleted",
            &[("binding_id", binding_id), ("instance_id", instance_id)],
        );
        Ok(())
    }

    /// Resume operations a previous process left in flight.
    ///
    /// A crash mid-pipeline leaves the record claimed (`InProgress`), so
    /// no client request can claim it again. This boot-time sweep finds
    /// those records and respawns their pipelines from the persisted
    /// cursor. A record whose pipeline can no longer be built (module
    /// unregistered, plan gone, no operation recorded) settles `Failed`
    /// so the client can re-issue the operation. Returns how many runs
    /// were respawned.
    pub fn recover(&self) -> EngineResult<usize> {
        let mut resumed = 0;
        for instance_id in self.store.list_instance_ids()? {
            let Some(record) = self.store.get_instance(&instance_id)? else {
                continue;
            };
            if record.status != OperationStatus::InProgress {
                continue;
            }
            match self.rebuild_pipeline(&record) {
                Ok((operation, pipeline)) => {
                    Logger::log(
                        Severity::Info,
                        "operation_resumed",
                        &[
                            ("instance_id", &instance_id),
                            ("operation", operation.as_str()),
                        ],
                    );
                    executor::spawn_run(
                        Arc::clone(&self.store),
                        record.instance_id,
                        operation,
                        pipeline,
                    );
                    resumed += 1;
                }
                Err(e) => self.settle_unrecoverable(record, e.to_string())?,
            }
        }
        Ok(resumed)
    }

    /// Rebuild the pipeline for a claimed record from its persisted
    /// service, plan, and operation type.
    fn rebuild_pipeline(
        &self,
        record: &InstanceRecord,
    ) -> EngineResult<(OperationType, Pipeline)> {
        let operation = record.last_operation.ok_or_else(|| {
            EngineError::Validation(format!(
                "instance {} is claimed with no operation recorded",
                record.instance_id
            ))
        })?;
        let module = self.registry.get(&record.service_id).map_err(reject_unknown)?;
        let pipeline = match operation {
            OperationType::Provision => module.provisioner(&record.plan_id),
            OperationType::Update => module.updater(&record.plan_id),
            OperationType::Deprovision => module.deprovisioner(&record.plan_id),
        }
        .map_err(reject_unknown)?;
        Ok((operation, pipeline))
    }

    fn settle_unrecoverable(&self, mut record: InstanceRecord, message: String) -> EngineResult<()> {
        Logger::log_stderr(
            Severity::Error,
            "recovery_failed",
            &[("error", &message), ("instance_id", &record.instance_id)],
        );
        record.status = OperationStatus::Failed;
        record.last_error = Some(message);
        record.updated_at = Utc::now();
        self.store.update_instance(&record)?;
        Ok(())
    }

    /// Claim an instance for a new operation via the store's conditional
    /// write. A lost race or an unsettled status is a conflict; the
    /// request is rejected, never queued.
    fn claim(
        &self,
        mut record: InstanceRecord,
        operation: OperationType,
    ) -> EngineResult<InstanceRecord> {
        let expected = record.status;
        if !expected.is_settled() {
            return Err(EngineError::Conflict(format!(
                "an operation is already in flight for instance {}",
                record.instance_id
            )));
        }

        // Orphan mitigation: re-issuing the operation type that failed
        // resumes from the cursor. Any other operation starts clean.
        let resuming = expected == OperationStatus::Failed
            && record.last_operation == Some(operation);
        if !resuming {
            record.resume_cursor = None;
        }

        record.status = OperationStatus::InProgress;
        record.last_operation = Some(operation);
        record.last_error = None;
        record.updated_at = Utc::now();

        if !self.store.update_instance_if_status(&record, expected)? {
            return Err(EngineError::Conflict(format!(
                "lost the claim race for instance {}",
                record.instance_id
            )));
        }
        Ok(record)
    }

    /// Reject self-reference and cycles in the stored parent chain, and
    /// require the parent to exist. Misconfigured references are caught
    /// here, at provision time, never at pipeline-run time.
    fn validate_parent(&self, instance_id: &str, parent_id: &str) -> EngineResult<()> {
        if parent_id == instance_id {
            return Err(EngineError::Validation(
                "instance cannot be its own parent".into(),
            ));
        }
        let mut seen = HashSet::new();
        let mut current = parent_id.to_string();
        loop {
            if current == instance_id || !seen.insert(current.clone()) {
                return Err(EngineError::Validation(
                    "parent chain contains a cycle".into(),
                ));
            }
            let record = self.store.get_instance(&current)?.ok_or_else(|| {
                EngineError::Validation(format!("parent instance not found: {}", current))
            })?;
            if record.status == OperationStatus::InProgress
                && record.last_operation == Some(OperationType::Deprovision)
            {
                return Err(EngineError::Validation(format!(
                    "parent instance {} is being deprovisioned",
                    current
                )));
            }
            match record.parent_instance_id {
                Some(next) => current = next,
                None => return Ok(()),
            }
        }
    }
}

/// Revoke the module-side grant of a binding that will not be kept.
/// The revoke error, if any, is logged; the caller's error stands.
fn revoke_grant(module: &dyn ServiceModule, snapshot: &InstanceSnapshot, binding: &BindingRecord) {
    if let Err(e) = module.unbind(snapshot, binding) {
        Logger::log_stderr(
            Severity::Error,
            "bind_rollback_failed",
            &[
                ("binding_id", &binding.binding_id),
                ("error", &e.to_string()),
            ],
        );
    }
}

/// Unknown service/plan lookups are client mistakes, not server faults.
fn reject_unknown(err: BrokerError) -> EngineError {
    match err {
        BrokerError::UnknownService(_) | BrokerError::UnknownPlan { .. } => {
            EngineError::Validation(err.to_string())
        }
        other => EngineError::Broker(other),
    }
}

//! Pipeline run loop
//!
//! One spawned task per accepted operation. Different instances run fully
//! in parallel; within one instance the claim taken before spawning keeps
//! this the only writer. Every step boundary persists details and cursor
//! in a single record write, so a crash re-runs at most the step that was
//! in flight, which steps must tolerate (at-least-once).
//!
//! A dropped client connection never reaches this task: accepted
//! operations run to completion or terminal failure, because cancelling
//! mid-step could leave the external resource half-created with no
//! further step to finish it.

use std::sync::Arc;

use chrono::Utc;

use crate::model::{InstanceRecord, InstanceSnapshot, OperationStatus, OperationType};
use crate::observability::{Logger, Severity};
use crate::pipeline::{Pipeline, StepContext};
use crate::store::BrokerStore;

/// Detach the run as an independent task.
pub(crate) fn spawn_run(
    store: Arc<dyn BrokerStore>,
    instance_id: String,
    operation: OperationType,
    pipeline: Pipeline,
) {
    tokio::spawn(async move {
        run_pipeline(store, instance_id, operation, pipeline).await;
    });
}

/// Drive one pipeline for one claimed instance to completion or failure.
pub(crate) async fn run_pipeline(
    store: Arc<dyn BrokerStore>,
    instance_id: String,
    operation: OperationType,
    pipeline: Pipeline,
) {
    let op = operation.as_str();
    Logger::log(
        Severity::Info,
        "operation_started",
        &[
            ("instance_id", &instance_id),
            ("operation", op),
            ("steps", &pipeline.len().to_string()),
        ],
    );

    let mut record = match store.get_instance(&instance_id) {
        Ok(Some(record)) => record,
        Ok(None) => {
            Logger::log_stderr(
                Severity::Error,
                "instance_vanished",
                &[("instance_id", &instance_id), ("operation", op)],
            );
            return;
        }
        Err(e) => {
            Logger::log_stderr(
                Severity::Error,
                "store_read_failed",
                &[("error", &e.to_string()), ("instance_id", &instance_id)],
            );
            return;
        }
    };

    // Parent resolution happens once, before any step, and the snapshot is
    // injected read-only into every step context.
    let parent = match resolve_parent(store.as_ref(), &record) {
        Ok(parent) => parent,
        Err(message) => {
            settle_failed(store.as_ref(), record, operation, message);
            return;
        }
    };

    let start = match pipeline.resume_index(record.resume_cursor.as_deref()) {
        Ok(index) => index,
        Err(e) => {
            // The pipeline definition changed under a suspended operation.
            // Operator-visible failure; never a silent restart from step 0.
            settle_failed(store.as_ref(), record, operation, e.to_string());
            return;
        }
    };

    for step in &pipeline.steps()[start..] {
        let ctx = StepContext {
            instance: record.snapshot(),
            parent: parent.clone(),
        };
        match step.run(ctx).await {
            Ok(output) => {
                record.details.extend(output.details);
                record.secure_details.extend(output.secure_details);
                record.resume_cursor = Some(step.name().to_string());
                record.updated_at = Utc::now();
                if let Err(e) = store.update_instance(&record) {
                    settle_failed(
                        store.as_ref(),
                        record,
                        operation,
                        format!("persisting step {:?} failed: {}", step.name(), e),
                    );
                    return;
                }
                Logger::log(
                    Severity::Info,
                    "step_completed",
                    &[
                        ("instance_id", &record.instance_id),
                        ("operation", op),
                        ("step", step.name()),
                    ],
                );
            }
            Err(e) => {
                // No internal retry: the client re-issues the operation and
                // the cursor resumes it past the completed steps.
                let message = format!("step {} failed: {}", step.name(), e.message());
                settle_failed(store.as_ref(), record, operation, message);
                return;
            }
        }
    }

    if operation == OperationType::Deprovision {
        if let Err(e) = store.delete_instance(&record.instance_id) {
            Logger::log_stderr(
                Severity::Error,
                "deprovision_purge_failed",
                &[
                    ("error", &e.to_string()),
                    ("instance_id", &record.instance_id),
                ],
            );
            return;
        }
    } else {
        record.status = OperationStatus::Succeeded;
        record.updated_at = Utc::now();
        if let Err(e) = store.update_instance(&record) {
            Logger::log_stderr(
                Severity::Error,
                "settle_write_failed",
                &[
                    ("error", &e.to_string()),
                    ("instance_id", &record.instance_id),
                ],
            );
            return;
        }
    }

    Logger::log(
        Severity::Info,
        "operation_succeeded",
        &[("instance_id", &instance_id), ("operation", op)],
    );
}

fn resolve_parent(
    store: &dyn BrokerStore,
    record: &InstanceRecord,
) -> Result<Option<InstanceSnapshot>, String> {
    let Some(parent_id) = &record.parent_instance_id else {
        return Ok(None);
    };
    match store.get_instance(parent_id) {
        Ok(Some(parent)) => Ok(Some(parent.snapshot())),
        Ok(None) => Err(format!("parent instance not found: {}", parent_id)),
        Err(e) => Err(format!("loading parent instance {} failed: {}", parent_id, e)),
    }
}

/// Persist the failure so pollers observe it; the triggering request
/// already returned 202.
fn settle_failed(
    store: &dyn BrokerStore,
    mut record: InstanceRecord,
    operation: OperationType,
    message: String,
) {
    Logger::log_stderr(
        Severity::Error,
        "operation_failed",
        &[
            ("error", &message),
            ("instance_id", &record.instance_id),
            ("operation", operation.as_str()),
        ],
    );
    record.status = OperationStatus::Failed;
    record.last_error = Some(message);
    record.updated_at = Utc::now();
    if let Err(e) = store.update_instance(&record) {
        Logger::log_stderr(
            Severity::Error,
            "settle_write_failed",
            &[
                ("error", &e.to_string()),
                ("instance_id", &record.instance_id),
            ],
        );
    }
}

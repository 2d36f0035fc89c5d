//! Instance/Binding Store contract
//!
//! Durable keyed storage for instance and binding records, consumed through
//! a narrow get/create/update/delete contract. The one concurrency
//! primitive is `update_instance_if_status`: a conditional write that
//! persists only when the stored status still matches the caller's
//! expectation. All cross-process coordination rides on that conditional
//! write; the broker never takes in-process locks around store calls.
//!
//! Two backends ship: a mutex-guarded in-memory store (tests, demos) and a
//! directory-of-JSON-documents file store with secure details segregated
//! per record.

mod errors;
mod file;
mod memory;

pub use errors::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::model::{BindingRecord, InstanceRecord, OperationStatus};

/// Narrow storage contract backing the broker.
///
/// Implementations must make `create_instance`, `create_binding` and
/// `update_instance_if_status` atomic with respect to concurrent callers;
/// the executor's single-writer guarantee depends on it.
pub trait BrokerStore: Send + Sync {
    fn get_instance(&self, instance_id: &str) -> StoreResult<Option<InstanceRecord>>;

    /// Atomically create a record; fails with `AlreadyExists` if the ID is
    /// taken. Exactly one of two racing creates wins.
    fn create_instance(&self, record: &InstanceRecord) -> StoreResult<()>;

    /// Unconditional overwrite of an existing record.
    fn update_instance(&self, record: &InstanceRecord) -> StoreResult<()>;

    /// Conditional overwrite: persists `record` only if the stored status
    /// equals `expected`. Returns `Ok(false)` when the condition does not
    /// hold (the caller lost a race), `NotFound` when the record is gone.
    fn update_instance_if_status(
        &self,
        record: &InstanceRecord,
        expected: OperationStatus,
    ) -> StoreResult<bool>;

    fn delete_instance(&self, instance_id: &str) -> StoreResult<()>;

    /// IDs of all stored instances, sorted. Drives the boot-time sweep
    /// that resumes operations a previous process left in flight.
    fn list_instance_ids(&self) -> StoreResult<Vec<String>>;

    /// IDs of instances whose `parent_instance_id` references the given
    /// instance. Used to refuse deleting a parent with live children.
    fn list_child_instances(&self, parent_instance_id: &str) -> StoreResult<Vec<String>>;

    fn get_binding(&self, binding_id: &str) -> StoreResult<Option<BindingRecord>>;

    fn create_binding(&self, record: &BindingRecord) -> StoreResult<()>;

    fn delete_binding(&self, binding_id: &str) -> StoreResult<()>;

    /// IDs of bindings owned by the given instance.
    fn list_bindings(&self, instance_id: &str) -> StoreResult<Vec<String>>;
}

//! Persisted data model for the broker
//!
//! One record per provisioned instance, one per binding. Records carry a
//! generic details map plus a segregated secure-details map; the typed view
//! of those maps belongs to the owning module (see `codec`).

mod binding;
mod instance;
mod operation;

pub use binding::BindingRecord;
pub use instance::{InstanceRecord, InstanceSnapshot};
pub use operation::{OperationStatus, OperationType};

use std::collections::BTreeMap;

use serde_json::Value;

/// Generic persisted representation of module-defined state.
///
/// Ordered so that persisted output is deterministic.
pub type DetailMap = BTreeMap<String, Value>;

/// Free-form request parameters as supplied by the client.
pub type ParamMap = serde_json::Map<String, Value>;

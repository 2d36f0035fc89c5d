//! Binding records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DetailMap, ParamMap};

/// Persisted record for one credential-granting binding.
///
/// Bindings are created and deleted synchronously; they never go through
/// the step pipeline, so there is no status or cursor here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRecord {
    pub binding_id: String,
    pub instance_id: String,

    #[serde(default)]
    pub parameters: ParamMap,

    /// Module state from the bind call.
    #[serde(default)]
    pub details: DetailMap,

    /// Sensitive subset, segregated at rest like instance secure details.
    #[serde(default)]
    pub secure_details: DetailMap,

    pub created_at: DateTime<Utc>,
}

impl BindingRecord {
    pub fn new(
        binding_id: impl Into<String>,
        instance_id: impl Into<String>,
        parameters: ParamMap,
        details: DetailMap,
        secure_details: DetailMap,
    ) -> Self {
        Self {
            binding_id: binding_id.into(),
            instance_id: instance_id.into(),
            parameters,
            details,
            secure_details,
            created_at: Utc::now(),
        }
    }
}

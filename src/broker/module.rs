//! Module capability interface

use serde_json::Value;

use crate::model::{BindingRecord, DetailMap, InstanceSnapshot, ParamMap};
use crate::pipeline::Pipeline;

use super::errors::BrokerResult;

/// Credentials handed to a bind caller.
pub type CredentialMap = serde_json::Map<String, Value>;

/// Contract a resource module implements.
///
/// Pipeline construction is pure: it decides which steps apply for the
/// plan, never executes anything. Bind and unbind are synchronous calls
/// and do not go through the executor.
///
/// This is the one seam between the orchestration engine and
/// resource-specific logic; the engine dispatches through a registry of
/// `Arc<dyn ServiceModule>` keyed by service ID.
pub trait ServiceModule: Send + Sync {
    /// Service ID this module serves; the registry key.
    fn service_id(&self) -> &str;

    /// Ordered steps for provisioning under the given plan.
    fn provisioner(&self, plan_id: &str) -> BrokerResult<Pipeline>;

    /// Ordered steps for updating under the given plan.
    fn updater(&self, plan_id: &str) -> BrokerResult<Pipeline>;

    /// Ordered steps for deprovisioning under the given plan.
    fn deprovisioner(&self, plan_id: &str) -> BrokerResult<Pipeline>;

    /// Create binding state: `(details, secure_details)`.
    fn bind(
        &self,
        instance: &InstanceSnapshot,
        parameters: &ParamMap,
    ) -> BrokerResult<(DetailMap, DetailMap)>;

    /// Tear down whatever `bind` granted.
    fn unbind(&self, instance: &InstanceSnapshot, binding: &BindingRecord) -> BrokerResult<()>;

    /// Construct the client-visible credentials for a binding. The only
    /// path on which secure details may be read back out.
    fn credentials(
        &self,
        instance: &InstanceSnapshot,
        binding: &BindingRecord,
    ) -> BrokerResult<CredentialMap>;
}

impl std::fmt::Debug for dyn ServiceModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceModule")
            .field("service_id", &self.service_id())
            .finish()
    }
}

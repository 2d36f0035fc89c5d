//! Module Capability Interface
//!
//! The seam between the orchestration engine and resource-specific
//! modules: the `ServiceModule` trait each resource kind implements, and
//! the service-ID-keyed registry the engine dispatches through.

mod errors;
mod module;
mod registry;

pub use errors::{BrokerError, BrokerResult};
pub use module::{CredentialMap, ServiceModule};
pub use registry::ModuleRegistry;

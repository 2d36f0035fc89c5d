//! Module registry
//!
//! Lookup table keyed by service ID mapping to one concrete module per
//! resource kind. Dynamic dispatch over `Arc<dyn ServiceModule>`; no
//! hierarchy.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{BrokerError, BrokerResult};
use super::module::ServiceModule;

/// Registry of all modules this broker instance can serve.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn ServiceModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its own service ID.
    pub fn register(&mut self, module: Arc<dyn ServiceModule>) -> BrokerResult<()> {
        let service_id = module.service_id().to_string();
        if self.modules.contains_key(&service_id) {
            return Err(BrokerError::DuplicateService(service_id));
        }
        self.modules.insert(service_id, module);
        Ok(())
    }

    /// Resolve the module for a service ID.
    pub fn get(&self, service_id: &str) -> BrokerResult<Arc<dyn ServiceModule>> {
        self.modules
            .get(service_id)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownService(service_id.to_string()))
    }

    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.modules.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

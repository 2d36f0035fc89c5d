//! In-memory store backend
//!
//! Mutex-guarded maps. The conditional write is atomic because every
//! operation holds the same lock for its full read-compare-write span.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{BindingRecord, InstanceRecord, OperationStatus};

use super::errors::{StoreError, StoreResult};
use super::BrokerStore;

#[derive(Default)]
struct Tables {
    instances: HashMap<String, InstanceRecord>,
    bindings: HashMap<String, BindingRecord>,
}

/// In-memory implementation of `BrokerStore`.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // A poisoned lock means a panic mid-write; the maps are still
        // structurally sound, so continue with the inner value.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BrokerStore for MemoryStore {
    fn get_instance(&self, instance_id: &str) -> StoreResult<Option<InstanceRecord>> {
        Ok(self.lock().instances.get(instance_id).cloned())
    }

    fn create_instance(&self, record: &InstanceRecord) -> StoreResult<()> {
        let mut tables = self.lock();
        if tables.instances.contains_key(&record.instance_id) {
            return Err(StoreError::AlreadyExists(record.instance_id.clone()));
        }
        tables
            .instances
            .insert(record.instance_id.clone(), record.clone());
        Ok(())
    }

    fn update_instance(&self, record: &InstanceRecord) -> StoreResult<()> {
        let mut tables = self.lock();
        if !tables.instances.contains_key(&record.instance_id) {
            return Err(StoreError::NotFound(record.instance_id.clone()));
        }
        tables
            .instances
            .insert(record.instance_id.clone(), record.clone());
        Ok(())
    }

    fn update_instance_if_status(
        &self,
        record: &InstanceRecord,
        expected: OperationStatus,
    ) -> StoreResult<bool> {
        let mut tables = self.lock();
        let current = tables
            .instances
            .get(&record.instance_id)
            .ok_or_else(|| StoreError::NotFound(record.instance_id.clone()))?;
        if current.status != expected {
            return Ok(false);
        }
        tables
            .instances
            .insert(record.instance_id.clone(), record.clone());
        Ok(true)
    }

    fn delete_instance(&self, instance_id: &str) -> StoreResult<()> {
        let mut tables = self.lock();
        tables
            .instances
            .remove(instance_id)
            .ok_or_else(|| StoreError::NotFound(instance_id.to_string()))?;
        Ok(())
    }

    fn list_instance_ids(&self) -> StoreResult<Vec<String>> {
        let tables = self.lock();
        let mut ids: Vec<String> = tables.instances.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn list_child_instances(&self, parent_instance_id: &str) -> StoreResult<Vec<String>> {
        let tables = self.lock();
        let mut children: Vec<String> = tables
            .instances
            .values()
            .filter(|r| r.parent_instance_id.as_deref() == Some(parent_instance_id))
            .map(|r| r.instance_id.clone())
            .collect();
        children.sort();
        Ok(children)
    }

    fn get_binding(&self, binding_id: &str) -> StoreResult<Option<BindingRecord>> {
        Ok(self.lock().bindings.get(binding_id).cloned())
    }

    fn create_binding(&self, record: &BindingRecord) -> StoreResult<()> {
        let mut tables = self.lock();
        if tables.bindings.contains_key(&record.binding_id) {
            return Err(StoreError::AlreadyExists(record.binding_id.clone()));
        }
        tables
            .bindings
            .insert(record.binding_id.clone(), record.clone());
        Ok(())
    }

    fn delete_binding(&self, binding_id: &str) -> StoreResult<()> {
        let mut tables = self.lock();
        tables
            .bindings
            .remove(binding_id)
            .ok_or_else(|| StoreError::NotFound(binding_id.to_string()))?;
        Ok(())
    }

    fn list_bindings(&self, instance_id: &str) -> StoreResult<Vec<String>> {
        let tables = self.lock();
        let mut bindings: Vec<String> = tables
            .bindings
            .values()
            .filter(|r| r.instance_id == instance_id)
            .map(|r| r.binding_id.clone())
            .collect();
        bindings.sort();
        Ok(bindings)
    }
}

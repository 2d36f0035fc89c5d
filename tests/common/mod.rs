//! Shared harness for broker integration tests
//!
//! A scriptable `ServiceModule` with invocation counters and a fail-once
//! switch, plus helpers to build an engine and wait for an operation to
//! settle the way a polling client would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use harbormaster::broker::{BrokerError, BrokerResult, CredentialMap, ModuleRegistry, ServiceModule};
use harbormaster::engine::Engine;
use harbormaster::model::{
    BindingRecord, DetailMap, InstanceRecord, InstanceSnapshot, OperationStatus, ParamMap,
};
use harbormaster::pipeline::{Pipeline, Step, StepError, StepOutput};
use harbormaster::store::{BrokerStore, MemoryStore};

pub const SERVICE_ID: &str = "scripted";
pub const PLAN_ID: &str = "standard";

/// A module whose two provision steps count their invocations and can be
/// told to fail step two exactly once.
pub struct ScriptedModule {
    pub step_one_runs: Arc<AtomicUsize>,
    pub step_two_runs: Arc<AtomicUsize>,
    pub teardown_runs: Arc<AtomicUsize>,
    pub fail_step_two_once: Arc<AtomicBool>,
    pub fail_credentials_once: Arc<AtomicBool>,
    /// Delay inserted into step one, to hold an operation in flight.
    pub step_one_delay: Duration,
}

impl ScriptedModule {
    pub fn new() -> Self {
        Self {
            step_one_runs: Arc::new(AtomicUsize::new(0)),
            step_two_runs: Arc::new(AtomicUsize::new(0)),
            teardown_runs: Arc::new(AtomicUsize::new(0)),
            fail_step_two_once: Arc::new(AtomicBool::new(false)),
            fail_credentials_once: Arc::new(AtomicBool::new(false)),
            step_one_delay: Duration::ZERO,
        }
    }

    pub fn with_step_one_delay(mut self, delay: Duration) -> Self {
        self.step_one_delay = delay;
        self
    }
}

impl ServiceModule for ScriptedModule {
    fn service_id(&self) -> &str {
        SERVICE_ID
    }

    fn provisioner(&self, _plan_id: &str) -> BrokerResult<Pipeline> {
        let runs = self.step_one_runs.clone();
        let delay = self.step_one_delay;
        let step_one = Step::new("step-one", move |_ctx| {
            let runs = runs.clone();
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(StepOutput::new().with_detail("one", json!("done")))
            }
        });

        let runs = self.step_two_runs.clone();
        let fail_once = self.fail_step_two_once.clone();
        let step_two = Step::new("step-two", move |_ctx| {
            let runs = runs.clone();
            let fail_once = fail_once.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                if fail_once.swap(false, Ordering::SeqCst) {
                    return Err(StepError::new("transient vendor failure"));
                }
                Ok(StepOutput::new().with_detail("two", json!("done")))
            }
        });

        Ok(Pipeline::builder().step(step_one).step(step_two).build()?)
    }

    fn updater(&self, _plan_id: &str) -> BrokerResult<Pipeline> {
        Ok(Pipeline::builder()
            .step(Step::new("apply-update", |_ctx| async {
                Ok(StepOutput::new().with_detail("updated", json!(true)))
            }))
            .build()?)
    }

    fn deprovisioner(&self, _plan_id: &str) -> BrokerResult<Pipeline> {
        let runs = self.teardown_runs.clone();
        Ok(Pipeline::builder()
            .step(Step::new("teardown", move |_ctx| {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(StepOutput::new())
                }
            }))
            .build()?)
    }

    fn bind(
        &self,
        _instance: &InstanceSnapshot,
        _parameters: &ParamMap,
    ) -> BrokerResult<(DetailMap, DetailMap)> {
        let mut details = DetailMap::new();
        details.insert("username".to_string(), json!(format!("u_{}", Uuid::new_v4())));
        let mut secure = DetailMap::new();
        secure.insert("password".to_string(), json!(Uuid::new_v4().to_string()));
        Ok((details, secure))
    }

    fn unbind(&self, _instance: &InstanceSnapshot, _binding: &BindingRecord) -> BrokerResult<()> {
        Ok(())
    }

    fn credentials(
        &self,
        _instance: &InstanceSnapshot,
        binding: &BindingRecord,
    ) -> BrokerResult<CredentialMap> {
        if self.fail_credentials_once.swap(false, Ordering::SeqCst) {
            return Err(BrokerError::Module(
                "credential backend unavailable".to_string(),
            ));
        }
        let mut credentials = CredentialMap::new();
        for (key, value) in binding.details.iter().chain(binding.secure_details.iter()) {
            credentials.insert(key.clone(), value.clone());
        }
        Ok(credentials)
    }
}

/// Engine over a fresh in-memory store with the given module registered.
pub fn engine_with(module: Arc<dyn ServiceModule>) -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let mut registry = ModuleRegistry::new();
    registry.register(module).expect("register module");
    (
        Engine::new(store.clone(), Arc::new(registry)),
        store,
    )
}

/// Poll the store until the instance settles (or vanishes), as an HTTP
/// client would poll `last_operation`.
pub async fn wait_settled<S: BrokerStore>(
    store: &Arc<S>,
    instance_id: &str,
) -> Option<InstanceRecord> {
    for _ in 0..500 {
        match store.get_instance(instance_id).expect("store read") {
            Some(record) if record.status != OperationStatus::InProgress => {
                return Some(record);
            }
            Some(_) => {}
            None => return None,
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("instance {} never settled", instance_id);
}

/// Provision parameters-free request for the scripted module.
pub fn provision_request(instance_id: &str) -> harbormaster::engine::ProvisionRequest {
    harbormaster::engine::ProvisionRequest {
        instance_id: instance_id.to_string(),
        service_id: SERVICE_ID.to_string(),
        plan_id: PLAN_ID.to_string(),
        parameters: ParamMap::new(),
        parent_instance_id: None,
        tags: Vec::new(),
    }
}

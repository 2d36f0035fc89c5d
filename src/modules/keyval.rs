//! Key/value namespace module
//!
//! Manages in-process key/value namespaces, one per instance. Small
//! enough to read in one sitting, but it exercises the full module
//! contract: plan-dependent pipeline construction, idempotent steps, the
//! typed-detail codec with a secure field, and per-binding credentials.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::broker::{BrokerError, BrokerResult, CredentialMap, ServiceModule};
use crate::codec::{self, TypedDetails};
use crate::model::{BindingRecord, DetailMap, InstanceSnapshot, ParamMap};
use crate::pipeline::{Pipeline, Step, StepError, StepOutput};

const SERVICE_ID: &str = "keyval";
const PLANS: &[&str] = &["standard", "replicated"];

/// Typed instance details for a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyvalDetails {
    pub namespace: String,
    pub endpoint: String,
    pub quota: Option<u64>,
    pub api_token: String,
}

impl TypedDetails for KeyvalDetails {
    const SECURE_FIELDS: &'static [&'static str] = &["api_token"];
}

#[derive(Debug, Default)]
struct Namespace {
    users: HashSet<String>,
    replicated: bool,
}

type Namespaces = Arc<Mutex<HashMap<String, Namespace>>>;

/// Reference implementation of `ServiceModule`.
#[derive(Default)]
pub struct KeyvalModule {
    namespaces: Namespaces,
}

impl KeyvalModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live namespaces (for tests and the health probe).
    pub fn namespace_count(&self) -> usize {
        lock(&self.namespaces).len()
    }

    fn check_plan(&self, plan_id: &str) -> BrokerResult<()> {
        if PLANS.contains(&plan_id) {
            Ok(())
        } else {
            Err(BrokerError::UnknownPlan {
                service_id: SERVICE_ID.to_string(),
                plan_id: plan_id.to_string(),
            })
        }
    }
}

fn lock(namespaces: &Namespaces) -> std::sync::MutexGuard<'_, HashMap<String, Namespace>> {
    namespaces.lock().unwrap_or_else(|e| e.into_inner())
}

fn random_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl ServiceModule for KeyvalModule {
    fn service_id(&self) -> &str {
        SERVICE_ID
    }

    fn provisioner(&self, plan_id: &str) -> BrokerResult<Pipeline> {
        self.check_plan(plan_id)?;

        let namespaces = Arc::clone(&self.namespaces);
        let create = Step::new("create-namespace", move |ctx| {
            let namespaces = Arc::clone(&namespaces);
            async move {
                // Create if not exists: safe to re-run after a crash.
                lock(&namespaces)
                    .entry(ctx.instance.instance_id.clone())
                    .or_default();
                Ok(StepOutput::new())
            }
        });

        let write_metadata = Step::new("write-metadata", |ctx| async move {
            let details = KeyvalDetails {
                namespace: ctx.instance.instance_id.clone(),
                endpoint: format!("keyval://{}", ctx.instance.instance_id),
                quota: None,
                api_token: random_secret(32),
            };
            let (details, secure_details) =
                codec::flatten(&details).map_err(|e| StepError::new(e.to_string()))?;
            Ok(StepOutput {
                details,
                secure_details,
            })
        });

        let mut builder = Pipeline::builder().step(create).step(write_metadata);

        // The replicated plan gets one extra step; plan selection happens
        // here, at construction, never inside a step.
        if plan_id == "replicated" {
            let namespaces = Arc::clone(&self.namespaces);
            builder = builder.step(Step::new("enable-replication", move |ctx| {
                let namespaces = Arc::clone(&namespaces);
                async move {
                    let mut guard = lock(&namespaces);
                    let namespace = guard
                        .get_mut(&ctx.instance.instance_id)
                        .ok_or_else(|| StepError::new("namespace missing"))?;
                    namespace.replicated = true;
                    Ok(StepOutput::new().with_detail("replicas", json!(3)))
                }
            }));
        }

        Ok(builder.build()?)
    }

    fn updater(&self, plan_id: &str) -> BrokerResult<Pipeline> {
        self.check_plan(plan_id)?;

        let apply = Step::new("apply-parameters", |ctx| async move {
            let mut output = StepOutput::new();
            if let Some(quota) = ctx.instance.parameters.get("quota") {
                if !quota.is_u64() {
                    return Err(StepError::new("quota must be a non-negative integer"));
                }
                output = output.with_detail("quota", quota.clone());
            }
            Ok(output)
        });

        Ok(Pipeline::builder().step(apply).build()?)
    }

    fn deprovisioner(&self, plan_id: &str) -> BrokerResult<Pipeline> {
        self.check_plan(plan_id)?;

        let namespaces = Arc::clone(&self.namespaces);
        let delete = Step::new("delete-namespace", move |ctx| {
            let namespaces = Arc::clone(&namespaces);
            async move {
                // Remove if present: already-gone is success, not an error.
                lock(&namespaces).remove(&ctx.instance.instance_id);
                Ok(StepOutput::new())
            }
        });

        Ok(Pipeline::builder().step(delete).build()?)
    }

    fn bind(
        &self,
        instance: &InstanceSnapshot,
        _parameters: &ParamMap,
    ) -> BrokerResult<(DetailMap, DetailMap)> {
        let typed: KeyvalDetails =
            codec::hydrate(&instance.details, &instance.secure_details)
                .map_err(|e| BrokerError::Module(format!("hydrating instance details: {}", e)))?;

        let username = format!("kv_{}", random_secret(12));
        let password = random_secret(24);

        let mut guard = lock(&self.namespaces);
        let namespace = guard
            .get_mut(&typed.namespace)
            .ok_or_else(|| BrokerError::Module(format!("namespace missing: {}", typed.namespace)))?;
        namespace.users.insert(username.clone());

        let mut details = DetailMap::new();
        details.insert("username".to_string(), json!(username));
        details.insert("uri".to_string(), json!(typed.endpoint));
        let mut secure_details = DetailMap::new();
        secure_details.insert("password".to_string(), json!(password));
        Ok((details, secure_details))
    }

    fn unbind(&self, instance: &InstanceSnapshot, binding: &BindingRecord) -> BrokerResult<()> {
        let username = binding
            .details
            .get("username")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BrokerError::Module("binding has no username".to_string()))?;
        let mut guard = lock(&self.namespaces);
        if let Some(namespace) = guard.get_mut(&instance.instance_id) {
            namespace.users.remove(username);
        }
        Ok(())
    }

    fn credentials(
        &self,
        _instance: &InstanceSnapshot,
        binding: &BindingRecord,
    ) -> BrokerResult<CredentialMap> {
        let mut credentials = CredentialMap::new();
        for (key, value) in binding.details.iter().chain(binding.secure_details.iter()) {
            credentials.insert(key.clone(), value.clone());
        }
        Ok(credentials)
    }
}

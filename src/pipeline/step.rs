//! Steps and their execution context

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::model::{DetailMap, InstanceSnapshot};

use super::errors::StepResult;

/// Read-only view a step executes against.
///
/// The parent snapshot is resolved by the executor before any step runs
/// and is only present for hierarchical services.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub instance: InstanceSnapshot,
    pub parent: Option<InstanceSnapshot>,
}

/// Detail deltas returned by a successful step, merged into the instance
/// record before the next step runs.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub details: DetailMap,
    pub secure_details: DetailMap,
}

impl StepOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_secure_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.secure_details.insert(key.into(), value);
        self
    }
}

/// Boxed future returned by a step invocation.
pub type StepFuture = Pin<Box<dyn Future<Output = StepResult<StepOutput>> + Send>>;

type StepFn = Arc<dyn Fn(StepContext) -> StepFuture + Send + Sync>;

/// A named, idempotent unit of pipeline work.
///
/// The name doubles as the resume-cursor token, so a step re-run after a
/// crash must tolerate its own side effects already existing
/// ("create if not exists").
#[derive(Clone)]
pub struct Step {
    name: String,
    run: StepFn,
}

impl Step {
    /// Wrap an async function as a named step.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult<StepOutput>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// A step that records nothing and always succeeds. Useful for
    /// pipeline positions whose work is conditional and not applicable.
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, |_ctx| async { Ok(StepOutput::new()) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the step against a snapshot.
    pub fn run(&self, ctx: StepContext) -> StepFuture {
        (self.run)(ctx)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InstanceRecord, ParamMap};
    use crate::pipeline::StepError;
    use serde_json::json;

    fn ctx() -> StepContext {
        StepContext {
            instance: InstanceRecord::new("inst-1", "svc-1", "plan-a", ParamMap::new()).snapshot(),
            parent: None,
        }
    }

    #[tokio::test]
    async fn test_step_returns_output() {
        let step = Step::new("record-endpoint", |ctx: StepContext| async move {
            Ok(StepOutput::new()
                .with_detail("endpoint", json!(format!("https://{}.example", ctx.instance.instance_id))))
        });
        let out = step.run(ctx()).await.unwrap();
        assert_eq!(out.details["endpoint"], json!("https://inst-1.example"));
    }

    #[tokio::test]
    async fn test_step_propagates_failure() {
        let step = Step::new("always-fails", |_ctx| async { Err(StepError::new("boom")) });
        let err = step.run(ctx()).await.unwrap_err();
        assert_eq!(err.message(), "boom");
    }

    #[tokio::test]
    async fn test_noop_step() {
        let out = Step::noop("skip").run(ctx()).await.unwrap();
        assert!(out.details.is_empty());
        assert!(out.secure_details.is_empty());
    }
}

//! Step Pipeline
//!
//! An ordered list of named, idempotent steps carrying out one lifecycle
//! operation. Modules build a pipeline per lifecycle type; construction is
//! pure and decides only which steps apply for the plan at hand. Step
//! names are the resume-cursor tokens, so they must be unique within a
//! pipeline.

mod errors;
mod step;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use step::{Step, StepContext, StepFuture, StepOutput};

use std::collections::HashSet;

/// An ordered, validated list of named steps.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// An empty pipeline; the executor settles it as an immediate success.
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder { steps: Vec::new() }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the first step still to run, given the persisted cursor.
    ///
    /// No cursor means nothing has completed: start at 0. A cursor naming
    /// step *k* means steps `0..=k` are durable: start at *k*+1. A cursor
    /// naming no current step means the pipeline definition changed under
    /// a suspended operation; that is `CursorInvalid`, which the executor
    /// treats as fatal.
    pub fn resume_index(&self, cursor: Option<&str>) -> PipelineResult<usize> {
        match cursor {
            None => Ok(0),
            Some(name) => self
                .steps
                .iter()
                .position(|s| s.name() == name)
                .map(|i| i + 1)
                .ok_or_else(|| PipelineError::CursorInvalid {
                    cursor: name.to_string(),
                }),
        }
    }
}

/// Builder enforcing unique, non-empty step names.
pub struct PipelineBuilder {
    steps: Vec<Step>,
}

impl PipelineBuilder {
    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Validate names and produce the pipeline.
    pub fn build(self) -> PipelineResult<Pipeline> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.name().is_empty() {
                return Err(PipelineError::EmptyStepName);
            }
            if !seen.insert(step.name().to_string()) {
                return Err(PipelineError::DuplicateStepName(step.name().to_string()));
            }
        }
        Ok(Pipeline { steps: self.steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_step_pipeline() -> Pipeline {
        Pipeline::builder()
            .step(Step::noop("create-server"))
            .step(Step::noop("wait-ready"))
            .step(Step::noop("record-endpoint"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let err = Pipeline::builder()
            .step(Step::noop("create"))
            .step(Step::noop("create"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateStepName(n) if n == "create"));
    }

    #[test]
    fn test_builder_rejects_empty_names() {
        let err = Pipeline::builder().step(Step::noop("")).build().unwrap_err();
        assert!(matches!(err, PipelineError::EmptyStepName));
    }

    #[test]
    fn test_resume_index_empty_cursor_starts_at_zero() {
        assert_eq!(three_step_pipeline().resume_index(None).unwrap(), 0);
    }

    #[test]
    fn test_resume_index_continues_after_named_step() {
        let p = three_step_pipeline();
        assert_eq!(p.resume_index(Some("create-server")).unwrap(), 1);
        assert_eq!(p.resume_index(Some("wait-ready")).unwrap(), 2);
        // Cursor at the last step: everything is done.
        assert_eq!(p.resume_index(Some("record-endpoint")).unwrap(), 3);
    }

    #[test]
    fn test_resume_index_unknown_cursor_is_fatal() {
        let err = three_step_pipeline()
            .resume_index(Some("grant-roles"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::CursorInvalid { cursor } if cursor == "grant-roles"));
    }

    #[test]
    fn test_empty_pipeline() {
        let p = Pipeline::empty();
        assert!(p.is_empty());
        assert_eq!(p.resume_index(None).unwrap(), 0);
    }
}

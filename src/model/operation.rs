//! Operation status vocabulary
//!
//! `OperationStatus` is the persisted per-instance state machine driven by
//! the executor; `OperationType` names the lifecycle operation that last
//! touched (or is touching) the instance. The client-visible polling
//! vocabulary is derived from both in `engine::poll`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Persisted status of an instance's current or last operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// No operation has run yet.
    Idle,
    /// An executor holds the instance; no other operation may start.
    InProgress,
    /// The last operation ran its pipeline to completion.
    Succeeded,
    /// The last operation stopped at a failing step.
    Failed,
}

impl OperationStatus {
    /// A settled status admits a new operation claim.
    pub fn is_settled(&self) -> bool {
        !matches!(self, OperationStatus::InProgress)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationStatus::Idle => "idle",
            OperationStatus::InProgress => "in_progress",
            OperationStatus::Succeeded => "succeeded",
            OperationStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle operation kinds that run through the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Provision,
    Update,
    Deprovision,
}

impl OperationType {
    /// Wire name used in `last_operation` polling query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Provision => "provision",
            OperationType::Update => "update",
            OperationType::Deprovision => "deprovision",
        }
    }

    /// Parse the wire name from a polling query string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "provision" => Some(OperationType::Provision),
            "update" => Some(OperationType::Update),
            "deprovision" => Some(OperationType::Deprovision),
            _ => None,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

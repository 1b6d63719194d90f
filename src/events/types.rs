//! Progress event payloads delivered to sinks and subscribers.

use crate::error::StepErrorDetail;
use crate::state_machine::{RunStatus, StepRunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Event names, for subscribers that filter by string
pub mod constants {
    pub const STEP_TRANSITION: &str = "hunt.step.transition";
    pub const RUN_TRANSITION: &str = "hunt.run.transition";
}

/// A step moved from one status to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTransition {
    pub run_id: Uuid,
    pub step_id: String,
    pub from: StepRunStatus,
    pub to: StepRunStatus,
    /// Attempts made so far, including the current one
    pub attempt: u32,
    pub error: Option<StepErrorDetail>,
    /// Present only for successful steps declared with `persist_result`
    pub result: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

/// A run moved from one status to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTransition {
    pub run_id: Uuid,
    pub from: RunStatus,
    pub to: RunStatus,
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Step(StepTransition),
    Run(RunTransition),
}

impl ProgressEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Step(_) => constants::STEP_TRANSITION,
            Self::Run(_) => constants::RUN_TRANSITION,
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Step(t) => t.run_id,
            Self::Run(t) => t.run_id,
        }
    }
}

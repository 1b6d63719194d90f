//! Run and step state records owned by the scheduling loop, plus the messages
//! step tasks send back to it.

use crate::error::{StepError, StepErrorDetail};
use crate::graph::RunGraph;
use crate::state_machine::{
    RunEvent, RunStateMachine, RunStatus, StateMachineResult, StepEvent, StepRunStatus,
    StepStateMachine,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Per-step, per-run execution record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRunState {
    pub step_id: String,
    pub unit_name: String,
    pub status: StepRunStatus,
    pub optional: bool,
    /// Attempts started so far
    pub attempts: u32,
    pub max_attempts: u32,
    /// Start of the first attempt
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_error: Option<StepErrorDetail>,
}

impl StepRunState {
    pub fn new(
        step_id: impl Into<String>,
        unit_name: impl Into<String>,
        optional: bool,
        max_attempts: u32,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            unit_name: unit_name.into(),
            status: StepRunStatus::Pending,
            optional,
            attempts: 0,
            max_attempts,
            started_at: None,
            ended_at: None,
            last_error: None,
        }
    }

    /// Apply a lifecycle event, returning the status it replaced
    pub fn apply(&mut self, event: &StepEvent) -> StateMachineResult<StepRunStatus> {
        let target = StepStateMachine::determine_target_state(self.status, event)?;
        let previous = std::mem::replace(&mut self.status, target);
        let now = Utc::now();

        if matches!(event, StepEvent::Start) {
            self.attempts += 1;
            self.started_at.get_or_insert(now);
        }
        if let Some(detail) = event.error_detail() {
            self.last_error = Some(detail.clone());
        }
        if target.is_terminal() {
            self.ended_at = Some(now);
        }
        Ok(previous)
    }

    pub fn has_attempts_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Per-run snapshot, published after every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// One entry per declared step, in declaration order
    pub steps: Vec<StepRunState>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Adapter invocations across all steps and attempts
    pub steps_dispatched: u32,
    /// Reason the run failed, when it did not fail because of a step
    pub error: Option<String>,
}

impl RunState {
    pub fn new(run_id: Uuid, graph: &RunGraph) -> Self {
        let steps = graph
            .nodes()
            .iter()
            .map(|node| {
                let decl = &node.declaration;
                StepRunState::new(&decl.id, &decl.unit_name, decl.optional, decl.max_attempts())
            })
            .collect();

        Self {
            run_id,
            status: RunStatus::Pending,
            steps,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            steps_dispatched: 0,
            error: None,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepRunState> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether every step has reached a terminal status
    pub fn all_steps_terminal(&self) -> bool {
        self.steps.iter().all(StepRunState::is_terminal)
    }

    pub fn count_with_status(&self, status: StepRunStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn step_statuses(&self) -> Vec<StepRunStatus> {
        self.steps.iter().map(|s| s.status).collect()
    }

    /// Apply a run lifecycle event, returning the status it replaced
    pub fn apply(&mut self, event: &RunEvent) -> StateMachineResult<RunStatus> {
        let target = RunStateMachine::determine_target_state(self.status, event)?;
        let previous = std::mem::replace(&mut self.status, target);
        let now = Utc::now();

        if matches!(event, RunEvent::Start) {
            self.started_at = Some(now);
        }
        if let Some(message) = event.error_message() {
            self.error.get_or_insert_with(|| message.to_string());
        }
        if target.is_terminal() {
            self.ended_at = Some(now);
        }
        Ok(previous)
    }
}

/// Result of one attempt as seen by the step task
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Succeeded(Value),
    Failed(StepError),
}

/// Step task -> scheduling loop
#[derive(Debug)]
pub(crate) enum StepMessage {
    /// A permit was acquired and the attempt is about to begin
    Started { index: usize },
    /// The attempt is over. Sent exactly once per spawned task.
    Finished { index: usize, outcome: StepOutcome },
}

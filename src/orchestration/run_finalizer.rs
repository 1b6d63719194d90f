//! # Run Finalizer
//!
//! Maps the terminal step statuses of a run onto the run's own outcome.

use super::types::StepRunState;
use crate::state_machine::{RunEvent, StepRunStatus};

pub struct RunFinalizer;

impl RunFinalizer {
    /// Decide the closing run event. Precedence: cancellation, then internal
    /// errors, then fatal step failures.
    pub fn determine_outcome(
        steps: &[StepRunState],
        cancel_requested: bool,
        internal_error: Option<&str>,
    ) -> RunEvent {
        if cancel_requested {
            return RunEvent::Cancel;
        }
        if let Some(error) = internal_error {
            return RunEvent::fail_with_error(error);
        }

        let fatal: Vec<&str> = steps
            .iter()
            .filter(|s| s.status.is_fatal())
            .map(|s| s.step_id.as_str())
            .collect();
        if !fatal.is_empty() {
            return RunEvent::fail_with_error(format!(
                "required step(s) failed: {}",
                fatal.join(", ")
            ));
        }

        if steps.iter().all(|s| s.status == StepRunStatus::Succeeded) {
            RunEvent::Complete
        } else {
            RunEvent::CompleteWithFailures
        }
    }
}

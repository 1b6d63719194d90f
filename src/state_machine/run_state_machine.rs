use super::errors::{StateMachineError, StateMachineResult};
use super::events::RunEvent;
use super::states::RunStatus;

/// Transition table for a run's lifecycle
pub struct RunStateMachine;

impl RunStateMachine {
    pub fn determine_target_state(
        current_state: RunStatus,
        event: &RunEvent,
    ) -> StateMachineResult<RunStatus> {
        let target = match (current_state, event) {
            (RunStatus::Pending, RunEvent::Start) => RunStatus::Running,

            (RunStatus::Running, RunEvent::Complete) => RunStatus::Succeeded,
            (RunStatus::Running, RunEvent::CompleteWithFailures) => RunStatus::PartiallyFailed,

            // Internal errors can surface before the first step is dispatched
            (RunStatus::Pending | RunStatus::Running, RunEvent::Fail(_)) => RunStatus::Failed,
            (RunStatus::Pending | RunStatus::Running, RunEvent::Cancel) => RunStatus::Cancelled,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

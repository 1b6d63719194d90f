use super::errors::{StateMachineError, StateMachineResult};
use super::events::StepEvent;
use super::states::StepRunStatus;

/// Transition table for a single step's lifecycle.
///
/// ```text
/// Pending --enqueue--> Ready --start--> Running --complete--> Succeeded
///    ^                                     |
///    +-------------- retry ----------------+--> FailedOptional | FailedFatal | TimedOut
/// Pending --skip--> Skipped
/// Pending | Ready | Running --cancel--> Cancelled
/// ```
pub struct StepStateMachine;

impl StepStateMachine {
    /// Determine the target state for `event`, or reject the transition
    pub fn determine_target_state(
        current_state: StepRunStatus,
        event: &StepEvent,
    ) -> StateMachineResult<StepRunStatus> {
        let target = match (current_state, event) {
            (StepRunStatus::Pending, StepEvent::Enqueue) => StepRunStatus::Ready,
            (StepRunStatus::Ready, StepEvent::Start) => StepRunStatus::Running,

            (StepRunStatus::Running, StepEvent::Complete) => StepRunStatus::Succeeded,
            (StepRunStatus::Running, StepEvent::Retry(_)) => StepRunStatus::Pending,
            (StepRunStatus::Running, StepEvent::FailOptional(_)) => StepRunStatus::FailedOptional,
            (StepRunStatus::Running, StepEvent::FailFatal(_)) => StepRunStatus::FailedFatal,
            (StepRunStatus::Running, StepEvent::TimeOut(_)) => StepRunStatus::TimedOut,

            (StepRunStatus::Pending, StepEvent::Skip(_)) => StepRunStatus::Skipped,

            (StepRunStatus::Pending | StepRunStatus::Ready | StepRunStatus::Running, StepEvent::Cancel) => {
                StepRunStatus::Cancelled
            }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepErrorDetail;

    fn detail() -> StepErrorDetail {
        StepErrorDetail::internal("boom")
    }

    #[test]
    fn test_happy_path() {
        let mut state = StepRunStatus::Pending;
        for event in [StepEvent::Enqueue, StepEvent::Start, StepEvent::Complete] {
            state = StepStateMachine::determine_target_state(state, &event).unwrap();
        }
        assert_eq!(state, StepRunStatus::Succeeded);
    }

    #[test]
    fn test_retry_returns_to_pending() {
        let state =
            StepStateMachine::determine_target_state(StepRunStatus::Running, &StepEvent::Retry(detail()))
                .unwrap();
        assert_eq!(state, StepRunStatus::Pending);
    }

    #[test]
    fn test_exhaustion_targets() {
        let cases = [
            (StepEvent::FailOptional(detail()), StepRunStatus::FailedOptional),
            (StepEvent::FailFatal(detail()), StepRunStatus::FailedFatal),
            (StepEvent::TimeOut(detail()), StepRunStatus::TimedOut),
        ];
        for (event, expected) in cases {
            assert_eq!(
                StepStateMachine::determine_target_state(StepRunStatus::Running, &event).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn test_cancel_from_any_non_terminal_state() {
        for state in [StepRunStatus::Pending, StepRunStatus::Ready, StepRunStatus::Running] {
            assert_eq!(
                StepStateMachine::determine_target_state(state, &StepEvent::Cancel).unwrap(),
                StepRunStatus::Cancelled
            );
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let terminal = [
            StepRunStatus::Succeeded,
            StepRunStatus::FailedOptional,
            StepRunStatus::FailedFatal,
            StepRunStatus::Skipped,
            StepRunStatus::TimedOut,
            StepRunStatus::Cancelled,
        ];
        for state in terminal {
            let err = StepStateMachine::determine_target_state(state, &StepEvent::Cancel).unwrap_err();
            assert!(matches!(err, StateMachineError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(StepStateMachine::determine_target_state(StepRunStatus::Pending, &StepEvent::Start).is_err());
        assert!(StepStateMachine::determine_target_state(StepRunStatus::Ready, &StepEvent::Complete).is_err());
        assert!(
            StepStateMachine::determine_target_state(StepRunStatus::Running, &StepEvent::Skip(detail()))
                .is_err()
        );
    }
}

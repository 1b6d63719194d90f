use hunt_core::events::{ProgressSink, PublishError, RunTransition, StepTransition};
use parking_lot::Mutex;

/// Progress sink that keeps every transition it sees
#[derive(Default)]
pub struct RecordingSink {
    pub steps: Mutex<Vec<StepTransition>>,
    pub runs: Mutex<Vec<RunTransition>>,
}

impl RecordingSink {
    pub fn step_transitions_for(&self, step_id: &str) -> Vec<StepTransition> {
        self.steps
            .lock()
            .iter()
            .filter(|t| t.step_id == step_id)
            .cloned()
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn on_step_transition(&self, transition: &StepTransition) -> Result<(), PublishError> {
        self.steps.lock().push(transition.clone());
        Ok(())
    }

    fn on_run_transition(&self, transition: &RunTransition) -> Result<(), PublishError> {
        self.runs.lock().push(transition.clone());
        Ok(())
    }
}

/// Progress sink that rejects everything
pub struct FailingSink;

impl ProgressSink for FailingSink {
    fn on_step_transition(&self, _transition: &StepTransition) -> Result<(), PublishError> {
        Err(PublishError::Rejected("storage unavailable".to_string()))
    }

    fn on_run_transition(&self, _transition: &RunTransition) -> Result<(), PublishError> {
        Err(PublishError::Rejected("storage unavailable".to_string()))
    }
}

// State machine module for hunt orchestration
//
// Pure transition tables for steps and runs. The scheduling loop owns the
// actual state records and consults these tables before every change.

pub mod errors;
pub mod events;
pub mod run_state_machine;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{RunEvent, StepEvent};
pub use run_state_machine::RunStateMachine;
pub use states::{RunStatus, StepRunStatus};
pub use step_state_machine::StepStateMachine;

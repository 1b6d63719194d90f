//! # Models
//!
//! Static, authored data handed to the orchestrator: step declarations and the
//! run definitions that group them.

pub mod run_definition;
pub mod step_declaration;

pub use run_definition::RunDefinition;
pub use step_declaration::StepDeclaration;

use crate::resolution::PathSyntaxError;
use thiserror::Error;

/// Structural problems found while building a run graph. Any of these stops the
/// run before a single step is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphValidationError {
    #[error("Run definition declares no steps")]
    EmptyDefinition,

    #[error("Invalid step id '{step_id}': {reason}")]
    InvalidStepId {
        step_id: String,
        reason: &'static str,
    },

    #[error("Step id '{step_id}' is reserved")]
    ReservedStepId { step_id: String },

    #[error("Duplicate step id '{step_id}'")]
    DuplicateStepId { step_id: String },

    #[error("Step '{step_id}' depends on unknown step '{dependency}'")]
    UnknownDependency { step_id: String, dependency: String },

    #[error("Dependency cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Step '{step_id}' parameter '{parameter}' has an invalid address: {source}")]
    InvalidParameterPath {
        step_id: String,
        parameter: String,
        #[source]
        source: PathSyntaxError,
    },

    #[error("Step '{step_id}' parameter '{parameter}' references unknown step '{reference}'")]
    UnknownReference {
        step_id: String,
        parameter: String,
        reference: String,
    },

    #[error(
        "Step '{step_id}' parameter '{parameter}' reads from '{reference}', which is not among its dependencies"
    )]
    UndeclaredDependency {
        step_id: String,
        parameter: String,
        reference: String,
    },
}

impl GraphValidationError {
    /// Step ids implicated by this error
    pub fn step_ids(&self) -> Vec<&str> {
        match self {
            Self::EmptyDefinition => Vec::new(),
            Self::InvalidStepId { step_id, .. }
            | Self::ReservedStepId { step_id }
            | Self::DuplicateStepId { step_id }
            | Self::InvalidParameterPath { step_id, .. } => vec![step_id.as_str()],
            Self::UnknownDependency {
                step_id,
                dependency,
            } => vec![step_id.as_str(), dependency.as_str()],
            Self::Cycle { path } => {
                let mut ids: Vec<&str> = path.iter().map(String::as_str).collect();
                // The closing repeat of the first node
                if ids.len() > 1 {
                    ids.pop();
                }
                ids
            }
            Self::UnknownReference {
                step_id, reference, ..
            }
            | Self::UndeclaredDependency {
                step_id, reference, ..
            } => vec![step_id.as_str(), reference.as_str()],
        }
    }
}

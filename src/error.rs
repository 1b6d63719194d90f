//! Error types for the hunt orchestrator.
//!
//! Errors fall into two families. Run-level errors ([`HuntError`]) are surfaced to
//! the caller of the control surface and never retried. Step-level errors
//! ([`StepError`]) are absorbed by the retry/optional machinery and end up as a
//! [`StepErrorDetail`] on the step's run state.

use crate::config::ConfigurationError;
use crate::graph::GraphValidationError;
use crate::resolution::PathResolutionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Run-level errors returned by the orchestrator's public operations
#[derive(Debug, Error)]
pub enum HuntError {
    #[error("Graph validation error: {0}")]
    GraphValidation(#[from] GraphValidationError),
    #[error("Run {run_id} not found")]
    RunNotFound { run_id: Uuid },
    #[error("Run {run_id} is still active (status {status})")]
    RunStillActive { run_id: Uuid, status: String },
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Invalid run definition: {0}")]
    InvalidDefinition(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for HuntError {
    fn from(error: serde_json::Error) -> Self {
        HuntError::InvalidDefinition(format!("JSON deserialization error: {error}"))
    }
}

pub type HuntResult<T> = std::result::Result<T, HuntError>;

/// Failure reported by a Step Runner Adapter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("No analysis unit registered under '{unit_name}'")]
    UnknownUnit { unit_name: String },
    #[error("Unit '{unit_name}' rejected its parameters: {reason}")]
    InvalidParameters { unit_name: String, reason: String },
    #[error("Unit '{unit_name}' failed: {message}")]
    Failed { unit_name: String, message: String },
}

impl AdapterError {
    pub fn failed(unit_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            unit_name: unit_name.into(),
            message: message.into(),
        }
    }
}

/// Per-step failures. All of them are recoverable except `Cancelled`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error("Parameter resolution failed for '{parameter}': {source}")]
    PathResolution {
        parameter: String,
        #[source]
        source: PathResolutionError,
    },
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("Step timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },
    #[error("Step was cancelled")]
    Cancelled,
    #[error("Output of upstream step '{upstream}' is unavailable")]
    UpstreamUnavailable { upstream: String },
}

impl StepError {
    pub fn kind(&self) -> StepErrorKind {
        match self {
            Self::PathResolution { .. } => StepErrorKind::PathResolution,
            Self::Adapter(_) => StepErrorKind::Adapter,
            Self::Timeout { .. } => StepErrorKind::Timeout,
            Self::Cancelled => StepErrorKind::Cancellation,
            Self::UpstreamUnavailable { .. } => StepErrorKind::Upstream,
        }
    }

    /// Whether another attempt may be made after this failure
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::UpstreamUnavailable { .. })
    }

    pub fn detail(&self) -> StepErrorDetail {
        StepErrorDetail {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    PathResolution,
    Adapter,
    Timeout,
    Cancellation,
    Upstream,
    Internal,
}

impl fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathResolution => write!(f, "path_resolution"),
            Self::Adapter => write!(f, "adapter"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancellation => write!(f, "cancellation"),
            Self::Upstream => write!(f, "upstream"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Serializable record of the last error a step saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepErrorDetail {
    pub kind: StepErrorKind,
    pub message: String,
}

impl StepErrorDetail {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: StepErrorKind::Internal,
            message: message.into(),
        }
    }

    /// A step that will never run because of how an upstream step ended
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: StepErrorKind::Upstream,
            message: message.into(),
        }
    }
}

impl fmt::Display for StepErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

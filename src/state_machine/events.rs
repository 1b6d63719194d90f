use crate::error::StepErrorDetail;
use serde::{Deserialize, Serialize};

/// Events that can trigger step state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepEvent {
    /// Dependencies resolved; hand the step to the executor
    Enqueue,
    /// An execution slot was acquired and the attempt began
    Start,
    /// The attempt produced a result
    Complete,
    /// The attempt failed but attempts remain
    Retry(StepErrorDetail),
    /// An optional step ran out of attempts
    FailOptional(StepErrorDetail),
    /// A required step ran out of attempts
    FailFatal(StepErrorDetail),
    /// A required step ran out of attempts and the last one hit its deadline
    TimeOut(StepErrorDetail),
    /// An upstream requirement cannot be met
    Skip(StepErrorDetail),
    /// Run-level cancellation
    Cancel,
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Enqueue => "enqueue",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Retry(_) => "retry",
            Self::FailOptional(_) => "fail_optional",
            Self::FailFatal(_) => "fail_fatal",
            Self::TimeOut(_) => "time_out",
            Self::Skip(_) => "skip",
            Self::Cancel => "cancel",
        }
    }

    /// Extract the error carried by failure-like events
    pub fn error_detail(&self) -> Option<&StepErrorDetail> {
        match self {
            Self::Retry(detail)
            | Self::FailOptional(detail)
            | Self::FailFatal(detail)
            | Self::TimeOut(detail)
            | Self::Skip(detail) => Some(detail),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete
                | Self::FailOptional(_)
                | Self::FailFatal(_)
                | Self::TimeOut(_)
                | Self::Skip(_)
                | Self::Cancel
        )
    }
}

/// Events that can trigger run state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunEvent {
    Start,
    Complete,
    CompleteWithFailures,
    Fail(String),
    Cancel,
}

impl RunEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::CompleteWithFailures => "complete_with_failures",
            Self::Fail(_) => "fail",
            Self::Cancel => "cancel",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}

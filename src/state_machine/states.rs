use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-step lifecycle within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepRunStatus {
    /// Waiting on dependencies (or on a retry delay)
    #[default]
    Pending,
    /// Dependencies resolved, dispatched and waiting for an execution slot
    Ready,
    /// The analysis unit is executing
    Running,
    /// Completed and recorded a result
    Succeeded,
    /// An optional step exhausted its attempts; dependents are not blocked
    FailedOptional,
    /// A required step exhausted its attempts
    FailedFatal,
    /// Never ran because an upstream requirement failed
    Skipped,
    /// A required step whose final attempt hit its deadline
    TimedOut,
    /// Stopped by a run-level cancellation
    Cancelled,
}

impl StepRunStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded
                | Self::FailedOptional
                | Self::FailedFatal
                | Self::Skipped
                | Self::TimedOut
                | Self::Cancelled
        )
    }

    /// Check if the step has been handed to the executor
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }

    /// Check if a required step in this state fails the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FailedFatal | Self::TimedOut)
    }

    /// Check if this state unblocks dependents regardless of the step's optionality
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Succeeded | Self::FailedOptional)
    }
}

impl fmt::Display for StepRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::FailedOptional => write!(f, "failed_optional"),
            Self::FailedFatal => write!(f, "failed_fatal"),
            Self::Skipped => write!(f, "skipped"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for StepRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "failed_optional" => Ok(Self::FailedOptional),
            "failed_fatal" => Ok(Self::FailedFatal),
            "skipped" => Ok(Self::Skipped),
            "timed_out" => Ok(Self::TimedOut),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid step run status: {s}")),
        }
    }
}

/// Lifecycle of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    /// Every step succeeded
    Succeeded,
    /// Nothing fatal, but at least one step failed optionally or was skipped
    PartiallyFailed,
    /// A required step failed, or the engine hit an internal error
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::PartiallyFailed | Self::Failed | Self::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::PartiallyFailed => write!(f, "partially_failed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "succeeded" => Ok(Self::Succeeded),
            "partially_failed" => Ok(Self::PartiallyFailed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid run status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_terminal_check() {
        assert!(StepRunStatus::Succeeded.is_terminal());
        assert!(StepRunStatus::FailedOptional.is_terminal());
        assert!(StepRunStatus::FailedFatal.is_terminal());
        assert!(StepRunStatus::Skipped.is_terminal());
        assert!(StepRunStatus::TimedOut.is_terminal());
        assert!(StepRunStatus::Cancelled.is_terminal());
        assert!(!StepRunStatus::Pending.is_terminal());
        assert!(!StepRunStatus::Ready.is_terminal());
        assert!(!StepRunStatus::Running.is_terminal());
    }

    #[test]
    fn test_step_status_dependency_satisfaction() {
        assert!(StepRunStatus::Succeeded.satisfies_dependencies());
        assert!(StepRunStatus::FailedOptional.satisfies_dependencies());
        assert!(!StepRunStatus::FailedFatal.satisfies_dependencies());
        assert!(!StepRunStatus::TimedOut.satisfies_dependencies());
        assert!(!StepRunStatus::Running.satisfies_dependencies());
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(StepRunStatus::FailedOptional.to_string(), "failed_optional");
        assert_eq!(
            "timed_out".parse::<StepRunStatus>().unwrap(),
            StepRunStatus::TimedOut
        );
        assert!("finished".parse::<StepRunStatus>().is_err());

        assert_eq!(RunStatus::PartiallyFailed.to_string(), "partially_failed");
        assert_eq!("cancelled".parse::<RunStatus>().unwrap(), RunStatus::Cancelled);
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&StepRunStatus::FailedFatal).unwrap();
        assert_eq!(json, "\"failed_fatal\"");

        let parsed: RunStatus = serde_json::from_str("\"partially_failed\"").unwrap();
        assert_eq!(parsed, RunStatus::PartiallyFailed);
    }

    #[test]
    fn test_run_status_terminal_check() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Succeeded.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
    }
}

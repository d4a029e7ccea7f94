//! Outcome of executing one action.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text::{MAX_OUTPUT_LEN, truncate_in_place};
use crate::time::{Timestamp, now};

/// Lifecycle state of an action execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Timeout,
    Cancelled,
    /// Handed to the asynchronous queue; the real outcome arrives later.
    Queued,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Timeout => "Timeout",
            Self::Cancelled => "Cancelled",
            Self::Queued => "Queued",
        })
    }
}

/// Result record of one execution. `output` holds at most
/// [`MAX_OUTPUT_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub exit_code: i32,
    pub output: String,
    pub duration_ms: u64,
    pub completed_at: Timestamp,
}

impl ActionResult {
    /// Build a result, truncating `output` to the budget.
    #[must_use]
    pub fn new(status: ActionStatus, output: impl Into<String>) -> Self {
        let mut output = output.into();
        truncate_in_place(&mut output, MAX_OUTPUT_LEN);
        Self {
            status,
            exit_code: 0,
            output,
            duration_ms: 0,
            completed_at: now(),
        }
    }

    #[must_use]
    pub fn success(output: impl Into<String>) -> Self {
        Self::new(ActionStatus::Success, output)
    }

    #[must_use]
    pub fn failed(output: impl Into<String>) -> Self {
        Self::new(ActionStatus::Failed, output)
    }

    #[must_use]
    pub fn timeout(output: impl Into<String>) -> Self {
        Self::new(ActionStatus::Timeout, output)
    }

    #[must_use]
    pub fn queued(output: impl Into<String>) -> Self {
        Self::new(ActionStatus::Queued, output)
    }

    #[must_use]
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_truncate_output_to_budget() {
        let result = ActionResult::success("o".repeat(1000));
        assert_eq!(result.output.len(), MAX_OUTPUT_LEN);
    }

    #[test]
    fn should_report_success_only_for_success_status() {
        assert!(ActionResult::success("").is_success());
        assert!(!ActionResult::queued("").is_success());
        assert!(!ActionResult::failed("boom").with_exit_code(2).is_success());
    }
}

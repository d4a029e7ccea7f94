//! Counters exposed by the action manager and the rule engine.

use serde::{Deserialize, Serialize};

use crate::automation::ActionKind;
use crate::result::{ActionResult, ActionStatus};
use crate::time::Timestamp;

/// Aggregate action execution statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStats {
    pub total_executed: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub total_timeout: u64,
    pub ssh_commands: u64,
    pub led_actions: u64,
    pub gpio_actions: u64,
    /// Deepest the asynchronous queue has been.
    pub queue_high_water: usize,
}

impl ActionStats {
    /// Account for one finished execution.
    pub fn record(&mut self, kind: &ActionKind, result: &ActionResult) {
        self.total_executed += 1;
        match result.status {
            ActionStatus::Success => self.total_success += 1,
            ActionStatus::Timeout => self.total_timeout += 1,
            _ => self.total_failed += 1,
        }
        match kind {
            ActionKind::SshCmd { .. } => self.ssh_commands += 1,
            ActionKind::Led { .. } => self.led_actions += 1,
            ActionKind::Gpio { .. } => self.gpio_actions += 1,
            _ => {}
        }
    }
}

/// Rule engine statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_evaluations: u64,
    pub total_triggers: u64,
    pub total_actions: u64,
    pub failed_actions: u64,
    pub last_evaluation_time: Option<Timestamp>,
}

/// Snapshot of the asynchronous queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Entries waiting to be picked up.
    pub pending: usize,
    /// Entries currently executing.
    pub running: usize,
}

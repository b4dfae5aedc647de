use serde::{Deserialize, Serialize};

use crate::domain::entity::timer::EpochMillis;

/// An active break. There is no paused form: a break either exists or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakState {
    pub break_start: EpochMillis,
    /// The task that was being worked on when the break began.
    #[serde(default)]
    pub task_id: Option<String>,
}

impl BreakState {
    /// Creates a new [`BreakState`] starting at `now`.
    pub fn new(now: EpochMillis, task_id: Option<String>) -> Self {
        Self {
            break_start: now,
            task_id,
        }
    }

    /// Whole seconds since the break began.
    pub fn elapsed(&self, now: EpochMillis) -> u64 {
        if now > self.break_start {
            ((now - self.break_start) / 1000) as u64
        } else {
            0
        }
    }
}

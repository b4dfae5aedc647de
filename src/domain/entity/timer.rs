use serde::{Deserialize, Serialize};

/// An absolute instant in milliseconds since the Unix epoch.
pub type EpochMillis = i64;

/// The state of one work interval, anchored on wall-clock timestamps so that
/// it can be stored and recovered across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub is_running: bool,
    pub start_timestamp: Option<EpochMillis>,
    pub accumulated: u64,
    pub current_task_id: Option<String>,
    pub current_task_name: Option<String>,
    #[serde(default)]
    pub started_at: Option<EpochMillis>,
}

impl TimerState {
    /// Seconds measured so far in the current interval.
    pub fn elapsed(&self, now: EpochMillis) -> u64 {
        self.accumulated + self.running_segment(now)
    }

    /// Begin a fresh interval for the given task. Any unsaved time from the
    /// previous interval is discarded.
    pub fn start(&mut self, task_id: String, task_name: String, now: EpochMillis) {
        *self = Self {
            is_running: true,
            start_timestamp: Some(now),
            accumulated: 0,
            current_task_id: Some(task_id),
            current_task_name: Some(task_name),
            started_at: Some(now),
        };
    }

    /// Fold the running segment into `accumulated`. Returns `false` if the
    /// timer was not running.
    pub fn pause(&mut self, now: EpochMillis) -> bool {
        if !self.is_running {
            return false;
        }
        self.accumulated += self.running_segment(now);
        self.start_timestamp = None;
        self.is_running = false;
        true
    }

    /// Open a new running segment. Returns `false` if the timer was already
    /// running, in which case the current segment is left untouched.
    pub fn resume(&mut self, now: EpochMillis) -> bool {
        if self.is_running {
            return false;
        }
        self.start_timestamp = Some(now);
        self.is_running = true;
        true
    }

    /// Close the interval and return its total length in seconds. The task
    /// identity is kept until [`TimerState::reset`].
    pub fn stop(&mut self, now: EpochMillis) -> u64 {
        let total = self.elapsed(now);
        self.is_running = false;
        self.start_timestamp = None;
        self.accumulated = 0;
        self.started_at = None;
        total
    }

    /// Zero every field, including the task identity.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whole seconds of the segment that is currently running.
    fn running_segment(&self, now: EpochMillis) -> u64 {
        match (self.is_running, self.start_timestamp) {
            (true, Some(start)) if now > start => ((now - start) / 1000) as u64,
            _ => 0,
        }
    }
}

/// Render seconds compactly: `H:MM:SS`, `M:SS` or a bare `S`.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else if minutes > 0 {
        format!("{minutes}:{secs:02}")
    } else {
        secs.to_string()
    }
}

use chrono::NaiveDate;

use crate::domain::entity::TaskDraft;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start timing a task
    Start { task: String },
    /// Pause the work timer
    Pause,
    /// Resume the work timer
    Resume,
    /// Stop the work timer and record the interval
    Stop,
    /// Record the interval and mark its task completed today
    Complete,
    /// Discard the current interval
    Reset,
    /// Show the timer's status
    Status { watch: bool },
    /// Start or end a break
    Break(BreakCommand),
    /// Manage tasks
    Task(TaskCommand),
    /// Send queued changes to the remote store
    Sync { watch: bool },
    /// Print every task, session and completion as JSON
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakCommand {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskCommand {
    /// Create a task
    Add(TaskDraft),
    /// List tasks, optionally only those scheduled on a day
    List { date: Option<NaiveDate> },
    /// Delete a task
    Remove { task: String },
    /// Schedule a task on a day
    Plan { task: String, date: NaiveDate },
    /// Toggle the completion of a task on a day, today by default
    Done {
        task: String,
        date: Option<NaiveDate>,
    },
}

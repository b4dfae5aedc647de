use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifies the completion flag of one task on one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionKey {
    pub task_id: String,
    pub date: NaiveDate,
}

impl CompletionKey {
    /// Creates a new [`CompletionKey`].
    pub fn new(task_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            task_id: task_id.into(),
            date,
        }
    }
}

/// A row of the remote completions table. The natural key is
/// `(user_id, task_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub user_id: String,
    pub task_id: String,
    pub date: NaiveDate,
    pub completed: bool,
}

impl Completion {
    /// Returns the in-memory key of this row.
    pub fn key(&self) -> CompletionKey {
        CompletionKey::new(self.task_id.clone(), self.date)
    }
}

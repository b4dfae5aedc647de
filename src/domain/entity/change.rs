use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::timer::EpochMillis;

/// A mapping from column name to value, shaped per table.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Remote tables the tracker writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    #[serde(rename = "tasks")]
    Tasks,
    #[serde(rename = "sessions")]
    Sessions,
    #[serde(rename = "task_completions")]
    Completions,
}

impl Table {
    /// Returns the table name used by the remote store.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Sessions => "sessions",
            Self::Completions => "task_completions",
        }
    }

    /// Columns which identify a row independently of its `id`.
    pub fn natural_key(self) -> &'static [&'static str] {
        match self {
            Self::Tasks | Self::Sessions => &["id"],
            Self::Completions => &["user_id", "task_id", "date"],
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// The kind of mutation a [`PendingChange`] replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Upsert,
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Insert => f.write_str("insert"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
            Self::Upsert => f.write_str("upsert"),
        }
    }
}

/// A mutation that could not reach the remote store and waits in the
/// durable queue.
///
/// For [`ChangeKind::Update`] the data carries the target `id` next to the
/// changed columns; for [`ChangeKind::Delete`] it carries only the `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub id: Uuid,
    pub table: Table,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub data: Row,
    pub timestamp: EpochMillis,
}

impl PendingChange {
    /// Creates a new [`PendingChange`] with a fresh identifier.
    pub fn new(table: Table, kind: ChangeKind, data: Row, timestamp: EpochMillis) -> Self {
        Self {
            id: Uuid::new_v4(),
            table,
            kind,
            data,
            timestamp,
        }
    }

    /// Returns the identifier of the targeted row, if the payload has one.
    pub fn row_id(&self) -> Option<&str> {
        self.data.get("id").and_then(serde_json::Value::as_str)
    }

    /// Rewrite references to a renamed row. Returns `true` if anything
    /// changed.
    pub fn retarget(&mut self, from: &str, to: &str) -> bool {
        let mut changed = false;
        for column in ["id", "task_id"] {
            if let Some(value) = self.data.get_mut(column) {
                if value.as_str() == Some(from) {
                    *value = serde_json::Value::String(to.to_owned());
                    changed = true;
                }
            }
        }
        changed
    }
}

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::domain::entity::timer::EpochMillis;

/// The length of a recorded session in seconds. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SessionDuration(u64);

impl SessionDuration {
    /// Try to create a [`SessionDuration`] from a number of seconds.
    ///
    /// # Errors
    ///
    /// This function will return an error if the number is zero.
    pub fn try_new(seconds: u64) -> Result<Self, TryNewSessionDurationError> {
        ensure!(seconds > 0, ZeroSnafu);
        Ok(Self(seconds))
    }

    /// Returns the number of seconds.
    pub fn seconds(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for SessionDuration {
    type Error = TryNewSessionDurationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<SessionDuration> for u64 {
    fn from(value: SessionDuration) -> Self {
        value.0
    }
}

/// An error type of creating a [`SessionDuration`].
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
#[non_exhaustive]
pub enum TryNewSessionDurationError {
    #[snafu(display("Session duration must be greater than zero"))]
    #[non_exhaustive]
    Zero,
}

/// What a session was spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Work,
    Break,
}

impl Display for SessionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Work => f.write_str("work"),
            Self::Break => f.write_str("break"),
        }
    }
}

/// A completed work or break interval. Sessions are never modified once
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub task_name: String,
    pub date: NaiveDate,
    pub duration: SessionDuration,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub timestamp: EpochMillis,
}

impl Session {
    /// Build a [`Session`] from a draft and an identifier.
    pub fn from_draft(id: String, draft: SessionDraft) -> Self {
        Self {
            id,
            task_id: draft.task_id,
            task_name: draft.task_name,
            date: draft.date,
            duration: draft.duration,
            kind: draft.kind,
            timestamp: draft.timestamp,
        }
    }
}

/// A session that has not been given an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub task_id: Option<String>,
    pub task_name: String,
    pub date: NaiveDate,
    pub duration: SessionDuration,
    pub kind: SessionKind,
    pub timestamp: EpochMillis,
}

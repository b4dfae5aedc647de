use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A named unit of work which may be scheduled on several days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub planned_duration: Option<u32>,
    #[serde(default)]
    pub start_hour: Option<u8>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dates: Vec<NaiveDate>,
}

impl Task {
    /// Build a [`Task`] from a draft and an identifier.
    pub fn from_draft(id: String, draft: TaskDraft) -> Self {
        let TaskDraft {
            name,
            category,
            planned_duration,
            start_hour,
            dates,
        } = draft;
        let mut task = Self {
            id,
            name,
            category,
            planned_duration,
            start_hour,
            dates: Vec::with_capacity(dates.len()),
        };
        for day in dates {
            task.schedule(day);
        }
        task
    }

    /// Returns `true` if the task is scheduled on `day`.
    pub fn is_scheduled(&self, day: NaiveDate) -> bool {
        self.dates.contains(&day)
    }

    /// Append `day` to the schedule. Returns `false` if it was already there.
    pub fn schedule(&mut self, day: NaiveDate) -> bool {
        if self.is_scheduled(day) {
            return false;
        }
        self.dates.push(day);
        true
    }

    /// Overwrite the fields present in `patch`.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(category) = &patch.category {
            self.category = Some(category.clone());
        }
        if let Some(planned) = patch.planned_duration {
            self.planned_duration = Some(planned);
        }
        if let Some(hour) = patch.start_hour {
            self.start_hour = Some(hour);
        }
        if let Some(dates) = &patch.dates {
            self.dates.clear();
            for day in dates {
                self.schedule(*day);
            }
        }
    }
}

/// A task that has not been given an identifier yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub category: Option<String>,
    pub planned_duration: Option<u32>,
    pub start_hour: Option<u8>,
    pub dates: Vec<NaiveDate>,
}

impl TaskDraft {
    /// Creates a new [`TaskDraft`] with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A partial update of a [`Task`]. Absent fields are left unchanged. Its
/// serialized form only carries the changed columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_hour: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<NaiveDate>>,
}

impl TaskPatch {
    /// A patch that only replaces the schedule.
    pub fn dates(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates: Some(dates),
            ..Default::default()
        }
    }

    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.planned_duration.is_none()
            && self.start_hour.is_none()
            && self.dates.is_none()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<NaiveDate>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

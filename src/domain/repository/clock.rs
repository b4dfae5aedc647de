use chrono::{DateTime, Local, NaiveDate};

use crate::domain::entity::EpochMillis;

/// An abstract interface for reading the wall clock.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync + 'static {
    /// Current instant in milliseconds since the Unix epoch.
    fn now(&self) -> EpochMillis;
}

/// The local calendar day containing `instant`.
pub fn local_day(instant: EpochMillis) -> NaiveDate {
    DateTime::from_timestamp_millis(instant)
        .unwrap_or_default()
        .with_timezone(&Local)
        .date_naive()
}

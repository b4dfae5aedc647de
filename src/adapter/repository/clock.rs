use chrono::Utc;

use crate::domain::entity::EpochMillis;
use crate::domain::repository::Clock;

/// A [`Clock`] reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> EpochMillis {
        Utc::now().timestamp_millis()
    }
}

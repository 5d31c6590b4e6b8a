use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Time left until a session ends, broken down for display. Admission never
/// looks at this; the server decides with its own clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    pub fn until(end_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let total = (end_time - now).max(Duration::zero()).num_seconds();

        Self {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        }
    }

    pub fn is_over(&self) -> bool {
        *self == Self::default()
    }
}

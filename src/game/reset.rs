use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};

/// How often a habit's counters return to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetCadence {
    Daily,
    Weekly,
    Monthly,
}

impl ResetCadence {
    /// Moment the counters are due to reset after a reset at `last_reset`
    pub fn next_reset(&self, last_reset: DateTime<Utc>) -> DateTime<Utc> {
        let next = match self {
            ResetCadence::Daily => last_reset.checked_add_days(Days::new(1)),
            ResetCadence::Weekly => last_reset.checked_add_days(Days::new(7)),
            ResetCadence::Monthly => last_reset.checked_add_months(Months::new(1)),
        };

        next.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_due(&self, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= self.next_reset(last_reset)
    }

    /// Seconds remaining until the next reset, never negative
    pub fn seconds_until_reset(&self, last_reset: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (self.next_reset(last_reset) - now).num_seconds().max(0)
    }
}

impl core::fmt::Display for ResetCadence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ResetCadence::Daily => "daily",
            ResetCadence::Weekly => "weekly",
            ResetCadence::Monthly => "monthly",
        };

        write!(f, "{s}")
    }
}

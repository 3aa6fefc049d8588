use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::Document;
use crate::db::store::Collection;
use crate::game::prelude::ResetCadence;

/// Which kinds of occurrence a habit accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitKind {
    Positive,
    Negative,
    Both,
    None,
}

impl HabitKind {
    pub fn flags(&self) -> (bool, bool) {
        match self {
            HabitKind::Positive => (true, false),
            HabitKind::Negative => (false, true),
            HabitKind::Both => (true, true),
            HabitKind::None => (false, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub positive: bool,
    #[serde(default)]
    pub negative: bool,
    #[serde(default)]
    pub positive_count: u64,
    /// Number of negative occurrences since the last reset
    #[serde(default)]
    pub negative_count: u64,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub reset_cadence: Option<ResetCadence>,
    #[serde(default)]
    pub last_reset: Option<DateTime<Utc>>,
}

impl Habit {
    /// A new habit accepts neither kind of occurrence until edited
    pub fn new(title: &str, order: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: String::new(),
            positive: false,
            negative: false,
            positive_count: 0,
            negative_count: 0,
            order,
            reset_cadence: None,
            last_reset: None,
        }
    }

    pub fn kind(&self) -> HabitKind {
        match (self.positive, self.negative) {
            (true, true) => HabitKind::Both,
            (true, false) => HabitKind::Positive,
            (false, true) => HabitKind::Negative,
            (false, false) => HabitKind::None,
        }
    }

    pub fn set_kind(&mut self, kind: HabitKind) {
        (self.positive, self.negative) = kind.flags();
    }

    /// Changes the reset cadence; a newly scheduled cadence starts counting from `now`
    pub fn set_cadence(&mut self, cadence: Option<ResetCadence>, now: DateTime<Utc>) {
        if cadence.is_some() && (self.reset_cadence != cadence || self.last_reset.is_none()) {
            self.last_reset = Some(now);
        }

        if cadence.is_none() {
            self.last_reset = None;
        }

        self.reset_cadence = cadence;
    }

    /// Zeroes the counters if the reset cadence has elapsed, returning whether a reset happened
    pub fn reset_if_due(&mut self, now: DateTime<Utc>) -> bool {
        let (Some(cadence), Some(last_reset)) = (self.reset_cadence, self.last_reset) else {
            return false;
        };

        if !cadence.is_due(last_reset, now) {
            return false;
        }

        tracing::debug!(habit_id = self.id, %cadence, "resetting habit counters");
        self.positive_count = 0;
        self.negative_count = 0;
        self.last_reset = Some(now);

        true
    }

    pub fn seconds_until_reset(&self, now: DateTime<Utc>) -> Option<i64> {
        let (cadence, last_reset) = (self.reset_cadence?, self.last_reset?);
        Some(cadence.seconds_until_reset(last_reset, now))
    }

    pub fn view(self, now: DateTime<Utc>) -> HabitView {
        HabitView {
            seconds_until_reset: self.seconds_until_reset(now),
            habit: self,
        }
    }
}

impl Document for Habit {
    const COLLECTION: Collection = Collection::Habits;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Habit as returned to clients, with the time left before its counters reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitView {
    #[serde(flatten)]
    pub habit: Habit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_until_reset: Option<i64>,
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_habit_defaults() {
        let habit = Habit::new("Drink water", 3);

        assert_eq!(habit.kind(), HabitKind::None);
        assert_eq!(habit.order, 3);
        assert!(Uuid::parse_str(&habit.id).is_ok());
    }

    #[test]
    fn test_kind_round_trips_through_flags() {
        let mut habit = Habit::new("Run", 0);
        for kind in [
            HabitKind::Positive,
            HabitKind::Negative,
            HabitKind::Both,
            HabitKind::None,
        ] {
            habit.set_kind(kind);
            assert_eq!(habit.kind(), kind);
        }
    }

    #[test]
    fn test_counters_reset_once_cadence_elapses() {
        let mut habit = Habit::new("Read", 0);
        habit.set_cadence(Some(ResetCadence::Daily), noon());
        habit.positive_count = 4;
        habit.negative_count = 2;

        assert!(!habit.reset_if_due(noon() + Duration::hours(23)));
        assert_eq!(habit.positive_count, 4);

        let later = noon() + Duration::hours(25);
        assert!(habit.reset_if_due(later));
        assert_eq!(habit.positive_count, 0);
        assert_eq!(habit.negative_count, 0);
        assert_eq!(habit.last_reset, Some(later));
    }

    #[test]
    fn test_clearing_cadence_clears_last_reset() {
        let mut habit = Habit::new("Read", 0);
        habit.set_cadence(Some(ResetCadence::Weekly), noon());
        habit.set_cadence(None, noon());

        assert_eq!(habit.last_reset, None);
        assert_eq!(habit.seconds_until_reset(noon()), None);
    }

    #[test]
    fn test_keeping_cadence_keeps_schedule() {
        let mut habit = Habit::new("Read", 0);
        habit.set_cadence(Some(ResetCadence::Weekly), noon());
        habit.set_cadence(Some(ResetCadence::Weekly), noon() + Duration::days(2));

        assert_eq!(habit.last_reset, Some(noon()));
        assert_eq!(
            habit.seconds_until_reset(noon() + Duration::days(2)),
            Some(5 * 86_400)
        );
    }

    #[test]
    fn test_view_flattens_habit() {
        let mut habit = Habit::new("Stretch", 0);
        habit.set_cadence(Some(ResetCadence::Daily), noon());
        let value = serde_json::to_value(habit.view(noon())).unwrap();

        assert_eq!(value["title"], "Stretch");
        assert_eq!(value["reset_cadence"], "daily");
        assert_eq!(value["seconds_until_reset"], 86_400);
    }
}

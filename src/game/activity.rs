use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily activity record used for streak-based badges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    /// Number of distinct days with at least one positive occurrence
    #[serde(default)]
    pub active_days: u32,
    #[serde(default)]
    pub last_active_day: Option<NaiveDate>,
}

impl Activity {
    /// Records a positive occurrence on `day` (the user's local calendar day)
    pub fn record(&mut self, day: NaiveDate) {
        match self.last_active_day {
            Some(last) if day <= last => return,
            Some(last) if last.succ_opt() == Some(day) => self.current_streak += 1,
            _ => self.current_streak = 1,
        }

        self.active_days += 1;
        self.last_active_day = Some(day);
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }

    /// Streak as of `today`; a streak whose last day is before yesterday has lapsed
    pub fn streak_on(&self, today: NaiveDate) -> u32 {
        match self.last_active_day {
            Some(last) if last == today || last.succ_opt() == Some(today) => self.current_streak,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_consecutive_days_extend_streak() {
        let mut activity = Activity::default();
        for d in 1..=7 {
            activity.record(day(d));
        }

        assert_eq!(activity.current_streak, 7);
        assert_eq!(activity.longest_streak, 7);
        assert_eq!(activity.active_days, 7);
    }

    #[test]
    fn test_same_day_is_counted_once() {
        let mut activity = Activity::default();
        activity.record(day(1));
        activity.record(day(1));

        assert_eq!(activity.current_streak, 1);
        assert_eq!(activity.active_days, 1);
    }

    #[test]
    fn test_gap_resets_streak_but_keeps_longest() {
        let mut activity = Activity::default();
        activity.record(day(1));
        activity.record(day(2));
        activity.record(day(3));
        activity.record(day(10));

        assert_eq!(activity.current_streak, 1);
        assert_eq!(activity.longest_streak, 3);
        assert_eq!(activity.active_days, 4);
    }

    #[test]
    fn test_streak_lapses_after_missed_day() {
        let mut activity = Activity::default();
        activity.record(day(1));
        activity.record(day(2));

        assert_eq!(activity.streak_on(day(3)), 2);
        assert_eq!(activity.streak_on(day(4)), 0);
    }
}

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub const COMPLETION_BADGE_ID: &str = "habit-king";

/// Static badge definition from the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub requirement: &'static str,
    pub rule: Rule,
}

/// Unlock condition for a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Level(u32),
    TotalXp(u64),
    Streak(u32),
    /// Streak measured in days; kept separate so the earned badge reports `days_required`
    Days(u32),
    PositiveLogs(u64),
    /// A positive occurrence logged strictly before this local hour
    LoggedBefore(u32),
    /// A positive occurrence logged at or after this local hour
    LoggedFrom(u32),
    /// Every other catalog badge is held
    Completion,
}

pub static CATALOG: [BadgeDef; 15] = [
    BadgeDef {
        id: "novice",
        name: "Novice",
        icon: "🌙",
        requirement: "Complete level 5",
        rule: Rule::Level(5),
    },
    BadgeDef {
        id: "intermediate",
        name: "Intermediate",
        icon: "⭐",
        requirement: "Complete level 10",
        rule: Rule::Level(10),
    },
    BadgeDef {
        id: "xp-hunter",
        name: "XP Hunter",
        icon: "🎯",
        requirement: "Accumulate 10,000 XP",
        rule: Rule::TotalXp(10_000),
    },
    BadgeDef {
        id: "consistent",
        name: "Consistent",
        icon: "🔥",
        requirement: "7 day streak",
        rule: Rule::Streak(7),
    },
    BadgeDef {
        id: "achiever",
        name: "Achiever",
        icon: "✅",
        requirement: "Complete level 15",
        rule: Rule::Level(15),
    },
    BadgeDef {
        id: "dedication",
        name: "Dedication",
        icon: "💪",
        requirement: "Complete level 30",
        rule: Rule::Level(30),
    },
    BadgeDef {
        id: "elite",
        name: "Elite",
        icon: "🏆",
        requirement: "Complete level 50",
        rule: Rule::Level(50),
    },
    BadgeDef {
        id: "legendary",
        name: "Legendary",
        icon: "⚡",
        requirement: "Complete level 70",
        rule: Rule::Level(70),
    },
    BadgeDef {
        id: "unstoppable",
        name: "Unstoppable",
        icon: "⚔️",
        requirement: "Complete level 100",
        rule: Rule::Level(100),
    },
    BadgeDef {
        id: "early-bird",
        name: "Early Bird",
        icon: "🌅",
        requirement: "Log a Habit Before 8:00 AM",
        rule: Rule::LoggedBefore(8),
    },
    BadgeDef {
        id: "night-owl",
        name: "Night Owl",
        icon: "🦉",
        requirement: "Log a Habit After 11:00 PM",
        rule: Rule::LoggedFrom(23),
    },
    BadgeDef {
        id: "habit-lord",
        name: "Habit Lord",
        icon: "⌛",
        requirement: "Log 100 Positive Habits",
        rule: Rule::PositiveLogs(100),
    },
    BadgeDef {
        id: COMPLETION_BADGE_ID,
        name: "Habit King",
        icon: "👑",
        requirement: "Complete all other badges",
        rule: Rule::Completion,
    },
    BadgeDef {
        id: "grandmaster",
        name: "Grandmaster",
        icon: "🎭",
        requirement: "Earn 100,000 XP",
        rule: Rule::TotalXp(100_000),
    },
    BadgeDef {
        id: "marathon-runner",
        name: "Marathon Runner",
        icon: "🏃",
        requirement: "30 day streak",
        rule: Rule::Days(30),
    },
];

pub fn find(id: &str) -> Option<&'static BadgeDef> {
    CATALOG.iter().find(|def| def.id == id)
}

/// An earned badge as stored for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub requirement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_required: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_required: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_required: Option<u32>,
    /// `HH:MM` boundary for time-of-day badges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub earned_at: DateTime<Utc>,
}

impl BadgeDef {
    pub fn earn(&self, earned_at: DateTime<Utc>) -> Badge {
        let mut badge = Badge {
            id: self.id.to_string(),
            name: self.name.to_string(),
            icon: self.icon.to_string(),
            requirement: self.requirement.to_string(),
            xp_required: None,
            level_required: None,
            streak: None,
            days_required: None,
            time: None,
            earned_at,
        };

        match self.rule {
            Rule::Level(level) => badge.level_required = Some(level),
            Rule::TotalXp(xp) => badge.xp_required = Some(xp),
            Rule::Streak(days) => badge.streak = Some(days),
            Rule::Days(days) => badge.days_required = Some(days),
            Rule::LoggedBefore(hour) | Rule::LoggedFrom(hour) => {
                badge.time = Some(format!("{hour:02}:00"))
            }
            Rule::PositiveLogs(_) | Rule::Completion => {}
        }

        badge
    }
}

/// What triggered an evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A positive occurrence logged at the given local time
    PositiveLog(DateTime<FixedOffset>),
    NegativeLog,
}

/// Snapshot of the values the unlock rules read
#[derive(Debug, Clone, Copy)]
pub struct UnlockContext {
    pub level: u32,
    pub total_xp: u64,
    pub streak: u32,
    pub total_positive: u64,
    pub trigger: Trigger,
}

impl Rule {
    fn is_met(&self, ctx: &UnlockContext) -> bool {
        match *self {
            Rule::Level(level) => ctx.level >= level,
            Rule::TotalXp(xp) => ctx.total_xp >= xp,
            Rule::Streak(days) | Rule::Days(days) => ctx.streak >= days,
            Rule::PositiveLogs(count) => ctx.total_positive >= count,
            Rule::LoggedBefore(hour) => {
                matches!(ctx.trigger, Trigger::PositiveLog(at) if at.hour() < hour)
            }
            Rule::LoggedFrom(hour) => {
                matches!(ctx.trigger, Trigger::PositiveLog(at) if at.hour() >= hour)
            }
            // decided separately once the rest of the pass is known
            Rule::Completion => false,
        }
    }
}

/// Returns the catalog badges unlocked by `ctx` that are not already present in `earned`.
///
/// The completion badge is checked after every other rule, so a pass that grants the final
/// outstanding badge also grants the completion badge.
#[instrument(skip(earned), fields(earned_count = earned.len()))]
pub fn evaluate(ctx: &UnlockContext, earned: &[Badge], now: DateTime<Utc>) -> Vec<Badge> {
    let mut held: HashSet<&str> = earned.iter().map(|badge| badge.id.as_str()).collect();
    let mut granted = Vec::new();

    for def in CATALOG.iter() {
        if held.contains(def.id) || !def.rule.is_met(ctx) {
            continue;
        }

        held.insert(def.id);
        granted.push(def.earn(now));
    }

    if !held.contains(COMPLETION_BADGE_ID) && holds_all_others(&held) {
        if let Some(def) = find(COMPLETION_BADGE_ID) {
            granted.push(def.earn(now));
        }
    }

    if !granted.is_empty() {
        tracing::info!(
            granted = ?granted.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            "badges unlocked"
        );
    }

    granted
}

fn holds_all_others(held: &HashSet<&str>) -> bool {
    CATALOG
        .iter()
        .filter(|def| def.id != COMPLETION_BADGE_ID)
        .all(|def| held.contains(def.id))
}

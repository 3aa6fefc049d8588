use chrono::{DateTime, Utc};
use futures::future::try_join;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::constants::{NEGATIVE_LOG_XP, POSITIVE_LOG_GOLD, POSITIVE_LOG_XP};
use crate::db::prelude::{
    AccountRepository, BadgeRepository, Habit, HabitKind, HabitRepository, HabitView,
};
use crate::game::badges;
use crate::game::prelude::{Badge, Progress, ResetCadence, Trigger, UnlockContext};
use crate::tracker::{
    Tracker, TrackerErr, TrackerResult, apply_order, explicit_null, local_offset, local_time,
    validate_title,
};

/// Partial habit update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HabitEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<HabitKind>,
    /// `null` removes the cadence
    #[serde(default, deserialize_with = "explicit_null")]
    pub reset_cadence: Option<Option<ResetCadence>>,
}

/// Everything that changed as a result of logging an occurrence
#[derive(Debug, Clone, Serialize)]
pub struct LogOutcome {
    pub habit: HabitView,
    pub xp_delta: i64,
    pub gold_earned: u64,
    pub levels_gained: u32,
    pub progress: Progress,
    pub gold: u64,
    /// Consecutive active days as of the caller's local day
    pub streak: u32,
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occurrence {
    Positive,
    Negative,
}

impl Occurrence {
    fn as_str(&self) -> &'static str {
        match self {
            Occurrence::Positive => "positive",
            Occurrence::Negative => "negative",
        }
    }
}

impl Tracker<'_> {
    fn habits(&self) -> HabitRepository<'_> {
        HabitRepository::new(self.store, self.uid)
    }

    async fn find_habit(&self, id: &str) -> TrackerResult<Habit> {
        self.habits()
            .get(id)
            .await?
            .ok_or_else(|| TrackerErr::NotFound {
                kind: "habit",
                id: id.to_string(),
            })
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn create_habit(&self, title: &str) -> TrackerResult<Habit> {
        let title = validate_title(title)?;
        let repo = self.habits();

        let next_order = repo
            .list()
            .await?
            .iter()
            .map(|habit| habit.order + 1)
            .max()
            .unwrap_or(0);

        let habit = Habit::new(&title, next_order);
        repo.save(&habit).await?;

        tracing::info!(habit_id = habit.id, "created habit");
        Ok(habit)
    }

    /// Lists habits in display order, resetting any whose cadence has elapsed
    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn list_habits(&self, now: DateTime<Utc>) -> TrackerResult<Vec<HabitView>> {
        let repo = self.habits();
        let mut habits = repo.list_ordered().await?;

        let reset: Vec<Habit> = habits
            .iter_mut()
            .filter_map(|habit| habit.reset_if_due(now).then(|| habit.clone()))
            .collect();
        repo.save_all(&reset).await?;

        Ok(habits.into_iter().map(|habit| habit.view(now)).collect())
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn get_habit(&self, id: &str, now: DateTime<Utc>) -> TrackerResult<HabitView> {
        let mut habit = self.find_habit(id).await?;
        if habit.reset_if_due(now) {
            self.habits().save(&habit).await?;
        }

        Ok(habit.view(now))
    }

    #[instrument(skip(self, edit), fields(uid = %self.uid))]
    pub async fn edit_habit(
        &self,
        id: &str,
        edit: HabitEdit,
        now: DateTime<Utc>,
    ) -> TrackerResult<HabitView> {
        let mut habit = self.find_habit(id).await?;

        if let Some(title) = edit.title {
            habit.title = validate_title(&title)?;
        }
        if let Some(description) = edit.description {
            habit.description = description;
        }
        if let Some(kind) = edit.kind {
            habit.set_kind(kind);
        }
        if let Some(cadence) = edit.reset_cadence {
            habit.set_cadence(cadence, now);
        }

        self.habits().save(&habit).await?;
        Ok(habit.view(now))
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn delete_habit(&self, id: &str) -> TrackerResult<()> {
        if !self.habits().delete(id).await? {
            return Err(TrackerErr::NotFound {
                kind: "habit",
                id: id.to_string(),
            });
        }

        tracing::info!(habit_id = id, "deleted habit");
        Ok(())
    }

    #[instrument(skip(self, ids), fields(uid = %self.uid, count = ids.len()))]
    pub async fn reorder_habits(
        &self,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> TrackerResult<Vec<HabitView>> {
        let repo = self.habits();
        let mut habits = repo.list().await?;

        apply_order(&mut habits, ids)?;
        repo.save_all(&habits).await?;

        habits.sort_by_key(|habit| habit.order);
        Ok(habits.into_iter().map(|habit| habit.view(now)).collect())
    }

    /// Logs a positive occurrence: +XP, +gold, today's activity, and any badges this unlocks.
    ///
    /// `offset_minutes` is the caller's UTC offset, used for the local day and hour.
    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn log_positive(
        &self,
        id: &str,
        offset_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> TrackerResult<LogOutcome> {
        self.log(id, Occurrence::Positive, offset_minutes, now).await
    }

    /// Logs a negative occurrence. The streak used for badge checks is read on the caller's local
    /// day, same as for positive logs.
    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn log_negative(
        &self,
        id: &str,
        offset_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> TrackerResult<LogOutcome> {
        self.log(id, Occurrence::Negative, offset_minutes, now).await
    }

    async fn log(
        &self,
        id: &str,
        occurrence: Occurrence,
        offset_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> TrackerResult<LogOutcome> {
        let offset = local_offset(offset_minutes)?;
        let mut habit = self.find_habit(id).await?;
        let accepts = match occurrence {
            Occurrence::Positive => habit.positive,
            Occurrence::Negative => habit.negative,
        };
        if !accepts {
            tracing::debug!(habit_id = id, kind = ?habit.kind(), "occurrence not accepted");
            return Err(TrackerErr::NotApplicable {
                id: id.to_string(),
                kind: occurrence.as_str(),
            });
        }

        let accounts = AccountRepository::new(self.store, self.uid);
        let badge_repo = BadgeRepository::new(self.store, self.uid);
        let (mut account, mut earned) = try_join(accounts.load(), badge_repo.load()).await?;

        habit.reset_if_due(now);

        let local = local_time(now, offset);
        let today = local.date_naive();
        let (xp_delta, gold_earned, trigger) = match occurrence {
            Occurrence::Positive => {
                habit.positive_count += 1;
                account.total_positive += 1;
                account.activity.record(today);
                (POSITIVE_LOG_XP, POSITIVE_LOG_GOLD, Trigger::PositiveLog(local))
            }
            Occurrence::Negative => {
                habit.negative_count += 1;
                (NEGATIVE_LOG_XP, 0, Trigger::NegativeLog)
            }
        };

        let change = account.progress.apply_xp(xp_delta);
        account.gold.earn(gold_earned);

        let streak = account.activity.streak_on(today);
        let ctx = UnlockContext {
            level: account.progress.level,
            total_xp: account.progress.total_xp,
            streak,
            total_positive: account.total_positive,
            trigger,
        };
        let new_badges = badges::evaluate(&ctx, &earned.badges, now);

        let habits = self.habits();
        try_join(habits.save(&habit), accounts.save(&account)).await?;
        if earned.extend(&new_badges) > 0 {
            badge_repo.save(&earned).await?;
        }

        tracing::info!(
            habit_id = id,
            occurrence = occurrence.as_str(),
            xp_delta,
            level = account.progress.level,
            gold = account.gold.gold,
            "logged habit occurrence"
        );

        Ok(LogOutcome {
            habit: habit.view(now),
            xp_delta,
            gold_earned,
            levels_gained: change.levels_gained,
            progress: account.progress,
            gold: account.gold.gold,
            streak,
            new_badges,
        })
    }
}

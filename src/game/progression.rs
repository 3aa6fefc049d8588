use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::constants::{BASE_XP_FOR_NEXT_LEVEL, XP_PER_LEVEL};

#[inline]
const fn default_xp_for_next_level() -> u64 {
    BASE_XP_FOR_NEXT_LEVEL
}

/// Experience and level state for a single user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Experience accumulated towards the next level
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub level: u32,
    #[serde(default = "default_xp_for_next_level")]
    pub xp_for_next_level: u64,
    /// Lifetime experience; decreases with negative occurrences but is never below zero
    #[serde(default)]
    pub total_xp: u64,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 0,
            xp_for_next_level: BASE_XP_FOR_NEXT_LEVEL,
            total_xp: 0,
        }
    }
}

/// Outcome of applying an experience delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelChange {
    pub levels_gained: u32,
    pub level: u32,
}

impl Progress {
    /// Applies a signed experience delta, levelling up as many times as the resulting experience
    /// allows.
    #[instrument(level = "trace")]
    pub fn apply_xp(&mut self, delta: i64) -> LevelChange {
        self.xp = saturating_add_signed(self.xp, delta);
        self.total_xp = saturating_add_signed(self.total_xp, delta);

        let mut levels_gained = 0;
        // a zero threshold would never drain `xp`
        while self.xp_for_next_level > 0 && self.xp >= self.xp_for_next_level {
            self.xp -= self.xp_for_next_level;
            self.level += 1;
            self.xp_for_next_level = Self::threshold_for(self.level);
            levels_gained += 1;
        }

        if levels_gained > 0 {
            tracing::debug!(level = self.level, levels_gained, "level up");
        }

        LevelChange {
            levels_gained,
            level: self.level,
        }
    }

    /// Experience required to advance past `level`
    pub const fn threshold_for(level: u32) -> u64 {
        XP_PER_LEVEL * (level as u64 + 1)
    }
}

fn saturating_add_signed(value: u64, delta: i64) -> u64 {
    if delta.is_negative() {
        value.saturating_sub(delta.unsigned_abs())
    } else {
        value.saturating_add(delta as u64)
    }
}

use serde::{Deserialize, Serialize};

use crate::constants::BADGES_DOC_ID;
use crate::db::models::Document;
use crate::db::store::Collection;
use crate::game::prelude::Badge;

/// Badges a user holds, in the order they were earned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedBadges {
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl EarnedBadges {
    pub fn holds(&self, id: &str) -> bool {
        self.badges.iter().any(|badge| badge.id == id)
    }

    /// Adds badges not already held, returning how many were added
    pub fn extend(&mut self, granted: &[Badge]) -> usize {
        let before = self.badges.len();
        for badge in granted {
            if !self.holds(&badge.id) {
                self.badges.push(badge.clone());
            }
        }

        self.badges.len() - before
    }
}

impl Document for EarnedBadges {
    const COLLECTION: Collection = Collection::Account;

    fn id(&self) -> &str {
        BADGES_DOC_ID
    }
}

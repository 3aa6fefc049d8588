use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::Document;
use crate::db::store::Collection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    /// Price in gold
    #[serde(default)]
    pub cost: u64,
    #[serde(default)]
    pub order: i64,
}

impl Reward {
    pub fn new(title: &str, notes: &str, cost: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            notes: notes.to_string(),
            cost,
            order: 0,
        }
    }
}

impl Document for Reward {
    const COLLECTION: Collection = Collection::Rewards;

    fn id(&self) -> &str {
        &self.id
    }
}

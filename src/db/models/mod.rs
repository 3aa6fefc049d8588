use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::db::store::Collection;

pub mod account;
pub mod badges;
pub mod habit;
pub mod reward;

/// A serializable record stored under a fixed collection
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

/// Records that carry a user-controlled display position
pub trait Ordered {
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

impl Ordered for habit::Habit {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Ordered for reward::Reward {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

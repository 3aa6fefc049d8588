use core::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::account::UserId;

pub mod memory;
pub mod redis;

/// Per-user document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Habits,
    Rewards,
    /// Singleton documents: the account itself and the earned badges
    Account,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Habits => "habits",
            Collection::Rewards => "rewards",
            Collection::Account => "account",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Document store addressed by `(user, collection, document id)`.
///
/// Documents are opaque serialized strings; typed access goes through
/// [`crate::db::repositories::Repository`]. Writes overwrite whatever is stored (last write wins).
#[async_trait]
pub trait Store: Send + Sync + fmt::Debug {
    async fn get(&self, uid: &UserId, collection: Collection, id: &str)
    -> StoreResult<Option<String>>;

    async fn list(&self, uid: &UserId, collection: Collection) -> StoreResult<Vec<String>>;

    async fn set(&self, uid: &UserId, collection: Collection, id: &str, doc: String)
    -> StoreResult<()>;

    /// Writes several documents of one collection in a single round trip
    async fn set_many(
        &self,
        uid: &UserId,
        collection: Collection,
        docs: Vec<(String, String)>,
    ) -> StoreResult<()>;

    /// Removes a document, returning whether it existed
    async fn delete(&self, uid: &UserId, collection: Collection, id: &str) -> StoreResult<bool>;

    /// Marks a payment as redeemed by `uid` unless someone already redeemed it, and returns the
    /// user it is redeemed by. Shared across all users.
    async fn redeem_payment(&self, payment_id: &str, uid: &UserId) -> StoreResult<UserId>;
}

pub type StoreResult<T> = core::result::Result<T, StoreErr>;

#[derive(Debug, Error)]
pub enum StoreErr {
    #[error(transparent)]
    RedisClientError(#[from] ::redis::RedisError),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
}

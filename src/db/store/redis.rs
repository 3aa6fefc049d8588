use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::instrument;

use crate::constants::REDEEMED_PAYMENTS_KEY;
use crate::db::models::account::UserId;
use crate::db::store::{Collection, Store, StoreResult};

/// Redis-backed store.
///
/// Each `(user, collection)` pair is one hash at `user:{uid}:{collection}` whose fields are
/// document ids and whose values are JSON documents.
///
/// $: `redis-server --port 6379 --save "300 10" --appendonly yes --appendfsync everysec`
#[derive(Clone)]
pub struct RedisStore {
    pub manager: ConnectionManager,
}

impl core::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    #[instrument]
    pub async fn new(redis_url: &str) -> StoreResult<Self> {
        tracing::debug!(redis_url, "connecting to redis server");

        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        Ok(Self { manager })
    }

    pub fn key(uid: &UserId, collection: Collection) -> String {
        format!("user:{}:{}", uid, collection)
    }
}

#[async_trait]
impl Store for RedisStore {
    #[instrument(skip(self))]
    async fn get(
        &self,
        uid: &UserId,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<String>> {
        let mut conn = self.manager.clone();
        let doc: Option<String> = redis::cmd("HGET")
            .arg(Self::key(uid, collection))
            .arg(id)
            .query_async(&mut conn)
            .await?;

        Ok(doc)
    }

    #[instrument(skip(self))]
    async fn list(&self, uid: &UserId, collection: Collection) -> StoreResult<Vec<String>> {
        let mut conn = self.manager.clone();
        let docs: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(Self::key(uid, collection))
            .query_async(&mut conn)
            .await?;

        tracing::trace!(count = docs.len(), "listed documents");
        Ok(docs.into_values().collect())
    }

    #[instrument(skip(self, doc))]
    async fn set(
        &self,
        uid: &UserId,
        collection: Collection,
        id: &str,
        doc: String,
    ) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("HSET")
            .arg(Self::key(uid, collection))
            .arg(id)
            .arg(doc)
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn set_many(
        &self,
        uid: &UserId,
        collection: Collection,
        docs: Vec<(String, String)>,
    ) -> StoreResult<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(Self::key(uid, collection));
        for (id, doc) in docs {
            cmd.arg(id).arg(doc);
        }

        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, uid: &UserId, collection: Collection, id: &str) -> StoreResult<bool> {
        let mut conn = self.manager.clone();
        let removed: i64 = redis::cmd("HDEL")
            .arg(Self::key(uid, collection))
            .arg(id)
            .query_async(&mut conn)
            .await?;

        Ok(removed > 0)
    }

    #[instrument(skip(self))]
    async fn redeem_payment(&self, payment_id: &str, uid: &UserId) -> StoreResult<UserId> {
        let mut conn = self.manager.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();

        pipe.hset_nx(REDEEMED_PAYMENTS_KEY, payment_id, &uid.0);
        pipe.hget(REDEEMED_PAYMENTS_KEY, payment_id);

        let (claimed, owner): (bool, String) = pipe.query_async(&mut conn).await?;

        tracing::debug!(claimed, owner, "redeemed payment");
        Ok(UserId::from(owner))
    }
}

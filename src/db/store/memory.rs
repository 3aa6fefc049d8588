use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::models::account::UserId;
use crate::db::store::{Collection, Store, StoreResult};

type Documents = BTreeMap<String, String>;

/// Process-local store, used for `--memory` runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<(UserId, Collection), Documents>>,
    redeemed: RwLock<HashMap<String, UserId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(
        &self,
        uid: &UserId,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<String>> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(&(uid.clone(), collection))
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, uid: &UserId, collection: Collection) -> StoreResult<Vec<String>> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(&(uid.clone(), collection))
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn set(
        &self,
        uid: &UserId,
        collection: Collection,
        id: &str,
        doc: String,
    ) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        guard
            .entry((uid.clone(), collection))
            .or_default()
            .insert(id.to_string(), doc);

        Ok(())
    }

    async fn set_many(
        &self,
        uid: &UserId,
        collection: Collection,
        docs: Vec<(String, String)>,
    ) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        guard
            .entry((uid.clone(), collection))
            .or_default()
            .extend(docs);

        Ok(())
    }

    async fn delete(&self, uid: &UserId, collection: Collection, id: &str) -> StoreResult<bool> {
        let mut guard = self.inner.write().await;
        Ok(guard
            .get_mut(&(uid.clone(), collection))
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    async fn redeem_payment(&self, payment_id: &str, uid: &UserId) -> StoreResult<UserId> {
        let mut guard = self.redeemed.write().await;
        Ok(guard
            .entry(payment_id.to_string())
            .or_insert_with(|| uid.clone())
            .clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_documents_are_scoped_per_user() {
        let store = MemoryStore::new();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        store
            .set(&alice, Collection::Habits, "h1", "{}".to_string())
            .await
            .unwrap();

        assert!(store.get(&alice, Collection::Habits, "h1").await.unwrap().is_some());
        assert!(store.get(&bob, Collection::Habits, "h1").await.unwrap().is_none());
        assert!(store.list(&alice, Collection::Rewards).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_many_and_delete() {
        let store = MemoryStore::new();
        let uid = UserId::from("alice");

        store
            .set_many(
                &uid,
                Collection::Rewards,
                vec![
                    ("a".to_string(), "1".to_string()),
                    ("b".to_string(), "2".to_string()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.list(&uid, Collection::Rewards).await.unwrap().len(), 2);
        assert!(store.delete(&uid, Collection::Rewards, "a").await.unwrap());
        assert!(!store.delete(&uid, Collection::Rewards, "a").await.unwrap());
        assert_eq!(store.list(&uid, Collection::Rewards).await.unwrap(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_payment_redeems_for_first_user_only() {
        let store = MemoryStore::new();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        assert_eq!(store.redeem_payment("pi_1", &alice).await.unwrap(), alice);
        assert_eq!(store.redeem_payment("pi_1", &bob).await.unwrap(), alice);
        assert_eq!(store.redeem_payment("pi_1", &alice).await.unwrap(), alice);
        assert_eq!(store.redeem_payment("pi_2", &bob).await.unwrap(), bob);
    }
}

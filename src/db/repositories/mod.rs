use core::fmt;
use std::marker::PhantomData;

use tracing::instrument;

use crate::db::models::account::{Account, UserId};
use crate::db::models::badges::EarnedBadges;
use crate::db::models::habit::Habit;
use crate::db::models::reward::Reward;
use crate::db::models::{Document, Ordered};
use crate::db::store::{Store, StoreResult};

pub type HabitRepository<'a> = Repository<'a, Habit>;
pub type RewardRepository<'a> = Repository<'a, Reward>;
pub type AccountRepository<'a> = Repository<'a, Account>;
pub type BadgeRepository<'a> = Repository<'a, EarnedBadges>;

/// Typed view over one user's documents of type `T`
pub struct Repository<'a, T> {
    store: &'a dyn Store,
    uid: &'a UserId,
    _doc: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Repository<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("uid", self.uid)
            .field("doc", &std::any::type_name::<T>())
            .finish()
    }
}

impl<'a, T: Document> Repository<'a, T> {
    pub fn new(store: &'a dyn Store, uid: &'a UserId) -> Self {
        Self {
            store,
            uid,
            _doc: PhantomData,
        }
    }

    #[instrument(skip(self), fields(uid = %self.uid, collection = %T::COLLECTION))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        match self.store.get(self.uid, T::COLLECTION, id).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Lists every document in the collection; documents that no longer deserialize are skipped
    #[instrument(skip(self), fields(uid = %self.uid, collection = %T::COLLECTION))]
    pub async fn list(&self) -> StoreResult<Vec<T>> {
        let raw = self.store.list(self.uid, T::COLLECTION).await?;
        let docs = raw
            .iter()
            .filter_map(|doc| match serde_json::from_str::<T>(doc) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!(error = ?e, "skipping malformed document");
                    None
                }
            })
            .collect();

        Ok(docs)
    }

    #[instrument(skip(self, doc), fields(uid = %self.uid, collection = %T::COLLECTION, id = doc.id()))]
    pub async fn save(&self, doc: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(doc)?;
        self.store.set(self.uid, T::COLLECTION, doc.id(), raw).await
    }

    #[instrument(skip(self, docs), fields(uid = %self.uid, collection = %T::COLLECTION, count = docs.len()))]
    pub async fn save_all(&self, docs: &[T]) -> StoreResult<()> {
        let raw = docs
            .iter()
            .map(|doc| Ok((doc.id().to_string(), serde_json::to_string(doc)?)))
            .collect::<StoreResult<Vec<_>>>()?;

        self.store.set_many(self.uid, T::COLLECTION, raw).await
    }

    #[instrument(skip(self), fields(uid = %self.uid, collection = %T::COLLECTION))]
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(self.uid, T::COLLECTION, id).await
    }
}

impl<T: Document + Default> Repository<'_, T> {
    /// Loads a singleton document, falling back to a fresh one if it was never written
    pub async fn load(&self) -> StoreResult<T> {
        let id = T::default().id().to_string();
        Ok(self.get(&id).await?.unwrap_or_default())
    }
}

impl<T: Document + Ordered> Repository<'_, T> {
    /// Lists the collection in display order; ties fall back to id for a stable ordering
    pub async fn list_ordered(&self) -> StoreResult<Vec<T>> {
        let mut docs = self.list().await?;
        docs.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.id().cmp(b.id())));

        Ok(docs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::store::Collection;
    use crate::db::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let store = MemoryStore::new();
        let uid = UserId::from("alice");
        let repo = HabitRepository::new(&store, &uid);

        let habit = Habit::new("Meditate", 0);
        repo.save(&habit).await.unwrap();

        assert_eq!(repo.get(&habit.id).await.unwrap(), Some(habit));
        assert_eq!(repo.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_ordered_sorts_by_order() {
        let store = MemoryStore::new();
        let uid = UserId::from("alice");
        let repo = RewardRepository::new(&store, &uid);

        let mut first = Reward::new("Coffee", "", 10);
        let mut second = Reward::new("Movie", "", 50);
        first.order = 1;
        second.order = 0;
        repo.save_all(&[first.clone(), second.clone()]).await.unwrap();

        let titles: Vec<String> = repo
            .list_ordered()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Movie", "Coffee"]);
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let store = MemoryStore::new();
        let uid = UserId::from("alice");
        store
            .set(&uid, Collection::Habits, "broken", "not json".to_string())
            .await
            .unwrap();

        let repo = HabitRepository::new(&store, &uid);
        repo.save(&Habit::new("Walk", 0)).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_singleton_loads_default() {
        let store = MemoryStore::new();
        let uid = UserId::from("alice");

        let account = AccountRepository::new(&store, &uid).load().await.unwrap();
        assert_eq!(account, Account::default());

        let badges = BadgeRepository::new(&store, &uid).load().await.unwrap();
        assert!(badges.badges.is_empty());
    }
}

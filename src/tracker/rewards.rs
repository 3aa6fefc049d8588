use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::prelude::{AccountRepository, Reward, RewardRepository};
use crate::tracker::{Tracker, TrackerErr, TrackerResult, apply_order, validate_title};

#[derive(Debug, Clone, Deserialize)]
pub struct NewReward {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub cost: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewardEdit {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub cost: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub reward: Reward,
    pub gold: u64,
}

impl Tracker<'_> {
    fn rewards(&self) -> RewardRepository<'_> {
        RewardRepository::new(self.store, self.uid)
    }

    async fn find_reward(&self, id: &str) -> TrackerResult<Reward> {
        self.rewards()
            .get(id)
            .await?
            .ok_or_else(|| TrackerErr::NotFound {
                kind: "reward",
                id: id.to_string(),
            })
    }

    /// Creates a reward at the top of the list, pushing the existing ones down by one
    #[instrument(skip(self, new), fields(uid = %self.uid))]
    pub async fn create_reward(&self, new: NewReward) -> TrackerResult<Reward> {
        let title = validate_title(&new.title)?;
        let repo = self.rewards();

        let mut shifted = repo.list().await?;
        for reward in shifted.iter_mut() {
            reward.order += 1;
        }

        let reward = Reward::new(&title, &new.notes, new.cost);
        shifted.push(reward.clone());
        repo.save_all(&shifted).await?;

        tracing::info!(reward_id = reward.id, cost = reward.cost, "created reward");
        Ok(reward)
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn list_rewards(&self) -> TrackerResult<Vec<Reward>> {
        Ok(self.rewards().list_ordered().await?)
    }

    #[instrument(skip(self, edit), fields(uid = %self.uid))]
    pub async fn edit_reward(&self, id: &str, edit: RewardEdit) -> TrackerResult<Reward> {
        let mut reward = self.find_reward(id).await?;

        if let Some(title) = edit.title {
            reward.title = validate_title(&title)?;
        }
        if let Some(notes) = edit.notes {
            reward.notes = notes;
        }
        if let Some(cost) = edit.cost {
            reward.cost = cost;
        }

        self.rewards().save(&reward).await?;
        Ok(reward)
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn delete_reward(&self, id: &str) -> TrackerResult<()> {
        if !self.rewards().delete(id).await? {
            return Err(TrackerErr::NotFound {
                kind: "reward",
                id: id.to_string(),
            });
        }

        Ok(())
    }

    #[instrument(skip(self, ids), fields(uid = %self.uid, count = ids.len()))]
    pub async fn reorder_rewards(&self, ids: &[String]) -> TrackerResult<Vec<Reward>> {
        let repo = self.rewards();
        let mut rewards = repo.list().await?;

        apply_order(&mut rewards, ids)?;
        repo.save_all(&rewards).await?;

        rewards.sort_by_key(|reward| reward.order);
        Ok(rewards)
    }

    /// Spends the reward's cost; the balance is untouched when it cannot cover it
    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn redeem_reward(&self, id: &str) -> TrackerResult<Redemption> {
        let reward = self.find_reward(id).await?;
        let accounts = AccountRepository::new(self.store, self.uid);
        let mut account = accounts.load().await?;

        let gold = account.gold.spend(reward.cost)?;
        accounts.save(&account).await?;

        tracing::info!(reward_id = id, cost = reward.cost, gold, "redeemed reward");
        Ok(Redemption { reward, gold })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::prelude::UserId;
    use crate::db::store::memory::MemoryStore;
    use crate::game::prelude::WalletErr;

    fn new_reward(title: &str, cost: u64) -> NewReward {
        NewReward {
            title: title.to_string(),
            notes: String::new(),
            cost,
        }
    }

    #[tokio::test]
    async fn test_new_rewards_are_prepended() {
        let store = MemoryStore::new();
        let uid = UserId::from("bob");
        let tracker = Tracker::new(&store, &uid);

        tracker.create_reward(new_reward("Coffee", 20)).await.unwrap();
        tracker.create_reward(new_reward("Movie", 80)).await.unwrap();

        let rewards = tracker.list_rewards().await.unwrap();
        let titles: Vec<&str> = rewards.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Movie", "Coffee"]);
        assert_eq!(rewards[0].order, 0);
        assert_eq!(rewards[1].order, 1);
    }

    #[tokio::test]
    async fn test_redeem_spends_gold() {
        let store = MemoryStore::new();
        let uid = UserId::from("bob");
        let tracker = Tracker::new(&store, &uid);

        let coffee = tracker.create_reward(new_reward("Coffee", 30)).await.unwrap();
        let redemption = tracker.redeem_reward(&coffee.id).await.unwrap();

        assert_eq!(redemption.gold, 70);
        assert_eq!(redemption.reward.id, coffee.id);
    }

    #[tokio::test]
    async fn test_redeem_without_enough_gold_changes_nothing() {
        let store = MemoryStore::new();
        let uid = UserId::from("bob");
        let tracker = Tracker::new(&store, &uid);

        let holiday = tracker.create_reward(new_reward("Holiday", 500)).await.unwrap();
        let err = tracker.redeem_reward(&holiday.id).await.unwrap_err();
        assert!(matches!(
            err,
            TrackerErr::WalletError(WalletErr::InsufficientGold {
                cost: 500,
                balance: 100
            })
        ));

        let account = AccountRepository::new(&store, &uid).load().await.unwrap();
        assert_eq!(account.gold.gold, 100);
    }

    #[tokio::test]
    async fn test_edit_reorder_delete() {
        let store = MemoryStore::new();
        let uid = UserId::from("bob");
        let tracker = Tracker::new(&store, &uid);

        let a = tracker.create_reward(new_reward("A", 1)).await.unwrap();
        let b = tracker.create_reward(new_reward("B", 2)).await.unwrap();

        let edit = RewardEdit {
            cost: Some(15),
            ..Default::default()
        };
        assert_eq!(tracker.edit_reward(&a.id, edit).await.unwrap().cost, 15);

        let edit = RewardEdit {
            title: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            tracker.edit_reward(&a.id, edit).await,
            Err(TrackerErr::EmptyTitle)
        ));

        let ordered = tracker
            .reorder_rewards(&[a.id.clone(), b.id.clone()])
            .await
            .unwrap();
        assert_eq!(ordered[0].id, a.id);

        tracker.delete_reward(&b.id).await.unwrap();
        assert!(matches!(
            tracker.redeem_reward(&b.id).await,
            Err(TrackerErr::NotFound { kind: "reward", .. })
        ));
    }
}

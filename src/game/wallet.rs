use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::STARTING_GOLD;

pub type WalletResult<T> = core::result::Result<T, WalletErr>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletErr {
    #[error("not enough gold: cost {cost}, balance {balance}")]
    InsufficientGold { cost: u64, balance: u64 },
}

/// Gold balance; never negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wallet {
    pub gold: u64,
}

impl Default for Wallet {
    fn default() -> Self {
        Self {
            gold: STARTING_GOLD,
        }
    }
}

impl Wallet {
    pub fn earn(&mut self, amount: u64) -> u64 {
        self.gold = self.gold.saturating_add(amount);
        self.gold
    }

    /// Deducts `cost` from the balance, or leaves the balance untouched if it cannot cover it
    pub fn spend(&mut self, cost: u64) -> WalletResult<u64> {
        if cost > self.gold {
            tracing::warn!(cost, balance = self.gold, "not enough gold");
            return Err(WalletErr::InsufficientGold {
                cost,
                balance: self.gold,
            });
        }

        self.gold -= cost;
        Ok(self.gold)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_spend_within_balance() {
        let mut wallet = Wallet::default();
        assert_eq!(wallet.spend(40), Ok(60));
        assert_eq!(wallet.spend(60), Ok(0));
    }

    #[test]
    fn test_rejected_spend_leaves_balance() {
        let mut wallet = Wallet { gold: 10 };
        let err = wallet.spend(11).unwrap_err();

        assert_eq!(
            err,
            WalletErr::InsufficientGold {
                cost: 11,
                balance: 10
            }
        );
        assert_eq!(wallet.gold, 10);
    }

    #[test]
    fn test_earn_accumulates() {
        let mut wallet = Wallet { gold: 0 };
        wallet.earn(5);
        assert_eq!(wallet.earn(5), 10);
    }
}

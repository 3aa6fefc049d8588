use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::ACCOUNT_DOC_ID;
use crate::db::models::Document;
use crate::db::store::Collection;
use crate::game::prelude::{Activity, Progress, Wallet};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Whether the user has bought the dark mode entitlement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DarkModeAccess {
    #[default]
    Temporary,
    Granted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DarkMode {
    #[serde(default)]
    pub access: DarkModeAccess,
    #[serde(default)]
    pub enabled: bool,
}

/// The per-user account document: profile, progression, gold and settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub gold: Wallet,
    #[serde(default)]
    pub activity: Activity,
    /// Lifetime number of positive occurrences across all habits
    #[serde(default)]
    pub total_positive: u64,
    #[serde(default)]
    pub dark_mode: DarkMode,
    /// The payment intent that bought dark mode
    #[serde(default)]
    pub payment_intent: Option<String>,
}

impl Document for Account {
    const COLLECTION: Collection = Collection::Account;

    fn id(&self) -> &str {
        ACCOUNT_DOC_ID
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        UserId(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::constants::{DARK_MODE_PRICE_CENTS, PAYMENT_CURRENCY, PAYMENT_SUCCEEDED};
use crate::db::prelude::{Account, AccountRepository, BadgeRepository, DarkMode, DarkModeAccess};
use crate::game::badges::CATALOG;
use crate::game::prelude::Badge;
use crate::tracker::{Tracker, TrackerErr, TrackerResult};
use crate::util::stripe::Stripe;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileEdit {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// A catalog badge and whether the user holds it
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub requirement: &'static str,
    pub earned: bool,
}

impl Tracker<'_> {
    fn accounts(&self) -> AccountRepository<'_> {
        AccountRepository::new(self.store, self.uid)
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn account(&self) -> TrackerResult<Account> {
        Ok(self.accounts().load().await?)
    }

    #[instrument(skip(self, edit), fields(uid = %self.uid))]
    pub async fn update_profile(&self, edit: ProfileEdit) -> TrackerResult<Account> {
        let repo = self.accounts();
        let mut account = repo.load().await?;

        if let Some(username) = edit.username {
            account.username = username.trim().to_string();
        }
        if let Some(email) = edit.email {
            account.email = email.trim().to_string();
        }

        repo.save(&account).await?;
        Ok(account)
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn badges(&self) -> TrackerResult<Vec<Badge>> {
        let earned = BadgeRepository::new(self.store, self.uid).load().await?;
        Ok(earned.badges)
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn badge_catalog(&self) -> TrackerResult<Vec<CatalogEntry>> {
        let earned = BadgeRepository::new(self.store, self.uid).load().await?;

        Ok(CATALOG
            .iter()
            .map(|def| CatalogEntry {
                id: def.id,
                name: def.name,
                icon: def.icon,
                requirement: def.requirement,
                earned: earned.holds(def.id),
            })
            .collect())
    }

    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn dark_mode(&self) -> TrackerResult<DarkMode> {
        Ok(self.accounts().load().await?.dark_mode)
    }

    /// Switches dark mode on or off; switching it on needs the purchased entitlement
    #[instrument(skip(self), fields(uid = %self.uid))]
    pub async fn set_dark_mode(&self, enabled: bool) -> TrackerResult<DarkMode> {
        let repo = self.accounts();
        let mut account = repo.load().await?;

        if enabled && account.dark_mode.access != DarkModeAccess::Granted {
            return Err(TrackerErr::DarkModeLocked);
        }

        account.dark_mode.enabled = enabled;
        repo.save(&account).await?;

        Ok(account.dark_mode)
    }

    /// Verifies a completed payment with the processor and grants (and enables) dark mode.
    ///
    /// The payment must cover the price in the expected currency, and each payment unlocks one
    /// account only. When the account has an email on file the payment must have been made with
    /// it. Confirming the payment that already unlocked this account again is a no-op.
    #[instrument(skip(self, stripe), fields(uid = %self.uid))]
    pub async fn confirm_payment(
        &self,
        stripe: &Stripe,
        intent_id: &str,
    ) -> TrackerResult<DarkMode> {
        let repo = self.accounts();
        let mut account = repo.load().await?;
        if account.dark_mode.access == DarkModeAccess::Granted
            && account.payment_intent.as_deref() == Some(intent_id)
        {
            return Ok(account.dark_mode);
        }

        let intent = stripe.retrieve_payment_intent(intent_id).await?;
        if intent.status != PAYMENT_SUCCEEDED {
            tracing::warn!(intent_id, status = intent.status, "payment not completed");
            return Err(TrackerErr::PaymentIncomplete(intent.status));
        }

        if intent.amount < DARK_MODE_PRICE_CENTS
            || !intent.currency.eq_ignore_ascii_case(PAYMENT_CURRENCY)
        {
            tracing::warn!(
                intent_id,
                amount = intent.amount,
                currency = intent.currency,
                "payment does not cover dark mode"
            );
            return Err(TrackerErr::PaymentUnderpaid {
                amount: intent.amount,
                currency: intent.currency,
            });
        }

        if !account.email.is_empty()
            && intent.metadata.get("email").map(String::as_str) != Some(account.email.as_str())
        {
            tracing::warn!(intent_id, "payment email does not match account");
            return Err(TrackerErr::PaymentMismatch);
        }

        let owner = self.store.redeem_payment(intent_id, self.uid).await?;
        if &owner != self.uid {
            tracing::warn!(intent_id, %owner, "payment already redeemed by another user");
            return Err(TrackerErr::PaymentReused(intent_id.to_string()));
        }

        account.dark_mode = DarkMode {
            access: DarkModeAccess::Granted,
            enabled: true,
        };
        account.payment_intent = Some(intent_id.to_string());
        repo.save(&account).await?;

        tracing::info!(intent_id, "dark mode access granted");
        Ok(account.dark_mode)
    }
}

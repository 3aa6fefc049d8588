//! User actions: each operation loads the user's documents, runs the game rules over them and
//! writes the results back. Writes are independent; there is no transaction spanning them.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::constants::MAX_UTC_OFFSET_MINUTES;
use crate::db::prelude::{Document, Ordered, StoreErr, UserId};
use crate::db::store::Store;
use crate::game::prelude::WalletErr;
use crate::util::stripe::StripeErr;

pub mod account;
pub mod habits;
pub mod rewards;

pub struct Tracker<'a> {
    store: &'a dyn Store,
    uid: &'a UserId,
}

impl<'a> Tracker<'a> {
    pub fn new(store: &'a dyn Store, uid: &'a UserId) -> Self {
        Self { store, uid }
    }
}

/// Distinguishes "field absent" from "field explicitly null" in partial updates
pub(crate) fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn validate_title(title: &str) -> TrackerResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TrackerErr::EmptyTitle);
    }

    Ok(title.to_string())
}

/// Resolves a client-supplied UTC offset (minutes east of UTC) into a fixed offset
pub(crate) fn local_offset(offset_minutes: Option<i32>) -> TrackerResult<FixedOffset> {
    let minutes = offset_minutes.unwrap_or(0);
    if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return Err(TrackerErr::InvalidOffset(minutes));
    }

    FixedOffset::east_opt(minutes * 60).ok_or(TrackerErr::InvalidOffset(minutes))
}

pub(crate) fn local_time(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    now.with_timezone(&offset)
}

/// Assigns display positions following `ids`, which must name every record exactly once
pub(crate) fn apply_order<T>(docs: &mut [T], ids: &[String]) -> TrackerResult<()>
where
    T: Document + Ordered,
{
    let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let existing: HashSet<&str> = docs.iter().map(|doc| doc.id()).collect();

    if requested.len() != ids.len() || requested != existing {
        return Err(TrackerErr::InvalidOrder);
    }

    for doc in docs.iter_mut() {
        if let Some(position) = ids.iter().position(|candidate| candidate == doc.id()) {
            doc.set_order(position as i64);
        }
    }

    Ok(())
}

pub type TrackerResult<T> = core::result::Result<T, TrackerErr>;

#[derive(Debug, Error)]
pub enum TrackerErr {
    #[error(transparent)]
    StoreError(#[from] StoreErr),

    #[error(transparent)]
    WalletError(#[from] WalletErr),

    #[error(transparent)]
    PaymentError(#[from] StripeErr),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("habit '{id}' does not accept {kind} occurrences")]
    NotApplicable { id: String, kind: &'static str },

    #[error("reorder must list every item exactly once")]
    InvalidOrder,

    #[error("utc offset of {0} minutes is out of range")]
    InvalidOffset(i32),

    #[error("dark mode has not been purchased")]
    DarkModeLocked,

    #[error("payment has not succeeded (status '{0}')")]
    PaymentIncomplete(String),

    #[error("payment was made for a different account")]
    PaymentMismatch,

    #[error("payment of {amount} {currency} does not cover the purchase")]
    PaymentUnderpaid { amount: u64, currency: String },

    #[error("payment '{0}' has already been redeemed")]
    PaymentReused(String),
}

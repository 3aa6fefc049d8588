//! Derived-value rules: progression, gold, badges, streaks and reset cadences.
//!
//! Nothing in here touches the store; the tracker loads documents, runs these rules over them and
//! writes the results back.

pub mod activity;
pub mod badges;
pub mod progression;
pub mod reset;
pub mod wallet;

pub mod prelude {
    pub use crate::game::activity::Activity;
    pub use crate::game::badges::{Badge, Trigger, UnlockContext};
    pub use crate::game::progression::Progress;
    pub use crate::game::reset::ResetCadence;
    pub use crate::game::wallet::{Wallet, WalletErr};
}

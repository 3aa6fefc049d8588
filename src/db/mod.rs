pub mod models;
pub mod repositories;
pub mod store;

pub mod prelude {
    pub use crate::db::models::account::{Account, DarkMode, DarkModeAccess, UserId};
    pub use crate::db::models::habit::{Habit, HabitKind, HabitView};
    pub use crate::db::models::reward::Reward;
    pub use crate::db::models::{Document, Ordered};

    pub use crate::db::repositories::{
        AccountRepository, BadgeRepository, HabitRepository, RewardRepository,
    };
    pub use crate::db::store::{Store, StoreErr};
}

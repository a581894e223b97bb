//! The progression-and-economy engine: user aggregates, the quest state
//! machine, the stamina/coin/experience economy, the skin shop, and the
//! derived leaderboards, all persisted in a sled-backed store.

pub mod errors;
pub mod inventory;
pub mod leaderboard;
pub mod progression;
pub mod quest;
pub mod registry;
pub mod shop;
pub mod storage;
pub mod types;

pub use errors::{RegistrationError, ShopError, StoreError, UserError};
pub use inventory::{get_inventory, set_active_inventory};
pub use leaderboard::leaderboard_by_role;
pub use progression::{choose_role, level_for_exp, tier_progress, TierProgress, LEVEL_THRESHOLDS, MAX_LEVEL};
pub use quest::{
    accept_quest, complete_quest, detail_quest, fail_expired_quests, get_stamina, history_quest,
};
pub use registry::{
    get_profile, grant_coin, grant_coin_by_username, is_admin, is_user_exists, register_user,
};
pub use shop::{add_skin, buy_skin, get_coins, get_shop};
pub use storage::{starter_catalog, HabitStore, HabitStoreBuilder};
pub use types::*;

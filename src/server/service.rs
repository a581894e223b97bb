//! The engine actor: a single task owns the store and applies every mutation
//! in arrival order, so no operation ever observes a half-applied change.
//! Callers talk to it through a cloneable [`ServiceHandle`] over an mpsc
//! channel, one oneshot reply per request.

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::engine::errors::{RegistrationError, ShopError, StoreError, UserError};
use crate::engine::storage::HabitStore;
use crate::engine::types::{
    InventoryEntry, LeaderboardView, QuestConfig, QuestDraft, QuestHistory, QuestRecord,
    RoleCategory, RoleRecord, ShopView, SkinDraft, UserProfile, UserRecord,
};
use crate::engine::{
    accept_quest, add_skin, buy_skin, choose_role, complete_quest, detail_quest,
    fail_expired_quests, get_coins, get_inventory, get_profile, get_shop, get_stamina,
    grant_coin, grant_coin_by_username, history_quest, is_user_exists, leaderboard_by_role,
    register_user, set_active_inventory,
};

const REQUEST_QUEUE_DEPTH: usize = 64;

/// Addressing for admin coin grants.
#[derive(Debug, Clone)]
pub enum GrantTarget {
    Principal(String),
    Username(String),
}

/// Runtime knobs the actor needs beyond the store itself.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub quest: QuestConfig,
    pub admins: Vec<String>,
    pub leaderboard_top_n: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            quest: QuestConfig::default(),
            admins: Vec::new(),
            leaderboard_top_n: 10,
        }
    }
}

enum Request {
    RegisterUser {
        principal: String,
        username: String,
        reply: oneshot::Sender<Result<(UserRecord, Vec<RoleRecord>), RegistrationError>>,
    },
    IsUserExists {
        principal: String,
        reply: oneshot::Sender<Result<bool, StoreError>>,
    },
    GetProfile {
        principal: String,
        reply: oneshot::Sender<Result<Option<UserProfile>, StoreError>>,
    },
    ChooseRole {
        principal: String,
        category: RoleCategory,
        reply: oneshot::Sender<Result<(), UserError>>,
    },
    AcceptQuest {
        principal: String,
        draft: QuestDraft,
        reply: oneshot::Sender<Result<u64, UserError>>,
    },
    CompleteQuest {
        principal: String,
        quest_id: u64,
        reply: oneshot::Sender<Result<(), UserError>>,
    },
    FailExpiredQuests {
        reply: oneshot::Sender<Result<usize, StoreError>>,
    },
    DetailQuest {
        principal: String,
        quest_id: u64,
        reply: oneshot::Sender<Result<Option<QuestRecord>, StoreError>>,
    },
    HistoryQuest {
        principal: String,
        reply: oneshot::Sender<Result<QuestHistory, StoreError>>,
    },
    GetStamina {
        principal: String,
        reply: oneshot::Sender<Result<u64, UserError>>,
    },
    GetCoins {
        principal: String,
        reply: oneshot::Sender<Result<u64, UserError>>,
    },
    GetShop {
        principal: String,
        reply: oneshot::Sender<Result<ShopView, StoreError>>,
    },
    BuySkin {
        principal: String,
        skin_id: u64,
        reply: oneshot::Sender<Result<u64, ShopError>>,
    },
    AddSkin {
        caller: String,
        draft: SkinDraft,
        reply: oneshot::Sender<Result<u64, ShopError>>,
    },
    GetInventory {
        principal: String,
        reply: oneshot::Sender<Result<Vec<InventoryEntry>, StoreError>>,
    },
    SetActiveInventory {
        principal: String,
        inventory_id: u64,
        reply: oneshot::Sender<Result<(), ShopError>>,
    },
    Leaderboard {
        caller: String,
        category: RoleCategory,
        reply: oneshot::Sender<Result<LeaderboardView, StoreError>>,
    },
    GrantCoin {
        caller: String,
        target: GrantTarget,
        amount: u64,
        reply: oneshot::Sender<Result<(), ShopError>>,
    },
}

/// Cloneable client side of the engine actor.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Request>,
}

impl ServiceHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| StoreError::ServiceUnavailable)?;
        rx.await.map_err(|_| StoreError::ServiceUnavailable)
    }

    pub async fn register_user(
        &self,
        principal: &str,
        username: &str,
    ) -> Result<(UserRecord, Vec<RoleRecord>), RegistrationError> {
        let (principal, username) = (principal.to_string(), username.to_string());
        self.call(|reply| Request::RegisterUser {
            principal,
            username,
            reply,
        })
        .await?
    }

    pub async fn is_user_exists(&self, principal: &str) -> Result<bool, StoreError> {
        let principal = principal.to_string();
        self.call(|reply| Request::IsUserExists { principal, reply })
            .await?
    }

    pub async fn get_profile(&self, principal: &str) -> Result<Option<UserProfile>, StoreError> {
        let principal = principal.to_string();
        self.call(|reply| Request::GetProfile { principal, reply })
            .await?
    }

    pub async fn choose_role(
        &self,
        principal: &str,
        category: RoleCategory,
    ) -> Result<(), UserError> {
        let principal = principal.to_string();
        self.call(|reply| Request::ChooseRole {
            principal,
            category,
            reply,
        })
        .await?
    }

    pub async fn accept_quest(&self, principal: &str, draft: QuestDraft) -> Result<u64, UserError> {
        let principal = principal.to_string();
        self.call(|reply| Request::AcceptQuest {
            principal,
            draft,
            reply,
        })
        .await?
    }

    pub async fn complete_quest(&self, principal: &str, quest_id: u64) -> Result<(), UserError> {
        let principal = principal.to_string();
        self.call(|reply| Request::CompleteQuest {
            principal,
            quest_id,
            reply,
        })
        .await?
    }

    pub async fn fail_expired_quests(&self) -> Result<usize, StoreError> {
        self.call(|reply| Request::FailExpiredQuests { reply })
            .await?
    }

    pub async fn detail_quest(
        &self,
        principal: &str,
        quest_id: u64,
    ) -> Result<Option<QuestRecord>, StoreError> {
        let principal = principal.to_string();
        self.call(|reply| Request::DetailQuest {
            principal,
            quest_id,
            reply,
        })
        .await?
    }

    pub async fn history_quest(&self, principal: &str) -> Result<QuestHistory, StoreError> {
        let principal = principal.to_string();
        self.call(|reply| Request::HistoryQuest { principal, reply })
            .await?
    }

    pub async fn get_stamina(&self, principal: &str) -> Result<u64, UserError> {
        let principal = principal.to_string();
        self.call(|reply| Request::GetStamina { principal, reply })
            .await?
    }

    pub async fn get_coins(&self, principal: &str) -> Result<u64, UserError> {
        let principal = principal.to_string();
        self.call(|reply| Request::GetCoins { principal, reply })
            .await?
    }

    pub async fn get_shop(&self, principal: &str) -> Result<ShopView, StoreError> {
        let principal = principal.to_string();
        self.call(|reply| Request::GetShop { principal, reply })
            .await?
    }

    pub async fn buy_skin(&self, principal: &str, skin_id: u64) -> Result<u64, ShopError> {
        let principal = principal.to_string();
        self.call(|reply| Request::BuySkin {
            principal,
            skin_id,
            reply,
        })
        .await?
    }

    pub async fn add_skin(&self, caller: &str, draft: SkinDraft) -> Result<u64, ShopError> {
        let caller = caller.to_string();
        self.call(|reply| Request::AddSkin {
            caller,
            draft,
            reply,
        })
        .await?
    }

    pub async fn get_inventory(&self, principal: &str) -> Result<Vec<InventoryEntry>, StoreError> {
        let principal = principal.to_string();
        self.call(|reply| Request::GetInventory { principal, reply })
            .await?
    }

    pub async fn set_active_inventory(
        &self,
        principal: &str,
        inventory_id: u64,
    ) -> Result<(), ShopError> {
        let principal = principal.to_string();
        self.call(|reply| Request::SetActiveInventory {
            principal,
            inventory_id,
            reply,
        })
        .await?
    }

    pub async fn leaderboard_by_role(
        &self,
        caller: &str,
        category: RoleCategory,
    ) -> Result<LeaderboardView, StoreError> {
        let caller = caller.to_string();
        self.call(|reply| Request::Leaderboard {
            caller,
            category,
            reply,
        })
        .await?
    }

    pub async fn grant_coin(
        &self,
        caller: &str,
        target: GrantTarget,
        amount: u64,
    ) -> Result<(), ShopError> {
        let caller = caller.to_string();
        self.call(|reply| Request::GrantCoin {
            caller,
            target,
            amount,
            reply,
        })
        .await?
    }
}

/// The engine actor itself. Owns the store for its whole lifetime.
pub struct Service {
    store: HabitStore,
    config: ServiceConfig,
}

impl Service {
    /// Spawn the actor task. The returned handle is cheap to clone; the task
    /// exits when the last handle is dropped.
    pub fn spawn(store: HabitStore, config: ServiceConfig) -> (ServiceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let service = Service { store, config };
        let join = tokio::spawn(service.run(rx));
        (ServiceHandle { tx }, join)
    }

    async fn run(self, mut rx: mpsc::Receiver<Request>) {
        info!(
            "engine service started ({} admin principal(s))",
            self.config.admins.len()
        );
        while let Some(request) = rx.recv().await {
            self.dispatch(request);
        }
        debug!("engine service stopped: all handles dropped");
    }

    fn dispatch(&self, request: Request) {
        let store = &self.store;
        let cfg = &self.config;
        // Reply send failures mean the caller gave up waiting; safe to drop.
        match request {
            Request::RegisterUser {
                principal,
                username,
                reply,
            } => {
                let _ = reply.send(register_user(
                    store,
                    &principal,
                    &username,
                    cfg.quest.stamina.max,
                ));
            }
            Request::IsUserExists { principal, reply } => {
                let _ = reply.send(is_user_exists(store, &principal));
            }
            Request::GetProfile { principal, reply } => {
                let _ = reply.send(get_profile(store, &principal));
            }
            Request::ChooseRole {
                principal,
                category,
                reply,
            } => {
                let _ = reply.send(choose_role(store, &principal, category));
            }
            Request::AcceptQuest {
                principal,
                draft,
                reply,
            } => {
                let _ = reply.send(accept_quest(store, &cfg.quest, &principal, draft));
            }
            Request::CompleteQuest {
                principal,
                quest_id,
                reply,
            } => {
                let _ = reply.send(complete_quest(store, &principal, quest_id));
            }
            Request::FailExpiredQuests { reply } => {
                let _ = reply.send(fail_expired_quests(store));
            }
            Request::DetailQuest {
                principal,
                quest_id,
                reply,
            } => {
                let _ = reply.send(detail_quest(store, &principal, quest_id));
            }
            Request::HistoryQuest { principal, reply } => {
                let _ = reply.send(history_quest(store, &principal));
            }
            Request::GetStamina { principal, reply } => {
                let _ = reply.send(get_stamina(store, &cfg.quest.stamina, &principal));
            }
            Request::GetCoins { principal, reply } => {
                let _ = reply.send(get_coins(store, &principal));
            }
            Request::GetShop { principal, reply } => {
                let _ = reply.send(get_shop(store, &principal));
            }
            Request::BuySkin {
                principal,
                skin_id,
                reply,
            } => {
                let _ = reply.send(buy_skin(store, &principal, skin_id));
            }
            Request::AddSkin {
                caller,
                draft,
                reply,
            } => {
                let _ = reply.send(add_skin(store, &cfg.admins, &caller, draft));
            }
            Request::GetInventory { principal, reply } => {
                let _ = reply.send(get_inventory(store, &principal));
            }
            Request::SetActiveInventory {
                principal,
                inventory_id,
                reply,
            } => {
                let _ = reply.send(set_active_inventory(store, &principal, inventory_id));
            }
            Request::Leaderboard {
                caller,
                category,
                reply,
            } => {
                let _ = reply.send(leaderboard_by_role(
                    store,
                    &caller,
                    category,
                    cfg.leaderboard_top_n,
                ));
            }
            Request::GrantCoin {
                caller,
                target,
                amount,
                reply,
            } => {
                let result = match target {
                    GrantTarget::Principal(principal) => {
                        grant_coin(store, &cfg.admins, &caller, &principal, amount)
                    }
                    GrantTarget::Username(username) => {
                        grant_coin_by_username(store, &cfg.admins, &caller, &username, amount)
                    }
                };
                let _ = reply.send(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::storage::HabitStoreBuilder;
    use tempfile::TempDir;

    async fn spawn_service() -> (TempDir, ServiceHandle, JoinHandle<()>) {
        let dir = TempDir::new().expect("tempdir");
        let store = HabitStoreBuilder::new(dir.path()).open().expect("store");
        let config = ServiceConfig {
            admins: vec!["admin-principal".to_string()],
            ..ServiceConfig::default()
        };
        let (handle, join) = Service::spawn(store, config);
        (dir, handle, join)
    }

    #[tokio::test]
    async fn requests_apply_in_order() {
        let (_dir, handle, join) = spawn_service().await;

        handle.register_user("p1", "alice").await.expect("register");
        assert!(handle.is_user_exists("p1").await.unwrap());
        handle
            .choose_role("p1", RoleCategory::Codes)
            .await
            .expect("role");

        let draft = QuestDraft {
            title: "Read a chapter".to_string(),
            description: "One chapter before bed".to_string(),
            stamina_cost: 10,
            coin_reward: 40,
            exp_reward: 25,
        };
        let quest_id = handle.accept_quest("p1", draft).await.expect("accept");
        handle.complete_quest("p1", quest_id).await.expect("complete");

        assert_eq!(handle.get_coins("p1").await.unwrap(), 40);
        let profile = handle.get_profile("p1").await.unwrap().expect("profile");
        assert_eq!(profile.roles[0].exp, 25);

        drop(handle);
        join.await.expect("actor exits cleanly");
    }

    #[tokio::test]
    async fn grants_and_purchases_through_the_handle() {
        let (_dir, handle, _join) = spawn_service().await;
        handle.register_user("p1", "alice").await.unwrap();

        handle
            .grant_coin(
                "admin-principal",
                GrantTarget::Username("alice".to_string()),
                1000,
            )
            .await
            .expect("grant");

        let shop = handle.get_shop("p1").await.unwrap();
        let skin_id = shop.available[0].id;
        let item_id = handle.buy_skin("p1", skin_id).await.expect("buy");
        handle
            .set_active_inventory("p1", item_id)
            .await
            .expect("equip");

        let inventory = handle.get_inventory("p1").await.unwrap();
        assert_eq!(inventory.len(), 1);
        assert!(inventory[0].item.is_active);
    }

    #[tokio::test]
    async fn dropped_service_reports_unavailable() {
        let (_dir, handle, join) = spawn_service().await;
        // Kill the actor while a handle is still alive; calls through that
        // handle must fail fast instead of waiting on a dead channel.
        join.abort();
        let _ = join.await;

        let err = handle.is_user_exists("p1").await.unwrap_err();
        assert!(matches!(err, StoreError::ServiceUnavailable));
    }
}

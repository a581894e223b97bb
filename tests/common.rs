//! Test utilities & fixtures shared by the integration suites.

use chrono::Duration;
use habitforge::engine::{HabitStore, HabitStoreBuilder, QuestDraft};
use habitforge::server::{Service, ServiceConfig, ServiceHandle};
use tempfile::TempDir;
use tokio::task::JoinHandle;

#[allow(dead_code)]
pub const ADMIN: &str = "admin-principal";

/// Open a throwaway store with the starter catalog seeded.
#[allow(dead_code)]
pub fn temp_store() -> (TempDir, HabitStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = HabitStoreBuilder::new(dir.path()).open().expect("store");
    (dir, store)
}

/// Spawn an engine actor over a throwaway store, with one admin principal.
#[allow(dead_code)]
pub fn temp_service() -> (TempDir, ServiceHandle, JoinHandle<()>) {
    let (dir, store) = temp_store();
    let config = ServiceConfig {
        admins: vec![ADMIN.to_string()],
        ..ServiceConfig::default()
    };
    let (handle, join) = Service::spawn(store, config);
    (dir, handle, join)
}

/// A plausible quest draft with the given economy numbers.
#[allow(dead_code)]
pub fn quest_draft(stamina_cost: u64, coin_reward: u64, exp_reward: u64) -> QuestDraft {
    QuestDraft {
        title: "Practice scales for 20 minutes".to_string(),
        description: "Major scales, both hands, metronome at 80bpm".to_string(),
        stamina_cost,
        coin_reward,
        exp_reward,
    }
}

/// Shift a stored quest's window into the past so it reads as overdue.
#[allow(dead_code)]
pub fn backdate_quest(store: &HabitStore, principal: &str, quest_id: u64, hours: i64) {
    let mut user = store.get_user(principal).expect("user");
    let quest = user.quest_mut(quest_id).expect("quest");
    quest.accepted_at = quest.accepted_at - Duration::hours(hours);
    quest.deadline = quest.deadline - Duration::hours(hours);
    store.put_user(user).expect("put");
}

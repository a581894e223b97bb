//! Quest lifecycle and the stamina ledger.
//!
//! States move one way: `OnProgress` to `Completed` or `Failed`, never back.
//! Stamina is debited on accept and never refunded; it replenishes through a
//! lazy time-based refill applied whenever the balance is read or spent.
//! Deadline enforcement is pull-based: the sweep marks overdue quests failed,
//! and completion re-checks the deadline so a stale `OnProgress` status can
//! never be completed after it expired.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::engine::errors::{StoreError, UserError};
use crate::engine::progression::award_experience;
use crate::engine::registry::require_user;
use crate::engine::storage::HabitStore;
use crate::engine::types::{
    QuestConfig, QuestDraft, QuestHistory, QuestRecord, StaminaConfig, UserRecord,
};
use crate::logutil::escape_log;
use crate::validation::{clamp_text, MAX_QUEST_DESCRIPTION_LEN, MAX_QUEST_TITLE_LEN};

/// Credit the lazy stamina refill: one point per elapsed regen interval,
/// capped at the configured maximum. The remainder of a partial interval is
/// preserved by advancing `stamina_updated_at` in whole intervals only.
pub(crate) fn apply_stamina_regen(user: &mut UserRecord, cfg: &StaminaConfig, now: DateTime<Utc>) {
    if cfg.regen_minutes <= 0 {
        return;
    }
    if user.stamina >= cfg.max {
        user.stamina = cfg.max;
        user.stamina_updated_at = now;
        return;
    }
    let elapsed = now.signed_duration_since(user.stamina_updated_at);
    let intervals = elapsed.num_minutes() / cfg.regen_minutes;
    if intervals <= 0 {
        return;
    }
    let credit = (intervals as u64).min(cfg.max - user.stamina);
    user.stamina += credit;
    user.stamina_updated_at = if user.stamina >= cfg.max {
        now
    } else {
        user.stamina_updated_at + Duration::minutes(intervals * cfg.regen_minutes)
    };
}

/// Accept a quest: debits stamina immediately and opens the fixed deadline
/// window. Validation happens before any mutation, so a failed call leaves
/// the aggregate untouched.
pub fn accept_quest(
    store: &HabitStore,
    cfg: &QuestConfig,
    principal: &str,
    draft: QuestDraft,
) -> Result<u64, UserError> {
    let mut user = require_user(store, principal)?;
    let now = Utc::now();
    apply_stamina_regen(&mut user, &cfg.stamina, now);

    if user.has_active_quest() {
        return Err(UserError::ActiveQuestExists);
    }
    if draft.stamina_cost > user.stamina {
        return Err(UserError::NotEnoughStamina);
    }

    let draft = QuestDraft {
        title: clamp_text(&draft.title, MAX_QUEST_TITLE_LEN),
        description: clamp_text(&draft.description, MAX_QUEST_DESCRIPTION_LEN),
        ..draft
    };

    let quest_id = store.next_quest_id()?;
    let deadline = now + Duration::hours(cfg.deadline_hours);
    let quest = QuestRecord::new(quest_id, draft, now, deadline);

    user.stamina -= quest.stamina_cost;
    info!(
        "user '{}' accepted quest {} '{}' (stamina {} -> {})",
        escape_log(&user.username),
        quest_id,
        escape_log(&quest.title),
        user.stamina + quest.stamina_cost,
        user.stamina
    );
    user.quests.push(quest);
    store.put_user(user)?;
    Ok(quest_id)
}

/// Complete an on-progress quest: credits the coin reward and pays the
/// experience to the active role. Fails with `NoActiveRole` when no role is
/// active, so the reward is never silently dropped. An expired quest is
/// marked failed on the spot and refused.
pub fn complete_quest(store: &HabitStore, principal: &str, quest_id: u64) -> Result<(), UserError> {
    let mut user = require_user(store, principal)?;
    let now = Utc::now();

    {
        let quest = user.quest(quest_id).ok_or(UserError::QuestNotFound)?;
        if !quest.is_on_progress() {
            return Err(UserError::QuestNotInProgress);
        }
        if quest.is_expired(now) {
            // Overdue but not yet swept: settle it as failed, then refuse.
            let username = user.username.clone();
            if let Some(quest) = user.quest_mut(quest_id) {
                quest.mark_failed();
            }
            store.put_user(user)?;
            debug!(
                "user '{}' tried to complete expired quest {}",
                escape_log(&username),
                quest_id
            );
            return Err(UserError::QuestNotInProgress);
        }
    }

    if user.active_role().is_none() {
        return Err(UserError::NoActiveRole);
    }

    let (coin_reward, exp_reward) = {
        let quest = user.quest_mut(quest_id).ok_or(UserError::QuestNotFound)?;
        quest.mark_completed();
        (quest.coin_reward, quest.exp_reward)
    };
    user.coin = user.coin.saturating_add(coin_reward);
    let role = user.active_role_mut().ok_or(UserError::NoActiveRole)?;
    award_experience(role, exp_reward);
    let (category, level) = (role.category, role.level);

    info!(
        "user '{}' completed quest {}: +{} coin, +{} exp to {:?} (level {})",
        escape_log(&user.username),
        quest_id,
        coin_reward,
        exp_reward,
        category,
        level
    );
    store.put_user(user)?;
    Ok(())
}

/// Sweep every user's on-progress quest and fail the overdue ones. Idempotent
/// and safe to run repeatedly; users without an on-progress quest are skipped
/// without a write. Returns the number of quests transitioned.
pub fn fail_expired_quests(store: &HabitStore) -> Result<usize, StoreError> {
    let now = Utc::now();
    let mut swept = 0usize;
    for principal in store.list_principals()? {
        let mut user = store.get_user(&principal)?;
        if !user.has_active_quest() {
            continue;
        }
        let expired: Vec<u64> = user
            .quests
            .iter()
            .filter(|q| q.is_on_progress() && q.is_expired(now))
            .map(|q| q.id)
            .collect();
        if expired.is_empty() {
            continue;
        }
        for quest_id in &expired {
            if let Some(quest) = user.quest_mut(*quest_id) {
                quest.mark_failed();
            }
        }
        debug!(
            "expired {} quest(s) for user '{}'",
            expired.len(),
            escape_log(&user.username)
        );
        swept += expired.len();
        store.put_user(user)?;
    }
    Ok(swept)
}

/// Look up one of the caller's quests by id. Absent caller or quest yields
/// `None`; queries carry no error set.
pub fn detail_quest(
    store: &HabitStore,
    principal: &str,
    quest_id: u64,
) -> Result<Option<QuestRecord>, StoreError> {
    let Some(user) = store.find_user(principal)? else {
        return Ok(None);
    };
    Ok(user.quest(quest_id).cloned())
}

/// The caller's quest log partitioned by status. Unregistered callers see
/// empty lists.
pub fn history_quest(store: &HabitStore, principal: &str) -> Result<QuestHistory, StoreError> {
    let Some(user) = store.find_user(principal)? else {
        return Ok(QuestHistory::default());
    };
    let mut history = QuestHistory::default();
    for quest in user.quests {
        match quest.status {
            crate::engine::types::QuestStatus::OnProgress => history.on_progress.push(quest),
            crate::engine::types::QuestStatus::Completed => history.completed.push(quest),
            crate::engine::types::QuestStatus::Failed => history.failed.push(quest),
        }
    }
    Ok(history)
}

/// Current stamina balance after applying the lazy refill. Persists the
/// credit so repeated reads agree.
pub fn get_stamina(
    store: &HabitStore,
    cfg: &StaminaConfig,
    principal: &str,
) -> Result<u64, UserError> {
    let mut user = require_user(store, principal)?;
    apply_stamina_regen(&mut user, cfg, Utc::now());
    let stamina = user.stamina;
    store.put_user(user)?;
    Ok(stamina)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progression::choose_role;
    use crate::engine::registry::register_user;
    use crate::engine::storage::HabitStoreBuilder;
    use crate::engine::types::{QuestStatus, RoleCategory};
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, HabitStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = HabitStoreBuilder::new(dir.path())
            .without_catalog_seed()
            .open()
            .expect("store");
        (dir, store)
    }

    fn cfg() -> QuestConfig {
        QuestConfig::default()
    }

    fn draft(cost: u64, coin: u64, exp: u64) -> QuestDraft {
        QuestDraft {
            title: "Morning run".to_string(),
            description: "Run 5km before work".to_string(),
            stamina_cost: cost,
            coin_reward: coin,
            exp_reward: exp,
        }
    }

    /// Push the stored deadline of a quest into the past, simulating elapsed
    /// time without waiting for it.
    fn backdate_quest(store: &HabitStore, principal: &str, quest_id: u64, hours: i64) {
        let mut user = store.get_user(principal).expect("user");
        let quest = user.quest_mut(quest_id).expect("quest");
        quest.accepted_at = quest.accepted_at - Duration::hours(hours);
        quest.deadline = quest.deadline - Duration::hours(hours);
        store.put_user(user).expect("put");
    }

    #[test]
    fn accept_debits_stamina_and_sets_deadline() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();

        let quest_id = accept_quest(&store, &cfg(), "p1", draft(20, 50, 30)).expect("accept");
        let user = store.get_user("p1").unwrap();
        assert_eq!(user.stamina, 80);
        let quest = user.quest(quest_id).unwrap();
        assert_eq!(quest.status, QuestStatus::OnProgress);
        assert_eq!(quest.deadline - quest.accepted_at, Duration::hours(24));
    }

    #[test]
    fn accept_fails_without_stamina_and_leaves_balance() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 15).unwrap();
        let cfg = QuestConfig {
            stamina: StaminaConfig {
                max: 15,
                regen_minutes: 5,
            },
            ..QuestConfig::default()
        };

        let err = accept_quest(&store, &cfg, "p1", draft(20, 0, 0)).unwrap_err();
        assert!(matches!(err, UserError::NotEnoughStamina));
        let user = store.get_user("p1").unwrap();
        assert_eq!(user.stamina, 15);
        assert!(user.quests.is_empty());
    }

    #[test]
    fn second_accept_fails_while_first_on_progress() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();

        let first = accept_quest(&store, &cfg(), "p1", draft(10, 0, 0)).unwrap();
        let err = accept_quest(&store, &cfg(), "p1", draft(10, 0, 0)).unwrap_err();
        assert!(matches!(err, UserError::ActiveQuestExists));
        let user = store.get_user("p1").unwrap();
        assert_eq!(user.quest(first).unwrap().status, QuestStatus::OnProgress);
        assert_eq!(user.quests.len(), 1);
    }

    #[test]
    fn accept_requires_registration() {
        let (_dir, store) = setup_store();
        let err = accept_quest(&store, &cfg(), "nobody", draft(1, 0, 0)).unwrap_err();
        assert!(matches!(err, UserError::UserNotFound));
    }

    #[test]
    fn complete_pays_coin_and_experience() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();
        choose_role(&store, "p1", RoleCategory::Sports).unwrap();

        let quest_id = accept_quest(&store, &cfg(), "p1", draft(10, 50, 250)).unwrap();
        complete_quest(&store, "p1", quest_id).expect("complete");

        let user = store.get_user("p1").unwrap();
        assert_eq!(user.coin, 50);
        let role = user.active_role().unwrap();
        assert_eq!(role.exp, 250);
        assert_eq!(role.level, 2);
        assert_eq!(user.quest(quest_id).unwrap().status, QuestStatus::Completed);
    }

    #[test]
    fn complete_without_active_role_fails_and_keeps_quest() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();

        let quest_id = accept_quest(&store, &cfg(), "p1", draft(10, 50, 30)).unwrap();
        let err = complete_quest(&store, "p1", quest_id).unwrap_err();
        assert!(matches!(err, UserError::NoActiveRole));

        // No partial effects: quest still open, no coin credited.
        let user = store.get_user("p1").unwrap();
        assert_eq!(user.coin, 0);
        assert_eq!(user.quest(quest_id).unwrap().status, QuestStatus::OnProgress);
    }

    #[test]
    fn complete_twice_fails_second_time() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();
        choose_role(&store, "p1", RoleCategory::Codes).unwrap();

        let quest_id = accept_quest(&store, &cfg(), "p1", draft(10, 50, 30)).unwrap();
        complete_quest(&store, "p1", quest_id).unwrap();
        let err = complete_quest(&store, "p1", quest_id).unwrap_err();
        assert!(matches!(err, UserError::QuestNotInProgress));
        assert_eq!(store.get_user("p1").unwrap().coin, 50);
    }

    #[test]
    fn complete_unknown_quest() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();
        let err = complete_quest(&store, "p1", 999).unwrap_err();
        assert!(matches!(err, UserError::QuestNotFound));
    }

    #[test]
    fn expired_quest_cannot_be_completed_even_before_sweep() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();
        choose_role(&store, "p1", RoleCategory::Codes).unwrap();

        let quest_id = accept_quest(&store, &cfg(), "p1", draft(10, 50, 30)).unwrap();
        backdate_quest(&store, "p1", quest_id, 48);

        let err = complete_quest(&store, "p1", quest_id).unwrap_err();
        assert!(matches!(err, UserError::QuestNotInProgress));

        let user = store.get_user("p1").unwrap();
        assert_eq!(user.quest(quest_id).unwrap().status, QuestStatus::Failed);
        assert_eq!(user.coin, 0);
        // Stamina stays spent.
        assert_eq!(user.stamina, 90);
    }

    #[test]
    fn sweep_fails_overdue_quests_and_is_idempotent() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();
        register_user(&store, "p2", "bob", 100).unwrap();
        register_user(&store, "p3", "carol", 100).unwrap();

        let q1 = accept_quest(&store, &cfg(), "p1", draft(10, 0, 0)).unwrap();
        let q2 = accept_quest(&store, &cfg(), "p2", draft(10, 0, 0)).unwrap();
        backdate_quest(&store, "p1", q1, 48);
        // p2's quest stays within its window; p3 has no quest at all.

        assert_eq!(fail_expired_quests(&store).unwrap(), 1);
        assert_eq!(
            store.get_user("p1").unwrap().quest(q1).unwrap().status,
            QuestStatus::Failed
        );
        assert_eq!(
            store.get_user("p2").unwrap().quest(q2).unwrap().status,
            QuestStatus::OnProgress
        );

        // Second run is a no-op.
        let before: Vec<_> = ["p1", "p2", "p3"]
            .iter()
            .map(|p| store.get_user(p).unwrap().quests)
            .collect();
        assert_eq!(fail_expired_quests(&store).unwrap(), 0);
        let after: Vec<_> = ["p1", "p2", "p3"]
            .iter()
            .map(|p| store.get_user(p).unwrap().quests)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn history_partitions_by_status() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();
        choose_role(&store, "p1", RoleCategory::Codes).unwrap();

        let q1 = accept_quest(&store, &cfg(), "p1", draft(10, 10, 10)).unwrap();
        complete_quest(&store, "p1", q1).unwrap();
        let q2 = accept_quest(&store, &cfg(), "p1", draft(10, 10, 10)).unwrap();
        backdate_quest(&store, "p1", q2, 48);
        fail_expired_quests(&store).unwrap();
        let q3 = accept_quest(&store, &cfg(), "p1", draft(10, 10, 10)).unwrap();

        let history = history_quest(&store, "p1").unwrap();
        assert_eq!(
            history.on_progress.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![q3]
        );
        assert_eq!(
            history.completed.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![q1]
        );
        assert_eq!(
            history.failed.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![q2]
        );

        assert_eq!(detail_quest(&store, "p1", q2).unwrap().unwrap().id, q2);
        assert!(detail_quest(&store, "p1", 999).unwrap().is_none());
        assert!(history_quest(&store, "nobody").unwrap().on_progress.is_empty());
    }

    #[test]
    fn stamina_regen_credits_elapsed_intervals() {
        let stamina_cfg = StaminaConfig {
            max: 100,
            regen_minutes: 5,
        };
        let mut user = UserRecord::new("p1", "alice", 100);
        user.stamina = 40;
        let start = Utc::now();
        user.stamina_updated_at = start;

        // 17 minutes: three full intervals, remainder preserved.
        apply_stamina_regen(&mut user, &stamina_cfg, start + Duration::minutes(17));
        assert_eq!(user.stamina, 43);
        assert_eq!(user.stamina_updated_at, start + Duration::minutes(15));

        // A huge gap caps at max.
        apply_stamina_regen(&mut user, &stamina_cfg, start + Duration::days(30));
        assert_eq!(user.stamina, 100);
    }

    #[test]
    fn get_stamina_reflects_regen_and_persists() {
        let (_dir, store) = setup_store();
        register_user(&store, "p1", "alice", 100).unwrap();
        accept_quest(&store, &cfg(), "p1", draft(30, 0, 0)).unwrap();

        // Pretend the last refill credit happened an hour ago.
        let mut user = store.get_user("p1").unwrap();
        user.stamina_updated_at = user.stamina_updated_at - Duration::minutes(60);
        store.put_user(user).unwrap();

        let stamina_cfg = StaminaConfig {
            max: 100,
            regen_minutes: 5,
        };
        let stamina = get_stamina(&store, &stamina_cfg, "p1").unwrap();
        assert_eq!(stamina, 82); // 70 spent-down + 12 intervals
        assert_eq!(store.get_user("p1").unwrap().stamina, 82);
    }
}

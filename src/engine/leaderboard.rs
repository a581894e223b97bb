//! Per-role leaderboards, recomputed on demand from the user aggregates.

use std::collections::HashMap;

use crate::engine::errors::StoreError;
use crate::engine::storage::HabitStore;
use crate::engine::types::{
    LeaderboardEntry, LeaderboardView, RoleCategory, SkinRecord, UserRecord,
};

/// Rank every user who has ever selected `category`, by that role's
/// experience. Ties break on principal so repeated calls agree on order. The
/// caller's own row rides along even when it falls outside the top N.
pub fn leaderboard_by_role(
    store: &HabitStore,
    caller: &str,
    category: RoleCategory,
    top_n: usize,
) -> Result<LeaderboardView, StoreError> {
    let mut ranked: Vec<(UserRecord, u64, u32)> = Vec::new();
    for principal in store.list_principals()? {
        let user = store.get_user(&principal)?;
        if let Some(role) = user.role(category) {
            let (exp, level) = (role.exp, role.level);
            ranked.push((user, exp, level));
        }
    }
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.principal.cmp(&b.0.principal)));

    // Missing catalog entries render the row skinless; real store failures
    // (corruption, schema mismatch) propagate instead of being masked.
    let mut skins: HashMap<u64, Option<SkinRecord>> = HashMap::new();
    let mut skin_for = |user: &UserRecord| -> Result<Option<SkinRecord>, StoreError> {
        let Some(item) = user.active_item() else {
            return Ok(None);
        };
        if let Some(cached) = skins.get(&item.skin_id) {
            return Ok(cached.clone());
        }
        let skin = store.find_skin(item.skin_id)?;
        skins.insert(item.skin_id, skin.clone());
        Ok(skin)
    };

    let mut view = LeaderboardView::default();
    for (index, (user, exp, level)) in ranked.iter().enumerate() {
        let rank = index as u32 + 1;
        let in_top = index < top_n;
        if !in_top && user.principal != caller {
            continue;
        }
        let entry = LeaderboardEntry {
            rank,
            username: user.username.clone(),
            exp: *exp,
            level: *level,
            skin: skin_for(user)?,
        };
        if user.principal == caller {
            view.mine = Some(entry.clone());
        }
        if in_top {
            view.top.push(entry);
        }
    }
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progression::choose_role;
    use crate::engine::registry::register_user;
    use crate::engine::storage::HabitStoreBuilder;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, HabitStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = HabitStoreBuilder::new(dir.path())
            .without_catalog_seed()
            .open()
            .expect("store");
        (dir, store)
    }

    fn seed_player(store: &HabitStore, principal: &str, username: &str, exp: u64) {
        register_user(store, principal, username, 100).unwrap();
        choose_role(store, principal, RoleCategory::Codes).unwrap();
        let mut user = store.get_user(principal).unwrap();
        user.active_role_mut().unwrap().exp = exp;
        store.put_user(user).unwrap();
    }

    #[test]
    fn ranks_by_experience_descending() {
        let (_dir, store) = setup_store();
        seed_player(&store, "p1", "alice", 300);
        seed_player(&store, "p2", "bob", 900);
        seed_player(&store, "p3", "carol", 100);

        let view = leaderboard_by_role(&store, "p1", RoleCategory::Codes, 10).unwrap();
        let names: Vec<&str> = view.top.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);
        assert_eq!(
            view.top.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(view.mine.unwrap().rank, 2);
    }

    #[test]
    fn caller_row_present_outside_top_n() {
        let (_dir, store) = setup_store();
        for (i, exp) in [900u64, 700, 500, 300, 100].iter().enumerate() {
            seed_player(&store, &format!("p{}", i), &format!("user{}", i), *exp);
        }

        let view = leaderboard_by_role(&store, "p4", RoleCategory::Codes, 3).unwrap();
        assert_eq!(view.top.len(), 3);
        let mine = view.mine.unwrap();
        assert_eq!(mine.username, "user4");
        assert_eq!(mine.rank, 5);
    }

    #[test]
    fn only_users_with_the_role_appear() {
        let (_dir, store) = setup_store();
        seed_player(&store, "p1", "alice", 300);
        register_user(&store, "p2", "bob", 100).unwrap();
        choose_role(&store, "p2", RoleCategory::Arts).unwrap();

        let view = leaderboard_by_role(&store, "p2", RoleCategory::Codes, 10).unwrap();
        assert_eq!(view.top.len(), 1);
        assert!(view.mine.is_none());

        let arts = leaderboard_by_role(&store, "p2", RoleCategory::Arts, 10).unwrap();
        assert_eq!(arts.top.len(), 1);
        assert_eq!(arts.mine.unwrap().username, "bob");
    }

    #[test]
    fn ties_break_deterministically() {
        let (_dir, store) = setup_store();
        seed_player(&store, "pa", "alice", 500);
        seed_player(&store, "pb", "bob", 500);

        let first = leaderboard_by_role(&store, "pa", RoleCategory::Codes, 10).unwrap();
        let second = leaderboard_by_role(&store, "pa", RoleCategory::Codes, 10).unwrap();
        assert_eq!(first.top, second.top);
        assert_eq!(first.top[0].username, "alice");
    }

    #[test]
    fn dangling_equipped_skin_renders_skinless() {
        let (_dir, store) = setup_store();
        seed_player(&store, "p1", "alice", 400);

        // Equip an item whose skin is absent from the catalog.
        let mut user = store.get_user("p1").unwrap();
        user.inventory
            .push(crate::engine::types::InventoryItem::new(1, 999, chrono::Utc::now()));
        user.equip_item(1);
        store.put_user(user).unwrap();

        let view = leaderboard_by_role(&store, "p1", RoleCategory::Codes, 10).unwrap();
        assert_eq!(view.top.len(), 1);
        assert!(view.top[0].skin.is_none());
        assert!(view.mine.unwrap().skin.is_none());
    }

    #[test]
    fn empty_board_for_unused_role() {
        let (_dir, store) = setup_store();
        let view = leaderboard_by_role(&store, "nobody", RoleCategory::Traveler, 10).unwrap();
        assert!(view.top.is_empty());
        assert!(view.mine.is_none());
    }
}

//! Identity and registration: maps opaque caller-identity tokens to user
//! aggregates and hosts the admin coin grants.

use log::info;

use crate::engine::errors::{RegistrationError, ShopError, StoreError, UserError};
use crate::engine::storage::HabitStore;
use crate::engine::types::{RoleRecord, UserProfile, UserRecord};
use crate::logutil::escape_log;
use crate::validation;

/// Capability check for administrative operations. The roster comes from the
/// service configuration.
pub fn is_admin(admins: &[String], principal: &str) -> bool {
    admins.iter().any(|admin| admin == principal)
}

/// Register a new user aggregate for the calling identity. The new user
/// starts with zero coin, full stamina, and no roles.
pub fn register_user(
    store: &HabitStore,
    principal: &str,
    username: &str,
    stamina_max: u64,
) -> Result<(UserRecord, Vec<RoleRecord>), RegistrationError> {
    let username = validation::validate_user_name(username)?;

    if store.find_user(principal)?.is_some() {
        return Err(RegistrationError::AlreadyRegistered);
    }
    if store.username_taken(&username)? {
        return Err(RegistrationError::UsernameTaken);
    }

    let user = UserRecord::new(principal, &username, stamina_max);
    store.put_user(user)?;
    store.index_username(&username, principal)?;
    info!("registered user '{}'", escape_log(&username));

    let stored = store.get_user(principal)?;
    let roles = stored.roles.clone();
    Ok((stored, roles))
}

/// True iff the calling identity owns a user aggregate.
pub fn is_user_exists(store: &HabitStore, principal: &str) -> Result<bool, StoreError> {
    Ok(store.find_user(principal)?.is_some())
}

/// Full profile for the dashboard, or `None` when the caller is unregistered.
pub fn get_profile(store: &HabitStore, principal: &str) -> Result<Option<UserProfile>, StoreError> {
    let Some(user) = store.find_user(principal)? else {
        return Ok(None);
    };
    let roles = user.roles.clone();
    let active_inventory = user.active_item().cloned();
    Ok(Some(UserProfile {
        user,
        roles,
        active_inventory,
    }))
}

fn credit_coin(store: &HabitStore, mut user: UserRecord, amount: u64) -> Result<(), StoreError> {
    user.coin = user.coin.saturating_add(amount);
    let username = user.username.clone();
    store.put_user(user)?;
    info!("granted {} coin to '{}'", amount, escape_log(&username));
    Ok(())
}

/// Admin grant: credit coin to the aggregate owned by `target_principal`.
pub fn grant_coin(
    store: &HabitStore,
    admins: &[String],
    caller: &str,
    target_principal: &str,
    amount: u64,
) -> Result<(), ShopError> {
    if !is_admin(admins, caller) {
        return Err(ShopError::NotAdmin);
    }
    let user = store
        .find_user(target_principal)?
        .ok_or(ShopError::UserNotFound)?;
    credit_coin(store, user, amount)?;
    Ok(())
}

/// Admin grant addressed by username instead of principal.
pub fn grant_coin_by_username(
    store: &HabitStore,
    admins: &[String],
    caller: &str,
    username: &str,
    amount: u64,
) -> Result<(), ShopError> {
    if !is_admin(admins, caller) {
        return Err(ShopError::NotAdmin);
    }
    let user = store
        .find_user_by_username(username)?
        .ok_or(ShopError::UserNotFound)?;
    credit_coin(store, user, amount)?;
    Ok(())
}

/// Resolve the caller to its aggregate or fail with the uniform lookup error.
pub(crate) fn require_user(store: &HabitStore, principal: &str) -> Result<UserRecord, UserError> {
    store.get_user(principal).map_err(UserError::from_lookup)
}

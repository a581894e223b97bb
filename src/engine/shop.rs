//! The skin shop: catalog browsing, purchases, and admin catalog management.

use log::info;

use crate::engine::errors::{ShopError, StoreError, UserError};
use crate::engine::registry::{is_admin, require_user};
use crate::engine::storage::HabitStore;
use crate::engine::types::{InventoryItem, ShopView, SkinDraft, SkinRecord};
use crate::logutil::escape_log;

/// Catalog partitioned for the caller into not-yet-owned and owned skins.
/// An unregistered caller sees the whole catalog as available.
pub fn get_shop(store: &HabitStore, principal: &str) -> Result<ShopView, StoreError> {
    let user = store.find_user(principal)?;
    let mut view = ShopView::default();
    for skin in store.list_skins()? {
        let owned = user.as_ref().map(|u| u.owns_skin(skin.id)).unwrap_or(false);
        if owned {
            view.owned.push(skin);
        } else {
            view.available.push(skin);
        }
    }
    Ok(view)
}

/// Purchase a catalog skin: debits coin and mints an inventory item. The
/// caller's first-ever item is equipped automatically so a fresh buyer always
/// has an appearance.
pub fn buy_skin(store: &HabitStore, principal: &str, skin_id: u64) -> Result<u64, ShopError> {
    let mut user = store.get_user(principal).map_err(ShopError::from_lookup)?;
    let skin = store.find_skin(skin_id)?.ok_or(ShopError::SkinNotFound)?;

    if user.owns_skin(skin_id) {
        return Err(ShopError::AlreadyOwned);
    }
    if skin.price > user.coin {
        return Err(ShopError::NotEnoughCoin);
    }

    let inventory_id = store.next_inventory_id()?;
    let first_item = user.inventory.is_empty();
    user.coin -= skin.price;
    user.inventory
        .push(InventoryItem::new(inventory_id, skin_id, chrono::Utc::now()));
    if first_item {
        user.equip_item(inventory_id);
    }
    info!(
        "user '{}' bought skin {} '{}' for {} coin",
        escape_log(&user.username),
        skin_id,
        escape_log(&skin.name),
        skin.price
    );
    store.put_user(user)?;
    Ok(inventory_id)
}

/// Admin operation: append a new skin to the catalog. Returns the new id.
pub fn add_skin(
    store: &HabitStore,
    admins: &[String],
    caller: &str,
    draft: SkinDraft,
) -> Result<u64, ShopError> {
    if !is_admin(admins, caller) {
        return Err(ShopError::NotAdmin);
    }
    let id = store.next_skin_id()?;
    let skin = SkinRecord::new(id, draft);
    info!("catalog skin {} '{}' added", id, escape_log(&skin.name));
    store.put_skin(skin)?;
    Ok(id)
}

/// Current coin balance for the caller.
pub fn get_coins(store: &HabitStore, principal: &str) -> Result<u64, UserError> {
    Ok(require_user(store, principal)?.coin)
}

//! Owned-item queries and the equipped-appearance selector.

use log::warn;

use crate::engine::errors::{ShopError, StoreError};
use crate::engine::storage::HabitStore;
use crate::engine::types::InventoryEntry;

/// The caller's inventory joined with catalog entries. Items whose skin has
/// vanished from the catalog are logged and skipped rather than failing the
/// whole listing. Unregistered callers see an empty list.
pub fn get_inventory(store: &HabitStore, principal: &str) -> Result<Vec<InventoryEntry>, StoreError> {
    let Some(user) = store.find_user(principal)? else {
        return Ok(Vec::new());
    };
    let mut entries = Vec::with_capacity(user.inventory.len());
    for item in user.inventory {
        match store.find_skin(item.skin_id)? {
            Some(skin) => entries.push(InventoryEntry { item, skin }),
            None => warn!(
                "inventory item {} references missing skin {}",
                item.id, item.skin_id
            ),
        }
    }
    Ok(entries)
}

/// Equip the owned item with `inventory_id`, exclusively. Only ever one item
/// is active at a time.
pub fn set_active_inventory(
    store: &HabitStore,
    principal: &str,
    inventory_id: u64,
) -> Result<(), ShopError> {
    let mut user = store.get_user(principal).map_err(ShopError::from_lookup)?;
    if !user.equip_item(inventory_id) {
        return Err(ShopError::InventoryNotFound);
    }
    store.put_user(user)?;
    Ok(())
}

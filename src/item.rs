use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::crafting::Ledger;
use crate::data::ItemRegistry;

// ============================================================================
// Inventory
// ============================================================================

pub const INVENTORY_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item_id: String,
    pub quantity: u32,
}

impl InventorySlot {
    pub fn new(item_id: &str, quantity: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            quantity,
        }
    }
}

/// Fixed-size slot inventory; stack limits come from the item registry
#[derive(Debug, Clone)]
pub struct Inventory {
    pub slots: Vec<Option<InventorySlot>>,
    items: Arc<ItemRegistry>,
}

impl Inventory {
    pub fn new(items: Arc<ItemRegistry>) -> Self {
        Self {
            slots: vec![None; INVENTORY_SIZE],
            items,
        }
    }

    /// Try to add an item to inventory. Returns the quantity that couldn't fit.
    pub fn add_item(&mut self, item_id: &str, mut quantity: u32) -> u32 {
        let max_stack = self.items.max_stack(item_id);

        // First, try to stack with existing items
        for slot in self.slots.iter_mut().flatten() {
            if quantity == 0 {
                break;
            }
            if slot.item_id == item_id && slot.quantity < max_stack {
                let add = quantity.min(max_stack - slot.quantity);
                slot.quantity += add;
                quantity -= add;
            }
        }

        // Then, try to find empty slots for remaining quantity
        for slot in &mut self.slots {
            if quantity == 0 {
                break;
            }
            if slot.is_none() {
                let add = quantity.min(max_stack);
                *slot = Some(InventorySlot::new(item_id, add));
                quantity -= add;
            }
        }

        quantity // Return what couldn't fit
    }

    /// Remove from the first matching slots onward. Returns the quantity that wasn't there.
    pub fn remove_item(&mut self, item_id: &str, mut quantity: u32) -> u32 {
        for slot in &mut self.slots {
            if quantity == 0 {
                break;
            }
            if let Some(inv_slot) = slot {
                if inv_slot.item_id == item_id {
                    let take = quantity.min(inv_slot.quantity);
                    inv_slot.quantity -= take;
                    quantity -= take;
                    if inv_slot.quantity == 0 {
                        *slot = None;
                    }
                }
            }
        }
        quantity
    }

    /// Total held across all slots
    pub fn count_item(&self, item_id: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.item_id == item_id)
            .map(|slot| slot.quantity)
            .sum()
    }

    /// How many more of the item would fit right now
    pub fn free_space_for(&self, item_id: &str) -> u32 {
        let max_stack = self.items.max_stack(item_id);
        self.slots
            .iter()
            .map(|slot| match slot {
                None => max_stack,
                Some(s) if s.item_id == item_id => max_stack.saturating_sub(s.quantity),
                Some(_) => 0,
            })
            .fold(0u32, u32::saturating_add)
    }

    /// Occupied slots as a serializable update
    pub fn to_update(&self) -> Vec<InventorySlotUpdate> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref().map(|s| InventorySlotUpdate {
                    slot: i as u8,
                    item_id: s.item_id.clone(),
                    quantity: s.quantity,
                })
            })
            .collect()
    }

    /// Serialize slots to JSON for database storage
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.slots).unwrap_or_else(|_| "[]".to_string())
    }

    /// Rebuild from stored JSON; unreadable data yields an empty inventory
    pub fn from_json(json: &str, items: Arc<ItemRegistry>) -> Self {
        let mut inventory = Self::new(items);
        let stored: Vec<Option<InventorySlot>> = serde_json::from_str(json).unwrap_or_default();
        for (slot, saved) in inventory.slots.iter_mut().zip(stored) {
            *slot = saved.filter(|s| s.quantity > 0);
        }
        inventory
    }
}

impl Ledger for Inventory {
    fn has_quantity(&self, item_id: &str) -> u32 {
        self.count_item(item_id)
    }

    fn remove(&mut self, item_id: &str, count: u32) -> u32 {
        self.remove_item(item_id, count)
    }

    fn add_best_effort(&mut self, item_id: &str, count: u32) -> u32 {
        self.add_item(item_id, count)
    }

    fn has_space_for(&self, item_id: &str, count: u32) -> bool {
        self.free_space_for(item_id) >= count
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InventorySlotUpdate {
    pub slot: u8,
    pub item_id: String,
    pub quantity: u32,
}

//! Crafted output slot.
//!
//! Holds finished-but-unclaimed results of a single item type. The slot is
//! either empty or holds a non-zero amount of exactly one item.

use serde::Serialize;

use super::definition::CraftingItem;
use crate::data::ItemRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CraftedItemSlot {
    item_id: Option<String>,
    amount: u32,
}

impl CraftedItemSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled from saved data; an empty ID or zero amount yields an empty slot
    pub fn with_contents(item_id: &str, amount: u32) -> Self {
        if item_id.trim().is_empty() || amount == 0 {
            return Self::new();
        }
        Self {
            item_id: Some(item_id.to_string()),
            amount,
        }
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn is_empty(&self) -> bool {
        self.item_id.is_none()
    }

    pub fn contents(&self) -> Option<CraftingItem> {
        self.item_id
            .as_deref()
            .map(|id| CraftingItem::new(id, self.amount))
    }

    /// Empty, or already holding the same stackable item
    pub fn can_accept(&self, item: &CraftingItem, items: &ItemRegistry) -> bool {
        match &self.item_id {
            None => true,
            Some(held) => *held == item.item_id && items.is_stackable(held),
        }
    }

    /// Add a crafted result. Returns false, leaving the slot untouched, if it can't go here.
    pub fn deposit(&mut self, item: &CraftingItem, items: &ItemRegistry) -> bool {
        if item.count == 0 || !self.can_accept(item, items) {
            return false;
        }
        let Some(amount) = self.amount.checked_add(item.count) else {
            return false;
        };
        if self.item_id.is_none() {
            self.item_id = Some(item.item_id.clone());
        }
        self.amount = amount;
        true
    }

    /// Take up to `count` out; returns what was actually removed
    pub fn withdraw(&mut self, count: u32) -> Option<CraftingItem> {
        let item_id = self.item_id.clone()?;
        let removed = count.min(self.amount);
        if removed == 0 {
            return None;
        }
        self.amount -= removed;
        if self.amount == 0 {
            self.item_id = None;
        }
        Some(CraftingItem::new(&item_id, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ItemDefinition;

    fn items() -> ItemRegistry {
        ItemRegistry::from_items([
            ItemDefinition::new("arrow", "Arrow", 99),
            ItemDefinition::new("plank", "Plank", 50),
            ItemDefinition::new("hunting_bow", "Hunting Bow", 1),
        ])
    }

    #[test]
    fn test_stacking_same_item() {
        let items = items();
        let mut slot = CraftedItemSlot::new();

        assert!(slot.deposit(&CraftingItem::new("arrow", 3), &items));
        assert!(slot.deposit(&CraftingItem::new("arrow", 2), &items));

        assert_eq!(slot.contents(), Some(CraftingItem::new("arrow", 5)));
    }

    #[test]
    fn test_mismatched_item_rejected() {
        let items = items();
        let mut slot = CraftedItemSlot::new();
        slot.deposit(&CraftingItem::new("arrow", 3), &items);

        let plank = CraftingItem::new("plank", 1);
        assert!(!slot.can_accept(&plank, &items));
        assert!(!slot.deposit(&plank, &items));
        assert_eq!(slot.contents(), Some(CraftingItem::new("arrow", 3)));
    }

    #[test]
    fn test_unstackable_item_rejected_when_occupied() {
        let items = items();
        let mut slot = CraftedItemSlot::new();
        let bow = CraftingItem::new("hunting_bow", 1);

        assert!(slot.deposit(&bow, &items));
        assert!(!slot.can_accept(&bow, &items));
        assert!(!slot.deposit(&bow, &items));
        assert_eq!(slot.amount(), 1);
    }

    #[test]
    fn test_withdraw_clears_when_empty() {
        let items = items();
        let mut slot = CraftedItemSlot::new();
        slot.deposit(&CraftingItem::new("arrow", 5), &items);

        assert_eq!(slot.withdraw(2), Some(CraftingItem::new("arrow", 2)));
        assert_eq!(slot.amount(), 3);

        assert_eq!(slot.withdraw(10), Some(CraftingItem::new("arrow", 3)));
        assert!(slot.is_empty());
        assert_eq!(slot.amount(), 0);

        assert_eq!(slot.withdraw(1), None);
    }

    #[test]
    fn test_with_contents_normalises_empty() {
        assert!(CraftedItemSlot::with_contents("", 4).is_empty());
        assert!(CraftedItemSlot::with_contents("arrow", 0).is_empty());
        assert_eq!(CraftedItemSlot::with_contents("arrow", 4).amount(), 4);
    }
}

use std::sync::Arc;

use crate::crafting::{Agent, Ledger};
use crate::data::ItemRegistry;
use crate::item::Inventory;
use crate::skills::Skill;

/// A crafter: an inventory plus the crafting skill that gates recipes
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub inventory: Inventory,
    pub crafting: Skill,
}

impl Player {
    pub fn new(id: &str, name: &str, items: Arc<ItemRegistry>, level: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            inventory: Inventory::new(items),
            crafting: Skill::new(level),
        }
    }
}

impl Agent for Player {
    fn agent_id(&self) -> &str {
        &self.id
    }

    fn ledger(&self) -> Option<&dyn Ledger> {
        Some(&self.inventory)
    }

    fn ledger_mut(&mut self) -> Option<&mut dyn Ledger> {
        Some(&mut self.inventory)
    }

    fn level(&self) -> Option<u32> {
        Some(self.crafting.level)
    }
}

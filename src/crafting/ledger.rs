//! Collaborator contracts the crafting station consumes.
//!
//! The station never owns an inventory or a level; it borrows them from
//! whichever agent is crafting for the duration of a single call.

/// Read/mutate access to an agent's held resources
pub trait Ledger {
    /// Total count of an item across however the ledger stores it
    fn has_quantity(&self, item_id: &str) -> u32;

    /// Remove up to `count`; returns what could NOT be removed (0 on full success)
    fn remove(&mut self, item_id: &str, count: u32) -> u32;

    /// Add as many as fit; returns what could NOT be added (0 on full success)
    fn add_best_effort(&mut self, item_id: &str, count: u32) -> u32;

    /// Whether `count` more of the item would fit right now
    fn has_space_for(&self, item_id: &str, count: u32) -> bool;
}

/// Whoever is crafting: a resource ledger plus a level.
///
/// Either collaborator may be missing (a detached agent, a spectator); the
/// station then refuses to craft instead of failing.
pub trait Agent {
    /// Stable identity; a craft can only be cancelled by whoever started it
    fn agent_id(&self) -> &str;

    fn ledger(&self) -> Option<&dyn Ledger>;

    fn ledger_mut(&mut self) -> Option<&mut dyn Ledger>;

    fn level(&self) -> Option<u32>;
}

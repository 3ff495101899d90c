//! Crafting System
//!
//! Recipe definitions and registry, the timed crafting station state machine,
//! its output slot, the shared game clock, and save/restore layouts.

pub mod clock;
pub mod definition;
pub mod events;
pub mod ledger;
pub mod output;
pub mod persistence;
pub mod registry;
pub mod station;
pub mod system;

pub use clock::GameClock;
pub use definition::{CraftingItem, InvalidRecipe, Recipe, RecipeCategory};
pub use events::{CraftingEvent, CraftingObserver};
pub use ledger::{Agent, Ledger};
pub use output::CraftedItemSlot;
pub use persistence::{CraftingState, StationSnapshot, WorldSnapshot};
pub use registry::CraftingRegistry;
pub use station::{CraftingStation, StationState};
pub use system::CraftingSystem;

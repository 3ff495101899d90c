//! Crafting System
//!
//! Owns the shared clock and every station. The host calls `tick` once per
//! update with the real time that passed; the clock always advances, but only
//! stations someone has open get polled. Unobserved stations catch up the
//! next time they are opened and polled.
//!
//! Stations exist only once the host adds them; lookups never create one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::clock::GameClock;
use super::persistence::WorldSnapshot;
use super::registry::CraftingRegistry;
use super::station::CraftingStation;
use crate::data::ItemRegistry;

#[derive(Debug)]
pub struct CraftingSystem {
    clock: Arc<GameClock>,
    recipes: Arc<CraftingRegistry>,
    items: Arc<ItemRegistry>,
    stations: BTreeMap<String, CraftingStation>,
    /// Station ID -> number of viewers
    observed: BTreeMap<String, usize>,
}

impl CraftingSystem {
    pub fn new(recipes: Arc<CraftingRegistry>, items: Arc<ItemRegistry>) -> Self {
        Self {
            clock: Arc::new(GameClock::new()),
            recipes,
            items,
            stations: BTreeMap::new(),
            observed: BTreeMap::new(),
        }
    }

    pub fn clock(&self) -> &Arc<GameClock> {
        &self.clock
    }

    pub fn recipes(&self) -> &Arc<CraftingRegistry> {
        &self.recipes
    }

    pub fn items(&self) -> &Arc<ItemRegistry> {
        &self.items
    }

    /// Place a station; adding an ID that already exists returns the existing one
    pub fn add_station(&mut self, station_id: &str) -> &mut CraftingStation {
        self.stations
            .entry(station_id.to_string())
            .or_insert_with(|| {
                info!("Created crafting station {}", station_id);
                CraftingStation::new(
                    station_id,
                    self.recipes.clone(),
                    self.items.clone(),
                    self.clock.clone(),
                )
            })
    }

    pub fn station_mut(&mut self, station_id: &str) -> Option<&mut CraftingStation> {
        self.stations.get_mut(station_id)
    }

    pub fn station(&self, station_id: &str) -> Option<&CraftingStation> {
        self.stations.get(station_id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &CraftingStation> {
        self.stations.values()
    }

    /// Someone started looking at a station; it gets polled until closed
    pub fn open(&mut self, station_id: &str) -> Option<&mut CraftingStation> {
        let Some(station) = self.stations.get_mut(station_id) else {
            debug!("Ignoring open of unknown station {}", station_id);
            return None;
        };
        *self.observed.entry(station_id.to_string()).or_default() += 1;
        debug!("Station {} opened", station_id);
        Some(station)
    }

    /// One viewer stopped looking at a station
    pub fn close(&mut self, station_id: &str) {
        let Some(viewers) = self.observed.get_mut(station_id) else {
            warn!("Closing station {} which was not open", station_id);
            return;
        };
        *viewers -= 1;
        if *viewers == 0 {
            self.observed.remove(station_id);
            debug!("Station {} no longer observed", station_id);
        }
    }

    pub fn is_observed(&self, station_id: &str) -> bool {
        self.observed.contains_key(station_id)
    }

    /// Advance the clock by real elapsed time and poll observed stations
    pub fn tick(&mut self, elapsed: Duration) {
        self.clock.advance(elapsed);
        for station_id in self.observed.keys() {
            if let Some(station) = self.stations.get_mut(station_id) {
                station.poll();
            }
        }
    }

    /// Poll every station regardless of observers (used before saving)
    pub fn poll_all(&mut self) {
        for station in self.stations.values_mut() {
            station.poll();
        }
    }

    pub fn capture(&self) -> WorldSnapshot {
        WorldSnapshot {
            clock: self.clock.capture_state(),
            stations: self
                .stations
                .iter()
                .map(|(id, station)| (id.clone(), station.capture()))
                .collect(),
        }
    }

    /// Restore the clock first, then every saved station
    pub fn restore(&mut self, snapshot: &WorldSnapshot) {
        self.clock.restore_state(snapshot.clock);
        for (station_id, station_snapshot) in &snapshot.stations {
            self.add_station(station_id).restore(station_snapshot);
        }
        info!(
            "Restored {} crafting stations at clock {:.3}",
            snapshot.stations.len(),
            snapshot.clock
        );
    }

    /// IDs of stations currently being observed
    pub fn observed(&self) -> BTreeSet<&str> {
        self.observed.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crafting::definition::{CraftingItem, Recipe};
    use crate::crafting::ledger::{Agent, Ledger};
    use crate::data::ItemDefinition;
    use crate::item::Inventory;

    struct Crafter {
        inventory: Inventory,
    }

    impl Agent for Crafter {
        fn agent_id(&self) -> &str {
            "crafter"
        }

        fn ledger(&self) -> Option<&dyn Ledger> {
            Some(&self.inventory)
        }

        fn ledger_mut(&mut self) -> Option<&mut dyn Ledger> {
            Some(&mut self.inventory)
        }

        fn level(&self) -> Option<u32> {
            Some(1)
        }
    }

    fn system() -> (CraftingSystem, Crafter) {
        let recipes = CraftingRegistry::from_recipes([Recipe::new(
            "arrow",
            vec![CraftingItem::new("wood", 1)],
            CraftingItem::new("arrow", 5),
            4.0,
            0,
        )
        .unwrap()]);
        let items = Arc::new(ItemRegistry::from_items([
            ItemDefinition::new("wood", "Wood", 99),
            ItemDefinition::new("arrow", "Arrow", 99),
        ]));
        let mut inventory = Inventory::new(items.clone());
        inventory.add_item("wood", 3);
        let mut system = CraftingSystem::new(Arc::new(recipes), items);
        system.add_station("a");
        system.add_station("b");
        (system, Crafter { inventory })
    }

    #[test]
    fn test_only_observed_stations_are_polled() {
        let (mut system, mut crafter) = system();
        system.station_mut("a").unwrap().start_craft("arrow", &mut crafter).unwrap();
        system.open("b").unwrap().start_craft("arrow", &mut crafter).unwrap();

        system.tick(Duration::from_secs(1));
        assert_eq!(system.station("a").unwrap().progress(), 0.0);
        assert_eq!(system.station("b").unwrap().progress(), 0.25);
        assert_eq!(system.observed().into_iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_unobserved_station_catches_up_when_opened() {
        let (mut system, mut crafter) = system();
        system.station_mut("a").unwrap().start_craft("arrow", &mut crafter).unwrap();

        system.tick(Duration::from_secs(10));
        assert!(system.station("a").unwrap().is_crafting());

        system.open("a");
        system.tick(Duration::from_millis(50));
        let station = system.station("a").unwrap();
        assert!(!station.is_crafting());
        assert_eq!(station.output().amount(), 5);
    }

    #[test]
    fn test_close_counts_viewers() {
        let (mut system, _) = system();
        system.open("a");
        system.open("a");
        system.close("a");
        assert!(system.is_observed("a"));
        system.close("a");
        assert!(!system.is_observed("a"));
        system.close("a");
    }

    #[test]
    fn test_capture_and_restore_world() {
        let (mut system, mut crafter) = system();
        system.tick(Duration::from_secs(30));
        system.open("a").unwrap().start_craft("arrow", &mut crafter).unwrap();
        system.tick(Duration::from_secs(1));
        let saved = system.capture();
        assert_eq!(saved.clock, 31.0);

        let mut reloaded = CraftingSystem::new(system.recipes().clone(), system.items().clone());
        reloaded.restore(&saved);
        assert_eq!(reloaded.clock().now(), 31.0);

        reloaded.open("a");
        reloaded.tick(Duration::from_secs(3));
        assert_eq!(reloaded.station("a").unwrap().output().amount(), 5);
    }

    #[test]
    fn test_unknown_station_is_never_created() {
        let (mut system, _) = system();
        assert!(system.open("nowhere").is_none());
        assert!(system.station_mut("nowhere").is_none());
        assert!(!system.is_observed("nowhere"));
        system.close("nowhere");

        let ids: Vec<String> = system.capture().stations.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_adding_a_station_twice_keeps_its_state() {
        let (mut system, mut crafter) = system();
        system.open("a").unwrap().start_craft("arrow", &mut crafter).unwrap();
        assert!(system.add_station("a").is_crafting());
        assert_eq!(system.stations().count(), 2);
    }
}

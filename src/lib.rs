//! Timed crafting stations for a multiplayer game server.
//!
//! The `crafting` module is the engine: recipes, stations and the shared
//! clock. The rest is the server around it: catalogs, players and their
//! inventories, storage, configuration and the HTTP protocol.

pub mod config;
pub mod crafting;
pub mod data;
pub mod db;
pub mod error;
pub mod item;
pub mod player;
pub mod protocol;
pub mod skills;

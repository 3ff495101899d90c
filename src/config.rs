//! Server Configuration
//!
//! Read from `crafting.toml` (or the file named by `CRAFTING_CONFIG`).
//! Every field has a default, so a missing file is not an error.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::crafting::CraftingItem;
use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "CRAFTING_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "crafting.toml";

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 2567))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_database_url() -> String {
    "sqlite:crafting.db?mode=rwc".to_string()
}

fn default_tick_ms() -> u64 {
    50 // 20 Hz
}

fn default_autosave_secs() -> u64 {
    30
}

fn default_starting_level() -> u32 {
    1
}

fn default_stations() -> Vec<String> {
    vec!["workbench".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,
    /// Crafting level new players start at
    #[serde(default = "default_starting_level")]
    pub starting_level: u32,
    /// Items new players start with
    #[serde(default)]
    pub starter_items: Vec<CraftingItem>,
    /// Station IDs placed at startup; requests for any other ID are rejected
    #[serde(default = "default_stations")]
    pub stations: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
            database_url: default_database_url(),
            tick_ms: default_tick_ms(),
            autosave_secs: default_autosave_secs(),
            starting_level: default_starting_level(),
            starter_items: Vec::new(),
            stations: default_stations(),
        }
    }
}

impl ServerConfig {
    /// Load from the path in `CRAFTING_CONFIG`, falling back to `crafting.toml`
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig::load_from(&temp_dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.bind_addr.port(), 2567);
        assert!(config.starter_items.is_empty());
        assert_eq!(config.stations, vec!["workbench"]);
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("crafting.toml");
        std::fs::write(
            &path,
            r#"
bind_addr = "127.0.0.1:8080"
starting_level = 3
stations = ["forge", "loom"]

[[starter_items]]
item_id = "wood"
count = 5
"#,
        )
        .unwrap();

        let config = ServerConfig::load_from(&path).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.starting_level, 3);
        assert_eq!(config.autosave_secs, 30);
        assert_eq!(config.starter_items, vec![CraftingItem::new("wood", 5)]);
        assert_eq!(config.stations, vec!["forge", "loom"]);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("crafting.toml");
        std::fs::write(&path, "tick_ms = \"fast\"").unwrap();
        assert!(matches!(
            ServerConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}

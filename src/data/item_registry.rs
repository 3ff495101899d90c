use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::item_def::{ItemDefinition, RawItemDefinition};
use crate::error::CatalogError;

/// Registry for all item definitions
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: HashMap<String, ItemDefinition>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Build a registry from definitions assembled in code
    pub fn from_items(items: impl IntoIterator<Item = ItemDefinition>) -> Self {
        let mut registry = Self::new();
        for item in items {
            registry.insert(item);
        }
        registry
    }

    /// Load all item definitions from `<data_dir>/items/*.toml`
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), CatalogError> {
        let items_dir = data_dir.join("items");

        if !items_dir.exists() {
            warn!("Items directory does not exist: {:?}", items_dir);
            return Ok(());
        }

        for path in super::toml_files(&items_dir)? {
            let content = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;

            // Parse as table of items
            let table: HashMap<String, RawItemDefinition> = toml::from_str(&content)
                .map_err(|source| CatalogError::Parse {
                    path: path.clone(),
                    source,
                })?;

            for (id, raw) in table {
                if self.items.contains_key(&id) {
                    warn!("Duplicate item ID '{}' in {:?}, overwriting", id, path);
                }
                let item = ItemDefinition::from_raw(&id, &raw);
                self.items.insert(id, item);
            }
        }

        info!("Loaded {} item definitions", self.items.len());

        Ok(())
    }

    pub fn insert(&mut self, item: ItemDefinition) {
        self.items.insert(item.id.clone(), item);
    }

    /// Get an item definition by ID
    pub fn get(&self, id: &str) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    /// Unknown items never stack
    pub fn is_stackable(&self, id: &str) -> bool {
        self.get(id).is_some_and(ItemDefinition::is_stackable)
    }

    /// Per-slot stack limit; unknown items occupy a slot each
    pub fn max_stack(&self, id: &str) -> u32 {
        self.get(id).map_or(1, |def| def.max_stack)
    }

    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |def| def.display_name.as_str())
    }

    /// Get all items
    pub fn all(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }

    /// Check if an item exists
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Get the number of loaded items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//! Crafting Recipe Registry
//!
//! Loads recipe definitions from TOML files once, indexes them by ID and
//! hands out shared read-only views. Load order is preserved: files sorted by
//! name, recipes in declaration order within each file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::definition::{RawRecipeDefinition, Recipe, RecipeCategory};
use crate::error::CatalogError;

/// Registry for all recipe definitions
#[derive(Debug, Default)]
pub struct CraftingRegistry {
    recipes: Vec<Arc<Recipe>>,
    index: HashMap<String, usize>,
}

impl CraftingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from recipes assembled in code
    pub fn from_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        let mut registry = Self::new();
        for recipe in recipes {
            registry.register(recipe);
        }
        registry
    }

    /// Add a recipe; on a duplicate ID the first definition wins
    pub fn register(&mut self, recipe: Recipe) -> bool {
        if let Some(&existing) = self.index.get(recipe.id()) {
            error!(
                "Duplicate recipe ID '{}' ({} and {}), keeping the first",
                recipe.id(),
                self.recipes[existing].display_name(),
                recipe.display_name()
            );
            return false;
        }
        self.index
            .insert(recipe.id().to_string(), self.recipes.len());
        self.recipes.push(Arc::new(recipe));
        true
    }

    /// Load all recipe definitions from `<data_dir>/recipes/*.toml`.
    ///
    /// Malformed files and invalid recipes are logged and skipped; only a
    /// directory that exists but cannot be read is an error.
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), CatalogError> {
        let recipes_dir = data_dir.join("recipes");

        if !recipes_dir.exists() {
            warn!("Recipes directory does not exist: {:?}", recipes_dir);
            return Ok(());
        }

        for path in crate::data::toml_files(&recipes_dir)? {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read {:?}: {}", path, e);
                    continue;
                }
            };

            // Parse as an ordered table of recipes
            let table: toml::Table = match toml::from_str(&content) {
                Ok(table) => table,
                Err(e) => {
                    error!("Failed to parse {:?}: {}", path, e);
                    continue;
                }
            };

            for (id, value) in table {
                let raw: RawRecipeDefinition = match value.try_into() {
                    Ok(raw) => raw,
                    Err(e) => {
                        error!("Skipping recipe '{}' in {:?}: {}", id, path, e);
                        continue;
                    }
                };
                match Recipe::from_raw(&id, &raw) {
                    Ok(recipe) => {
                        info!(
                            "Loaded recipe: {} ({}) - {} ingredients -> {} x{} in {}s",
                            recipe.display_name(),
                            id,
                            recipe.ingredients().len(),
                            recipe.result().item_id,
                            recipe.result().count,
                            recipe.duration_secs()
                        );
                        self.register(recipe);
                    }
                    Err(e) => error!("Skipping recipe '{}' in {:?}: {}", id, path, e),
                }
            }
        }

        info!("Loaded {} recipe definitions", self.recipes.len());

        Ok(())
    }

    /// Get a recipe definition by ID; empty and unknown IDs yield `None`
    pub fn get(&self, id: &str) -> Option<&Arc<Recipe>> {
        if id.trim().is_empty() {
            return None;
        }
        self.index.get(id).map(|&i| &self.recipes[i])
    }

    /// Get all recipes in load order
    pub fn all(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.iter()
    }

    /// Get recipes by category
    pub fn by_category(&self, category: RecipeCategory) -> Vec<&Arc<Recipe>> {
        self.recipes
            .iter()
            .filter(|r| r.category() == category)
            .collect()
    }

    /// Check if a recipe exists
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get the number of loaded recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crafting::definition::CraftingItem;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_recipes(dir: &Path, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_recipes_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        let recipes_dir = temp_dir.path().join("recipes");
        std::fs::create_dir(&recipes_dir).unwrap();

        write_recipes(
            &recipes_dir,
            "weapons.toml",
            r#"
[hunting_bow]
display_name = "Hunting Bow"
category = "equipment"
level_required = 2
duration_secs = 10.0

[[hunting_bow.ingredients]]
item_id = "wood"
count = 5

[[hunting_bow.ingredients]]
item_id = "string"
count = 2

[hunting_bow.result]
item_id = "hunting_bow"

[arrow]
duration_secs = 2.0

[[arrow.ingredients]]
item_id = "wood"

[arrow.result]
item_id = "arrow"
count = 20
"#,
        );

        let mut registry = CraftingRegistry::new();
        registry.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(registry.len(), 2);
        let ids: Vec<&str> = registry.all().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["hunting_bow", "arrow"]);

        let recipe = registry.get("hunting_bow").unwrap();
        assert_eq!(recipe.display_name(), "Hunting Bow");
        assert_eq!(recipe.category(), RecipeCategory::Equipment);
        assert_eq!(recipe.ingredients()[0], CraftingItem::new("wood", 5));
        assert_eq!(registry.by_category(RecipeCategory::Equipment).len(), 1);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let temp_dir = TempDir::new().unwrap();
        let recipes_dir = temp_dir.path().join("recipes");
        std::fs::create_dir(&recipes_dir).unwrap();

        write_recipes(
            &recipes_dir,
            "a.toml",
            r#"
[plank]
display_name = "First Plank"
[plank.result]
item_id = "plank"
"#,
        );
        write_recipes(
            &recipes_dir,
            "b.toml",
            r#"
[plank]
display_name = "Second Plank"
[plank.result]
item_id = "plank"
"#,
        );

        let mut registry = CraftingRegistry::new();
        registry.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("plank").unwrap().display_name(), "First Plank");
    }

    #[test]
    fn test_broken_entries_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let recipes_dir = temp_dir.path().join("recipes");
        std::fs::create_dir(&recipes_dir).unwrap();

        write_recipes(&recipes_dir, "broken.toml", "this is [not toml");
        write_recipes(
            &recipes_dir,
            "mixed.toml",
            r#"
[no_result]
display_name = "Missing result"

[twice_wood]
[[twice_wood.ingredients]]
item_id = "wood"
[[twice_wood.ingredients]]
item_id = "wood"
[twice_wood.result]
item_id = "plank"

[good]
[good.result]
item_id = "plank"
"#,
        );

        let mut registry = CraftingRegistry::new();
        registry.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("good"));
    }

    #[test]
    fn test_lookup_of_empty_and_unknown_ids() {
        let registry = CraftingRegistry::from_recipes([Recipe::new(
            "plank",
            vec![CraftingItem::new("wood", 1)],
            CraftingItem::new("plank", 2),
            1.0,
            0,
        )
        .unwrap()]);

        assert!(registry.get("plank").is_some());
        assert!(registry.get("").is_none());
        assert!(registry.get("   ").is_none());
        assert!(registry.get("bow").is_none());
    }
}

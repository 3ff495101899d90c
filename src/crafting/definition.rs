//! Crafting Recipe Definitions
//!
//! Defines the data structures for crafting recipes, including TOML
//! deserialization (Raw*) and validated, immutable versions with defaults applied.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::ItemRegistry;

/// Recipe categories for UI organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeCategory {
    Consumables,
    Materials,
    Equipment,
    Tools,
}

impl Default for RecipeCategory {
    fn default() -> Self {
        RecipeCategory::Materials
    }
}

impl RecipeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeCategory::Consumables => "consumables",
            RecipeCategory::Materials => "materials",
            RecipeCategory::Equipment => "equipment",
            RecipeCategory::Tools => "tools",
        }
    }
}

// ============================================================================
// Raw TOML Structures
// ============================================================================

fn default_count() -> i64 {
    1
}

fn default_duration() -> f64 {
    1.0
}

/// Raw `(item, count)` entry from TOML, used for ingredients and the result
#[derive(Debug, Clone, Deserialize)]
pub struct RawCraftingItem {
    pub item_id: String,
    #[serde(default = "default_count")]
    pub count: i64,
}

/// Raw recipe definition from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecipeDefinition {
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub category: RecipeCategory,
    #[serde(default)]
    pub level_required: i64,
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
    #[serde(default)]
    pub ingredients: Vec<RawCraftingItem>,
    pub result: RawCraftingItem,
}

/// Why a raw recipe was rejected at load time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRecipe {
    #[error("recipe ID is empty")]
    EmptyId,
    #[error("ingredient '{0}' is listed more than once")]
    DuplicateIngredient(String),
    #[error("'{item_id}' has non-positive count {count}")]
    BadCount { item_id: String, count: i64 },
    #[error("duration {0} is negative or not finite")]
    BadDuration(f64),
    #[error("level requirement {0} is negative")]
    BadLevel(i64),
}

// ============================================================================
// Resolved Structures
// ============================================================================

/// A resource ID paired with an amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingItem {
    pub item_id: String,
    pub count: u32,
}

impl CraftingItem {
    pub fn new(item_id: &str, count: u32) -> Self {
        Self {
            item_id: item_id.to_string(),
            count,
        }
    }

    /// Display label such as "Hunting Bow" or "Flaming Arrow x20"
    pub fn label(&self, items: &ItemRegistry) -> String {
        let name = items.display_name(&self.item_id);
        if self.count > 1 {
            format!("{} x{}", name, self.count)
        } else {
            name.to_string()
        }
    }

    fn from_raw(raw: &RawCraftingItem) -> Result<Self, InvalidRecipe> {
        if raw.count <= 0 || raw.count > u32::MAX as i64 {
            return Err(InvalidRecipe::BadCount {
                item_id: raw.item_id.clone(),
                count: raw.count,
            });
        }
        Ok(Self::new(&raw.item_id, raw.count as u32))
    }
}

/// An immutable crafting rule. Fields are private so a loaded recipe can't be edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    id: String,
    display_name: String,
    description: String,
    category: RecipeCategory,
    level_required: u32,
    duration_secs: f64,
    ingredients: Vec<CraftingItem>,
    result: CraftingItem,
}

impl Recipe {
    /// Build a recipe in code, with the same validation as the TOML loader
    pub fn new(
        id: &str,
        ingredients: Vec<CraftingItem>,
        result: CraftingItem,
        duration_secs: f64,
        level_required: u32,
    ) -> Result<Self, InvalidRecipe> {
        if id.trim().is_empty() {
            return Err(InvalidRecipe::EmptyId);
        }
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(InvalidRecipe::BadDuration(duration_secs));
        }
        for (i, ingredient) in ingredients.iter().enumerate() {
            if ingredient.count == 0 {
                return Err(InvalidRecipe::BadCount {
                    item_id: ingredient.item_id.clone(),
                    count: 0,
                });
            }
            if ingredients[..i]
                .iter()
                .any(|earlier| earlier.item_id == ingredient.item_id)
            {
                return Err(InvalidRecipe::DuplicateIngredient(
                    ingredient.item_id.clone(),
                ));
            }
        }
        if result.count == 0 {
            return Err(InvalidRecipe::BadCount {
                item_id: result.item_id.clone(),
                count: 0,
            });
        }

        Ok(Self {
            id: id.to_string(),
            display_name: id.replace('_', " "),
            description: String::new(),
            category: RecipeCategory::default(),
            level_required,
            duration_secs,
            ingredients,
            result,
        })
    }

    /// Create a validated Recipe from raw TOML data
    pub fn from_raw(id: &str, raw: &RawRecipeDefinition) -> Result<Self, InvalidRecipe> {
        if raw.level_required < 0 || raw.level_required > u32::MAX as i64 {
            return Err(InvalidRecipe::BadLevel(raw.level_required));
        }
        let ingredients = raw
            .ingredients
            .iter()
            .map(CraftingItem::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        let result = CraftingItem::from_raw(&raw.result)?;

        let mut recipe = Self::new(
            id,
            ingredients,
            result,
            raw.duration_secs,
            raw.level_required as u32,
        )?;
        if let Some(name) = &raw.display_name {
            recipe.display_name = name.clone();
        }
        recipe.description = raw.description.clone().unwrap_or_default();
        recipe.category = raw.category;
        Ok(recipe)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> RecipeCategory {
        self.category
    }

    pub fn level_required(&self) -> u32 {
        self.level_required
    }

    /// Crafting time in seconds
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn ingredients(&self) -> &[CraftingItem] {
        &self.ingredients
    }

    pub fn result(&self) -> &CraftingItem {
        &self.result
    }
}

//! HTTP request and response bodies.
//!
//! Everything here is plain JSON; crafting events go out over the WebSocket
//! as serialized `CraftingEvent`s.

use serde::{Deserialize, Serialize};

use crate::crafting::{CraftingItem, CraftingStation, Recipe, RecipeCategory};
use crate::error::CraftError;
use crate::data::{ItemDefinition, ItemRegistry};
use crate::item::InventorySlotUpdate;
use crate::player::Player;

// ============================================================================
// Client -> Server
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlayerRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CraftRequest {
    pub player_id: String,
    pub recipe_id: String,
}

/// Body for cancel and claim, which only need to know who is acting
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerRequest {
    pub player_id: String,
}

/// `?category=tools` on the recipe list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
    pub category: Option<RecipeCategory>,
}

/// `?player_id=` on a station's recipe list
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub player_id: String,
}

// ============================================================================
// Server -> Client
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub level_required: u32,
    pub duration_secs: f64,
    pub ingredients: Vec<ItemStackView>,
    pub result: ItemStackView,
}

impl RecipeView {
    pub fn new(recipe: &Recipe, items: &ItemRegistry) -> Self {
        Self {
            id: recipe.id().to_string(),
            display_name: recipe.display_name().to_string(),
            description: recipe.description().to_string(),
            category: recipe.category().as_str().to_string(),
            level_required: recipe.level_required(),
            duration_secs: recipe.duration_secs(),
            ingredients: recipe
                .ingredients()
                .iter()
                .map(|i| ItemStackView::new(i, items))
                .collect(),
            result: ItemStackView::new(recipe.result(), items),
        }
    }
}

/// A recipe plus whether one player could start it at one station right now
#[derive(Debug, Clone, Serialize)]
pub struct RecipeAvailability {
    pub recipe: RecipeView,
    pub craftable: bool,
    pub blocked_reason: Option<String>,
}

impl RecipeAvailability {
    pub fn new(recipe: &Recipe, check: Result<(), CraftError>, items: &ItemRegistry) -> Self {
        Self {
            recipe: RecipeView::new(recipe, items),
            craftable: check.is_ok(),
            blocked_reason: check.err().map(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemStackView {
    pub item_id: String,
    pub count: u32,
    pub label: String,
}

impl ItemStackView {
    pub fn new(item: &CraftingItem, items: &ItemRegistry) -> Self {
        Self {
            item_id: item.item_id.clone(),
            count: item.count,
            label: item.label(items),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub max_stack: u32,
}

impl From<&ItemDefinition> for ItemView {
    fn from(item: &ItemDefinition) -> Self {
        Self {
            id: item.id.clone(),
            display_name: item.display_name.clone(),
            description: item.description.clone(),
            category: item.category.as_str().to_string(),
            max_stack: item.max_stack,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub crafting_level: u32,
    pub crafting_xp: i64,
    pub level_progress: f32,
    pub inventory: Vec<InventorySlotUpdate>,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            crafting_level: player.crafting.level,
            crafting_xp: player.crafting.xp,
            level_progress: player.crafting.progress_in_level(),
            inventory: player.inventory.to_update(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StationView {
    pub id: String,
    pub state: &'static str,
    pub recipe_id: Option<String>,
    pub progress: f32,
    pub output: Option<ItemStackView>,
    pub observed: bool,
}

impl StationView {
    pub fn new(station: &CraftingStation, items: &ItemRegistry, observed: bool) -> Self {
        Self {
            id: station.id().to_string(),
            state: station.state().tag().as_str(),
            recipe_id: station.current_recipe().map(|r| r.id().to_string()),
            progress: station.progress(),
            output: station
                .output()
                .contents()
                .map(|item| ItemStackView::new(&item, items)),
            observed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimResponse {
    pub claimed: u32,
    pub station: StationView,
    pub player: PlayerView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use std::sync::Arc;

    use crate::crafting::{CraftingRegistry, GameClock};

    #[test]
    fn test_recipe_view_labels() {
        let items = ItemRegistry::from_items([
            ItemDefinition::new("wood", "Wood", 99),
            ItemDefinition::new("hunting_bow", "Hunting Bow", 1),
        ]);
        let recipe = Recipe::new(
            "hunting_bow",
            vec![CraftingItem::new("wood", 3)],
            CraftingItem::new("hunting_bow", 1),
            10.0,
            1,
        )
        .unwrap();

        let view = RecipeView::new(&recipe, &items);
        assert_eq!(view.ingredients[0].label, "Wood x3");
        assert_eq!(view.result.label, "Hunting Bow");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["level_required"], 1);
    }

    #[test]
    fn test_availability_explains_blockers() {
        let items = ItemRegistry::from_items([ItemDefinition::new("wood", "Wood", 99)]);
        let recipe = Recipe::new(
            "plank",
            vec![CraftingItem::new("wood", 2)],
            CraftingItem::new("plank", 1),
            1.0,
            0,
        )
        .unwrap();

        let ok = serde_json::to_value(RecipeAvailability::new(&recipe, Ok(()), &items)).unwrap();
        assert_eq!(ok["craftable"], true);
        assert!(ok["blocked_reason"].is_null());
        assert_eq!(ok["recipe"]["id"], "plank");

        let blocked = RecipeAvailability::new(
            &recipe,
            Err(CraftError::MissingIngredient {
                item_id: "wood".to_string(),
                required: 2,
                held: 1,
            }),
            &items,
        );
        assert!(!blocked.craftable);
        assert_eq!(
            blocked.blocked_reason.as_deref(),
            Some("missing ingredients: need 2 wood, have 1")
        );
    }

    fn query<T: serde::de::DeserializeOwned>(uri: &str) -> Option<T> {
        let uri: axum::http::Uri = uri.parse().unwrap();
        Query::<T>::try_from_uri(&uri).ok().map(|Query(q)| q)
    }

    #[test]
    fn test_query_strings() {
        let filtered: RecipeQuery = query("/api/recipes?category=tools").unwrap();
        assert_eq!(filtered.category, Some(RecipeCategory::Tools));
        let all: RecipeQuery = query("/api/recipes").unwrap();
        assert!(all.category.is_none());
        assert!(query::<RecipeQuery>("/api/recipes?category=weapons").is_none());

        let who: AvailabilityQuery = query("/api/stations/bench/recipes?player_id=p1").unwrap();
        assert_eq!(who.player_id, "p1");
        assert!(query::<AvailabilityQuery>("/api/stations/bench/recipes").is_none());
    }

    #[test]
    fn test_idle_station_view() {
        let items = Arc::new(ItemRegistry::new());
        let station = CraftingStation::new(
            "bench",
            Arc::new(CraftingRegistry::new()),
            items.clone(),
            Arc::new(GameClock::new()),
        );

        let view = StationView::new(&station, &items, false);
        assert_eq!(view.state, "idle");
        assert!(view.recipe_id.is_none());
        assert!(view.output.is_none());
    }
}

//! Saved crafting state.
//!
//! Logical layouts only; callers choose the encoding (the server stores them
//! as JSON). Restoring never re-validates a craft.

use serde::{Deserialize, Serialize};

/// Station state tag as it is saved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CraftingState {
    #[default]
    Idle,
    Crafting,
}

impl CraftingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CraftingState::Idle => "idle",
            CraftingState::Crafting => "crafting",
        }
    }
}

/// Everything needed to bring one station back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub state: CraftingState,
    /// Clock reading when the craft started (0 when idle)
    pub start_time: f64,
    /// Empty when idle
    #[serde(default)]
    pub recipe_id: String,
    /// Agent that started the craft and gets the refund on cancel
    #[serde(default)]
    pub crafter_id: String,
    /// Last computed progress, used until the next poll
    #[serde(default)]
    pub progress: f32,
    /// Empty when the output slot is empty
    #[serde(default)]
    pub output_item_id: String,
    #[serde(default)]
    pub output_amount: u32,
}

/// Saved clock reading plus every station, keyed by station ID
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub clock: f64,
    pub stations: Vec<(String, StationSnapshot)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_json_layout() {
        let snapshot = StationSnapshot {
            state: CraftingState::Crafting,
            start_time: 42.5,
            recipe_id: "hunting_bow".to_string(),
            crafter_id: "p1".to_string(),
            progress: 0.4,
            output_item_id: String::new(),
            output_amount: 0,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "crafting");
        assert_eq!(json["start_time"], 42.5);
        assert_eq!(json["recipe_id"], "hunting_bow");
        assert_eq!(json["crafter_id"], "p1");
    }

    #[test]
    fn test_snapshot_missing_fields_default() {
        let snapshot: StationSnapshot =
            serde_json::from_str(r#"{"state":"idle","start_time":0.0}"#).unwrap();
        assert_eq!(snapshot, StationSnapshot::default());
    }
}

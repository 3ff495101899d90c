use serde::{Deserialize, Serialize};

// ============================================================================
// Item Categories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Consumable,
    Material,
    Equipment,
    Tool,
}

impl Default for ItemCategory {
    fn default() -> Self {
        ItemCategory::Material
    }
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Consumable => "consumable",
            ItemCategory::Material => "material",
            ItemCategory::Equipment => "equipment",
            ItemCategory::Tool => "tool",
        }
    }
}

// ============================================================================
// Raw Item Definition (direct from TOML)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RawItemDefinition {
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub category: ItemCategory,
    pub max_stack: Option<u32>,
}

// ============================================================================
// Resolved Item Definition
// ============================================================================

/// A resource that recipes consume or produce, identified by its stable ID
#[derive(Debug, Clone, Serialize)]
pub struct ItemDefinition {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: ItemCategory,
    pub max_stack: u32,
}

impl ItemDefinition {
    pub fn from_raw(id: &str, raw: &RawItemDefinition) -> Self {
        Self {
            id: id.to_string(),
            display_name: raw
                .display_name
                .clone()
                .unwrap_or_else(|| id.replace('_', " ")),
            description: raw.description.clone().unwrap_or_default(),
            category: raw.category,
            max_stack: raw.max_stack.unwrap_or(99).max(1),
        }
    }

    /// Build a definition directly, mostly for catalogs assembled in code
    pub fn new(id: &str, display_name: &str, max_stack: u32) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            description: String::new(),
            category: ItemCategory::default(),
            max_stack: max_stack.max(1),
        }
    }

    /// Several units can share one inventory slot (or one output slot)
    pub fn is_stackable(&self) -> bool {
        self.max_stack > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_item_defaults() {
        let toml_str = r#"
            [hunting_bow]
            max_stack = 1
            category = "equipment"

            [wood]
        "#;

        let parsed: HashMap<String, RawItemDefinition> = toml::from_str(toml_str).unwrap();

        let bow = ItemDefinition::from_raw("hunting_bow", &parsed["hunting_bow"]);
        assert_eq!(bow.display_name, "hunting bow");
        assert_eq!(bow.category, ItemCategory::Equipment);
        assert!(!bow.is_stackable());

        let wood = ItemDefinition::from_raw("wood", &parsed["wood"]);
        assert_eq!(wood.max_stack, 99);
        assert_eq!(wood.category, ItemCategory::Material);
        assert!(wood.is_stackable());
    }

    #[test]
    fn test_zero_max_stack_clamped() {
        let raw = RawItemDefinition {
            display_name: None,
            description: None,
            category: ItemCategory::Tool,
            max_stack: Some(0),
        };
        assert_eq!(ItemDefinition::from_raw("hammer", &raw).max_stack, 1);
    }
}

//! Error types shared by the crafting core and the server.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading item or recipe data from disk
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Why a craft request was refused, or which consistency fault stopped it.
///
/// None of these are fatal: the station is always left Idle or untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftError {
    #[error("recipe '{0}' not found")]
    UnknownRecipe(String),

    #[error("no agent inventory available")]
    NoLedger,

    #[error("no agent level available")]
    NoLevel,

    #[error("requires level {required} (current {current})")]
    LevelTooLow { required: u32, current: u32 },

    #[error("missing ingredients: need {required} {item_id}, have {held}")]
    MissingIngredient {
        item_id: String,
        required: u32,
        held: u32,
    },

    #[error("output slot holds '{held}' which cannot stack with '{incoming}'")]
    OutputBlocked { held: String, incoming: String },

    #[error("station is already crafting '{0}'")]
    Busy(String),

    #[error("station is not crafting")]
    NotCrafting,

    #[error("only '{owner}' can cancel this craft")]
    NotCrafter { owner: String },

    #[error("inventory could not supply {item_id} after the ingredient check passed")]
    LedgerInconsistent { item_id: String },
}

/// Failures while loading the server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

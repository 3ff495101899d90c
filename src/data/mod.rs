pub mod item_def;
pub mod item_registry;

pub use item_def::{ItemCategory, ItemDefinition};
pub use item_registry::ItemRegistry;

use std::path::{Path, PathBuf};

use crate::error::CatalogError;

/// List `*.toml` files in a directory, sorted by name so load order is stable
pub(crate) fn toml_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

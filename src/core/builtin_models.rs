//! Built-in fallback catalog
//!
//! This module loads the hand-picked model catalog embedded from
//! builtin_models.toml. It is the catalog in effect before any credential
//! is verified and whenever the live listing is unavailable.

use serde::Deserialize;

use crate::core::catalog::{Catalog, Model};

#[derive(Debug, Deserialize)]
struct BuiltinModel {
    id: String,
    display_name: String,
    task_tag: String,
}

#[derive(Debug, Deserialize)]
struct BuiltinCatalogConfig {
    models: Vec<BuiltinModel>,
}

/// Load the embedded fallback catalog.
pub fn builtin_catalog() -> Catalog {
    const CONFIG_CONTENT: &str = include_str!("builtin_models.toml");

    let config: BuiltinCatalogConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_models.toml");

    Catalog::from_models(config.models.into_iter().map(|model| Model {
        id: model.id,
        display_name: model.display_name,
        task_tag: model.task_tag,
    }))
}

//! Render configuration consumed during description-file parsing.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration flags that parametrize texture/model loading.
///
/// Loaded from a JSON file or built with [`Default`] for vanilla behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderConfig {
    /// Render leaf blocks as transparent (`LEAVES` resolves to TRANSPARENT)
    /// instead of opaque.
    pub transparent_leaves: bool,
    /// Enable biome-based grass/foliage/water toning.
    pub biome_shading: bool,
    /// Prefer swamp-variant color ramps inside swamp biomes.
    pub swamp_shading: bool,
    /// Apply biome toning to water blocks.
    pub water_biome_shading: bool,
    /// Extend grass texture onto block sides adjacent to grass.
    pub better_grass: bool,
    /// Active game version used by `version:` gating, e.g. `1.20.4`.
    pub game_version: String,
    /// Overrides for `var:` defaults in description files.
    pub variables: HashMap<String, i32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            transparent_leaves: true,
            biome_shading: true,
            swamp_shading: false,
            water_biome_shading: true,
            better_grass: false,
            game_version: "1.20.4".to_string(),
            variables: HashMap::new(),
        }
    }
}

impl RenderConfig {
    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RenderConfig> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

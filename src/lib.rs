//! # maptex
//!
//! Texture/model resolution and pixel compositing for rendering voxel-world
//! blocks into 2D map tiles.
//!
//! ## Overview
//!
//! The library loads two declarative description grammars — block models
//! (volumetric bit maps, textured patches, custom renderers) and texture
//! mappings (per-face tile bindings with color-modifier ops) — plus the
//! texture pack images they reference, and resolves per-pixel colors for a
//! renderer's ray hits.
//!
//! ## Quick Start
//!
//! ```ignore
//! use maptex::{Loader, PackSource, RenderConfig, ResolveContext, TexturePack};
//!
//! // Describe the known block states, then parse description files.
//! let mut loader = Loader::new(&states, &config, &customs, &mod_versions);
//! loader.load_model_text("models.txt", &model_text)?;
//! loader.load_texture_text("textures.txt", &texture_text)?;
//! let tables = loader.finish();
//!
//! // Decode the referenced pack images.
//! let mut source = PackSource::open("pack.zip")?;
//! let pack = TexturePack::load(&mut source, &tables.registry, tables.biomes)?;
//!
//! // Resolve pixel colors on the render hot path.
//! let ctx = ResolveContext::new(&pack, &tables.maps, &config);
//! let color = maptex::resolver::resolve_color(&ctx, &map_iter, &point);
//! ```

pub mod config;
pub mod custom;
pub mod error;
pub mod mapping;
pub mod model;
pub mod pack;
pub mod parse;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod world;

// Re-export main types for convenience
pub use config::RenderConfig;
pub use custom::{CustomColorMultiplier, CustomRegistry, CustomRenderer};
pub use error::{MapTexError, Result};
pub use mapping::{BlockTextureMap, TextureMaps, TextureOp, TextureRef};
pub use model::{BlockModels, HDBlockModel, PatchDefinition, VolumetricModel};
pub use pack::source::PackSource;
pub use pack::TexturePack;
pub use registry::{FileHandle, TileFileFormat, TileRegistry};
pub use resolver::{resolve_color, ResolveContext, SurfaceCoord, SurfacePoint};
pub use types::{BlockState, BlockStateTable, BlockStep, Color, Transparency};
pub use world::MapIterator;

use std::collections::{HashMap, HashSet};

use log::info;

use crate::parse::models::{load_model_file, ModelFileContext};
use crate::parse::textures::{
    load_texture_file, load_tileset_file, materialize_named_maps, TextureFileContext,
};

/// Tables produced by a completed description-file load.
pub struct LoadedTables {
    pub models: BlockModels,
    pub maps: TextureMaps,
    pub registry: TileRegistry,
    pub biomes: pack::biome::BiomeTable,
}

/// Accumulates description files into one set of published tables.
///
/// Later files override earlier ones state by state, so feed files in
/// ascending priority order. [`Loader::finish`] materializes named texture
/// maps and runs the mapping-coverage diagnostic.
pub struct Loader<'a> {
    states: &'a BlockStateTable,
    config: &'a RenderConfig,
    customs: &'a CustomRegistry,
    mod_versions: &'a HashMap<String, String>,
    loaded_mods: HashSet<String>,
    models: BlockModels,
    maps: TextureMaps,
    registry: TileRegistry,
    biomes: pack::biome::BiomeTable,
    blockset: String,
}

impl<'a> Loader<'a> {
    pub fn new(
        states: &'a BlockStateTable,
        config: &'a RenderConfig,
        customs: &'a CustomRegistry,
        mod_versions: &'a HashMap<String, String>,
    ) -> Loader<'a> {
        Loader {
            states,
            config,
            customs,
            mod_versions,
            loaded_mods: HashSet::new(),
            models: BlockModels::new(),
            maps: TextureMaps::new(),
            registry: TileRegistry::new(),
            biomes: pack::biome::BiomeTable::new(),
            blockset: "core".to_string(),
        }
    }

    /// Blockset tag stamped on everything loaded until changed, so one
    /// origin's definitions can be reset and reloaded as a unit.
    pub fn set_blockset(&mut self, blockset: &str) {
        self.blockset = blockset.to_string();
    }

    /// Parse one model description file.
    pub fn load_model_text(&mut self, filename: &str, text: &str) -> Result<usize> {
        let mut ctx = ModelFileContext {
            states: self.states,
            models: &mut self.models,
            customs: self.customs,
            config: self.config,
            mod_versions: self.mod_versions,
            loaded_mods: &mut self.loaded_mods,
            blockset: self.blockset.clone(),
        };
        load_model_file(&mut ctx, filename, text)
    }

    /// Parse one texture mapping description file.
    pub fn load_texture_text(&mut self, filename: &str, text: &str) -> Result<usize> {
        let mut ctx = TextureFileContext {
            states: self.states,
            maps: &mut self.maps,
            registry: &mut self.registry,
            biomes: &mut self.biomes,
            customs: self.customs,
            config: self.config,
            mod_versions: self.mod_versions,
            loaded_mods: &mut self.loaded_mods,
            blockset: self.blockset.clone(),
        };
        load_texture_file(&mut ctx, filename, text)
    }

    /// Parse one tileset description file (per-tile name tables).
    pub fn load_tileset_text(&mut self, filename: &str, text: &str) -> Result<usize> {
        let mut ctx = TextureFileContext {
            states: self.states,
            maps: &mut self.maps,
            registry: &mut self.registry,
            biomes: &mut self.biomes,
            customs: self.customs,
            config: self.config,
            mod_versions: self.mod_versions,
            loaded_mods: &mut self.loaded_mods,
            blockset: self.blockset.clone(),
        };
        load_tileset_file(&mut ctx, filename, text)
    }

    /// Finish loading: materialize named texture maps and log coverage
    /// gaps, then hand the tables over for publication.
    pub fn finish(mut self) -> LoadedTables {
        materialize_named_maps(&mut self.maps, self.states, self.customs);
        log_mapping_gaps(&self.models, &self.maps, self.states);
        LoadedTables {
            models: self.models,
            maps: self.maps,
            registry: self.registry,
            biomes: self.biomes,
        }
    }
}

/// Diagnostic pass over the loaded tables: states with a model but no
/// texture mapping, or with fewer face slots than the model samples.
fn log_mapping_gaps(models: &BlockModels, maps: &TextureMaps, states: &BlockStateTable) {
    for (idx, model) in models.iter() {
        let name = states
            .get(idx)
            .map(|s| s.name.as_str())
            .unwrap_or("<unknown>");
        if !maps.is_mapped(idx) {
            info!("{}[{}]: model has no texture mapping", name, idx);
            continue;
        }
        let need = model.required_textures();
        let have = maps.get(idx).faces.len();
        if have < need {
            info!(
                "{}[{}]: texture mapping has {} face slots, model needs {}",
                name, idx, have, need
            );
        }
    }
}

//! Diagnostic CLI: parse description files, optionally decode a texture
//! pack, and report what loaded. Useful for validating pack/mod description
//! files without running a renderer.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;

use maptex::{
    BlockStateTable, CustomRegistry, Loader, PackSource, RenderConfig, Result, TexturePack,
};

#[derive(Parser)]
#[command(name = "maptex", version, about = "Inspect map texture/model description files")]
struct Args {
    /// JSON render configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON map of block name to state variant count, e.g.
    /// {"minecraft:stone": 1, "minecraft:oak_slab": 2}.
    #[arg(long)]
    states: Option<PathBuf>,

    /// Model description files, lowest priority first.
    #[arg(long = "models", value_name = "FILE")]
    model_files: Vec<PathBuf>,

    /// Texture mapping description files, lowest priority first.
    #[arg(long = "textures", value_name = "FILE")]
    texture_files: Vec<PathBuf>,

    /// Tileset description files (per-tile name tables).
    #[arg(long = "tilesets", value_name = "FILE")]
    tileset_files: Vec<PathBuf>,

    /// Texture pack (zip or directory) to decode against the loaded tables.
    #[arg(long)]
    pack: Option<PathBuf>,

    /// List every registered texture file and its tile allocations.
    #[arg(long)]
    list_files: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    let mut states = BlockStateTable::new();
    if let Some(path) = &args.states {
        let data = std::fs::read(path)?;
        let counts: HashMap<String, u16> = serde_json::from_slice(&data)?;
        for (name, variants) in counts {
            states.register_block(&name, variants);
        }
    }

    let customs = CustomRegistry::new();
    let mod_versions = HashMap::new();
    let mut loader = Loader::new(&states, &config, &customs, &mod_versions);

    let mut model_count = 0;
    for path in &args.model_files {
        let text = std::fs::read_to_string(path)?;
        model_count += loader.load_model_text(&path.display().to_string(), &text)?;
    }
    let mut mapping_count = 0;
    for path in &args.texture_files {
        let text = std::fs::read_to_string(path)?;
        mapping_count += loader.load_texture_text(&path.display().to_string(), &text)?;
    }
    for path in &args.tileset_files {
        let text = std::fs::read_to_string(path)?;
        loader.load_tileset_text(&path.display().to_string(), &text)?;
    }
    let tables = loader.finish();

    println!("models:   {} ({} definitions)", tables.models.len(), model_count);
    println!("mappings: {} ({} definitions)", tables.maps.len(), mapping_count);
    println!(
        "files:    {} registered, {} tiles allocated",
        tables.registry.iter_files().count(),
        tables.registry.tile_count()
    );

    if args.list_files {
        for (_, file) in tables.registry.iter_files() {
            let assigned = file.assigned_tiles().count();
            println!(
                "  {} [{:?} {}x{}] {} tiles referenced{}",
                file.filename,
                file.format,
                file.x_count,
                file.y_count,
                assigned,
                if file.used { "" } else { " (unused)" }
            );
        }
    }

    if let Some(path) = &args.pack {
        let mut source = PackSource::open(path)?;
        let pack = TexturePack::load(&mut source, &tables.registry, tables.biomes)?;
        let decoded = (0..pack.tile_count())
            .filter(|&t| pack.tile_argb(t as i32).is_some())
            .count();
        println!(
            "pack:     native scale {}, {}/{} tiles decoded",
            pack.native_scale(),
            decoded,
            pack.tile_count()
        );
    }
    Ok(())
}

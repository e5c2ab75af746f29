//! Parser for the texture-mapping description grammar.
//!
//! Mapping files register texture files (`texture:`/`texturefile:`), bind
//! block states to face texture arrays (`block:`, `copyblock:`), build
//! named key-indexed maps (`texturemap:`/`addtotexturemap:`), and adjust
//! biome tint data (`biome:`). Texture values carry their color-modifier
//! op premultiplied by 1000; they are decoded to [`TextureRef`] here and
//! never re-divided downstream.

use std::collections::{HashMap, HashSet};

use log::{debug, error, info, warn};

use crate::config::RenderConfig;
use crate::custom::CustomRegistry;
use crate::error::Result;
use crate::mapping::{BlockTextureMap, TextureMaps, TextureOp, TextureRef, BLANK_REF, OP_MULT_FILE};
use crate::pack::biome::BiomeTable;
use crate::registry::{CustomTileRect, FileHandle, TileFileFormat, TileRegistry};
use crate::types::{BlockStateTable, BlockStep, Transparency};

use super::models::{match_modname, parse_index_range, parse_vars};
use super::{get_block_name, split_directive, split_fields, DataBits, ParserState};

/// Everything a texture-mapping file load reads and writes.
pub struct TextureFileContext<'a> {
    pub states: &'a BlockStateTable,
    pub maps: &'a mut TextureMaps,
    pub registry: &'a mut TileRegistry,
    pub biomes: &'a mut BiomeTable,
    pub customs: &'a CustomRegistry,
    pub config: &'a RenderConfig,
    pub mod_versions: &'a HashMap<String, String>,
    pub loaded_mods: &'a mut HashSet<String>,
    pub blockset: String,
}

/// Face keyword order used by the generic `faceN` grammar.
const FACE_TO_STEP: [BlockStep; 6] = [
    BlockStep::YPlus,
    BlockStep::YMinus,
    BlockStep::ZPlus,
    BlockStep::ZMinus,
    BlockStep::XPlus,
    BlockStep::XMinus,
];

/// Load one texture-mapping file. Returns the number of mappings defined.
pub fn load_texture_file(
    ctx: &mut TextureFileContext<'_>,
    filename: &str,
    text: &str,
) -> Result<usize> {
    let mut state = ParserState::new(filename, ctx.config, ctx.mod_versions);
    // File-local ids for registered texture files.
    let mut file_ids: HashMap<String, FileHandle> = HashMap::new();
    let mut texture_path: Option<String> = None;
    let mut texture_mod: Option<String> = None;
    let mut count = 0usize;

    for raw in text.lines() {
        state.line_no += 1;
        let line = match state.strip_version_gates(raw)? {
            Some(l) => l,
            None => continue,
        };
        let t = line.trim_start();
        if t.is_empty() || t.starts_with('#') || t.starts_with(';') {
            continue;
        }
        match split_directive(line) {
            Some(("block", args)) => {
                count += parse_block(args, ctx, &file_ids, &mut state)?;
            }
            Some(("copyblock", args)) => {
                count += parse_copyblock(args, ctx, &mut state)?;
            }
            Some(("texturemap", args)) => {
                parse_texturemap(args, ctx, &mut state)?;
            }
            Some(("addtotexturemap", args)) => {
                parse_addtotexturemap(args, ctx, &file_ids, &mut state)?;
            }
            Some(("texturefile", args)) | Some(("texture", args)) => {
                let single = line.trim_start().starts_with("texture:");
                parse_texture_file(
                    args,
                    single,
                    ctx,
                    &mut file_ids,
                    texture_path.as_deref(),
                    texture_mod.as_deref(),
                    &mut state,
                )?;
            }
            Some(("biome", args)) => {
                parse_biome(args, ctx, &mut state)?;
            }
            Some(("enabled", arg)) => {
                let arg = arg.trim();
                if arg.starts_with("true") {
                } else if arg.starts_with("false") {
                    return Ok(count);
                } else if ctx.config.variables.get(arg).copied().unwrap_or(0) == 0 {
                    return Ok(count);
                } else {
                    info!("{} textures enabled", arg);
                }
            }
            Some(("var", args)) => {
                parse_vars(args, ctx.config, &mut state)?;
            }
            Some(("modname", args)) => {
                if !match_modname(args, ctx.loaded_mods, &mut state) {
                    return Ok(count);
                }
                if texture_mod.is_none() {
                    texture_mod = Some(state.mod_id.clone());
                }
            }
            Some(("texturemod", arg)) => {
                texture_mod = Some(arg.trim().to_string());
            }
            Some(("texturepath", arg)) => {
                let mut p = arg.trim().to_string();
                if !p.ends_with('/') {
                    p.push('/');
                }
                texture_path = Some(p);
            }
            Some(("version", range)) => {
                if !super::check_version_range(&ctx.config.game_version, range.trim()) {
                    return Ok(count);
                }
            }
            Some(("noterrainpng", arg)) => {
                // There is no implicit legacy terrain sheet here; every
                // texture reference names its file.
                debug!("noterrainpng:{} ignored", arg.trim());
            }
            Some(("cfgfile", path)) => {
                warn!(
                    "{}: line {}: cfgfile directive not supported, skipping {}",
                    filename,
                    state.line_no,
                    path.trim()
                );
            }
            _ => {}
        }
    }
    info!("Loaded {} texture mappings from {}", count, filename);
    Ok(count)
}

/// Load one tileset description file: `tileset:` headers registering a
/// `Tileset` format tile file, followed by `index-name` or `x,y-name` lines
/// naming individual tiles. Returns the number of tilesets defined.
pub fn load_tileset_file(
    ctx: &mut TextureFileContext<'_>,
    filename: &str,
    text: &str,
) -> Result<usize> {
    let mut state = ParserState::new(filename, ctx.config, ctx.mod_versions);
    let mut current: Option<(FileHandle, Vec<Option<String>>, u32)> = None;
    let mut count = 0usize;

    for raw in text.lines() {
        state.line_no += 1;
        let t = raw.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if let Some(args) = t.strip_prefix("tileset:") {
            if let Some((handle, names, _)) = current.take() {
                ctx.registry.set_tile_names(handle, names);
            }
            let (mut x_count, mut y_count) = (16u32, 16u32);
            let mut fname = None;
            let mut setdir = None;
            for (key, value) in split_fields(args) {
                match key {
                    "xcount" => {
                        x_count = value.parse().map_err(|_| state.err("invalid xcount"))?;
                    }
                    "ycount" => {
                        y_count = value.parse().map_err(|_| state.err("invalid ycount"))?;
                    }
                    "filename" => fname = Some(value.to_string()),
                    "setdir" => setdir = Some(value.to_string()),
                    _ => {}
                }
            }
            let fname = match (fname, setdir) {
                (Some(f), Some(_)) => f,
                _ => return Err(state.err("error defining tile set")),
            };
            let handle = ctx.registry.find_or_add_file(
                &fname,
                None,
                x_count,
                y_count,
                TileFileFormat::Tileset,
            );
            let names = vec![None; (x_count * y_count) as usize];
            current = Some((handle, names, x_count));
            count += 1;
        } else if t.starts_with(|c: char| c.is_ascii_digit()) {
            let (names, x_count) = match current.as_mut() {
                Some(c) => (&mut c.1, c.2),
                None => continue,
            };
            let (id, name) = match t.split_once('-') {
                Some(parts) => parts,
                None => continue,
            };
            let idx = match id.trim().split_once(',') {
                Some((x, y)) => {
                    let x: u32 = x.parse().map_err(|_| state.err("invalid tile index"))?;
                    let y: u32 = y.parse().map_err(|_| state.err("invalid tile index"))?;
                    (y * x_count + x) as usize
                }
                None => id
                    .trim()
                    .parse()
                    .map_err(|_| state.err("invalid tile index"))?,
            };
            if idx < names.len() {
                names[idx] = Some(name.trim().to_string());
            } else {
                error!("{}: line {}: bad tile index", filename, state.line_no);
            }
        }
    }
    if let Some((handle, names, _)) = current.take() {
        ctx.registry.set_tile_names(handle, names);
    }
    Ok(count)
}

/// Decode a texture value: `N` or `N:fileid`, with the color-modifier op
/// carried as `N = tile + 1000 * op`. The tile is allocated a global index
/// in the registry. Mapping errors are fatal to the file.
fn parse_texture_index(
    file_ids: &HashMap<String, FileHandle>,
    src: Option<FileHandle>,
    value: &str,
    registry: &mut TileRegistry,
    state: &ParserState<'_>,
) -> Result<TextureRef> {
    let (num, src) = match value.split_once(':') {
        Some((n, file)) if !n.is_empty() => {
            let handle = file_ids
                .get(file)
                .copied()
                .ok_or_else(|| state.err(format!("unknown texture file: {file}")))?;
            (n, Some(handle))
        }
        _ => (value, src),
    };
    let raw: i32 = num
        .parse()
        .map_err(|_| state.err(format!("invalid texture index: {value}")))?;
    let op = TextureOp::from_code(raw / OP_MULT_FILE);
    let sub = raw % OP_MULT_FILE;
    if sub < 0 {
        return Ok(TextureRef::new(-1, op));
    }
    let src = src.ok_or_else(|| {
        state.err(format!("invalid texture ID: no source texture file: {value}"))
    })?;
    let tile = registry.find_or_add_tile(src, sub as usize)?;
    Ok(TextureRef::new(tile as i32, op))
}

fn parse_transparency(value: &str, config: &RenderConfig, state: &ParserState<'_>) -> Transparency {
    match Transparency::parse(value, config.transparent_leaves) {
        Some(t) => t,
        None => {
            error!(
                "{}: line {}: invalid transparency setting - {}",
                state.filename, state.line_no, value
            );
            Transparency::Opaque
        }
    }
}

fn parse_block(
    args: &str,
    ctx: &mut TextureFileContext<'_>,
    file_ids: &HashMap<String, FileHandle>,
    state: &mut ParserState<'_>,
) -> Result<usize> {
    let fields = split_fields(args);
    // Source file first: face values may reference it implicitly.
    let mut src: Option<FileHandle> = None;
    for &(key, value) in &fields {
        if key == "txtid" {
            match file_ids.get(value) {
                Some(&h) => src = Some(h),
                None => error!(
                    "{}: line {}: bad texture {}",
                    state.filename, state.line_no, value
                ),
            }
        }
    }
    let mut names = Vec::new();
    let mut databits = DataBits::new();
    let mut faces: Vec<TextureRef> = vec![BLANK_REF; 6];
    let mut layer_specs: Vec<(usize, usize, i8)> = Vec::new();
    let mut transparency = Transparency::Opaque;
    let mut color_mult: u32 = 0;
    let mut cust_color_mult = None;
    let mut std_rot = false;
    let mut color_source: Option<FileHandle> = None;

    for &(key, value) in &fields {
        match key {
            "id" => match get_block_name(&state.mod_id, value) {
                Ok(name) => names.push(name),
                Err(e) => error!("{}: line {}: {}", state.filename, state.line_no, e),
            },
            "data" => {
                databits.add(value, &mut state.vars).map_err(|e| state.err(e))?;
            }
            "txtid" => {}
            "top" | "y-" | "face1" => {
                faces[BlockStep::YMinus.ordinal()] =
                    parse_texture_index(file_ids, src, value, ctx.registry, state)?;
            }
            "bottom" | "y+" | "face0" => {
                faces[BlockStep::YPlus.ordinal()] =
                    parse_texture_index(file_ids, src, value, ctx.registry, state)?;
            }
            "north" | "x+" | "face4" => {
                faces[BlockStep::XPlus.ordinal()] =
                    parse_texture_index(file_ids, src, value, ctx.registry, state)?;
            }
            "south" | "x-" | "face5" => {
                faces[BlockStep::XMinus.ordinal()] =
                    parse_texture_index(file_ids, src, value, ctx.registry, state)?;
            }
            "west" | "z-" | "face3" => {
                faces[BlockStep::ZMinus.ordinal()] =
                    parse_texture_index(file_ids, src, value, ctx.registry, state)?;
            }
            "east" | "z+" | "face2" => {
                faces[BlockStep::ZPlus.ordinal()] =
                    parse_texture_index(file_ids, src, value, ctx.registry, state)?;
            }
            "allfaces" => {
                let tex = parse_texture_index(file_ids, src, value, ctx.registry, state)?;
                faces[..6].fill(tex);
            }
            "allsides" => {
                let tex = parse_texture_index(file_ids, src, value, ctx.registry, state)?;
                for step in [
                    BlockStep::XPlus,
                    BlockStep::XMinus,
                    BlockStep::ZPlus,
                    BlockStep::ZMinus,
                ] {
                    faces[step.ordinal()] = tex;
                }
            }
            "topbottom" => {
                let tex = parse_texture_index(file_ids, src, value, ctx.registry, state)?;
                faces[BlockStep::YMinus.ordinal()] = tex;
                faces[BlockStep::YPlus.ordinal()] = tex;
            }
            "blockcolor" => match file_ids.get(value) {
                Some(&h) => color_source = Some(h),
                None => error!(
                    "{}: line {}: bad texture {}",
                    state.filename, state.line_no, value
                ),
            },
            "transparency" => transparency = parse_transparency(value, ctx.config, state),
            "colorMult" => {
                color_mult = u32::from_str_radix(value, 16)
                    .map_err(|_| state.err(format!("invalid colorMult {value}")))?;
            }
            "custColorMult" => {
                cust_color_mult = ctx.customs.color_multiplier(value).cloned();
            }
            "stdrot" => std_rot = value == "true",
            _ if key.starts_with("face") => {
                let (lo, hi) = parse_index_range(&key[4..], state)?;
                let tex = parse_texture_index(file_ids, src, value, ctx.registry, state)?;
                for i in lo..=hi.min(5) {
                    faces[FACE_TO_STEP[i].ordinal()] = tex;
                }
            }
            _ if key.starts_with("patch") => {
                let (lo, hi) = parse_index_range(&key[5..], state)?;
                if faces.len() <= hi {
                    faces.resize(hi + 1, BLANK_REF);
                }
                let tex = parse_texture_index(file_ids, src, value, ctx.registry, state)?;
                faces[lo..=hi].fill(tex);
            }
            _ if key.starts_with("layer") => {
                let (lo, hi) = parse_index_range(&key[5..], state)?;
                let val: i8 = value
                    .parse()
                    .map_err(|_| state.err(format!("invalid layer target {value}")))?;
                layer_specs.push((lo, hi, val));
            }
            _ => {}
        }
    }

    if names.is_empty() {
        error!(
            "{}: line {}: texture mapping missing required parameters",
            state.filename, state.line_no
        );
        return Ok(0);
    }
    // Layers size to the final face count, after any patch growth.
    let layers = if layer_specs.is_empty() {
        None
    } else {
        let mut l = vec![-1i8; faces.len()];
        for (lo, hi, val) in layer_specs {
            for slot in l.iter_mut().take(hi + 1).skip(lo) {
                *slot = val;
            }
        }
        Some(l)
    };
    let map = std::sync::Arc::new(BlockTextureMap {
        faces,
        layers,
        color_mult,
        cust_color_mult,
        blockset: ctx.blockset.clone(),
        std_rot,
        color_source,
        transparency,
    });
    let mut applied = 0;
    for name in &names {
        match ctx.states.variant_count(name) {
            Some(count) => {
                for v in databits.variants(count) {
                    if let Some(idx) = ctx.states.state_index(name, v) {
                        ctx.maps.set(idx, std::sync::Arc::clone(&map));
                        if let Some(h) = color_source {
                            ctx.maps.coloring_mut().set(idx, h);
                        }
                        applied += 1;
                    }
                }
            }
            None => error!(
                "{}: line {}: invalid block name {}",
                state.filename, state.line_no, name
            ),
        }
    }
    Ok(if applied > 0 { 1 } else { 0 })
}

fn parse_copyblock(
    args: &str,
    ctx: &mut TextureFileContext<'_>,
    state: &mut ParserState<'_>,
) -> Result<usize> {
    let mut names = Vec::new();
    let mut databits = DataBits::new();
    let mut src_name = None;
    let mut src_meta: i32 = 0;
    let mut transparency = None;
    for (key, value) in split_fields(args) {
        match key {
            "id" => match get_block_name(&state.mod_id, value) {
                Ok(name) => names.push(name),
                Err(e) => error!("{}: line {}: {}", state.filename, state.line_no, e),
            },
            "data" => {
                databits.add(value, &mut state.vars).map_err(|e| state.err(e))?;
            }
            "srcid" => match get_block_name(&state.mod_id, value) {
                Ok(name) => src_name = Some(name),
                Err(e) => error!("{}: line {}: {}", state.filename, state.line_no, e),
            },
            "srcmeta" => {
                src_meta = state.vars.get_int_value(value).map_err(|e| state.err(e))?;
            }
            "transparency" => transparency = Some(parse_transparency(value, ctx.config, state)),
            _ => {}
        }
    }
    let src_name = match src_name {
        Some(s) if !names.is_empty() => s,
        _ => {
            error!(
                "{}: line {}: texture mapping copy missing required parameters",
                state.filename, state.line_no
            );
            return Ok(0);
        }
    };
    let src_map = ctx
        .states
        .state_index(&src_name, src_meta.max(0) as u16)
        .filter(|&idx| ctx.maps.is_mapped(idx))
        .map(|idx| std::sync::Arc::clone(ctx.maps.get(idx)));
    let src_map = match src_map {
        Some(m) => m,
        None => {
            error!(
                "{}: line {}: copy of texture mapping failed",
                state.filename, state.line_no
            );
            return Ok(0);
        }
    };
    for name in &names {
        match ctx.states.variant_count(name) {
            Some(count) => {
                for v in databits.variants(count) {
                    if let Some(idx) = ctx.states.state_index(name, v) {
                        ctx.maps.copy_to_state(idx, &src_map, transparency);
                    }
                }
            }
            None => error!(
                "{}: line {}: invalid block name {}",
                state.filename, state.line_no, name
            ),
        }
    }
    Ok(1)
}

fn parse_texturemap(
    args: &str,
    ctx: &mut TextureFileContext<'_>,
    state: &mut ParserState<'_>,
) -> Result<()> {
    let mut mapid = None;
    let mut names = Vec::new();
    let mut databits = DataBits::new();
    let mut transparency = Transparency::Opaque;
    let mut color_mult: u32 = 0;
    let mut cust_name = None;
    for (key, value) in split_fields(args) {
        match key {
            "id" => match get_block_name(&state.mod_id, value) {
                Ok(name) => names.push(name),
                Err(e) => error!("{}: line {}: {}", state.filename, state.line_no, e),
            },
            "mapid" => mapid = Some(value.to_string()),
            "data" => {
                databits.add(value, &mut state.vars).map_err(|e| state.err(e))?;
            }
            "transparency" => transparency = parse_transparency(value, ctx.config, state),
            "colorMult" => {
                color_mult = u32::from_str_radix(value, 16)
                    .map_err(|_| state.err(format!("invalid colorMult {value}")))?;
            }
            "custColorMult" => cust_name = Some(value.to_string()),
            _ => {}
        }
    }
    let mapid = match mapid {
        Some(m) if !names.is_empty() => m,
        _ => {
            error!(
                "{}: line {}: texture map missing required parameters",
                state.filename, state.line_no
            );
            return Ok(());
        }
    };
    let state_ids = if databits.is_all() {
        None
    } else {
        Some(databits.variants(u16::MAX))
    };
    let blockset = ctx.blockset.clone();
    let named = ctx.maps.named_mut(&mapid);
    named.block_names = names;
    named.state_ids = state_ids;
    named.transparency = transparency;
    named.color_mult = color_mult;
    named.cust_color_mult_name = cust_name;
    named.blockset = blockset;
    Ok(())
}

fn parse_addtotexturemap(
    args: &str,
    ctx: &mut TextureFileContext<'_>,
    file_ids: &HashMap<String, FileHandle>,
    state: &mut ParserState<'_>,
) -> Result<()> {
    let fields = split_fields(args);
    let mut mapid = None;
    let mut src: Option<FileHandle> = None;
    for &(key, value) in &fields {
        match key {
            "mapid" => mapid = Some(value.to_string()),
            "txtid" => match file_ids.get(value) {
                Some(&h) => src = Some(h),
                None => error!(
                    "{}: line {}: bad texture {}",
                    state.filename, state.line_no, value
                ),
            },
            _ => {}
        }
    }
    let mapid = match mapid {
        Some(m) => m,
        None => {
            error!("{}: line {}: missing mapid", state.filename, state.line_no);
            return Ok(());
        }
    };
    for &(key, value) in &fields {
        if let Some(key_name) = key.strip_prefix("key:") {
            let key_val = state
                .vars
                .get_int_value(key_name)
                .map_err(|e| state.err(e))?;
            if key_val > 0 {
                let tex = parse_texture_index(file_ids, src, value, ctx.registry, state)?;
                ctx.maps.named_mut(&mapid).set_key(key_val as usize, tex);
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn parse_texture_file(
    args: &str,
    single: bool,
    ctx: &mut TextureFileContext<'_>,
    file_ids: &mut HashMap<String, FileHandle>,
    texture_path: Option<&str>,
    texture_mod: Option<&str>,
    state: &mut ParserState<'_>,
) -> Result<()> {
    let fields = split_fields(args);
    let (mut x_count, mut y_count) = if single { (1, 1) } else { (16, 16) };
    let mut format = TileFileFormat::Grid;
    let mut id = None;
    let mut filename = None;
    let mut material = None;
    for &(key, value) in &fields {
        match key {
            "id" => {
                id = Some(value.to_string());
                if filename.is_none() {
                    if let Some(path) = texture_path {
                        filename = Some(format!("{path}{value}.png"));
                    } else if let Some(m) = texture_mod {
                        filename = Some(format!("mods/{m}/textures/blocks/{value}.png"));
                    }
                }
            }
            "filename" => filename = Some(value.to_string()),
            "xcount" => {
                x_count = value.parse().map_err(|_| state.err("invalid xcount"))?;
            }
            "ycount" => {
                y_count = value.parse().map_err(|_| state.err("invalid ycount"))?;
            }
            "format" => {
                format = TileFileFormat::parse(value)
                    .ok_or_else(|| state.err(format!("invalid format type {value}")))?;
            }
            "material" => material = Some(value.to_string()),
            _ => {}
        }
    }
    let (id, filename) = match (id, filename) {
        (Some(i), Some(f)) => (i, f),
        _ => return Err(state.err("format error")),
    };
    let mod_scope = if state.mod_id == "minecraft" {
        None
    } else {
        Some(state.mod_id.clone())
    };
    let handle =
        ctx.registry
            .find_or_add_file(&filename, mod_scope.as_deref(), x_count, y_count, format);
    if format == TileFileFormat::Custom {
        ctx.registry
            .set_custom_rects(handle, parse_custom_rects(&fields, state));
    }
    if let Some(m) = material {
        ctx.registry.set_material(handle, &m);
    }
    file_ids.insert(id, handle);
    Ok(())
}

/// Parse `tileN=srcx:srcy/width:height[/targetx:targety]` crop fields of a
/// `format=CUSTOM` texture file. Bad fields are skipped with a warning.
fn parse_custom_rects(fields: &[(&str, &str)], state: &ParserState<'_>) -> Vec<CustomTileRect> {
    let mut rects: Vec<CustomTileRect> = Vec::new();
    for &(key, value) in fields {
        let id: usize = match key.strip_prefix("tile").and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => continue,
        };
        let mut rect = CustomTileRect::default();
        let mut parts = value.split('/');
        let parsed = (|| -> Option<()> {
            let (sx, sy) = parse_pair(parts.next()?)?;
            let (w, h) = parse_pair(parts.next()?)?;
            rect.src_x = sx;
            rect.src_y = sy;
            rect.width = w;
            rect.height = h;
            if let Some(dest) = parts.next() {
                let (tx, ty) = parse_pair(dest)?;
                rect.target_x = tx;
                rect.target_y = ty;
            }
            Some(())
        })();
        if parsed.is_none() {
            warn!(
                "{}: line {}: bad custom tile coordinate: {}",
                state.filename, state.line_no, value
            );
            continue;
        }
        if rects.len() <= id {
            rects.resize(id + 1, CustomTileRect::default());
        }
        rects[id] = rect;
    }
    rects
}

fn parse_pair(s: &str) -> Option<(u32, u32)> {
    let (a, b) = s.split_once(':')?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

fn parse_biome(
    args: &str,
    ctx: &mut TextureFileContext<'_>,
    state: &mut ParserState<'_>,
) -> Result<()> {
    let mut id: i32 = 0;
    let mut grass = None;
    let mut foliage = None;
    let mut water = None;
    let mut temp = None;
    let mut rain = None;
    for (key, value) in split_fields(args) {
        match key {
            "id" => {
                id = state.vars.get_int_value(value).map_err(|e| state.err(e))?;
            }
            "grassColorMult" => {
                grass = Some(
                    u32::from_str_radix(value, 16)
                        .map_err(|_| state.err("invalid grassColorMult"))?,
                );
            }
            "foliageColorMult" => {
                foliage = Some(
                    u32::from_str_radix(value, 16)
                        .map_err(|_| state.err("invalid foliageColorMult"))?,
                );
            }
            "waterColorMult" => {
                water = Some(
                    u32::from_str_radix(value, 16)
                        .map_err(|_| state.err("invalid waterColorMult"))?,
                );
            }
            "temp" => {
                temp = Some(value.parse::<f64>().map_err(|_| state.err("invalid temp"))?);
            }
            "rain" => {
                rain = Some(value.parse::<f64>().map_err(|_| state.err("invalid rain"))?);
            }
            _ => {
                return Err(state.err("format error"));
            }
        }
    }
    if id <= 0 {
        return Ok(());
    }
    let id = id as usize;
    if let Some(m) = grass {
        ctx.biomes.set_grass_mult(id, m);
    }
    if let Some(m) = foliage {
        ctx.biomes.set_foliage_mult(id, m);
    }
    if let Some(m) = water {
        ctx.biomes.set_water_mult(id, m);
    }
    if temp.is_some() || rain.is_some() {
        let existing = ctx.biomes.get(id).cloned().unwrap_or_default();
        ctx.biomes.set_climate(
            id,
            temp.unwrap_or(existing.temperature),
            rain.unwrap_or(existing.rainfall),
        );
    }
    Ok(())
}

/// Convert named maps built by `texturemap:`/`addtotexturemap:` into
/// per-state texture maps, once all files have loaded.
pub fn materialize_named_maps(
    maps: &mut TextureMaps,
    states: &BlockStateTable,
    customs: &CustomRegistry,
) {
    let ids: Vec<String> = maps.named_ids().cloned().collect();
    for mapid in ids {
        let named = match maps.named(&mapid) {
            Some(n) => n.clone(),
            None => continue,
        };
        if named.block_names.is_empty() {
            continue;
        }
        let cust = named
            .cust_color_mult_name
            .as_deref()
            .and_then(|n| customs.color_multiplier(n).cloned());
        let map = std::sync::Arc::new(BlockTextureMap {
            faces: named.textures.clone(),
            layers: None,
            color_mult: named.color_mult,
            cust_color_mult: cust,
            blockset: named.blockset.clone(),
            std_rot: true,
            color_source: None,
            transparency: named.transparency,
        });
        for name in &named.block_names {
            let count = match states.variant_count(name) {
                Some(c) => c,
                None => {
                    error!("invalid texture map block name {}", name);
                    continue;
                }
            };
            let variants: Vec<u16> = match &named.state_ids {
                Some(ids) => ids.iter().copied().filter(|&v| v < count).collect(),
                None => (0..count).collect(),
            };
            for v in variants {
                if let Some(idx) = states.state_index(name, v) {
                    maps.set(idx, std::sync::Arc::clone(&map));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::TextureOp;
    use crate::types::BlockStateTable;

    fn table() -> BlockStateTable {
        let mut t = BlockStateTable::new();
        t.register_block("minecraft:air", 1);
        t.register_block("minecraft:stone", 1);
        t.register_block("minecraft:grass_block", 2);
        t.register_block("minecraft:oak_leaves", 4);
        t.register_block("minecraft:bed", 16);
        t.register_block("minecraft:water", 16);
        t
    }

    struct Fixture {
        states: BlockStateTable,
        maps: TextureMaps,
        registry: TileRegistry,
        biomes: BiomeTable,
        customs: CustomRegistry,
        config: RenderConfig,
    }

    impl Fixture {
        fn new() -> Fixture {
            Fixture {
                states: table(),
                maps: TextureMaps::new(),
                registry: TileRegistry::new(),
                biomes: BiomeTable::new(),
                customs: CustomRegistry::new(),
                config: RenderConfig::default(),
            }
        }

        fn load(&mut self, text: &str) -> Result<usize> {
            let mod_versions = HashMap::new();
            let mut loaded_mods = HashSet::new();
            let mut ctx = TextureFileContext {
                states: &self.states,
                maps: &mut self.maps,
                registry: &mut self.registry,
                biomes: &mut self.biomes,
                customs: &self.customs,
                config: &self.config,
                mod_versions: &mod_versions,
                loaded_mods: &mut loaded_mods,
                blockset: "core".to_string(),
            };
            load_texture_file(&mut ctx, "textures-test.txt", text)
        }

        fn load_tilesets(&mut self, text: &str) -> Result<usize> {
            let mod_versions = HashMap::new();
            let mut loaded_mods = HashSet::new();
            let mut ctx = TextureFileContext {
                states: &self.states,
                maps: &mut self.maps,
                registry: &mut self.registry,
                biomes: &mut self.biomes,
                customs: &self.customs,
                config: &self.config,
                mod_versions: &mod_versions,
                loaded_mods: &mut loaded_mods,
                blockset: "core".to_string(),
            };
            load_tileset_file(&mut ctx, "tilesets-test.txt", text)
        }
    }

    #[test]
    fn test_tileset_names() {
        let mut f = Fixture::new();
        let n = f
            .load_tilesets(
                "# block tile names\n\
                 tileset:xcount=4,ycount=4,setdir=blocks,filename=assets/blocks.png\n\
                 0-stone\n\
                 1,1-dirt\n\
                 99-overflow\n",
            )
            .unwrap();
        assert_eq!(n, 1);
        let handle = f.registry.lookup_file("assets/blocks.png").unwrap();
        let file = f.registry.file(handle);
        assert_eq!(file.format, TileFileFormat::Tileset);
        assert_eq!(file.tile_names.len(), 16);
        assert_eq!(file.tile_names[0].as_deref(), Some("stone"));
        // x,y coordinates map row-major.
        assert_eq!(file.tile_names[5].as_deref(), Some("dirt"));
        assert_eq!(file.tile_names.iter().flatten().count(), 2);

        // A header without setdir is fatal to the file.
        assert!(f.load_tilesets("tileset:filename=assets/other.png\n").is_err());
    }

    #[test]
    fn test_block_face_binding() {
        let mut f = Fixture::new();
        let text = "\
texture:id=stone_tex,filename=assets/minecraft/textures/block/stone.png
texture:id=grass_top,filename=assets/minecraft/textures/block/grass_block_top.png
block:id=stone,allfaces=0:stone_tex
block:id=grass_block,data=*,top=1000:grass_top,allsides=0:stone_tex,stdrot=true
";
        let n = f.load(text).unwrap();
        assert_eq!(n, 2);
        let stone = f.states.state_index("minecraft:stone", 0).unwrap();
        let map = f.maps.get(stone);
        for face in 0..6 {
            assert!(!map.face(face).is_blank());
            assert_eq!(map.face(face).op, TextureOp::None);
        }
        let grass = f.states.state_index("minecraft:grass_block", 1).unwrap();
        let map = f.maps.get(grass);
        assert!(map.std_rot);
        // top keyword lands on the Y-minus step slot with its op decoded.
        let top = map.face(BlockStep::YMinus.ordinal());
        assert_eq!(top.op, TextureOp::GrassToned);
        assert!(!top.is_blank());
    }

    #[test]
    fn test_face_index_grammar_order() {
        let mut f = Fixture::new();
        let text = "\
texturefile:id=t,filename=t.png,xcount=2,ycount=1
block:id=stone,face0=0:t,face2-3=1:t
";
        f.load(text).unwrap();
        let idx = f.states.state_index("minecraft:stone", 0).unwrap();
        let map = f.maps.get(idx);
        // face0 is bottom (Y+), face2/face3 are Z+/Z-.
        assert!(!map.face(BlockStep::YPlus.ordinal()).is_blank());
        assert!(!map.face(BlockStep::ZPlus.ordinal()).is_blank());
        assert!(!map.face(BlockStep::ZMinus.ordinal()).is_blank());
        assert!(map.face(BlockStep::YMinus.ordinal()).is_blank());
    }

    #[test]
    fn test_patch_growth_and_layers() {
        let mut f = Fixture::new();
        let text = "\
texture:id=t,filename=t.png
block:id=water,data=*,patch0-7=0:t,layer0=3
";
        f.load(text).unwrap();
        let idx = f.states.state_index("minecraft:water", 0).unwrap();
        let map = f.maps.get(idx);
        assert_eq!(map.faces.len(), 8);
        assert!(!map.face(7).is_blank());
        assert_eq!(map.next_layer(0), Some(3));
        assert_eq!(map.next_layer(1), None);
    }

    #[test]
    fn test_unknown_file_reference_is_fatal() {
        let mut f = Fixture::new();
        assert!(f.load("block:id=stone,allfaces=0:nosuchfile\n").is_err());
        // No source file at all is also fatal.
        assert!(f.load("block:id=stone,allfaces=0\n").is_err());
    }

    #[test]
    fn test_leaves_transparency_follows_config() {
        let mut f = Fixture::new();
        f.config.transparent_leaves = true;
        let text = "\
texture:id=t,filename=t.png
block:id=oak_leaves,data=*,allfaces=2000:t,transparency=LEAVES
";
        f.load(text).unwrap();
        let idx = f.states.state_index("minecraft:oak_leaves", 0).unwrap();
        assert_eq!(f.maps.get(idx).transparency, Transparency::Transparent);

        let mut f = Fixture::new();
        f.config.transparent_leaves = false;
        let text = "\
texture:id=t,filename=t.png
block:id=oak_leaves,data=*,allfaces=2000:t,transparency=LEAVES
";
        f.load(text).unwrap();
        let idx = f.states.state_index("minecraft:oak_leaves", 0).unwrap();
        assert_eq!(f.maps.get(idx).transparency, Transparency::Opaque);
    }

    #[test]
    fn test_copyblock() {
        let mut f = Fixture::new();
        let text = "\
texturefile:id=t,filename=t.png
block:id=stone,allfaces=5:t
copyblock:id=grass_block,data=*,srcid=stone,srcmeta=0,transparency=TRANSPARENT
";
        f.load(text).unwrap();
        let src = f.states.state_index("minecraft:stone", 0).unwrap();
        let dst = f.states.state_index("minecraft:grass_block", 1).unwrap();
        assert_eq!(f.maps.get(dst).face(0), f.maps.get(src).face(0));
        assert_eq!(f.maps.get(dst).transparency, Transparency::Transparent);
        assert_eq!(f.maps.get(src).transparency, Transparency::Opaque);
    }

    #[test]
    fn test_texturemap_materialization() {
        let mut f = Fixture::new();
        let text = "\
texture:id=sheet,filename=bed.png,xcount=4,ycount=4
texturemap:mapid=beds,id=bed,data=*,transparency=TRANSPARENT
addtotexturemap:mapid=beds,txtid=sheet,key:1=0,key:2=1,key:3=4005
";
        f.load(text).unwrap();
        materialize_named_maps(&mut f.maps, &f.states, &f.customs);
        let idx = f.states.state_index("minecraft:bed", 0).unwrap();
        let map = f.maps.get(idx);
        assert_eq!(map.transparency, Transparency::Transparent);
        assert!(map.std_rot);
        assert!(map.face(0).is_blank());
        assert!(!map.face(1).is_blank());
        assert_eq!(map.face(3).op, TextureOp::Rot90);
    }

    #[test]
    fn test_biome_line() {
        let mut f = Fixture::new();
        let text = "biome:id=6,grassColorMult=4C763C,waterColorMult=E0FFAE,temp=0.8,rain=0.9\n";
        f.load(text).unwrap();
        let info = f.biomes.get(6).unwrap();
        assert_eq!(info.grass_mult, Some(0x4C763C));
        assert_eq!(info.water_mult, Some(0xE0FFAE));
        assert_eq!(info.temperature, 0.8);
        assert_eq!(info.rainfall, 0.9);
        assert!(info.foliage_mult.is_none());
    }

    #[test]
    fn test_custom_format_rects() {
        let mut f = Fixture::new();
        let text =
            "texture:id=c,filename=custom.png,format=CUSTOM,tile0=0:0/8:8,tile1=8:0/8:8/4:4\n";
        f.load(text).unwrap();
        let handle = f.registry.lookup_file("custom.png").unwrap();
        let file = f.registry.file(handle);
        assert_eq!(file.custom_rects.len(), 2);
        assert_eq!(file.custom_rects[0].src_x, 0);
        assert_eq!(file.custom_rects[1].src_x, 8);
        assert_eq!(file.custom_rects[1].target_x, 4);
    }

    #[test]
    fn test_texturepath_prefix() {
        let mut f = Fixture::new();
        let text = "\
texturepath:assets/minecraft/textures/block
texture:id=stone
";
        f.load(text).unwrap();
        assert!(f
            .registry
            .lookup_file("assets/minecraft/textures/block/stone.png")
            .is_some());
    }

    #[test]
    fn test_tile_allocation_is_idempotent() {
        let mut f = Fixture::new();
        let text = "\
texturefile:id=t,filename=t.png
block:id=stone,allfaces=3:t
block:id=grass_block,data=*,allfaces=3:t
";
        f.load(text).unwrap();
        let a = f.states.state_index("minecraft:stone", 0).unwrap();
        let b = f.states.state_index("minecraft:grass_block", 0).unwrap();
        assert_eq!(f.maps.get(a).face(0).tile, f.maps.get(b).face(0).tile);
        assert_eq!(f.registry.tile_count(), 1);
    }
}

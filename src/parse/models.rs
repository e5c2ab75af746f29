//! Parser for the block model description grammar.
//!
//! One directive per line. `block:` opens a volumetric model whose
//! occupancy is filled in by following `layer:`/pattern-row lines;
//! `patch:`/`patchblock:`/`boxblock:`/`boxlist:` build polygon models;
//! `rotate:`/`patchrotate:` derive variants from already-registered
//! models. Malformed structural lines abort the file; an unknown block
//! name only skips its own directive.

use std::collections::{HashMap, HashSet};

use log::{error, info, warn};

use crate::config::RenderConfig;
use crate::custom::CustomRegistry;
use crate::error::Result;
use crate::model::{
    add_box, BlockModels, BoxLimits, CustomModel, HDBlockModel, PatchDefinition, PatchModel,
    SideVisible, VolumetricModel, BOX_PATCH_SLOTS,
};
use crate::types::BlockStateTable;

use super::{get_block_name, split_directive, split_fields, DataBits, ParserState};

/// Everything a model file load reads and writes.
pub struct ModelFileContext<'a> {
    pub states: &'a BlockStateTable,
    pub models: &'a mut BlockModels,
    pub customs: &'a CustomRegistry,
    pub config: &'a RenderConfig,
    /// Versions of mods present on the server, for `modname:` matching.
    pub mod_versions: &'a HashMap<String, String>,
    /// Mods whose definitions were already supplied; a file for one of
    /// these is skipped entirely.
    pub loaded_mods: &'a mut HashSet<String>,
    /// Ownership tag for every model this file defines.
    pub blockset: String,
}

/// Load one model description file. Returns the number of models defined.
pub fn load_model_file(ctx: &mut ModelFileContext<'_>, filename: &str, text: &str) -> Result<usize> {
    let mut state = ParserState::new(filename, ctx.config, ctx.mod_versions);
    let mut patch_defs: HashMap<String, PatchDefinition> = HashMap::new();
    let mut scale: u32 = 0;
    let mut layer_bits: u32 = 0;
    let mut row_num: u32 = 0;
    let mut last_volumetric: Vec<u32> = Vec::new();
    let mut last_patch: Vec<u32> = Vec::new();
    let mut count = 0usize;

    for raw in text.lines() {
        state.line_no += 1;
        let line = match state.strip_version_gates(raw)? {
            Some(l) => l,
            None => continue,
        };
        let t = line.trim_start();
        if t.starts_with('#') || t.starts_with(';') {
            continue;
        }
        // Blank lines inside a pattern block still count as rows.
        if t.is_empty() && layer_bits == 0 {
            continue;
        }
        let directive = split_directive(line);
        match directive {
            Some(("block", args)) => {
                layer_bits = 0;
                scale = 0;
                let mut databits = DataBits::new();
                let mut names = Vec::new();
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => names.push(name),
                            Err(e) => error!("{}: line {}: {}", filename, state.line_no, e),
                        },
                        "data" => {
                            databits
                                .add(value, &mut state.vars)
                                .map_err(|e| state.err(e))?;
                        }
                        "scale" => {
                            scale = value.parse().map_err(|_| state.err("invalid scale"))?;
                        }
                        _ => {}
                    }
                }
                if names.is_empty() || scale == 0 {
                    error!(
                        "{}: line {}: block model missing required parameters",
                        filename, state.line_no
                    );
                    continue;
                }
                last_volumetric = target_states(ctx.states, &names, &databits, filename, state.line_no);
                for &idx in &last_volumetric {
                    ctx.models.insert(
                        idx,
                        HDBlockModel::Volumetric(VolumetricModel::new(scale)),
                        &ctx.blockset,
                    );
                }
                count += last_volumetric.len();
            }
            Some(("layer", args)) => {
                layer_bits = 0;
                row_num = 0;
                for a in args.split(',') {
                    let n: u32 = a
                        .trim()
                        .parse()
                        .map_err(|_| state.err("invalid layer index"))?;
                    layer_bits |= 1 << n;
                }
            }
            Some(("rotate", args)) => {
                let mut id = None;
                let mut data: i32 = -1;
                let mut rot: i32 = -1;
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => id = Some(name),
                            Err(e) => return Err(state.err(e)),
                        },
                        "data" => {
                            data = state.vars.get_int_value(value).map_err(|e| state.err(e))?;
                        }
                        "rot" => {
                            rot = value.parse().map_err(|_| state.err("invalid rotation"))?;
                        }
                        _ => {}
                    }
                }
                let id = id.ok_or_else(|| state.err("rotate missing id"))?;
                let src_idx = ctx
                    .states
                    .state_index(&id, data.max(0) as u16)
                    .ok_or_else(|| state.err(format!("invalid rotate ID: {id}")))?;
                if last_volumetric.is_empty() {
                    continue;
                }
                let src = match ctx.models.get(src_idx).map(|m| (**m).clone()) {
                    Some(HDBlockModel::Volumetric(v)) if rot % 90 == 0 => v,
                    _ => return Err(state.err("invalid rotate")),
                };
                for &idx in &last_volumetric {
                    ctx.models.modify(idx, |m| {
                        if let HDBlockModel::Volumetric(dst) = m {
                            rotate_into(&src, dst, scale, rot);
                        }
                    });
                }
            }
            Some(("patch", args)) => {
                parse_patch(args, &mut patch_defs, &mut state)?;
            }
            Some(("patchblock", args)) => {
                layer_bits = 0;
                let mut databits = DataBits::new();
                let mut names = Vec::new();
                let mut patches: Vec<PatchDefinition> = Vec::new();
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => names.push(name),
                            Err(e) => error!("{}: line {}: {}", filename, state.line_no, e),
                        },
                        "data" => {
                            databits
                                .add(value, &mut state.vars)
                                .map_err(|e| state.err(e))?;
                        }
                        _ if key.starts_with("patch") => {
                            let (lo, hi) = parse_index_range(&key[5..], &state)?;
                            let base = patch_defs
                                .get(value)
                                .ok_or_else(|| state.err(format!("invalid patch ID {value}")))?;
                            for i in lo..=hi {
                                let pd = base.with_texture(i);
                                if i > patches.len() {
                                    return Err(state.err(format!("invalid patch index {i}")));
                                }
                                patches.insert(i, pd);
                            }
                        }
                        _ => {}
                    }
                }
                if names.is_empty() {
                    error!(
                        "{}: line {}: patch block model missing required parameters",
                        filename, state.line_no
                    );
                    continue;
                }
                last_patch = target_states(ctx.states, &names, &databits, filename, state.line_no);
                for &idx in &last_patch {
                    ctx.models.insert(
                        idx,
                        HDBlockModel::Patch(PatchModel {
                            patches: patches.clone(),
                        }),
                        &ctx.blockset,
                    );
                }
                count += last_patch.len();
            }
            Some(("boxblock", args)) => {
                layer_bits = 0;
                let mut databits = DataBits::new();
                let mut names = Vec::new();
                let mut limits = BoxLimits {
                    patches: BOX_PATCH_SLOTS,
                    ..BoxLimits::default()
                };
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => names.push(name),
                            Err(e) => error!("{}: line {}: {}", filename, state.line_no, e),
                        },
                        "data" => {
                            databits
                                .add(value, &mut state.vars)
                                .map_err(|e| state.err(e))?;
                        }
                        "xmin" | "xmax" | "ymin" | "ymax" | "zmin" | "zmax" => {
                            let v: f64 =
                                value.parse().map_err(|_| state.err("invalid box bound"))?;
                            match key {
                                "xmin" => limits.xmin = v,
                                "xmax" => limits.xmax = v,
                                "ymin" => limits.ymin = v,
                                "ymax" => limits.ymax = v,
                                "zmin" => limits.zmin = v,
                                _ => limits.zmax = v,
                            }
                        }
                        _ => {}
                    }
                }
                if names.is_empty() {
                    error!(
                        "{}: line {}: box block model missing required parameters",
                        filename, state.line_no
                    );
                    continue;
                }
                let mut patches = Vec::new();
                add_box(&mut patches, &limits);
                last_patch = target_states(ctx.states, &names, &databits, filename, state.line_no);
                for &idx in &last_patch {
                    ctx.models.insert(
                        idx,
                        HDBlockModel::Patch(PatchModel {
                            patches: patches.clone(),
                        }),
                        &ctx.blockset,
                    );
                }
                count += last_patch.len();
            }
            Some(("boxlist", args)) => {
                layer_bits = 0;
                let mut databits = DataBits::new();
                let mut names = Vec::new();
                let mut boxes: Vec<BoxLimits> = Vec::new();
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => names.push(name),
                            Err(e) => error!("{}: line {}: {}", filename, state.line_no, e),
                        },
                        "data" => {
                            databits
                                .add(value, &mut state.vars)
                                .map_err(|e| state.err(e))?;
                        }
                        "box" => {
                            boxes.push(parse_box_limits(value, &state)?);
                        }
                        _ => {}
                    }
                }
                if names.is_empty() {
                    error!(
                        "{}: line {}: box list block model missing required parameters",
                        filename, state.line_no
                    );
                    continue;
                }
                let mut patches = Vec::new();
                for b in &boxes {
                    add_box(&mut patches, b);
                }
                last_patch = target_states(ctx.states, &names, &databits, filename, state.line_no);
                for &idx in &last_patch {
                    ctx.models.insert(
                        idx,
                        HDBlockModel::Patch(PatchModel {
                            patches: patches.clone(),
                        }),
                        &ctx.blockset,
                    );
                }
                count += last_patch.len();
            }
            Some(("patchrotate", args)) => {
                let mut id = None;
                let mut data: i32 = -1;
                let (mut rx, mut ry, mut rz) = (0f64, 0f64, 0f64);
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => id = Some(name),
                            Err(e) => return Err(state.err(e)),
                        },
                        "data" => {
                            data = state.vars.get_int_value(value).map_err(|e| state.err(e))?;
                        }
                        "rot" | "roty" => {
                            ry = value.parse().map_err(|_| state.err("invalid rotation"))?;
                        }
                        "rotx" => {
                            rx = value.parse().map_err(|_| state.err("invalid rotation"))?;
                        }
                        "rotz" => {
                            rz = value.parse().map_err(|_| state.err("invalid rotation"))?;
                        }
                        _ => {}
                    }
                }
                let id = id.ok_or_else(|| state.err("patchrotate missing id"))?;
                let src_idx = ctx
                    .states
                    .state_index(&id, data.max(0) as u16)
                    .ok_or_else(|| state.err(format!("invalid patchrotate id: {id}")))?;
                if last_patch.is_empty() {
                    continue;
                }
                let rotated = match ctx.models.get(src_idx).map(|m| (**m).clone()) {
                    Some(HDBlockModel::Patch(p)) => p
                        .patches
                        .iter()
                        .filter_map(|pd| pd.rotated(rx, ry, rz, pd.texture_index))
                        .collect::<Vec<_>>(),
                    _ => return Err(state.err("invalid rotate")),
                };
                for &idx in &last_patch {
                    ctx.models.modify(idx, |m| {
                        if let HDBlockModel::Patch(p) = m {
                            p.patches = rotated.clone();
                        }
                    });
                }
            }
            Some(("customblock", args)) => {
                let mut databits = DataBits::new();
                let mut names = Vec::new();
                let mut class = None;
                let mut custom_args: HashMap<String, String> = HashMap::new();
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => names.push(name),
                            Err(e) => error!("{}: line {}: {}", filename, state.line_no, e),
                        },
                        "data" => {
                            databits
                                .add(value, &mut state.vars)
                                .map_err(|e| state.err(e))?;
                        }
                        "class" => class = Some(value.to_string()),
                        _ => {
                            // Variable values substitute before being handed through.
                            let value = match state.vars.get(value) {
                                Some(v) => v.to_string(),
                                None => value.to_string(),
                            };
                            custom_args.insert(key.to_string(), value);
                        }
                    }
                }
                let class = match class {
                    Some(c) if !names.is_empty() => c,
                    _ => {
                        error!(
                            "{}: line {}: custom block model missing required parameters",
                            filename, state.line_no
                        );
                        continue;
                    }
                };
                let geometry = ctx.customs.renderer(&class).and_then(|r| r.geometry(&custom_args));
                if geometry.is_none() {
                    error!(
                        "{}: line {}: custom block model failed to initialize",
                        filename, state.line_no
                    );
                }
                let targets = target_states(ctx.states, &names, &databits, filename, state.line_no);
                for &idx in &targets {
                    let (patches, texture_count) = match &geometry {
                        Some(g) => (g.patches.clone(), g.texture_count),
                        None => (Vec::new(), 0),
                    };
                    ctx.models.insert(
                        idx,
                        HDBlockModel::Custom(CustomModel {
                            class: class.clone(),
                            args: custom_args.clone(),
                            patches,
                            texture_count,
                        }),
                        &ctx.blockset,
                    );
                }
                count += targets.len();
            }
            Some(("ignore-updates", args)) => {
                let mut databits = DataBits::new();
                let mut names = Vec::new();
                for (key, value) in split_fields(args) {
                    match key {
                        "id" => match get_block_name(&state.mod_id, value) {
                            Ok(name) => names.push(name),
                            Err(e) => error!("{}: line {}: {}", filename, state.line_no, e),
                        },
                        "data" => {
                            databits
                                .add(value, &mut state.vars)
                                .map_err(|e| state.err(e))?;
                        }
                        _ => {}
                    }
                }
                for idx in target_states(ctx.states, &names, &databits, filename, state.line_no) {
                    ctx.models.set_change_ignored(idx);
                }
            }
            Some(("enabled", arg)) => {
                let arg = arg.trim();
                if arg.starts_with("true") {
                } else if arg.starts_with("false") {
                    return Ok(count);
                } else if ctx.config.variables.get(arg).copied().unwrap_or(0) == 0 {
                    return Ok(count);
                } else {
                    info!("{} models enabled", arg);
                }
            }
            Some(("var", args)) => {
                parse_vars(args, ctx.config, &mut state)?;
            }
            Some(("modname", args)) => {
                if !match_modname(args, ctx.loaded_mods, &mut state) {
                    return Ok(count);
                }
            }
            Some(("version", range)) => {
                if !super::check_version_range(&ctx.config.game_version, range.trim()) {
                    return Ok(count);
                }
            }
            Some(("cfgfile", path)) => {
                warn!(
                    "{}: line {}: cfgfile directive not supported, skipping {}",
                    filename,
                    state.line_no,
                    path.trim()
                );
            }
            _ if layer_bits != 0 => {
                // Pattern row: columns run west to east (z = scale-1 down
                // to 0), rows advance north to south (x).
                for (i, c) in line.chars().enumerate() {
                    if i >= scale as usize {
                        break;
                    }
                    if c == '*' {
                        for y in 0..scale {
                            if layer_bits & (1 << y) != 0 {
                                for &idx in &last_volumetric {
                                    ctx.models.modify(idx, |m| {
                                        if let HDBlockModel::Volumetric(v) = m {
                                            v.set_subblock(row_num, y, scale - i as u32 - 1, true);
                                        }
                                    });
                                }
                            }
                        }
                    }
                }
                row_num += 1;
                if row_num >= scale {
                    row_num = 0;
                    layer_bits = 0;
                }
            }
            _ => {}
        }
    }
    info!("Loaded {} block models from {}", count, filename);
    Ok(count)
}

/// Resolve directive targets to global state indices, logging unknown
/// block names without failing the file.
fn target_states(
    states: &BlockStateTable,
    names: &[String],
    databits: &DataBits,
    filename: &str,
    line_no: usize,
) -> Vec<u32> {
    let mut out = Vec::new();
    for name in names {
        match states.variant_count(name) {
            Some(count) => {
                for v in databits.variants(count) {
                    if let Some(idx) = states.state_index(name, v) {
                        out.push(idx);
                    }
                }
            }
            None => error!("{}: line {}: invalid block name {}", filename, line_no, name),
        }
    }
    out
}

/// OR a rotated copy of `src` occupancy into `dst`.
fn rotate_into(src: &VolumetricModel, dst: &mut VolumetricModel, scale: u32, rot: i32) {
    for x in 0..scale {
        for y in 0..scale {
            for z in 0..scale {
                if !src.is_subblock_set(x, y, z) {
                    continue;
                }
                match rot.rem_euclid(360) {
                    0 => dst.set_subblock(x, y, z, true),
                    90 => dst.set_subblock(scale - z - 1, y, x, true),
                    180 => dst.set_subblock(scale - x - 1, y, scale - z - 1, true),
                    270 => dst.set_subblock(z, y, scale - x - 1, true),
                    _ => {}
                }
            }
        }
    }
}

fn parse_patch(
    args: &str,
    patch_defs: &mut HashMap<String, PatchDefinition>,
    state: &mut ParserState<'_>,
) -> Result<()> {
    let mut id = None;
    let mut origin = glam::DVec3::new(0.0, 0.0, 0.0);
    let mut u_point = glam::DVec3::new(0.0, 1.0, 0.0);
    let mut v_point = glam::DVec3::new(1.0, 0.0, 0.0);
    let (mut umin, mut umax) = (0.0f64, 1.0f64);
    let (mut vmin, mut vmax) = (0.0f64, 1.0f64);
    let mut vmax_at_umax = -1.0f64;
    let mut vmin_at_umax = -1.0f64;
    let mut uplusvmax = -1.0f64;
    let mut side_visible = SideVisible::Both;
    for (key, value) in split_fields(args) {
        if key == "id" {
            id = Some(value.to_string());
            continue;
        }
        if key == "visibility" {
            side_visible = SideVisible::parse(value);
            continue;
        }
        let num: f64 = value
            .parse()
            .map_err(|_| state.err(format!("invalid patch field {key}={value}")))?;
        match key {
            "Ox" => origin.x = num,
            "Oy" => origin.y = num,
            "Oz" => origin.z = num,
            "Ux" => u_point.x = num,
            "Uy" => u_point.y = num,
            "Uz" => u_point.z = num,
            "Vx" => v_point.x = num,
            "Vy" => v_point.y = num,
            "Vz" => v_point.z = num,
            "Umin" => umin = num,
            "Umax" => umax = num,
            "Vmin" => vmin = num,
            "Vmax" => vmax = num,
            "UplusVmax" => {
                warn!(
                    "{}: line {}: UplusVmax deprecated - use VmaxAtUMax",
                    state.filename, state.line_no
                );
                uplusvmax = num;
            }
            "VmaxAtUMax" => vmax_at_umax = num,
            "VminAtUMax" => vmin_at_umax = num,
            _ => {}
        }
    }
    if uplusvmax >= 0.0 {
        umax = uplusvmax;
        vmax = uplusvmax;
        vmax_at_umax = 0.0;
    }
    if vmax_at_umax < 0.0 {
        vmax_at_umax = vmax;
    }
    if vmin_at_umax < 0.0 {
        vmin_at_umax = vmin;
    }
    if let Some(id) = id {
        if let Some(pd) = PatchDefinition::new(
            origin,
            u_point,
            v_point,
            umin,
            umax,
            vmin,
            vmin_at_umax,
            vmax,
            vmax_at_umax,
            side_visible,
            0,
        ) {
            patch_defs.insert(id, pd);
        }
    }
    Ok(())
}

/// Parse `box=xmin:xmax:ymin:ymax:zmin:zmax:p0/p1/.../p5` where trailing
/// fields are optional and default to the full cube on slot 0.
fn parse_box_limits(value: &str, state: &ParserState<'_>) -> Result<BoxLimits> {
    let mut limits = BoxLimits::default();
    let fields: Vec<&str> = value.split(':').collect();
    let bound = |s: &str| -> Result<f64> {
        s.parse().map_err(|_| state.err(format!("invalid box bound {s}")))
    };
    if !fields.is_empty() {
        limits.xmin = bound(fields[0])?;
    }
    if fields.len() > 1 {
        limits.xmax = bound(fields[1])?;
    }
    if fields.len() > 2 {
        limits.ymin = bound(fields[2])?;
    }
    if fields.len() > 3 {
        limits.ymax = bound(fields[3])?;
    }
    if fields.len() > 4 {
        limits.zmin = bound(fields[4])?;
    }
    if fields.len() > 5 {
        limits.zmax = bound(fields[5])?;
    }
    if fields.len() > 6 {
        for (i, p) in fields[6].split('/').take(6).enumerate() {
            limits.patches[i] = p
                .parse()
                .map_err(|_| state.err(format!("invalid box patch index {p}")))?;
        }
    }
    Ok(limits)
}

/// Parse a `patchN` / `patchN-M` / `faceN-M` index suffix.
pub(super) fn parse_index_range(s: &str, state: &ParserState<'_>) -> Result<(usize, usize)> {
    let (lo, hi) = match s.split_once('-') {
        Some((a, b)) => (
            a.parse::<i32>().map_err(|_| state.err("invalid index"))?,
            b.parse::<i32>().map_err(|_| state.err("invalid index"))?,
        ),
        None => {
            let v = s.parse::<i32>().map_err(|_| state.err("invalid index"))?;
            (v, v)
        }
    };
    if lo < 0 || hi < lo {
        return Err(state.err(format!("invalid index range {s}")));
    }
    Ok((lo as usize, hi as usize))
}

/// Handle a `var:` line: `name=default` pairs, with configuration
/// overrides taking precedence over the file's defaults.
pub(super) fn parse_vars(
    args: &str,
    config: &RenderConfig,
    state: &mut ParserState<'_>,
) -> Result<()> {
    for pair in args.trim().split(',') {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| state.err("format error"))?;
        let default: i32 = value
            .trim()
            .parse()
            .map_err(|_| state.err("format error"))?;
        let value = config.variables.get(name.trim()).copied().unwrap_or(default);
        state.vars.set(name.trim(), value);
    }
    Ok(())
}

/// Handle a `modname:` line: names with optional `[range]` version limits.
/// Returns false when no named mod is present (skip the file); a name
/// already covered by an earlier file also skips.
pub(super) fn match_modname(
    args: &str,
    loaded_mods: &mut HashSet<String>,
    state: &mut ParserState<'_>,
) -> bool {
    for entry in args.split(',') {
        let entry = entry.trim();
        let (name, range) = match entry.split_once('[') {
            Some((n, r)) => (n.trim(), Some(r.trim_end_matches(']').trim())),
            None => (entry, None),
        };
        if loaded_mods.contains(name) {
            return false;
        }
        if let Some(ver) = state.mod_versions.get(name) {
            if range.map_or(true, |r| super::check_version_range(ver, r)) {
                info!("{}[{}] definitions enabled", name, ver);
                state.mod_id = name.to_string();
                state.mod_version = Some(ver.clone());
                loaded_mods.insert(name.to_string());
                return true;
            }
        }
    }
    false
}

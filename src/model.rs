//! Block geometry models: voxel-occupancy grids and polygon patches.
//!
//! A block either renders as a full cube (no model), as a `Volumetric`
//! occupancy grid at some NxNxN subdivision (stairs, slabs, fences), or as
//! a `Patch` model made of textured quads positioned in the unit cube
//! (rails, torches, custom geometry). Models are keyed by global block
//! state index and tagged with the blockset that defined them, so a reload
//! of one definition source invalidates only its own blocks.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use glam::DVec3;

use crate::types::BlockStep;

/// Which side of a patch plane renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideVisible {
    #[default]
    Both,
    Top,
    Bottom,
    /// Both sides render, with U mirrored on the back side.
    Flip,
}

impl SideVisible {
    pub fn parse(s: &str) -> SideVisible {
        match s {
            "top" => SideVisible::Top,
            "bottom" => SideVisible::Bottom,
            "flip" => SideVisible::Flip,
            _ => SideVisible::Both,
        }
    }
}

/// A textured quad in block-local coordinates.
///
/// The plane is spanned by the points `origin`, `u_point` (U=1) and
/// `v_point` (V=1); `umin..umax` and `vmin..vmax` clip the quad within the
/// plane. `vmin_at_umax`/`vmax_at_umax` let the V limits slope linearly
/// across U for triangular patches. `texture_index` selects the texture
/// slot the mapping file binds for this patch.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchDefinition {
    pub origin: DVec3,
    pub u_point: DVec3,
    pub v_point: DVec3,
    pub umin: f64,
    pub umax: f64,
    pub vmin: f64,
    pub vmax: f64,
    pub vmin_at_umax: f64,
    pub vmax_at_umax: f64,
    pub side_visible: SideVisible,
    pub texture_index: usize,
    /// Step direction of a ray that hits the front of this patch, derived
    /// from the plane normal.
    pub step: BlockStep,
}

impl PatchDefinition {
    /// Build a patch, validating that the plane is non-degenerate and the
    /// UV limits are ordered. Returns `None` for unusable definitions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        origin: DVec3,
        u_point: DVec3,
        v_point: DVec3,
        umin: f64,
        umax: f64,
        vmin: f64,
        vmin_at_umax: f64,
        vmax: f64,
        vmax_at_umax: f64,
        side_visible: SideVisible,
        texture_index: usize,
    ) -> Option<PatchDefinition> {
        let du = u_point - origin;
        let dv = v_point - origin;
        let normal = du.cross(dv);
        if !normal.is_finite() || normal.length_squared() < 1.0e-12 {
            return None;
        }
        if umin > umax || vmin > vmax || vmin_at_umax > vmax_at_umax {
            return None;
        }
        Some(PatchDefinition {
            origin,
            u_point,
            v_point,
            umin,
            umax,
            vmin,
            vmax,
            vmin_at_umax,
            vmax_at_umax,
            side_visible,
            texture_index,
            step: step_from_normal(normal),
        })
    }

    pub fn with_texture(&self, texture_index: usize) -> PatchDefinition {
        let mut p = self.clone();
        p.texture_index = texture_index;
        p
    }

    /// Rotate around the block center by the given degrees, applied X then
    /// Y then Z. Used by `patchrotate:` to derive facing variants.
    pub fn rotated(&self, rot_x: f64, rot_y: f64, rot_z: f64, texture_index: usize) -> Option<PatchDefinition> {
        let center = DVec3::splat(0.5);
        let rot = glam::DMat3::from_rotation_z(rot_z.to_radians())
            * glam::DMat3::from_rotation_y(rot_y.to_radians())
            * glam::DMat3::from_rotation_x(rot_x.to_radians());
        let xf = |p: DVec3| rot * (p - center) + center;
        PatchDefinition::new(
            xf(self.origin),
            xf(self.u_point),
            xf(self.v_point),
            self.umin,
            self.umax,
            self.vmin,
            self.vmin_at_umax,
            self.vmax,
            self.vmax_at_umax,
            self.side_visible,
            texture_index,
        )
    }

    /// V limits at a given U position, interpolated for sloped patches.
    pub fn v_limits_at(&self, u: f64) -> (f64, f64) {
        let t = if self.umax > self.umin {
            (u - self.umin) / (self.umax - self.umin)
        } else {
            0.0
        };
        (
            self.vmin + t * (self.vmin_at_umax - self.vmin),
            self.vmax + t * (self.vmax_at_umax - self.vmax),
        )
    }
}

fn step_from_normal(n: DVec3) -> BlockStep {
    let ax = n.x.abs();
    let ay = n.y.abs();
    let az = n.z.abs();
    if ax >= ay && ax >= az {
        // A ray that sees the +X-facing front travels in -X.
        if n.x >= 0.0 { BlockStep::XMinus } else { BlockStep::XPlus }
    } else if ay >= az {
        if n.y >= 0.0 { BlockStep::YMinus } else { BlockStep::YPlus }
    } else if n.z >= 0.0 {
        BlockStep::ZMinus
    } else {
        BlockStep::ZPlus
    }
}

/// Texture-slot assignment for the six faces of a generated box, in face
/// order bottom, top, xmin, xmax, zmin, zmax. The defaults are the step
/// ordinals of the ray directions that see each face, matching how full
/// cubes index their face textures.
pub const BOX_PATCH_SLOTS: [usize; 6] = [1, 4, 0, 3, 2, 5];

/// Axis-aligned box bounds inside the unit cube, with per-face texture
/// slots. Defaults span the full cube with every face on slot 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxLimits {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
    pub patches: [usize; 6],
}

impl Default for BoxLimits {
    fn default() -> Self {
        BoxLimits {
            xmin: 0.0,
            xmax: 1.0,
            ymin: 0.0,
            ymax: 1.0,
            zmin: 0.0,
            zmax: 1.0,
            patches: [0; 6],
        }
    }
}

/// Generate the six patches of a rectangular prism. Each face lies on a
/// full unit plane with the UV limits clipping to the box, oriented so
/// textures read unmirrored from outside.
pub fn add_box(out: &mut Vec<PatchDefinition>, b: &BoxLimits) {
    let faces = [
        // bottom
        (
            DVec3::new(0.0, b.ymin, 0.0),
            DVec3::new(1.0, b.ymin, 0.0),
            DVec3::new(0.0, b.ymin, 1.0),
            b.xmin, b.xmax, b.zmin, b.zmax,
            b.patches[0],
        ),
        // top
        (
            DVec3::new(0.0, b.ymax, 1.0),
            DVec3::new(1.0, b.ymax, 1.0),
            DVec3::new(0.0, b.ymax, 0.0),
            b.xmin, b.xmax, 1.0 - b.zmax, 1.0 - b.zmin,
            b.patches[1],
        ),
        // xmin side
        (
            DVec3::new(b.xmin, 0.0, 0.0),
            DVec3::new(b.xmin, 0.0, 1.0),
            DVec3::new(b.xmin, 1.0, 0.0),
            b.zmin, b.zmax, b.ymin, b.ymax,
            b.patches[2],
        ),
        // xmax side
        (
            DVec3::new(b.xmax, 0.0, 1.0),
            DVec3::new(b.xmax, 0.0, 0.0),
            DVec3::new(b.xmax, 1.0, 1.0),
            1.0 - b.zmax, 1.0 - b.zmin, b.ymin, b.ymax,
            b.patches[3],
        ),
        // zmin side
        (
            DVec3::new(1.0, 0.0, b.zmin),
            DVec3::new(0.0, 0.0, b.zmin),
            DVec3::new(1.0, 1.0, b.zmin),
            1.0 - b.xmax, 1.0 - b.xmin, b.ymin, b.ymax,
            b.patches[4],
        ),
        // zmax side
        (
            DVec3::new(0.0, 0.0, b.zmax),
            DVec3::new(1.0, 0.0, b.zmax),
            DVec3::new(0.0, 1.0, b.zmax),
            b.xmin, b.xmax, b.ymin, b.ymax,
            b.patches[5],
        ),
    ];
    for (origin, u_pt, v_pt, umin, umax, vmin, vmax, slot) in faces {
        if let Some(pd) = PatchDefinition::new(
            origin,
            u_pt,
            v_pt,
            umin,
            umax,
            vmin,
            vmin,
            vmax,
            vmax,
            SideVisible::Top,
            slot,
        ) {
            out.push(pd);
        }
    }
}

/// NxNxN voxel occupancy grid. Coordinates run x north-to-south, z
/// west-to-east, y bottom-to-top.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumetricModel {
    scale: u32,
    bits: Vec<u64>,
}

impl VolumetricModel {
    pub fn new(scale: u32) -> VolumetricModel {
        let cells = (scale as usize).pow(3);
        VolumetricModel {
            scale,
            bits: vec![0; cells.div_ceil(64)],
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        (((y * self.scale) + z) * self.scale + x) as usize
    }

    pub fn set_subblock(&mut self, x: u32, y: u32, z: u32, filled: bool) {
        let i = self.index(x, y, z);
        if filled {
            self.bits[i / 64] |= 1 << (i % 64);
        } else {
            self.bits[i / 64] &= !(1 << (i % 64));
        }
    }

    pub fn is_subblock_set(&self, x: u32, y: u32, z: u32) -> bool {
        let i = self.index(x, y, z);
        (self.bits[i / 64] >> (i % 64)) & 1 != 0
    }

    /// Resample the occupancy to another resolution. A target cell is
    /// occupied when at least half its volume is covered by occupied
    /// source cells.
    pub fn scaled_map(&self, res: u32) -> VolumetricModel {
        if res == self.scale {
            return self.clone();
        }
        let mut out = VolumetricModel::new(res);
        let s = self.scale as f64;
        let r = res as f64;
        // Per-axis overlap of destination cell d with source cell c, in
        // destination-cell units.
        let overlap = |d: u32, c: u32| -> f64 {
            let lo = (c as f64 * r / s).max(d as f64);
            let hi = ((c as f64 + 1.0) * r / s).min(d as f64 + 1.0);
            (hi - lo).max(0.0)
        };
        let range = |d: u32| -> std::ops::Range<u32> {
            let lo = (d as f64 * s / r).floor() as u32;
            let hi = (((d as f64 + 1.0) * s / r).ceil() as u32).min(self.scale);
            lo..hi
        };
        for dy in 0..res {
            for dz in 0..res {
                for dx in 0..res {
                    let mut vol = 0.0;
                    for sy in range(dy) {
                        let wy = overlap(dy, sy);
                        for sz in range(dz) {
                            let wz = overlap(dz, sz);
                            for sx in range(dx) {
                                if self.is_subblock_set(sx, sy, sz) {
                                    vol += wy * wz * overlap(dx, sx);
                                }
                            }
                        }
                    }
                    if vol >= 0.5 {
                        out.set_subblock(dx, dy, dz, true);
                    }
                }
            }
        }
        out
    }
}

/// A patch model: an ordered array of quads, indexed by texture slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchModel {
    pub patches: Vec<PatchDefinition>,
}

/// A model delegated to a named custom renderer with keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomModel {
    pub class: String,
    pub args: HashMap<String, String>,
    pub patches: Vec<PatchDefinition>,
    pub texture_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HDBlockModel {
    Volumetric(VolumetricModel),
    Patch(PatchModel),
    Custom(CustomModel),
}

impl HDBlockModel {
    /// Number of texture slots the model samples from.
    pub fn required_textures(&self) -> usize {
        match self {
            HDBlockModel::Volumetric(_) => 6,
            HDBlockModel::Patch(p) => p.patches.len(),
            HDBlockModel::Custom(c) => c.texture_count,
        }
    }
}

struct ModelEntry {
    model: Arc<HDBlockModel>,
    blockset: String,
}

/// Registry of models keyed by global block state index.
#[derive(Default)]
pub struct BlockModels {
    by_state: HashMap<u32, ModelEntry>,
    change_ignored: HashSet<u32>,
    max_patches: usize,
    scaled_cache: Mutex<HashMap<u32, Arc<HashMap<u32, VolumetricModel>>>>,
}

impl BlockModels {
    pub fn new() -> BlockModels {
        BlockModels::default()
    }

    pub fn insert(&mut self, state_index: u32, model: HDBlockModel, blockset: &str) {
        if let HDBlockModel::Patch(ref p) = model {
            self.max_patches = self.max_patches.max(p.patches.len());
        }
        if let HDBlockModel::Custom(ref c) = model {
            self.max_patches = self.max_patches.max(c.texture_count);
        }
        self.by_state.insert(
            state_index,
            ModelEntry {
                model: Arc::new(model),
                blockset: blockset.to_string(),
            },
        );
        self.scaled_cache.lock().map(|mut c| c.clear()).ok();
    }

    pub fn get(&self, state_index: u32) -> Option<&Arc<HDBlockModel>> {
        self.by_state.get(&state_index).map(|e| &e.model)
    }

    /// Mutate a registered model in place. Pattern rows and rotation
    /// directives edit models already entered in the table.
    pub fn modify(&mut self, state_index: u32, f: impl FnOnce(&mut HDBlockModel)) -> bool {
        match self.by_state.get_mut(&state_index) {
            Some(entry) => {
                f(Arc::make_mut(&mut entry.model));
                self.scaled_cache.lock().map(|mut c| c.clear()).ok();
                true
            }
            None => false,
        }
    }

    pub fn set_change_ignored(&mut self, state_index: u32) {
        self.change_ignored.insert(state_index);
    }

    pub fn is_change_ignored(&self, state_index: u32) -> bool {
        self.change_ignored.contains(&state_index)
    }

    /// Largest patch/texture-slot count across all models, sizing the
    /// per-block texture arrays in the mapping tables.
    /// Iterate (state index, model) over every registered model.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Arc<HDBlockModel>)> {
        self.by_state.iter().map(|(&idx, e)| (idx, &e.model))
    }

    pub fn max_patches(&self) -> usize {
        self.max_patches
    }

    pub fn len(&self) -> usize {
        self.by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }

    /// Drop every model owned by a blockset, ahead of reloading it.
    pub fn reset_blockset(&mut self, blockset: &str) {
        self.by_state.retain(|_, e| e.blockset != blockset);
        self.scaled_cache.lock().map(|mut c| c.clear()).ok();
    }

    /// Volumetric models resampled to the given render resolution, cached
    /// per resolution.
    pub fn models_for_scale(&self, res: u32) -> Arc<HashMap<u32, VolumetricModel>> {
        if let Ok(cache) = self.scaled_cache.lock() {
            if let Some(hit) = cache.get(&res) {
                return Arc::clone(hit);
            }
        }
        let mut scaled = HashMap::new();
        for (&idx, entry) in &self.by_state {
            if let HDBlockModel::Volumetric(ref v) = *entry.model {
                scaled.insert(idx, v.scaled_map(res));
            }
        }
        let scaled = Arc::new(scaled);
        if let Ok(mut cache) = self.scaled_cache.lock() {
            cache.insert(res, Arc::clone(&scaled));
        }
        scaled
    }
}

//! Per-pixel color resolution.
//!
//! [`resolve_color`] is the render hot path, invoked once per visible
//! block-face pixel: pick the face slot's tile, map the surface point to
//! tile UV, apply the bound texture op's UV transform, sample, and blend in
//! biome or custom tinting. It never errors and never does I/O; out-of-range
//! UV clamps and missing tiles sample transparent.

use crate::mapping::{BlockTextureMap, TextureMaps, TextureOp};
use crate::pack::biome::{BiomeRamp, COLOR_MULT_BIRCH, COLOR_MULT_LILY, COLOR_MULT_PINE};
use crate::pack::TexturePack;
use crate::registry::BLANK_TILE;
use crate::types::{BlockState, BlockStep, Color};
use crate::world::MapIterator;

/// Standard tiles the grass-side substitution swaps in. Unset slots sample
/// transparent, which degrades to the plain side texture.
#[derive(Debug, Clone, Copy)]
pub struct StdTiles {
    /// Full snow block texture.
    pub snow: i32,
    /// Grass side with snow overlay.
    pub snow_side: i32,
    /// Grass top, used for better-grass sides.
    pub grass_top: i32,
}

impl Default for StdTiles {
    fn default() -> Self {
        StdTiles {
            snow: BLANK_TILE,
            snow_side: BLANK_TILE,
            grass_top: BLANK_TILE,
        }
    }
}

/// Immutable per-render-pass inputs shared by every pixel.
pub struct ResolveContext<'a> {
    pub pack: &'a TexturePack,
    pub maps: &'a TextureMaps,
    pub biome_shading: bool,
    pub water_biome_shading: bool,
    pub swamp_shading: bool,
    pub better_grass: bool,
    pub std_tiles: StdTiles,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        pack: &'a TexturePack,
        maps: &'a TextureMaps,
        config: &crate::config::RenderConfig,
    ) -> ResolveContext<'a> {
        ResolveContext {
            pack,
            maps,
            biome_shading: config.biome_shading,
            water_biome_shading: config.water_biome_shading,
            swamp_shading: config.swamp_shading,
            better_grass: config.better_grass,
            std_tiles: StdTiles::default(),
        }
    }

    fn swamp_grass(&self) -> Option<&BiomeRamp> {
        if self.swamp_shading {
            self.pack.swamp_grass_ramp()
        } else {
            None
        }
    }

    fn swamp_foliage(&self) -> Option<&BiomeRamp> {
        if self.swamp_shading {
            self.pack.swamp_foliage_ramp()
        } else {
            None
        }
    }
}

/// Where on the block surface the ray landed.
#[derive(Debug, Clone, Copy)]
pub enum SurfaceCoord {
    /// Sub-block cell hit on a full-cube face, components in `0..scale`.
    Subblock([i32; 3]),
    /// Patch-model hit: the patch's face slot plus fractional patch UV.
    Patch { index: usize, u: f64, v: f64 },
}

/// One surface hit to resolve a color for.
#[derive(Debug, Clone)]
pub struct SurfacePoint<'a> {
    /// Step direction the ray took entering the block.
    pub step: BlockStep,
    pub coord: SurfaceCoord,
    /// True when the hit lies exactly on the block boundary face.
    pub on_face: bool,
    /// Last surface the ray hit before this one, for clear-inside checks.
    pub last_hit: &'a BlockState,
}

/// Floor that stays exact for the small magnitudes UV math produces,
/// without a branch on sign.
#[inline]
fn fast_floor(f: f64) -> i32 {
    ((f + 1_000_000_000.0) as i32) - 1_000_000_000
}

/// In-tile rotation/mirror for the orientation ops. Toned variants share
/// their rotation with the plain op of the same angle.
#[inline]
fn rotate_uv(op: TextureOp, u: i32, v: i32, scale: i32) -> (i32, i32) {
    match op {
        TextureOp::Rot90 => (scale - v - 1, u),
        TextureOp::Rot180 => (scale - u - 1, scale - v - 1),
        TextureOp::Rot270
        | TextureOp::GrassToned270
        | TextureOp::FoliageToned270
        | TextureOp::WaterToned270 => (v, scale - u - 1),
        TextureOp::FlipHoriz => (scale - u - 1, v),
        _ => (u, v),
    }
}

/// Face-dependent mapping from sub-block cell to tile UV. U runs left to
/// right, V top to bottom, as seen looking at the face from outside.
fn face_uv(step: BlockStep, xyz: [i32; 3], scale: i32, std_rot: bool) -> (i32, i32) {
    let [x, y, z] = xyz;
    match step {
        BlockStep::XMinus => (scale - z - 1, scale - y - 1),
        BlockStep::XPlus => (z, scale - y - 1),
        BlockStep::ZMinus => (x, scale - y - 1),
        BlockStep::ZPlus => (scale - x - 1, scale - y - 1),
        BlockStep::YMinus => {
            if std_rot {
                (x, z)
            } else {
                (scale - z - 1, x)
            }
        }
        BlockStep::YPlus => {
            if std_rot {
                (scale - x - 1, z)
            } else {
                (z, x)
            }
        }
    }
}

/// Resolve the color of one surface hit. Walks the face's layer chain while
/// samples come back transparent.
pub fn resolve_color(
    ctx: &ResolveContext<'_>,
    iter: &dyn MapIterator,
    point: &SurfacePoint<'_>,
) -> Color {
    let map = ctx.maps.get(iter.block().global_index);
    let mut face = match point.coord {
        SurfaceCoord::Patch { index, .. } => index,
        SurfaceCoord::Subblock(_) => point.step.ordinal(),
    };
    let mut color = read_face(ctx, iter, point, map, face);
    // The chain length bounds the retries; a malformed self-referencing
    // chain must not hang the renderer.
    let mut remaining = map.faces.len();
    while color.is_transparent() && remaining > 0 {
        match map.next_layer(face) {
            Some(next) => {
                face = next;
                color = read_face(ctx, iter, point, map, face);
            }
            None => break,
        }
        remaining -= 1;
    }
    color
}

fn read_face(
    ctx: &ResolveContext<'_>,
    iter: &dyn MapIterator,
    point: &SurfacePoint<'_>,
    map: &BlockTextureMap,
    face: usize,
) -> Color {
    let tex = map.face(face);
    if tex.is_blank() {
        return Color::TRANSPARENT;
    }
    let mut tile = tex.tile;
    let mut op = tex.op;
    let scale = ctx.pack.native_scale() as i32;

    let (mut u, mut v) = match point.coord {
        SurfaceCoord::Patch { u, v, .. } => (
            fast_floor(u * scale as f64),
            scale - fast_floor(v * scale as f64) - 1,
        ),
        SurfaceCoord::Subblock(xyz) => face_uv(point.step, xyz, scale, map.std_rot),
    };

    if matches!(op, TextureOp::ClearInside | TextureOp::MultTonedClearInside) {
        let blk = iter.block();
        let last = point.last_hit;
        // Interior faces between matching blocks (or two water-filled
        // blocks meeting exactly on the boundary) are invisible.
        if blk.is_same_base(last)
            || (blk.is_water_filled() && last.is_water_filled() && point.on_face)
        {
            return Color::TRANSPARENT;
        }
        op = if blk.is_water() {
            TextureOp::WaterToned
        } else if op == TextureOp::MultTonedClearInside {
            TextureOp::MultToned
        } else {
            TextureOp::None
        };
    }

    match op {
        TextureOp::Rot90
        | TextureOp::Rot180
        | TextureOp::Rot270
        | TextureOp::GrassToned270
        | TextureOp::FoliageToned270
        | TextureOp::WaterToned270
        | TextureOp::FlipHoriz => {
            (u, v) = rotate_uv(op, u, v, scale);
        }
        TextureOp::ShiftDownHalf => {
            if v < scale / 2 {
                return Color::TRANSPARENT;
            }
            v -= scale / 2;
        }
        TextureOp::ShiftDownHalfAndFlip => {
            if v < scale / 2 {
                return Color::TRANSPARENT;
            }
            v -= scale / 2;
            u = scale - u - 1;
        }
        TextureOp::InclinedTorch => {
            if v >= 3 * scale / 4 {
                return Color::TRANSPARENT;
            }
            v += scale / 4;
            u = u.clamp(scale / 2 - 1, scale / 2);
        }
        TextureOp::GrassSide => {
            let mut grass_below_neighbor = false;
            let mut snow_beside = false;
            if ctx.better_grass {
                let toward_viewer = point.step.opposite();
                snow_beside = iter.block_at(toward_viewer).is_snow();
                grass_below_neighbor =
                    iter.block_at2(toward_viewer, BlockStep::YMinus).is_grass();
            }
            if iter.block_at(BlockStep::YPlus).is_snow() {
                tile = if snow_beside {
                    ctx.std_tiles.snow
                } else {
                    ctx.std_tiles.snow_side
                };
                op = TextureOp::None;
            } else if grass_below_neighbor {
                tile = ctx.std_tiles.grass_top;
                op = TextureOp::GrassToned;
            } else if let Some(mask) = ctx.pack.grass_mask_tile() {
                // Overlay pixels present in the mask get grass toning; the
                // rest keep the plain side texture.
                if !ctx.pack.read_tile_pixel(mask as i32, u, v).is_transparent() {
                    tile = mask as i32;
                    op = TextureOp::GrassToned;
                } else {
                    op = TextureOp::None;
                }
            } else {
                op = TextureOp::None;
            }
        }
        TextureOp::LilyToned => {
            // Lily pads rotate per position; the hash matches the client's
            // pad renderer so maps agree with in-game orientation.
            let l1 = ((iter.x() as i64).wrapping_mul(0x2fc20f))
                ^ ((iter.z() as i64).wrapping_mul(0x6ebfff5))
                ^ (iter.y() as i64);
            let l1 = l1
                .wrapping_mul(l1)
                .wrapping_mul(0x285b825)
                .wrapping_add(l1.wrapping_mul(11));
            match (l1 >> 16) & 3 {
                0 => {
                    let tmp = u;
                    u = scale - v - 1;
                    v = tmp;
                }
                1 => {
                    u = scale - u - 1;
                    v = scale - v - 1;
                }
                2 => {
                    let tmp = u;
                    u = v;
                    v = scale - tmp - 1;
                }
                _ => {}
            }
        }
        _ => {}
    }

    let mut color = ctx.pack.read_tile_pixel(tile, u, v);

    // Per-block colormap tinting replaces op-based toning when present.
    let custom_ramp = if ctx.biome_shading {
        ctx.maps
            .coloring()
            .get(iter.block().global_index)
            .and_then(|h| ctx.pack.ramp_for_file(h))
    } else {
        None
    };

    let mut color_alpha = 0xFF00_0000u32;
    let mult: Option<u32> = if let Some(ramp) = custom_ramp {
        Some(iter.smooth_water_multiplier(Some(ramp)))
    } else {
        match op {
            TextureOp::GrassToned | TextureOp::GrassToned270 => Some(if ctx.biome_shading {
                iter.smooth_grass_multiplier(ctx.pack.grass_ramp(), ctx.swamp_grass())
            } else {
                ctx.pack.grass_ramp().trivial_color() & 0x00FF_FFFF
            }),
            TextureOp::FoliageToned | TextureOp::FoliageToned270 => Some(if ctx.biome_shading {
                iter.smooth_foliage_multiplier(ctx.pack.foliage_ramp(), ctx.swamp_foliage())
            } else {
                ctx.pack.foliage_ramp().trivial_color() & 0x00FF_FFFF
            }),
            TextureOp::FoliageMultToned => {
                let foliage = if ctx.biome_shading {
                    iter.smooth_foliage_multiplier(ctx.pack.foliage_ramp(), ctx.swamp_foliage())
                } else {
                    ctx.pack.foliage_ramp().trivial_color() & 0x00FF_FFFF
                };
                let other = match &map.cust_color_mult {
                    Some(cust) => cust.color_multiplier(iter),
                    None => map.color_mult,
                };
                Some(((foliage & 0xFEFEFE) + (other & 0x00FF_FFFF)) / 2)
            }
            TextureOp::WaterToned | TextureOp::WaterToned270 => {
                if ctx.pack.water_ramp().is_loaded() {
                    Some(if ctx.water_biome_shading {
                        iter.smooth_water_multiplier(Some(ctx.pack.water_ramp()))
                    } else {
                        ctx.pack.water_ramp().trivial_color() & 0x00FF_FFFF
                    })
                } else if ctx.water_biome_shading {
                    Some(iter.smooth_water_multiplier(None))
                } else {
                    None
                }
            }
            TextureOp::BirchToned => Some(match ctx.pack.birch_ramp() {
                Some(ramp) if ctx.biome_shading => {
                    iter.smooth_foliage_multiplier(ramp, ctx.swamp_foliage())
                }
                _ => COLOR_MULT_BIRCH,
            }),
            TextureOp::PineToned => Some(match ctx.pack.pine_ramp() {
                Some(ramp) if ctx.biome_shading => {
                    iter.smooth_foliage_multiplier(ramp, ctx.swamp_foliage())
                }
                _ => COLOR_MULT_PINE,
            }),
            TextureOp::LilyToned => Some(COLOR_MULT_LILY),
            TextureOp::MultToned => {
                let m = match &map.cust_color_mult {
                    Some(cust) => cust.color_multiplier(iter),
                    None => map.color_mult,
                };
                if m & 0xFF00_0000 != 0 {
                    color_alpha = m & 0xFF00_0000;
                }
                Some(m & 0x00FF_FFFF)
            }
            _ => None,
        }
    };

    if let Some(m) = mult {
        if m != 0 {
            color = color.blend_argb((m & 0x00FF_FFFF) | color_alpha);
        }
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::mapping::{TextureRef, BLANK_REF};
    use crate::pack::biome::BiomeInfo;
    use crate::pack::texture::LoadedImage;
    use crate::world::StaticMapIterator;

    // One 4x4 tile per entry, every pixel distinct: channels encode
    // (tile, v, u) so UV mapping is observable in the sampled color.
    fn gradient_pack(tile_count: usize) -> TexturePack {
        let mut pack = TexturePack::empty(4, tile_count);
        for t in 0..tile_count {
            let mut buf = vec![0u32; 16];
            for (i, px) in buf.iter_mut().enumerate() {
                *px = 0xFF00_0000 | ((t as u32) << 16) | (((i / 4) as u32) << 8) | ((i % 4) as u32);
            }
            pack.set_tile_for_test(t as u32, buf);
        }
        pack
    }

    fn uniform_ramp(argb: u32) -> BiomeRamp {
        BiomeRamp::from_image(&LoadedImage {
            width: 16,
            height: 16,
            argb: vec![argb; 256],
        })
    }

    fn cube_map(tile: i32, op: TextureOp) -> TextureMaps {
        let mut maps = TextureMaps::new();
        let mut map = BlockTextureMap::blank();
        map.faces = vec![TextureRef::new(tile, op); 6];
        maps.set(0, Arc::new(map));
        maps
    }

    fn ctx<'a>(pack: &'a TexturePack, maps: &'a TextureMaps) -> ResolveContext<'a> {
        ResolveContext {
            pack,
            maps,
            biome_shading: false,
            water_biome_shading: false,
            swamp_shading: false,
            better_grass: false,
            std_tiles: StdTiles::default(),
        }
    }

    fn block() -> BlockState {
        BlockState::named("minecraft:stone")
    }

    fn point(step: BlockStep, xyz: [i32; 3], last: &BlockState) -> SurfacePoint<'_> {
        SurfacePoint {
            step,
            coord: SurfaceCoord::Subblock(xyz),
            on_face: false,
            last_hit: last,
        }
    }

    #[test]
    fn test_side_face_uv_mapping() {
        let pack = gradient_pack(1);
        let maps = cube_map(0, TextureOp::None);
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let air = BlockState::air();
        // Z- face: u = x, v = scale-y-1.
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [2, 1, 0], &air));
        assert_eq!(c.blue(), 2);
        assert_eq!(c.green(), 2);
        // X+ face: u = z, v = scale-y-1.
        let c = resolve_color(&ctx, &iter, &point(BlockStep::XPlus, [0, 3, 1], &air));
        assert_eq!(c.blue(), 1);
        assert_eq!(c.green(), 0);
    }

    #[test]
    fn test_top_face_stdrot() {
        let pack = gradient_pack(1);
        let air = BlockState::air();
        let iter = StaticMapIterator::new(0, 0, 0, block());

        let maps = cube_map(0, TextureOp::None);
        let c = resolve_color(
            &ctx(&pack, &maps),
            &iter,
            &point(BlockStep::YMinus, [3, 0, 1], &air),
        );
        // Legacy top layout: u = scale-z-1, v = x.
        assert_eq!(c.blue(), 2);
        assert_eq!(c.green(), 3);

        let mut maps = TextureMaps::new();
        let mut map = BlockTextureMap::blank();
        map.faces = vec![TextureRef::new(0, TextureOp::None); 6];
        map.std_rot = true;
        maps.set(0, Arc::new(map));
        let c = resolve_color(
            &ctx(&pack, &maps),
            &iter,
            &point(BlockStep::YMinus, [3, 0, 1], &air),
        );
        // Standard rotation: u = x, v = z.
        assert_eq!(c.blue(), 3);
        assert_eq!(c.green(), 1);
    }

    #[test]
    fn test_rot90_transform() {
        let pack = gradient_pack(1);
        let maps = cube_map(0, TextureOp::Rot90);
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let air = BlockState::air();
        // Z- face at x=1,y=1: base uv (1,2); rot90 maps to (1,1).
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [1, 1, 0], &air));
        assert_eq!(c.blue(), 1);
        assert_eq!(c.green(), 1);
    }

    #[test]
    fn test_rotation_composition() {
        let scale = 16;
        for u in 0..scale {
            for v in 0..scale {
                let mut uv = (u, v);
                for _ in 0..4 {
                    uv = rotate_uv(TextureOp::Rot90, uv.0, uv.1, scale);
                }
                assert_eq!(uv, (u, v), "rot90 four times");

                let once = rotate_uv(TextureOp::Rot180, u, v, scale);
                assert_eq!(rotate_uv(TextureOp::Rot180, once.0, once.1, scale), (u, v));

                let flipped = rotate_uv(TextureOp::FlipHoriz, u, v, scale);
                assert_eq!(
                    rotate_uv(TextureOp::FlipHoriz, flipped.0, flipped.1, scale),
                    (u, v)
                );

                // 90 then 270 cancel out.
                let q = rotate_uv(TextureOp::Rot90, u, v, scale);
                assert_eq!(rotate_uv(TextureOp::Rot270, q.0, q.1, scale), (u, v));
            }
        }
    }

    #[test]
    fn test_patch_uv_and_fast_floor() {
        let pack = gradient_pack(1);
        let maps = cube_map(0, TextureOp::None);
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let air = BlockState::air();
        let p = SurfacePoint {
            step: BlockStep::YMinus,
            coord: SurfaceCoord::Patch {
                index: 0,
                u: 0.6,
                v: 0.3,
            },
            on_face: false,
            last_hit: &air,
        };
        let c = resolve_color(&ctx, &iter, &p);
        // u = floor(0.6*4) = 2; v = 4 - floor(0.3*4) - 1 = 2.
        assert_eq!(c.blue(), 2);
        assert_eq!(c.green(), 2);
        assert_eq!(fast_floor(-0.25), -1);
        assert_eq!(fast_floor(3.99), 3);
    }

    #[test]
    fn test_shift_down_half() {
        let pack = gradient_pack(1);
        let maps = cube_map(0, TextureOp::ShiftDownHalf);
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let air = BlockState::air();
        // Upper half of the face is clipped away.
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [0, 3, 0], &air));
        assert!(c.is_transparent());
        // Lower half samples shifted up: v = 3 becomes 1.
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [0, 0, 0], &air));
        assert_eq!(c.green(), 1);
    }

    #[test]
    fn test_clear_inside_against_matching_block() {
        let pack = gradient_pack(1);
        let maps = cube_map(0, TextureOp::ClearInside);
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let same = block();
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [0, 0, 0], &same));
        assert!(c.is_transparent());
        // A different previous block renders normally.
        let other = BlockState::named("minecraft:dirt");
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [0, 0, 0], &other));
        assert!(!c.is_transparent());
    }

    #[test]
    fn test_layer_chain_retries_until_opaque() {
        let pack = gradient_pack(2);
        let mut maps = TextureMaps::new();
        let mut map = BlockTextureMap::blank();
        map.faces = vec![BLANK_REF; 6];
        map.faces[1] = TextureRef::new(1, TextureOp::None);
        // X- face (ordinal 3) is blank and falls through to face 1.
        map.layers = Some(vec![-1, -1, -1, 1, -1, -1]);
        maps.set(0, Arc::new(map));
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let air = BlockState::air();
        let c = resolve_color(&ctx, &iter, &point(BlockStep::XMinus, [0, 0, 0], &air));
        assert_eq!(c.red(), 1);
    }

    #[test]
    fn test_layer_cycle_terminates() {
        let pack = gradient_pack(1);
        let mut maps = TextureMaps::new();
        let mut map = BlockTextureMap::blank();
        map.layers = Some(vec![0, 0, 0, 0, 0, 0]);
        maps.set(0, Arc::new(map));
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let air = BlockState::air();
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [0, 0, 0], &air));
        assert!(c.is_transparent());
    }

    #[test]
    fn test_grass_toned_uses_override_multiplier() {
        let pack = gradient_pack(1);
        let maps = cube_map(0, TextureOp::GrassToned);
        let mut ctx = ctx(&pack, &maps);
        ctx.biome_shading = true;
        let mut biome = BiomeInfo::default();
        biome.grass_mult = Some(0x00FF00);
        let iter = StaticMapIterator::new(0, 0, 0, block()).with_biome(biome);
        let air = BlockState::air();
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [1, 1, 0], &air));
        // Red and blue multiplied to zero, green kept.
        assert_eq!(c.red(), 0);
        assert_eq!(c.blue(), 0);
        assert_eq!(c.green(), 2);
    }

    #[test]
    fn test_birch_toned_prefers_colormap() {
        let maps = cube_map(0, TextureOp::BirchToned);
        let air = BlockState::air();
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let hit = point(BlockStep::ZMinus, [1, 1, 0], &air);

        // No birch colormap: the fixed constant applies.
        let pack = gradient_pack(1);
        let mut c = ctx(&pack, &maps);
        c.biome_shading = true;
        let fallback = resolve_color(&c, &iter, &hit);

        // A loaded colormap wins while biome shading is on.
        let mut pack = gradient_pack(1);
        pack.set_birch_ramp_for_test(uniform_ramp(0xFF00_FF00));
        let mut c = ctx(&pack, &maps);
        c.biome_shading = true;
        let toned = resolve_color(&c, &iter, &hit);
        assert_eq!(toned.green(), 2);
        assert_eq!(toned.blue(), 0);
        assert_ne!(toned.argb(), fallback.argb());

        // Shading off falls back to the constant despite the colormap.
        let off = resolve_color(&ctx(&pack, &maps), &iter, &hit);
        assert_eq!(off.argb(), fallback.argb());
    }

    #[test]
    fn test_swamp_biome_prefers_swamp_ramp() {
        let mut pack = gradient_pack(1);
        // Regular grass tints blue, the swamp variant green.
        pack.set_grass_ramps_for_test(uniform_ramp(0xFF00_00FF), Some(uniform_ramp(0xFF00_FF00)));
        let maps = cube_map(0, TextureOp::GrassToned);
        let air = BlockState::air();
        let hit = point(BlockStep::ZMinus, [1, 1, 0], &air);
        let mut biome = BiomeInfo::default();
        biome.swampy = true;
        let swampy = StaticMapIterator::new(0, 0, 0, block()).with_biome(biome);
        let plain = StaticMapIterator::new(0, 0, 0, block());

        let mut c = ctx(&pack, &maps);
        c.biome_shading = true;
        c.swamp_shading = true;
        let s = resolve_color(&c, &swampy, &hit);
        assert_eq!(s.green(), 2);
        assert_eq!(s.blue(), 0);
        let p = resolve_color(&c, &plain, &hit);
        assert_eq!(p.green(), 0);
        assert_eq!(p.blue(), 1);

        // Swamp shading off ignores the swamp ramp even for swamp biomes.
        c.swamp_shading = false;
        let s = resolve_color(&c, &swampy, &hit);
        assert_eq!(s.blue(), 1);
    }

    #[test]
    fn test_mult_toned_literal_and_alpha() {
        let pack = gradient_pack(1);
        let mut maps = TextureMaps::new();
        let mut map = BlockTextureMap::blank();
        map.faces = vec![TextureRef::new(0, TextureOp::MultToned); 6];
        map.color_mult = 0x80FF_FFFF;
        maps.set(0, Arc::new(map));
        let ctx = ctx(&pack, &maps);
        let iter = StaticMapIterator::new(0, 0, 0, block());
        let air = BlockState::air();
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [1, 1, 0], &air));
        // Multiplier alpha rides along into the sample's alpha.
        assert_eq!(c.alpha(), 0x80);
    }

    #[test]
    fn test_grass_side_snow_above() {
        let mut pack = gradient_pack(3);
        pack.set_grass_mask_tile(2);
        let maps = cube_map(0, TextureOp::GrassSide);
        let mut ctx = ctx(&pack, &maps);
        ctx.std_tiles.snow_side = 1;
        let iter = StaticMapIterator::new(0, 0, 0, block())
            .with_neighbor(BlockStep::YPlus, BlockState::named("minecraft:snow"));
        let air = BlockState::air();
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [0, 0, 0], &air));
        // Snow-side tile replaces the bound side tile.
        assert_eq!(c.red(), 1);
    }

    #[test]
    fn test_lily_orientation_is_position_stable() {
        let pack = gradient_pack(1);
        let maps = cube_map(0, TextureOp::LilyToned);
        let ctx = ctx(&pack, &maps);
        let air = BlockState::air();
        let a = StaticMapIterator::new(10, 64, -3, block());
        let b = StaticMapIterator::new(10, 64, -3, block());
        let pa = point(BlockStep::YMinus, [1, 3, 2], &air);
        let c1 = resolve_color(&ctx, &a, &pa);
        let c2 = resolve_color(&ctx, &b, &pa);
        assert_eq!(c1, c2);
        assert!(!c1.is_transparent());
    }

    #[test]
    fn test_unmapped_state_is_transparent() {
        let pack = gradient_pack(1);
        let maps = TextureMaps::new();
        let ctx = ctx(&pack, &maps);
        let mut blk = block();
        blk.global_index = 77;
        let iter = StaticMapIterator::new(0, 0, 0, blk);
        let air = BlockState::air();
        let c = resolve_color(&ctx, &iter, &point(BlockStep::ZMinus, [0, 0, 0], &air));
        assert!(c.is_transparent());
    }
}

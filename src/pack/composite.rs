//! Extraction of per-face tiles from fixed-layout composite sheets.
//!
//! Chest, sign, skin, shulker and bed textures ship as one sheet holding all
//! faces. Each layout is cropped at scale-independent coordinates expressed
//! in units of the sheet's nominal resolution, then every crop is resampled
//! to the pack's native tile scale.

use super::resample::scale_image;
use super::texture::LoadedImage;
use crate::registry::{CustomTileRect, BED_RECTS};

// Sub-tile index layout per composite format. The order is part of the
// description-file contract.
pub const CHEST_TOP: usize = 0;
pub const CHEST_LEFT: usize = 1;
pub const CHEST_RIGHT: usize = 2;
pub const CHEST_FRONT: usize = 3;
pub const CHEST_BACK: usize = 4;
pub const CHEST_BOTTOM: usize = 5;

pub const BIGCHEST_TOPLEFT: usize = 0;
pub const BIGCHEST_TOPRIGHT: usize = 1;
pub const BIGCHEST_FRONTLEFT: usize = 2;
pub const BIGCHEST_FRONTRIGHT: usize = 3;
pub const BIGCHEST_LEFT: usize = 4;
pub const BIGCHEST_RIGHT: usize = 5;
pub const BIGCHEST_BACKLEFT: usize = 6;
pub const BIGCHEST_BACKRIGHT: usize = 7;
pub const BIGCHEST_BOTTOMLEFT: usize = 8;
pub const BIGCHEST_BOTTOMRIGHT: usize = 9;

pub const SIGN_FRONT: usize = 0;
pub const SIGN_BACK: usize = 1;
pub const SIGN_TOP: usize = 2;
pub const SIGN_BOTTOM: usize = 3;
pub const SIGN_LEFT: usize = 4;
pub const SIGN_RIGHT: usize = 5;
pub const SIGN_POST_FRONT: usize = 6;
pub const SIGN_POST_BACK: usize = 7;
pub const SIGN_POST_LEFT: usize = 8;
pub const SIGN_POST_RIGHT: usize = 9;

pub const SKIN_FRONT: usize = 0;
pub const SKIN_LEFT: usize = 1;
pub const SKIN_RIGHT: usize = 2;
pub const SKIN_BACK: usize = 3;
pub const SKIN_TOP: usize = 4;
pub const SKIN_BOTTOM: usize = 5;

pub const SHULKER_TOP: usize = 0;
pub const SHULKER_LEFT: usize = 1;
pub const SHULKER_RIGHT: usize = 2;
pub const SHULKER_FRONT: usize = 3;
pub const SHULKER_BACK: usize = 4;
pub const SHULKER_BOTTOM: usize = 5;

/// Where a chest handle lands on a synthesized face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlePos {
    Center,
    Left,
    Right,
    None,
    LeftFront,
    RightFront,
}

/// Copy a rectangle out of `img` into `dest` (row-major, `dest_width` wide).
fn copy_subimage(
    img: &LoadedImage,
    from_x: usize,
    from_y: usize,
    to_x: usize,
    to_y: usize,
    width: usize,
    height: usize,
    dest: &mut [u32],
    dest_width: usize,
) {
    for h in 0..height {
        let src_off = (h + from_y) * img.width + from_x;
        let dst_off = (h + to_y) * dest_width + to_x;
        dest[dst_off..dst_off + width].copy_from_slice(&img.argb[src_off..src_off + width]);
    }
}

/// Overlay a rectangle of `img` onto `dest`, replacing only where the source
/// pixel is fully opaque. Alpha-tested, never blended.
fn combine_subimage(
    img: &LoadedImage,
    from_x: usize,
    from_y: usize,
    to_x: usize,
    to_y: usize,
    width: usize,
    height: usize,
    dest: &mut [u32],
    dest_width: usize,
) {
    for h in 0..height {
        for w in 0..width {
            let src = img.argb[(h + from_y) * img.width + (w + from_x)];
            if (src >> 24) & 0xFF == 0xFF {
                dest[dest_width * (h + to_y) + (w + to_x)] = src;
            }
        }
    }
}

fn finish_tile(tile: &[u32], tile_scale: usize, native_scale: usize) -> Vec<u32> {
    let mut out = vec![0u32; native_scale * native_scale];
    scale_image(tile_scale, native_scale, tile, &mut out);
    out
}

/// Cut a grid sheet into square cells and rescale each referenced cell.
/// Cell dimension is the smaller of width/x_count and height/y_count.
pub fn extract_grid(
    img: &LoadedImage,
    x_count: usize,
    y_count: usize,
    native_scale: usize,
    mut set_tile: impl FnMut(usize, Vec<u32>),
) {
    if x_count == 0 || y_count == 0 {
        return;
    }
    let dim = (img.width / x_count).min(img.height / y_count);
    if dim == 0 {
        return;
    }
    let mut cell = vec![0u32; dim * dim];
    for y in 0..y_count {
        for x in 0..x_count {
            for j in 0..dim {
                let src_off = (y * dim + j) * img.width + x * dim;
                cell[j * dim..(j + 1) * dim].copy_from_slice(&img.argb[src_off..src_off + dim]);
            }
            set_tile(y * x_count + x, finish_tile(&cell, dim, native_scale));
        }
    }
}

/// Chest sides are 14px tall split across the sheet (lid above the latch
/// line, body below), reassembled into one 16x16 face.
fn make_chest_side(
    img: &LoadedImage,
    native_scale: usize,
    src_x: usize,
    width: usize,
    dest_x: usize,
    handle: HandlePos,
) -> Vec<u32> {
    let mult = img.height / 64;
    let mut tile = vec![0u32; 16 * 16 * mult * mult];
    let tw = 16 * mult;
    // Lid part, then body part.
    copy_subimage(img, src_x * mult, 14 * mult, dest_x * mult, 2 * mult, width * mult, 5 * mult, &mut tile, tw);
    copy_subimage(img, src_x * mult, 34 * mult, dest_x * mult, 7 * mult, width * mult, 9 * mult, &mut tile, tw);
    match handle {
        HandlePos::Center => {
            copy_subimage(img, mult, mult, 7 * mult, 4 * mult, 2 * mult, 4 * mult, &mut tile, tw)
        }
        HandlePos::Left => {
            copy_subimage(img, 3 * mult, mult, 0, 4 * mult, mult, 4 * mult, &mut tile, tw)
        }
        HandlePos::LeftFront => {
            copy_subimage(img, 2 * mult, mult, 0, 4 * mult, mult, 4 * mult, &mut tile, tw)
        }
        HandlePos::Right => {
            copy_subimage(img, 0, mult, 15 * mult, 4 * mult, mult, 4 * mult, &mut tile, tw)
        }
        HandlePos::RightFront => {
            copy_subimage(img, mult, mult, 15 * mult, 4 * mult, mult, 4 * mult, &mut tile, tw)
        }
        HandlePos::None => {}
    }
    finish_tile(&tile, tw, native_scale)
}

fn make_chest_top_bottom(
    img: &LoadedImage,
    native_scale: usize,
    src_x: usize,
    src_y: usize,
    width: usize,
    dest_x: usize,
    handle: HandlePos,
) -> Vec<u32> {
    let mult = img.height / 64;
    let mut tile = vec![0u32; 16 * 16 * mult * mult];
    let tw = 16 * mult;
    copy_subimage(img, src_x * mult, src_y * mult, dest_x * mult, mult, width * mult, 14 * mult, &mut tile, tw);
    match handle {
        HandlePos::Center => {
            copy_subimage(img, mult, 0, 7 * mult, 15 * mult, 2 * mult, mult, &mut tile, tw)
        }
        HandlePos::Left => {
            copy_subimage(img, 2 * mult, 0, 0, 15 * mult, mult, mult, &mut tile, tw)
        }
        HandlePos::Right => {
            copy_subimage(img, mult, 0, 15 * mult, 15 * mult, mult, mult, &mut tile, tw)
        }
        _ => {}
    }
    finish_tile(&tile, tw, native_scale)
}

/// Synthesize the 6 face tiles of a single-chest sheet (nominal 64px tall).
pub fn extract_chest(
    img: &LoadedImage,
    native_scale: usize,
    mut set_tile: impl FnMut(usize, Vec<u32>),
) {
    if img.height < 64 {
        return;
    }
    set_tile(CHEST_FRONT, make_chest_side(img, native_scale, 14, 14, 1, HandlePos::Center));
    set_tile(CHEST_BACK, make_chest_side(img, native_scale, 42, 14, 1, HandlePos::None));
    set_tile(CHEST_LEFT, make_chest_side(img, native_scale, 0, 14, 1, HandlePos::Right));
    set_tile(CHEST_RIGHT, make_chest_side(img, native_scale, 28, 14, 1, HandlePos::Left));
    set_tile(CHEST_TOP, make_chest_top_bottom(img, native_scale, 14, 0, 14, 1, HandlePos::Center));
    set_tile(CHEST_BOTTOM, make_chest_top_bottom(img, native_scale, 28, 19, 14, 1, HandlePos::Center));
}

/// Synthesize the 10 face tiles of a double-chest sheet.
pub fn extract_big_chest(
    img: &LoadedImage,
    native_scale: usize,
    mut set_tile: impl FnMut(usize, Vec<u32>),
) {
    if img.height < 64 {
        return;
    }
    set_tile(BIGCHEST_FRONTLEFT, make_chest_side(img, native_scale, 14, 15, 1, HandlePos::RightFront));
    set_tile(BIGCHEST_FRONTRIGHT, make_chest_side(img, native_scale, 29, 15, 0, HandlePos::LeftFront));
    set_tile(BIGCHEST_LEFT, make_chest_side(img, native_scale, 0, 14, 1, HandlePos::Right));
    set_tile(BIGCHEST_RIGHT, make_chest_side(img, native_scale, 44, 14, 1, HandlePos::Left));
    set_tile(BIGCHEST_BACKRIGHT, make_chest_side(img, native_scale, 58, 15, 1, HandlePos::None));
    set_tile(BIGCHEST_BACKLEFT, make_chest_side(img, native_scale, 73, 15, 0, HandlePos::None));
    set_tile(BIGCHEST_TOPLEFT, make_chest_top_bottom(img, native_scale, 14, 0, 15, 1, HandlePos::Right));
    set_tile(BIGCHEST_TOPRIGHT, make_chest_top_bottom(img, native_scale, 29, 0, 15, 0, HandlePos::Left));
    set_tile(BIGCHEST_BOTTOMLEFT, make_chest_top_bottom(img, native_scale, 34, 19, 15, 1, HandlePos::Right));
    set_tile(BIGCHEST_BOTTOMRIGHT, make_chest_top_bottom(img, native_scale, 49, 19, 15, 0, HandlePos::Left));
}

/// Crops land in the lower-left corner of a 24x24 tile (nominal sheet 32px
/// tall).
fn make_sign_tile(
    img: &LoadedImage,
    native_scale: usize,
    src_x: usize,
    src_y: usize,
    width: usize,
    height: usize,
) -> Vec<u32> {
    let mult = img.height / 32;
    let mut tile = vec![0u32; 24 * 24 * mult * mult];
    let tw = 24 * mult;
    copy_subimage(img, src_x * mult, src_y * mult, 0, (24 - height) * mult, width * mult, height * mult, &mut tile, tw);
    finish_tile(&tile, tw, native_scale)
}

/// Synthesize the 10 tiles of a sign sheet: board faces plus post faces.
pub fn extract_sign(
    img: &LoadedImage,
    native_scale: usize,
    mut set_tile: impl FnMut(usize, Vec<u32>),
) {
    if img.height < 32 {
        return;
    }
    set_tile(SIGN_FRONT, make_sign_tile(img, native_scale, 2, 2, 24, 12));
    set_tile(SIGN_BACK, make_sign_tile(img, native_scale, 28, 2, 24, 12));
    set_tile(SIGN_TOP, make_sign_tile(img, native_scale, 2, 0, 24, 2));
    set_tile(SIGN_LEFT, make_sign_tile(img, native_scale, 0, 2, 2, 12));
    set_tile(SIGN_RIGHT, make_sign_tile(img, native_scale, 26, 2, 2, 12));
    set_tile(SIGN_BOTTOM, make_sign_tile(img, native_scale, 26, 0, 24, 2));
    set_tile(SIGN_POST_FRONT, make_sign_tile(img, native_scale, 0, 16, 2, 14));
    set_tile(SIGN_POST_RIGHT, make_sign_tile(img, native_scale, 2, 16, 2, 14));
    set_tile(SIGN_POST_BACK, make_sign_tile(img, native_scale, 4, 16, 2, 14));
    set_tile(SIGN_POST_LEFT, make_sign_tile(img, native_scale, 6, 16, 2, 14));
}

fn make_face_tile(img: &LoadedImage, native_scale: usize, src_x: usize, src_y: usize) -> Vec<u32> {
    let mult = img.width / 64;
    let mut tile = vec![0u32; 8 * 8 * mult * mult];
    copy_subimage(img, src_x * mult, src_y * mult, 0, 0, 8 * mult, 8 * mult, &mut tile, 8 * mult);
    finish_tile(&tile, 8 * mult, native_scale)
}

/// Synthesize the 6 head-face tiles of a skin sheet (nominal 64px wide).
pub fn extract_skin(
    img: &LoadedImage,
    native_scale: usize,
    mut set_tile: impl FnMut(usize, Vec<u32>),
) {
    if img.width < 64 {
        return;
    }
    set_tile(SKIN_FRONT, make_face_tile(img, native_scale, 8, 8));
    set_tile(SKIN_LEFT, make_face_tile(img, native_scale, 16, 8));
    set_tile(SKIN_RIGHT, make_face_tile(img, native_scale, 0, 8));
    set_tile(SKIN_BACK, make_face_tile(img, native_scale, 24, 8));
    set_tile(SKIN_TOP, make_face_tile(img, native_scale, 8, 0));
    set_tile(SKIN_BOTTOM, make_face_tile(img, native_scale, 16, 0));
}

/// Shulker sides combine the lid column (rows 16..28) with the base column
/// (rows 44..52) overlaid only where the base is fully opaque.
fn make_shulker_side(img: &LoadedImage, native_scale: usize, src_x: usize) -> Vec<u32> {
    let mult = img.width / 64;
    let mut tile = vec![0u32; 16 * 16 * mult * mult];
    let tw = 16 * mult;
    copy_subimage(img, src_x * mult, 16 * mult, 0, 0, 16 * mult, 12 * mult, &mut tile, tw);
    combine_subimage(img, src_x * mult, 44 * mult, 0, 8 * mult, 16 * mult, 8 * mult, &mut tile, tw);
    finish_tile(&tile, tw, native_scale)
}

fn make_shulker_top_bottom(
    img: &LoadedImage,
    native_scale: usize,
    src_x: usize,
    src_y: usize,
) -> Vec<u32> {
    let mult = img.width / 64;
    let mut tile = vec![0u32; 16 * 16 * mult * mult];
    copy_subimage(img, src_x * mult, src_y * mult, 0, 0, 16 * mult, 16 * mult, &mut tile, 16 * mult);
    finish_tile(&tile, 16 * mult, native_scale)
}

/// Synthesize the 6 face tiles of a shulker box sheet (nominal 64px wide).
pub fn extract_shulker(
    img: &LoadedImage,
    native_scale: usize,
    mut set_tile: impl FnMut(usize, Vec<u32>),
) {
    if img.width < 64 {
        return;
    }
    set_tile(SHULKER_FRONT, make_shulker_side(img, native_scale, 0));
    set_tile(SHULKER_BACK, make_shulker_side(img, native_scale, 16));
    set_tile(SHULKER_LEFT, make_shulker_side(img, native_scale, 32));
    set_tile(SHULKER_RIGHT, make_shulker_side(img, native_scale, 48));
    set_tile(SHULKER_TOP, make_shulker_top_bottom(img, native_scale, 16, 0));
    set_tile(SHULKER_BOTTOM, make_shulker_top_bottom(img, native_scale, 32, 28));
}

/// Cut a rect list out of a sheet; `nominal_height` is the sheet height the
/// rect coordinates were authored against.
pub fn extract_custom(
    img: &LoadedImage,
    rects: &[CustomTileRect],
    nominal_height: usize,
    native_scale: usize,
    mut set_tile: impl FnMut(usize, Vec<u32>),
) {
    if nominal_height == 0 {
        return;
    }
    let mult = img.height / nominal_height;
    if mult == 0 {
        return;
    }
    for (i, rect) in rects.iter().enumerate() {
        let mut tile = vec![0u32; 16 * 16 * mult * mult];
        copy_subimage(
            img,
            rect.src_x as usize * mult,
            rect.src_y as usize * mult,
            rect.target_x as usize * mult,
            rect.target_y as usize * mult,
            rect.width as usize * mult,
            rect.height as usize * mult,
            &mut tile,
            16 * mult,
        );
        set_tile(i, finish_tile(&tile, 16 * mult, native_scale));
    }
}

/// Synthesize the 18 part tiles of a bed sheet (nominal 64x64).
pub fn extract_bed(
    img: &LoadedImage,
    native_scale: usize,
    set_tile: impl FnMut(usize, Vec<u32>),
) {
    extract_custom(img, &BED_RECTS, 64, native_scale, set_tile);
}

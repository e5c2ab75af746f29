//! Exact box-filter scaling between arbitrary square tile resolutions.
//!
//! Packs routinely mix 16px, 32px and 64px source assets; every tile gets
//! rescaled to the pack's single native resolution, and whole packs get
//! rescaled again to the renderer's output resolution. The filter must be
//! exact so output matches the reference renderer at any scale.

/// Box-filter scale a square `src_scale` x `src_scale` ARGB buffer into a
/// square `dst_scale` x `dst_scale` buffer.
///
/// Upscaling gathers each destination pixel from at most a 2x2 source
/// neighborhood; downscaling scatters each source pixel into its overlapping
/// destination footprint. RGB is alpha-weighted, output alpha is the plain
/// coverage average.
pub fn scale_image(src_scale: usize, dst_scale: usize, src: &[u32], dst: &mut [u32]) {
    debug_assert_eq!(src.len(), src_scale * src_scale);
    debug_assert_eq!(dst.len(), dst_scale * dst_scale);
    if dst_scale == src_scale {
        dst.copy_from_slice(src);
    } else if dst_scale > src_scale {
        scale_up(src_scale, dst_scale, src, dst);
    } else {
        scale_down(src_scale, dst_scale, src, dst);
    }
}

/// Per-axis overlap table: each block on the finer grid overlaps one or two
/// blocks on the coarser grid, starting at `offsets[i]` with `weights[i]` of
/// its `span` width in the first and the rest in the second.
fn overlap_table(count: usize, step: usize, span: usize, cell: usize) -> (Vec<usize>, Vec<usize>) {
    let mut offsets = vec![0usize; count];
    let mut weights = vec![0usize; count];
    let mut v = 0;
    for idx in 0..count {
        offsets[idx] = v / cell;
        if (v + step - 1) / cell == offsets[idx] {
            weights[idx] = span;
        } else {
            weights[idx] = (offsets[idx] * cell + cell) - v;
        }
        v += step;
    }
    (offsets, weights)
}

fn channels(argb: u32) -> (f64, f64, f64, f64) {
    let a = ((argb >> 24) & 0xFF) as f64;
    let r = ((argb >> 16) & 0xFF) as f64;
    let g = ((argb >> 8) & 0xFF) as f64;
    let b = (argb & 0xFF) as f64;
    (a, r, g, b)
}

fn pack(a: f64, r: f64, g: f64, b: f64) -> u32 {
    ((a as u32 & 0xFF) << 24) | ((r as u32 & 0xFF) << 16) | ((g as u32 & 0xFF) << 8) | (b as u32 & 0xFF)
}

fn scale_up(src_scale: usize, dst_scale: usize, src: &[u32], dst: &mut [u32]) {
    let (offsets, weights) = overlap_table(dst_scale, src_scale, src_scale, dst_scale);
    for y in 0..dst_scale {
        let ind_y = offsets[y];
        let wgt_y = weights[y];
        for x in 0..dst_scale {
            let ind_x = offsets[x];
            let wgt_x = weights[x];
            let mut accum_red = 0.0;
            let mut accum_green = 0.0;
            let mut accum_blue = 0.0;
            let mut accum_alpha = 0.0;
            for xx in 0..2 {
                let wx = if xx == 0 { wgt_x } else { src_scale - wgt_x };
                if wx == 0 {
                    continue;
                }
                for yy in 0..2 {
                    let wy = if yy == 0 { wgt_y } else { src_scale - wgt_y };
                    if wy == 0 {
                        continue;
                    }
                    let (ca, cr, cg, cb) = channels(src[(ind_y + yy) * src_scale + ind_x + xx]);
                    let a = (wx * wy) as f64 * ca;
                    accum_red += cr * a;
                    accum_green += cg * a;
                    accum_blue += cb * a;
                    accum_alpha += a;
                }
            }
            let norm = if accum_alpha == 0.0 { 1.0 } else { accum_alpha };
            dst[y * dst_scale + x] = pack(
                accum_alpha / ((src_scale * src_scale) as f64),
                accum_red / norm,
                accum_green / norm,
                accum_blue / norm,
            );
        }
    }
}

fn scale_down(src_scale: usize, dst_scale: usize, src: &[u32], dst: &mut [u32]) {
    let (offsets, weights) = overlap_table(src_scale, dst_scale, dst_scale, src_scale);
    let cells = dst_scale * dst_scale;
    let mut accum_red = vec![0.0f64; cells];
    let mut accum_green = vec![0.0f64; cells];
    let mut accum_blue = vec![0.0f64; cells];
    let mut accum_alpha = vec![0.0f64; cells];
    for y in 0..src_scale {
        let ind_y = offsets[y];
        let wgt_y = weights[y];
        for x in 0..src_scale {
            let ind_x = offsets[x];
            let wgt_x = weights[x];
            let (ca, cr, cg, cb) = channels(src[y * src_scale + x]);
            for xx in 0..2 {
                let wx = if xx == 0 { wgt_x } else { dst_scale - wgt_x };
                if wx == 0 {
                    continue;
                }
                for yy in 0..2 {
                    let wy = if yy == 0 { wgt_y } else { dst_scale - wgt_y };
                    if wy == 0 {
                        continue;
                    }
                    let a = (wx * wy) as f64 * ca;
                    let i = (ind_y + yy) * dst_scale + ind_x + xx;
                    accum_red[i] += cr * a;
                    accum_green[i] += cg * a;
                    accum_blue[i] += cb * a;
                    accum_alpha[i] += a;
                }
            }
        }
    }
    for (i, out) in dst.iter_mut().enumerate() {
        let norm = if accum_alpha[i] == 0.0 { 1.0 } else { accum_alpha[i] };
        *out = pack(
            accum_alpha[i] / ((src_scale * src_scale) as f64),
            accum_red[i] / norm,
            accum_green[i] / norm,
            accum_blue[i] / norm,
        );
    }
}

/// Convenience wrapper returning a fresh destination buffer.
pub fn scaled(src_scale: usize, dst_scale: usize, src: &[u32]) -> Vec<u32> {
    let mut dst = vec![0u32; dst_scale * dst_scale];
    scale_image(src_scale, dst_scale, src, &mut dst);
    dst
}

/// Force every non-fully-transparent pixel to full alpha. Used on the grass
/// side mask, which is alpha-tested rather than blended.
pub fn make_alpha_pure(argb: &mut [u32]) {
    for px in argb.iter_mut() {
        if *px & 0xFF00_0000 != 0 {
            *px |= 0xFF00_0000;
        }
    }
}

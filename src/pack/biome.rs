//! Biome color ramps and per-biome overrides.
//!
//! Grass/foliage/water toning samples a 256x256 color-ramp image indexed by
//! biome temperature and rainfall. Ramps whose lower-left triangle is one
//! uniform color are classified trivial, and per-pixel biome lookups are
//! skipped entirely for that tone.

use log::warn;

use super::resample::scale_image;
use super::texture::LoadedImage;

/// Fallback multipliers for packs without the matching ramp image.
pub const COLOR_MULT_BIRCH: u32 = 0x80a755;
pub const COLOR_MULT_PINE: u32 = 0x619961;
pub const COLOR_MULT_LILY: u32 = 0x208030;

/// Ramp pixel index for a (temperature, rainfall) pair.
pub fn ramp_index(temperature: f64, rainfall: f64) -> usize {
    let t = temperature.clamp(0.0, 1.0);
    let r = rainfall.clamp(0.0, 1.0) * t;
    let w = (255.0 * (1.0 - t)) as usize;
    let h = (255.0 * (1.0 - r)) as usize;
    h * 256 + w
}

/// Default sampling point used when no biome context is available
/// (forest: temperature 0.7, rainfall 0.8).
pub fn default_ramp_index() -> usize {
    ramp_index(0.7, 0.8)
}

/// One loaded 256x256 biome color ramp.
#[derive(Debug, Clone)]
pub struct BiomeRamp {
    argb: Vec<u32>,
    trivial_color: u32,
    trivial: bool,
    loaded: bool,
}

impl BiomeRamp {
    /// Build a ramp from a decoded image, rescaling to 256x256 if needed.
    pub fn from_image(img: &LoadedImage) -> BiomeRamp {
        let argb = if img.width != 256 || img.height != 256 {
            if img.width != img.height {
                warn!(
                    "biome ramp is {}x{}, expected square; result may be skewed",
                    img.width, img.height
                );
            }
            let mut scaled = vec![0u32; 256 * 256];
            scale_image(img.width, 256, &img.argb, &mut scaled);
            scaled
        } else {
            img.argb.clone()
        };
        let (trivial_color, trivial) = classify_trivial(&argb, 256, 256);
        BiomeRamp {
            argb,
            trivial_color,
            trivial,
            loaded: true,
        }
    }

    /// Placeholder ramp for a missing image: everything resolves to white.
    pub fn missing() -> BiomeRamp {
        BiomeRamp {
            argb: Vec::new(),
            trivial_color: 0xFFFF_FFFF,
            trivial: true,
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True when the whole lower-left triangle is one color and per-pixel
    /// lookups can be skipped.
    pub fn is_trivial(&self) -> bool {
        self.trivial
    }

    pub fn trivial_color(&self) -> u32 {
        self.trivial_color
    }

    /// Ramp color for a (temperature, rainfall) pair.
    pub fn lookup(&self, temperature: f64, rainfall: f64) -> u32 {
        if self.argb.is_empty() {
            return self.trivial_color;
        }
        self.argb[ramp_index(temperature, rainfall)]
    }

    /// Ramp color at the default forest sampling point.
    pub fn default_multiplier(&self) -> u32 {
        if self.argb.is_empty() {
            return self.trivial_color;
        }
        self.argb[default_ramp_index()]
    }
}

/// Probe the lower-left triangle for uniformity. Non-uniform ramps fall back
/// to a 4x4 box-filtered average sample.
fn classify_trivial(argb: &[u32], width: usize, height: usize) -> (u32, bool) {
    let clr = argb[height * width * 3 / 4 + width / 2];
    let mut same = true;
    'scan: for j in 0..height {
        for i in 0..=j {
            if argb[width * j + i] != clr {
                same = false;
                break 'scan;
            }
        }
    }
    if same {
        (clr, true)
    } else {
        let mut scaled = vec![0u32; 16];
        scale_image(width, 4, argb, &mut scaled);
        (scaled[9], false)
    }
}

/// Per-biome data: file-driven multiplier overrides plus climate values.
#[derive(Debug, Clone)]
pub struct BiomeInfo {
    pub grass_mult: Option<u32>,
    pub foliage_mult: Option<u32>,
    pub water_mult: Option<u32>,
    pub temperature: f64,
    pub rainfall: f64,
    /// Swamp biomes prefer the swamp-variant ramp images.
    pub swampy: bool,
}

impl Default for BiomeInfo {
    fn default() -> Self {
        BiomeInfo {
            grass_mult: None,
            foliage_mult: None,
            water_mult: None,
            temperature: 0.5,
            rainfall: 0.5,
            swampy: false,
        }
    }
}

/// Table of biome data indexed by biome id, populated by `biome:` lines.
#[derive(Debug, Default)]
pub struct BiomeTable {
    biomes: Vec<BiomeInfo>,
}

impl BiomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, id: usize) -> &mut BiomeInfo {
        if id >= self.biomes.len() {
            self.biomes.resize_with(id + 1, BiomeInfo::default);
        }
        &mut self.biomes[id]
    }

    pub fn set_grass_mult(&mut self, id: usize, mult: u32) {
        self.ensure(id).grass_mult = Some(mult & 0x00FF_FFFF);
    }

    pub fn set_foliage_mult(&mut self, id: usize, mult: u32) {
        self.ensure(id).foliage_mult = Some(mult & 0x00FF_FFFF);
    }

    pub fn set_water_mult(&mut self, id: usize, mult: u32) {
        self.ensure(id).water_mult = Some(mult & 0x00FF_FFFF);
    }

    pub fn set_climate(&mut self, id: usize, temperature: f64, rainfall: f64) {
        let info = self.ensure(id);
        info.temperature = temperature;
        info.rainfall = rainfall;
    }

    pub fn get(&self, id: usize) -> Option<&BiomeInfo> {
        self.biomes.get(id)
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_triangle_image(tri_color: u32, other: u32) -> LoadedImage {
        let mut argb = vec![other; 256 * 256];
        for j in 0..256 {
            for i in 0..=j {
                argb[256 * j + i] = tri_color;
            }
        }
        LoadedImage {
            width: 256,
            height: 256,
            argb,
        }
    }

    #[test]
    fn test_trivial_detection_uniform_triangle() {
        // Upper-right content does not matter for the classification.
        let img = uniform_triangle_image(0xFF66CC44, 0xFF000000);
        let ramp = BiomeRamp::from_image(&img);
        assert!(ramp.is_trivial());
        assert_eq!(ramp.trivial_color(), 0xFF66CC44);
    }

    #[test]
    fn test_non_trivial_falls_back_to_average() {
        let mut img = uniform_triangle_image(0xFF66CC44, 0xFF000000);
        img.argb[256 * 200 + 10] = 0xFF123456;
        let ramp = BiomeRamp::from_image(&img);
        assert!(!ramp.is_trivial());
        // Fallback comes from the 4x4 downscale, not the poisoned pixel.
        assert_ne!(ramp.trivial_color(), 0xFF123456);
    }

    #[test]
    fn test_ramp_index_corners() {
        // Hot and wet lands at the left edge bottom rowish region.
        assert_eq!(ramp_index(1.0, 1.0), 0);
        // Cold and dry is the top-right corner.
        assert_eq!(ramp_index(0.0, 0.0), 255 * 256 + 255);
        assert!(default_ramp_index() < 256 * 256);
    }

    #[test]
    fn test_small_image_is_rescaled() {
        let img = LoadedImage {
            width: 16,
            height: 16,
            argb: vec![0xFF44_8844; 256],
        };
        let ramp = BiomeRamp::from_image(&img);
        assert!(ramp.is_trivial());
        assert_eq!(ramp.lookup(0.3, 0.9), 0xFF44_8844);
    }

    #[test]
    fn test_missing_ramp_is_white() {
        let ramp = BiomeRamp::missing();
        assert!(!ramp.is_loaded());
        assert_eq!(ramp.lookup(0.5, 0.5), 0xFFFF_FFFF);
    }

    #[test]
    fn test_biome_table_overrides() {
        let mut table = BiomeTable::new();
        table.set_grass_mult(6, 0x4C763C);
        table.set_climate(6, 0.8, 0.9);
        let info = table.get(6).unwrap();
        assert_eq!(info.grass_mult, Some(0x4C763C));
        assert_eq!(info.temperature, 0.8);
        assert!(table.get(7).is_none());
        // Untouched lower ids get defaults.
        assert_eq!(table.get(3).unwrap().temperature, 0.5);
    }
}

//! Texture pack loading and tile storage.
//!
//! A [`TexturePack`] owns one decoded tile buffer per referenced global tile
//! index, all at a single native resolution, plus the biome color ramps.
//! Packs are built once per (re)load from a [`PackSource`] and a populated
//! [`TileRegistry`], then treated as immutable; render workers needing a
//! different output resolution get a derived pack via
//! [`TexturePack::resample`], cached per scale.

pub mod biome;
pub mod composite;
pub mod resample;
pub mod source;
pub mod texture;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{error, warn};

use crate::error::Result;
use crate::registry::{FileHandle, TileFileFormat, TileRegistry, BLANK_TILE};
use crate::types::Color;

use biome::{BiomeRamp, BiomeTable};
use source::PackSource;
use texture::LoadedImage;

/// Which standard ramp a biome-format file feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RampRole {
    Grass,
    Foliage,
    Water,
    SwampGrass,
    SwampFoliage,
    Birch,
    Pine,
}

fn ramp_role(filename: &str) -> Option<RampRole> {
    let name = filename.rsplit('/').next().unwrap_or(filename).to_lowercase();
    if name.contains("swampgrass") {
        Some(RampRole::SwampGrass)
    } else if name.contains("swampfoliage") {
        Some(RampRole::SwampFoliage)
    } else if name.contains("birch") {
        Some(RampRole::Birch)
    } else if name.contains("pine") {
        Some(RampRole::Pine)
    } else if name.contains("grass") {
        Some(RampRole::Grass)
    } else if name.contains("foliage") {
        Some(RampRole::Foliage)
    } else if name.contains("water") {
        Some(RampRole::Water)
    } else {
        None
    }
}

/// All decoded tiles of one texture pack at one resolution.
pub struct TexturePack {
    native_scale: usize,
    /// Indexed by global tile index; `None` for tiles whose source was
    /// missing or failed to decode.
    tiles: Vec<Option<Vec<u32>>>,
    grass_ramp: Arc<BiomeRamp>,
    foliage_ramp: Arc<BiomeRamp>,
    water_ramp: Arc<BiomeRamp>,
    swamp_grass_ramp: Option<Arc<BiomeRamp>>,
    swamp_foliage_ramp: Option<Arc<BiomeRamp>>,
    birch_ramp: Option<Arc<BiomeRamp>>,
    pine_ramp: Option<Arc<BiomeRamp>>,
    /// Ramps for per-block colorizing, keyed by their tile file.
    ramps_by_file: HashMap<FileHandle, Arc<BiomeRamp>>,
    /// Biome-format files whose image failed to load; per-block coloring
    /// entries pointing at them must be scrubbed.
    failed_ramp_files: Vec<FileHandle>,
    /// Alpha-tested grass side mask tile, if the pack declared one.
    grass_mask_tile: Option<u32>,
    biomes: BiomeTable,
    /// Derived packs at other scales, built lazily.
    scaled_cache: Mutex<HashMap<usize, Arc<TexturePack>>>,
}

impl TexturePack {
    /// Decode and assemble every used tile file from `source`.
    ///
    /// Missing or undecodable images log an error and leave their tiles
    /// blank; the pack still loads.
    pub fn load(
        source: &mut PackSource,
        registry: &TileRegistry,
        biomes: BiomeTable,
    ) -> Result<TexturePack> {
        // Decode everything referenced first; the native scale depends on
        // what actually loaded.
        let mut images: HashMap<FileHandle, LoadedImage> = HashMap::new();
        let mut failed_ramp_files = Vec::new();
        for (handle, file) in registry.iter_files() {
            if !file.used {
                continue;
            }
            let data = source.read(&file.filename);
            let decoded = match data {
                Some(bytes) => match texture::decode_image(&bytes) {
                    Ok(img) => Some(img),
                    Err(e) => {
                        error!("{}: image decode failed: {}", file.filename, e);
                        None
                    }
                },
                None => {
                    warn!("{}: not found in texture pack", file.filename);
                    None
                }
            };
            match decoded {
                Some(img) => {
                    images.insert(handle, img);
                }
                None => {
                    if file.format == TileFileFormat::Biome {
                        failed_ramp_files.push(handle);
                    }
                }
            }
        }

        let native_scale = compute_native_scale(registry, &images);
        let mut tiles: Vec<Option<Vec<u32>>> = vec![None; registry.tile_count() as usize];

        let mut grass_ramp = None;
        let mut foliage_ramp = None;
        let mut water_ramp = None;
        let mut swamp_grass_ramp = None;
        let mut swamp_foliage_ramp = None;
        let mut birch_ramp = None;
        let mut pine_ramp = None;
        let mut ramps_by_file = HashMap::new();

        for (handle, file) in registry.iter_files() {
            if !file.used {
                continue;
            }
            let Some(img) = images.get(&handle) else {
                continue;
            };
            let mut set_tile = |sub: usize, buf: Vec<u32>| {
                if let Some(tile) = file.tile_index(sub) {
                    tiles[tile as usize] = Some(buf);
                }
            };
            match file.format {
                TileFileFormat::Grid | TileFileFormat::Tileset => composite::extract_grid(
                    img,
                    file.x_count as usize,
                    file.y_count as usize,
                    native_scale,
                    set_tile,
                ),
                TileFileFormat::Chest => composite::extract_chest(img, native_scale, set_tile),
                TileFileFormat::BigChest => {
                    composite::extract_big_chest(img, native_scale, set_tile)
                }
                TileFileFormat::Sign => composite::extract_sign(img, native_scale, set_tile),
                TileFileFormat::Skin => composite::extract_skin(img, native_scale, set_tile),
                TileFileFormat::Shulker => composite::extract_shulker(img, native_scale, set_tile),
                TileFileFormat::Bed => composite::extract_bed(img, native_scale, set_tile),
                TileFileFormat::Custom => composite::extract_custom(
                    img,
                    &file.custom_rects,
                    16 * file.y_count.max(1) as usize,
                    native_scale,
                    set_tile,
                ),
                TileFileFormat::Biome => {
                    let ramp = Arc::new(BiomeRamp::from_image(img));
                    // Biome files also expose their single logical tile.
                    set_tile(0, trivial_tile(&ramp, native_scale));
                    match ramp_role(&file.filename) {
                        Some(RampRole::Grass) => grass_ramp = Some(ramp.clone()),
                        Some(RampRole::Foliage) => foliage_ramp = Some(ramp.clone()),
                        Some(RampRole::Water) => water_ramp = Some(ramp.clone()),
                        Some(RampRole::SwampGrass) => swamp_grass_ramp = Some(ramp.clone()),
                        Some(RampRole::SwampFoliage) => swamp_foliage_ramp = Some(ramp.clone()),
                        Some(RampRole::Birch) => birch_ramp = Some(ramp.clone()),
                        Some(RampRole::Pine) => pine_ramp = Some(ramp.clone()),
                        None => {}
                    }
                    ramps_by_file.insert(handle, ramp);
                }
            }
        }

        Ok(TexturePack {
            native_scale,
            tiles,
            grass_ramp: grass_ramp.unwrap_or_else(|| Arc::new(BiomeRamp::missing())),
            foliage_ramp: foliage_ramp.unwrap_or_else(|| Arc::new(BiomeRamp::missing())),
            water_ramp: water_ramp.unwrap_or_else(|| Arc::new(BiomeRamp::missing())),
            swamp_grass_ramp,
            swamp_foliage_ramp,
            birch_ramp,
            pine_ramp,
            ramps_by_file,
            failed_ramp_files,
            grass_mask_tile: None,
            biomes,
            scaled_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Build an empty pack (all tiles blank) at the given scale. Used when
    /// the pack source itself failed to open.
    pub fn empty(native_scale: usize, tile_count: usize) -> TexturePack {
        TexturePack {
            native_scale,
            tiles: vec![None; tile_count],
            grass_ramp: Arc::new(BiomeRamp::missing()),
            foliage_ramp: Arc::new(BiomeRamp::missing()),
            water_ramp: Arc::new(BiomeRamp::missing()),
            swamp_grass_ramp: None,
            swamp_foliage_ramp: None,
            birch_ramp: None,
            pine_ramp: None,
            ramps_by_file: HashMap::new(),
            failed_ramp_files: Vec::new(),
            grass_mask_tile: None,
            biomes: BiomeTable::new(),
            scaled_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn native_scale(&self) -> usize {
        self.native_scale
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Raw pixel buffer for a tile, if present.
    pub fn tile_argb(&self, tile: i32) -> Option<&[u32]> {
        if tile < 0 {
            return None;
        }
        self.tiles.get(tile as usize)?.as_deref()
    }

    /// Sample one pixel of a tile. Out-of-range coordinates clamp to the
    /// edge; a blank or missing tile samples transparent. Never fails.
    pub fn read_tile_pixel(&self, tile: i32, u: i32, v: i32) -> Color {
        if tile == BLANK_TILE {
            return Color::TRANSPARENT;
        }
        let Some(buf) = self.tile_argb(tile) else {
            return Color::TRANSPARENT;
        };
        let max = (self.native_scale - 1) as i32;
        let u = u.clamp(0, max) as usize;
        let v = v.clamp(0, max) as usize;
        Color::from_argb(buf[v * self.native_scale + u])
    }

    pub fn grass_ramp(&self) -> &BiomeRamp {
        &self.grass_ramp
    }

    pub fn foliage_ramp(&self) -> &BiomeRamp {
        &self.foliage_ramp
    }

    pub fn water_ramp(&self) -> &BiomeRamp {
        &self.water_ramp
    }

    pub fn swamp_grass_ramp(&self) -> Option<&BiomeRamp> {
        self.swamp_grass_ramp.as_deref()
    }

    pub fn swamp_foliage_ramp(&self) -> Option<&BiomeRamp> {
        self.swamp_foliage_ramp.as_deref()
    }

    pub fn birch_ramp(&self) -> Option<&BiomeRamp> {
        self.birch_ramp.as_deref()
    }

    pub fn pine_ramp(&self) -> Option<&BiomeRamp> {
        self.pine_ramp.as_deref()
    }

    /// Ramp backing a per-block colorizing file.
    pub fn ramp_for_file(&self, handle: FileHandle) -> Option<&BiomeRamp> {
        self.ramps_by_file.get(&handle).map(|r| r.as_ref())
    }

    /// Biome-format files whose image failed to load this generation.
    pub fn failed_ramp_files(&self) -> &[FileHandle] {
        &self.failed_ramp_files
    }

    pub fn biomes(&self) -> &BiomeTable {
        &self.biomes
    }

    /// Declare the grass side mask tile. Its alpha is forced pure (0 or 255)
    /// since the mask is alpha-tested per pixel.
    pub fn set_grass_mask_tile(&mut self, tile: u32) {
        self.grass_mask_tile = Some(tile);
        if let Some(Some(buf)) = self.tiles.get_mut(tile as usize) {
            resample::make_alpha_pure(buf);
        }
    }

    pub fn grass_mask_tile(&self) -> Option<u32> {
        self.grass_mask_tile
    }

    #[cfg(test)]
    pub(crate) fn set_tile_for_test(&mut self, tile: u32, buf: Vec<u32>) {
        self.tiles[tile as usize] = Some(buf);
    }

    #[cfg(test)]
    pub(crate) fn set_grass_ramps_for_test(&mut self, grass: BiomeRamp, swamp: Option<BiomeRamp>) {
        self.grass_ramp = Arc::new(grass);
        self.swamp_grass_ramp = swamp.map(Arc::new);
    }

    #[cfg(test)]
    pub(crate) fn set_birch_ramp_for_test(&mut self, ramp: BiomeRamp) {
        self.birch_ramp = Some(Arc::new(ramp));
    }

    /// Derived pack with every tile rescaled to `scale`. Cached; repeated
    /// requests for the same scale share one copy.
    pub fn resample(&self, scale: usize) -> Arc<TexturePack> {
        let mut cache = match self.scaled_cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pack) = cache.get(&scale) {
            return pack.clone();
        }
        let mut tiles: Vec<Option<Vec<u32>>> = Vec::with_capacity(self.tiles.len());
        for tile in &self.tiles {
            tiles.push(
                tile.as_ref()
                    .map(|buf| resample::scaled(self.native_scale, scale, buf)),
            );
        }
        let mut scaled = TexturePack {
            native_scale: scale,
            tiles,
            grass_ramp: self.grass_ramp.clone(),
            foliage_ramp: self.foliage_ramp.clone(),
            water_ramp: self.water_ramp.clone(),
            swamp_grass_ramp: self.swamp_grass_ramp.clone(),
            swamp_foliage_ramp: self.swamp_foliage_ramp.clone(),
            birch_ramp: self.birch_ramp.clone(),
            pine_ramp: self.pine_ramp.clone(),
            ramps_by_file: self.ramps_by_file.clone(),
            failed_ramp_files: self.failed_ramp_files.clone(),
            grass_mask_tile: None,
            biomes: BiomeTable::new(),
            scaled_cache: Mutex::new(HashMap::new()),
        };
        if let Some(mask) = self.grass_mask_tile {
            scaled.set_grass_mask_tile(mask);
        }
        let scaled = Arc::new(scaled);
        cache.insert(scale, scaled.clone());
        scaled
    }
}

/// Pick the native tile resolution: the largest cell dimension among loaded
/// grid files, defaulting to 16 when nothing decoded.
fn compute_native_scale(
    registry: &TileRegistry,
    images: &HashMap<FileHandle, LoadedImage>,
) -> usize {
    let mut scale = 16;
    for (handle, file) in registry.iter_files() {
        if !matches!(
            file.format,
            TileFileFormat::Grid | TileFileFormat::Tileset
        ) {
            continue;
        }
        let Some(img) = images.get(&handle) else {
            continue;
        };
        if file.x_count == 0 || file.y_count == 0 {
            continue;
        }
        let dim = (img.width / file.x_count as usize).min(img.height / file.y_count as usize);
        scale = scale.max(dim);
    }
    scale
}

/// A solid tile painted with a ramp's trivial color, standing in for the
/// ramp image's single logical tile.
fn trivial_tile(ramp: &BiomeRamp, native_scale: usize) -> Vec<u32> {
    vec![ramp.trivial_color(); native_scale * native_scale]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_with_one_tile() -> (TexturePack, u32) {
        let mut pack = TexturePack::empty(4, 2);
        pack.tiles[1] = Some(vec![
            0xFF000001, 0xFF000002, 0xFF000003, 0xFF000004, //
            0xFF000005, 0xFF000006, 0xFF000007, 0xFF000008, //
            0xFF000009, 0xFF00000A, 0xFF00000B, 0xFF00000C, //
            0xFF00000D, 0xFF00000E, 0xFF00000F, 0xFF000010,
        ]);
        (pack, 1)
    }

    #[test]
    fn test_ramp_role_names() {
        assert_eq!(ramp_role("misc/grasscolor.png"), Some(RampRole::Grass));
        assert_eq!(ramp_role("misc/foliagecolor.png"), Some(RampRole::Foliage));
        assert_eq!(ramp_role("misc/watercolor.png"), Some(RampRole::Water));
        assert_eq!(
            ramp_role("misc/swampgrasscolor.png"),
            Some(RampRole::SwampGrass)
        );
        assert_eq!(
            ramp_role("misc/swampfoliagecolor.png"),
            Some(RampRole::SwampFoliage)
        );
        assert_eq!(ramp_role("misc/birchcolor.png"), Some(RampRole::Birch));
        assert_eq!(ramp_role("misc/pinecolor.png"), Some(RampRole::Pine));
        assert_eq!(ramp_role("misc/enderchest.png"), None);
    }

    #[test]
    fn test_read_tile_pixel_clamps() {
        let (pack, tile) = pack_with_one_tile();
        assert_eq!(pack.read_tile_pixel(tile as i32, 0, 0).argb(), 0xFF000001);
        assert_eq!(pack.read_tile_pixel(tile as i32, 3, 3).argb(), 0xFF000010);
        // One past the edge clamps instead of failing.
        assert_eq!(pack.read_tile_pixel(tile as i32, 4, 0).argb(), 0xFF000004);
        assert_eq!(pack.read_tile_pixel(tile as i32, -1, 2).argb(), 0xFF000009);
    }

    #[test]
    fn test_blank_and_missing_tiles_sample_transparent() {
        let (pack, _) = pack_with_one_tile();
        assert!(pack.read_tile_pixel(BLANK_TILE, 0, 0).is_transparent());
        assert!(pack.read_tile_pixel(0, 1, 1).is_transparent());
        assert!(pack.read_tile_pixel(99, 1, 1).is_transparent());
    }

    #[test]
    fn test_resample_cache_shares_instances() {
        let (pack, _) = pack_with_one_tile();
        let a = pack.resample(8);
        let b = pack.resample(8);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.native_scale(), 8);
        assert_eq!(a.tile_count(), pack.tile_count());
        // Scaled tile exists and samples non-transparent.
        assert!(!a.read_tile_pixel(1, 0, 0).is_transparent());
    }

    #[test]
    fn test_load_from_directory_pack() {
        use crate::registry::TileFileFormat;
        let dir = tempfile::tempdir().unwrap();
        // 2x1 grid of 8px tiles: left red, right green.
        let mut rgba = Vec::new();
        for _y in 0..8 {
            for x in 0..16 {
                if x < 8 {
                    rgba.extend_from_slice(&[255, 0, 0, 255]);
                } else {
                    rgba.extend_from_slice(&[0, 255, 0, 255]);
                }
            }
        }
        let img = image::RgbaImage::from_raw(16, 8, rgba).unwrap();
        img.save(dir.path().join("terrain.png")).unwrap();

        let mut registry = TileRegistry::new();
        let f = registry.find_or_add_file("terrain.png", None, 2, 1, TileFileFormat::Grid);
        let t0 = registry.find_or_add_tile(f, 0).unwrap();
        let t1 = registry.find_or_add_tile(f, 1).unwrap();

        let mut source = PackSource::open(dir.path()).unwrap();
        let pack = TexturePack::load(&mut source, &registry, BiomeTable::new()).unwrap();
        assert_eq!(pack.native_scale(), 8);
        assert_eq!(pack.read_tile_pixel(t0 as i32, 0, 0).argb(), 0xFFFF0000);
        assert_eq!(pack.read_tile_pixel(t1 as i32, 0, 0).argb(), 0xFF00FF00);
    }

    #[test]
    fn test_load_birch_colormap_ramp() {
        use crate::registry::TileFileFormat;
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("misc")).unwrap();
        let img = image::RgbaImage::from_pixel(16, 16, image::Rgba([0x20, 0x40, 0x60, 255]));
        img.save(dir.path().join("misc/birchcolor.png")).unwrap();

        let mut registry = TileRegistry::new();
        registry.find_or_add_file("misc/birchcolor.png", None, 1, 1, TileFileFormat::Biome);
        let mut source = PackSource::open(dir.path()).unwrap();
        let pack = TexturePack::load(&mut source, &registry, BiomeTable::new()).unwrap();
        let ramp = pack.birch_ramp().unwrap();
        assert!(ramp.is_loaded());
        assert_eq!(ramp.trivial_color() & 0x00FF_FFFF, 0x204060);
        assert!(pack.pine_ramp().is_none());
    }

    #[test]
    fn test_missing_file_leaves_blank_tiles() {
        use crate::registry::TileFileFormat;
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TileRegistry::new();
        let f = registry.find_or_add_file("nothere.png", None, 1, 1, TileFileFormat::Grid);
        let t = registry.find_or_add_tile(f, 0).unwrap();
        let mut source = PackSource::open(dir.path()).unwrap();
        let pack = TexturePack::load(&mut source, &registry, BiomeTable::new()).unwrap();
        assert!(pack.read_tile_pixel(t as i32, 0, 0).is_transparent());
    }
}

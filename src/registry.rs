//! Dynamic tile-file registry.
//!
//! Texture description files reference named image files; each named file
//! gets a registry entry the first time it is seen, and each sub-tile of a
//! file (grid cell, chest face, sign face, ...) gets a global tile index the
//! first time it is referenced. Both operations are idempotent, so the same
//! file named from many description lines collapses to one slot.

use std::collections::HashMap;

use log::debug;

use crate::error::{MapTexError, Result};

/// Tile index meaning "no texture, render transparent".
pub const BLANK_TILE: i32 = -1;

/// Layout of sub-tiles within a single texture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFileFormat {
    /// Regular x-by-y grid of square tiles.
    Grid,
    /// Single chest sheet, synthesized into 6 face tiles.
    Chest,
    /// Double chest sheet, synthesized into 10 face tiles.
    BigChest,
    /// Sign sheet, synthesized into 10 face tiles.
    Sign,
    /// Player/entity skin sheet, synthesized into 6 head-face tiles.
    Skin,
    /// Shulker box sheet, synthesized into 6 face tiles.
    Shulker,
    /// Bed sheet, synthesized into 18 part tiles.
    Bed,
    /// Arbitrary rectangle list declared inline in the description file.
    Custom,
    /// Grid with a per-tile name table.
    Tileset,
    /// Biome color ramp, one logical tile.
    Biome,
}

impl TileFileFormat {
    /// Parse a format keyword from the texture grammar.
    pub fn parse(s: &str) -> Option<TileFileFormat> {
        match s.to_uppercase().as_str() {
            "GRID" => Some(TileFileFormat::Grid),
            "CHEST" => Some(TileFileFormat::Chest),
            "BIGCHEST" => Some(TileFileFormat::BigChest),
            "SIGN" => Some(TileFileFormat::Sign),
            "SKIN" => Some(TileFileFormat::Skin),
            "SHULKER" => Some(TileFileFormat::Shulker),
            "BED" => Some(TileFileFormat::Bed),
            "CUSTOM" => Some(TileFileFormat::Custom),
            "TILESET" => Some(TileFileFormat::Tileset),
            "BIOME" => Some(TileFileFormat::Biome),
            _ => None,
        }
    }
}

/// One rectangle to crop out of a composite sheet, in units of the sheet's
/// nominal resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomTileRect {
    pub src_x: u32,
    pub src_y: u32,
    pub width: u32,
    pub height: u32,
    pub target_x: u32,
    pub target_y: u32,
}

impl CustomTileRect {
    pub const fn new(src_x: u32, src_y: u32, width: u32, height: u32) -> CustomTileRect {
        CustomTileRect {
            src_x,
            src_y,
            width,
            height,
            target_x: 0,
            target_y: 0,
        }
    }
}

/// Registry entry for one named texture file.
#[derive(Debug, Clone)]
pub struct TileFile {
    /// Filename as referenced from description files.
    pub filename: String,
    /// Owning mod namespace, if mod-scoped.
    pub mod_scope: Option<String>,
    /// Grid dimensions (tiles per row / per column) for grid-like formats.
    pub x_count: u32,
    pub y_count: u32,
    pub format: TileFileFormat,
    /// Crop list for `Custom` format files.
    pub custom_rects: Vec<CustomTileRect>,
    /// Per-tile names for `Tileset` format files.
    pub tile_names: Vec<Option<String>>,
    /// Material hint recorded for downstream renderers.
    pub material: Option<String>,
    /// Global tile index per sub-tile; `None` until first referenced.
    tiles: Vec<Option<u32>>,
    /// Set once any sub-tile is referenced, so unreferenced files skip decode.
    pub used: bool,
}

impl TileFile {
    /// Number of sub-tiles this file's format yields.
    pub fn tile_count(&self) -> usize {
        match self.format {
            TileFileFormat::Grid | TileFileFormat::Tileset => {
                (self.x_count * self.y_count) as usize
            }
            TileFileFormat::Chest => 6,
            TileFileFormat::BigChest => 10,
            TileFileFormat::Sign => 10,
            TileFileFormat::Skin => 6,
            TileFileFormat::Shulker => 6,
            TileFileFormat::Bed => 18,
            TileFileFormat::Biome => 1,
            TileFileFormat::Custom => self.custom_rects.len(),
        }
    }

    /// Global tile index assigned to `sub_index`, if any has been.
    pub fn tile_index(&self, sub_index: usize) -> Option<u32> {
        self.tiles.get(sub_index).copied().flatten()
    }

    /// Iterate (sub_index, global_index) for every assigned sub-tile.
    pub fn assigned_tiles(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.map(|t| (i, t)))
    }
}

/// Opaque handle to a registered tile file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub(crate) usize);

/// Find-or-add registry of tile files and global tile indices.
///
/// Passed explicitly to loaders and the texture pack; a full reload calls
/// [`TileRegistry::reset`] and repopulates into the fresh generation before
/// the new tables are published.
#[derive(Debug, Default)]
pub struct TileRegistry {
    files: Vec<TileFile>,
    by_name: HashMap<String, FileHandle>,
    next_tile: u32,
    generation: u64,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or register the file named `filename`. Idempotent by filename:
    /// dimensions/format from the first registration win.
    pub fn find_or_add_file(
        &mut self,
        filename: &str,
        mod_scope: Option<&str>,
        x_count: u32,
        y_count: u32,
        format: TileFileFormat,
    ) -> FileHandle {
        if let Some(&handle) = self.by_name.get(filename) {
            return handle;
        }
        let handle = FileHandle(self.files.len());
        let mut file = TileFile {
            filename: filename.to_string(),
            mod_scope: mod_scope.map(str::to_string),
            x_count,
            y_count,
            format,
            custom_rects: Vec::new(),
            tile_names: Vec::new(),
            material: None,
            tiles: Vec::new(),
            used: false,
        };
        // Biome ramps are decoded unconditionally; everything else waits
        // until a tile is referenced.
        if format == TileFileFormat::Biome {
            file.used = true;
        }
        file.tiles = vec![None; file.tile_count()];
        debug!(
            "registered tile file {} ({}x{} {:?})",
            filename, x_count, y_count, format
        );
        self.files.push(file);
        self.by_name.insert(filename.to_string(), handle);
        handle
    }

    /// Attach the crop list of a `Custom` format file. Resizes the sub-tile
    /// slot array to match.
    pub fn set_custom_rects(&mut self, handle: FileHandle, rects: Vec<CustomTileRect>) {
        let file = &mut self.files[handle.0];
        file.custom_rects = rects;
        let count = file.tile_count();
        file.tiles.resize(count, None);
    }

    /// Attach the per-tile name table of a `Tileset` file.
    pub fn set_tile_names(&mut self, handle: FileHandle, names: Vec<Option<String>>) {
        self.files[handle.0].tile_names = names;
    }

    pub fn set_material(&mut self, handle: FileHandle, material: &str) {
        self.files[handle.0].material = Some(material.to_string());
    }

    /// Find or allocate the global tile index for sub-tile `sub_index` of
    /// `handle`. The first reference allocates the next free global index;
    /// later references return the same index. An out-of-range sub-index is
    /// a fatal-to-file configuration error.
    pub fn find_or_add_tile(&mut self, handle: FileHandle, sub_index: usize) -> Result<u32> {
        let file = &mut self.files[handle.0];
        if sub_index >= file.tiles.len() {
            return Err(MapTexError::TileIndexOutOfRange {
                file: file.filename.clone(),
                index: sub_index,
                count: file.tiles.len(),
            });
        }
        file.used = true;
        if let Some(idx) = file.tiles[sub_index] {
            return Ok(idx);
        }
        let idx = self.next_tile;
        self.next_tile += 1;
        file.tiles[sub_index] = Some(idx);
        Ok(idx)
    }

    pub fn lookup_file(&self, filename: &str) -> Option<FileHandle> {
        self.by_name.get(filename).copied()
    }

    pub fn file(&self, handle: FileHandle) -> &TileFile {
        &self.files[handle.0]
    }

    /// Iterate all registered files with their handles.
    pub fn iter_files(&self) -> impl Iterator<Item = (FileHandle, &TileFile)> {
        self.files.iter().enumerate().map(|(i, f)| (FileHandle(i), f))
    }

    /// Total number of allocated global tile indices.
    pub fn tile_count(&self) -> u32 {
        self.next_tile
    }

    /// Reload generation, bumped by every [`TileRegistry::reset`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear all files, tile indices, and the index counter for a full
    /// reload.
    pub fn reset(&mut self) {
        self.files.clear();
        self.by_name.clear();
        self.next_tile = 0;
        self.generation += 1;
    }
}

/// Bed sheets have a fixed layout; expanded here rather than declared in
/// description files. Nominal sheet resolution is 64x64.
pub const BED_RECTS: [CustomTileRect; 18] = [
    CustomTileRect::new(6, 6, 16, 16),   // head top
    CustomTileRect::new(28, 6, 16, 16),  // head bottom
    CustomTileRect::new(0, 6, 6, 16),    // head left
    CustomTileRect::new(22, 6, 6, 16),   // head right
    CustomTileRect::new(6, 0, 16, 6),    // head end
    CustomTileRect::new(6, 28, 16, 16),  // foot top
    CustomTileRect::new(28, 28, 16, 16), // foot bottom
    CustomTileRect::new(0, 28, 6, 16),   // foot left
    CustomTileRect::new(22, 28, 6, 16),  // foot right
    CustomTileRect::new(22, 22, 16, 6),  // foot end
    CustomTileRect::new(50, 0, 6, 6),    // head left leg 1
    CustomTileRect::new(56, 0, 6, 6),    // head left leg 2
    CustomTileRect::new(50, 6, 6, 6),    // head right leg 1
    CustomTileRect::new(56, 6, 6, 6),    // head right leg 2
    CustomTileRect::new(50, 12, 6, 6),   // foot left leg 1
    CustomTileRect::new(56, 12, 6, 6),   // foot left leg 2
    CustomTileRect::new(50, 18, 6, 6),   // foot right leg 1
    CustomTileRect::new(56, 18, 6, 6),   // foot right leg 2
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_or_add_file_idempotent() {
        let mut reg = TileRegistry::new();
        let a = reg.find_or_add_file("terrain.png", None, 16, 16, TileFileFormat::Grid);
        let b = reg.find_or_add_file("terrain.png", None, 4, 4, TileFileFormat::Grid);
        assert_eq!(a, b);
        // First registration wins.
        assert_eq!(reg.file(a).x_count, 16);
    }

    #[test]
    fn test_find_or_add_tile_idempotent() {
        let mut reg = TileRegistry::new();
        let f = reg.find_or_add_file("foo.png", None, 4, 4, TileFileFormat::Grid);
        let t = reg.find_or_add_tile(f, 5).unwrap();
        assert_eq!(reg.find_or_add_tile(f, 5).unwrap(), t);
        // A different sub-tile gets the next index.
        let t2 = reg.find_or_add_tile(f, 6).unwrap();
        assert_ne!(t, t2);
        assert_eq!(reg.tile_count(), 2);
    }

    #[test]
    fn test_tile_index_out_of_range() {
        let mut reg = TileRegistry::new();
        let f = reg.find_or_add_file("foo.png", None, 4, 4, TileFileFormat::Grid);
        assert!(reg.find_or_add_tile(f, 15).is_ok());
        let err = reg.find_or_add_tile(f, 16).unwrap_err();
        assert!(matches!(err, MapTexError::TileIndexOutOfRange { .. }));
    }

    #[test]
    fn test_used_flag_and_biome() {
        let mut reg = TileRegistry::new();
        let g = reg.find_or_add_file("grid.png", None, 2, 2, TileFileFormat::Grid);
        assert!(!reg.file(g).used);
        reg.find_or_add_tile(g, 0).unwrap();
        assert!(reg.file(g).used);
        // Biome ramps are marked used at registration.
        let b = reg.find_or_add_file("grasscolor.png", None, 1, 1, TileFileFormat::Biome);
        assert!(reg.file(b).used);
    }

    #[test]
    fn test_reset_clears_counter_and_bumps_generation() {
        let mut reg = TileRegistry::new();
        let f = reg.find_or_add_file("foo.png", None, 4, 4, TileFileFormat::Grid);
        reg.find_or_add_tile(f, 0).unwrap();
        let gen = reg.generation();
        reg.reset();
        assert_eq!(reg.tile_count(), 0);
        assert_eq!(reg.generation(), gen + 1);
        assert!(reg.lookup_file("foo.png").is_none());
        let f2 = reg.find_or_add_file("foo.png", None, 4, 4, TileFileFormat::Grid);
        assert_eq!(reg.find_or_add_tile(f2, 3).unwrap(), 0);
    }

    #[test]
    fn test_composite_tile_counts() {
        let mut reg = TileRegistry::new();
        let chest = reg.find_or_add_file("chest.png", None, 1, 1, TileFileFormat::Chest);
        assert_eq!(reg.file(chest).tile_count(), 6);
        let bed = reg.find_or_add_file("bed.png", None, 1, 1, TileFileFormat::Bed);
        assert_eq!(reg.file(bed).tile_count(), 18);
        let cust = reg.find_or_add_file("cust.png", None, 1, 1, TileFileFormat::Custom);
        reg.set_custom_rects(cust, vec![CustomTileRect::new(0, 0, 8, 8); 3]);
        assert_eq!(reg.file(cust).tile_count(), 3);
        assert!(reg.find_or_add_tile(cust, 2).is_ok());
        assert!(reg.find_or_add_tile(cust, 3).is_err());
    }

    #[test]
    fn test_mod_scope_recorded() {
        let mut reg = TileRegistry::new();
        let f = reg.find_or_add_file(
            "assets/foo/bar.png",
            Some("foomod"),
            1,
            1,
            TileFileFormat::Grid,
        );
        assert_eq!(reg.file(f).mod_scope.as_deref(), Some("foomod"));
    }
}

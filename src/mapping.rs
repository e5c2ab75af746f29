//! Per-block-state texture bindings.
//!
//! The texture-mapping grammar binds each block state to an array of tile
//! references, one per face (or per patch slot for patch models). A tile
//! reference carries a color-modifier operation alongside the tile index;
//! mapping files encode the pair as `tile + 1000 * op`, decoded here once
//! at the parse boundary instead of re-dividing on every pixel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::custom::CustomColorMultiplier;
use crate::registry::{FileHandle, BLANK_TILE};
use crate::types::Transparency;

/// Multiplier applied to file-encoded texture op codes.
pub const OP_MULT_FILE: i32 = 1000;

/// Color-modifier operation applied when sampling a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureOp {
    #[default]
    None,
    GrassToned,
    FoliageToned,
    WaterToned,
    Rot90,
    Rot180,
    Rot270,
    FlipHoriz,
    ShiftDownHalf,
    ShiftDownHalfAndFlip,
    InclinedTorch,
    GrassSide,
    ClearInside,
    PineToned,
    BirchToned,
    LilyToned,
    MultToned,
    GrassToned270,
    FoliageToned270,
    WaterToned270,
    MultTonedClearInside,
    FoliageMultToned,
}

impl TextureOp {
    /// Map a file-encoded op code. Unknown codes fall back to `None`.
    pub fn from_code(code: i32) -> TextureOp {
        match code {
            1 => TextureOp::GrassToned,
            2 => TextureOp::FoliageToned,
            3 => TextureOp::WaterToned,
            4 => TextureOp::Rot90,
            5 => TextureOp::Rot180,
            6 => TextureOp::Rot270,
            7 => TextureOp::FlipHoriz,
            8 => TextureOp::ShiftDownHalf,
            9 => TextureOp::ShiftDownHalfAndFlip,
            10 => TextureOp::InclinedTorch,
            11 => TextureOp::GrassSide,
            12 => TextureOp::ClearInside,
            13 => TextureOp::PineToned,
            14 => TextureOp::BirchToned,
            15 => TextureOp::LilyToned,
            17 => TextureOp::MultToned,
            18 => TextureOp::GrassToned270,
            19 => TextureOp::FoliageToned270,
            20 => TextureOp::WaterToned270,
            21 => TextureOp::MultTonedClearInside,
            22 => TextureOp::FoliageMultToned,
            _ => TextureOp::None,
        }
    }
}

/// A tile index with its color-modifier op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub tile: i32,
    pub op: TextureOp,
}

pub const BLANK_REF: TextureRef = TextureRef {
    tile: BLANK_TILE,
    op: TextureOp::None,
};

impl TextureRef {
    pub fn new(tile: i32, op: TextureOp) -> TextureRef {
        TextureRef { tile, op }
    }

    pub fn is_blank(&self) -> bool {
        self.tile == BLANK_TILE
    }
}

impl Default for TextureRef {
    fn default() -> Self {
        BLANK_REF
    }
}

/// Texture bindings for one block state: faces indexed by step ordinal for
/// full cubes, by patch slot for patch models.
#[derive(Clone, Default)]
pub struct BlockTextureMap {
    pub faces: Vec<TextureRef>,
    /// Per-face fallback chain: when a face samples transparent, retry
    /// with the face index stored here, until blank (-1).
    pub layers: Option<Vec<i8>>,
    /// Literal multiplier color (RGB) for `MultToned` ops; 0 means unset.
    pub color_mult: u32,
    pub cust_color_mult: Option<Arc<dyn CustomColorMultiplier>>,
    pub blockset: String,
    /// Standard top/bottom UV rotation convention (modern packs) instead
    /// of the legacy diagonal layout.
    pub std_rot: bool,
    /// Colormap image supplying per-position tints, from `blockcolor=`.
    pub color_source: Option<FileHandle>,
    pub transparency: Transparency,
}

impl std::fmt::Debug for BlockTextureMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockTextureMap")
            .field("faces", &self.faces)
            .field("layers", &self.layers)
            .field("color_mult", &self.color_mult)
            .field("has_cust_color_mult", &self.cust_color_mult.is_some())
            .field("blockset", &self.blockset)
            .field("std_rot", &self.std_rot)
            .field("color_source", &self.color_source)
            .field("transparency", &self.transparency)
            .finish()
    }
}

impl BlockTextureMap {
    pub fn blank() -> BlockTextureMap {
        BlockTextureMap {
            faces: vec![BLANK_REF; 6],
            ..BlockTextureMap::default()
        }
    }

    /// Texture for a face index, blank when out of range.
    pub fn face(&self, index: usize) -> TextureRef {
        self.faces.get(index).copied().unwrap_or(BLANK_REF)
    }

    /// Next face in the layer chain, if any.
    pub fn next_layer(&self, face: usize) -> Option<usize> {
        let layers = self.layers.as_ref()?;
        match layers.get(face) {
            Some(&next) if next >= 0 => Some(next as usize),
            _ => None,
        }
    }
}

/// A named key-to-texture table built by `texturemap:`/`addtotexturemap:`
/// lines, materialized into per-state maps once the file finishes.
#[derive(Debug, Clone, Default)]
pub struct NamedTextureMap {
    pub textures: Vec<TextureRef>,
    pub block_names: Vec<String>,
    pub state_ids: Option<Vec<u16>>,
    pub transparency: Transparency,
    pub color_mult: u32,
    pub cust_color_mult_name: Option<String>,
    pub blockset: String,
}

impl NamedTextureMap {
    /// Assign a texture at a key index, growing the table with blanks.
    pub fn set_key(&mut self, key: usize, texture: TextureRef) {
        if self.textures.len() <= key {
            self.textures.resize(key + 1, BLANK_REF);
        }
        self.textures[key] = texture;
    }
}

/// Block states tinted by a colormap image rather than a biome ramp.
#[derive(Debug, Clone, Default)]
pub struct ColorizingData {
    by_state: HashMap<u32, FileHandle>,
}

impl ColorizingData {
    pub fn set(&mut self, state_index: u32, source: FileHandle) {
        self.by_state.insert(state_index, source);
    }

    pub fn get(&self, state_index: u32) -> Option<FileHandle> {
        self.by_state.get(&state_index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }

    /// Drop entries whose colormap image failed to load, so rendering
    /// falls back to untinted sampling instead of sampling garbage.
    pub fn scrub_failed(&mut self, failed: &HashSet<FileHandle>) {
        self.by_state.retain(|_, src| !failed.contains(src));
    }
}

struct MapEntry {
    map: Arc<BlockTextureMap>,
    blockset: String,
}

/// All texture bindings, keyed by global block state index.
#[derive(Default)]
pub struct TextureMaps {
    by_state: HashMap<u32, MapEntry>,
    named: HashMap<String, NamedTextureMap>,
    coloring: ColorizingData,
    blank: Arc<BlockTextureMap>,
}

impl TextureMaps {
    pub fn new() -> TextureMaps {
        TextureMaps {
            blank: Arc::new(BlockTextureMap::blank()),
            ..TextureMaps::default()
        }
    }

    pub fn set(&mut self, state_index: u32, map: Arc<BlockTextureMap>) {
        let blockset = map.blockset.clone();
        self.by_state.insert(state_index, MapEntry { map, blockset });
    }

    /// Bindings for a state; unmapped states render blank.
    pub fn get(&self, state_index: u32) -> &Arc<BlockTextureMap> {
        self.by_state
            .get(&state_index)
            .map(|e| &e.map)
            .unwrap_or(&self.blank)
    }

    pub fn is_mapped(&self, state_index: u32) -> bool {
        self.by_state.contains_key(&state_index)
    }

    /// Copy a source state's bindings onto a target state, optionally
    /// overriding transparency.
    pub fn copy_to_state(
        &mut self,
        target: u32,
        source: &Arc<BlockTextureMap>,
        transparency: Option<Transparency>,
    ) {
        let map = match transparency {
            Some(t) if t != source.transparency => {
                let mut m = (**source).clone();
                m.transparency = t;
                Arc::new(m)
            }
            _ => Arc::clone(source),
        };
        self.set(target, map);
    }

    pub fn named_mut(&mut self, mapid: &str) -> &mut NamedTextureMap {
        self.named.entry(mapid.to_string()).or_default()
    }

    pub fn named(&self, mapid: &str) -> Option<&NamedTextureMap> {
        self.named.get(mapid)
    }

    pub fn named_ids(&self) -> impl Iterator<Item = &String> {
        self.named.keys()
    }

    pub fn coloring(&self) -> &ColorizingData {
        &self.coloring
    }

    pub fn coloring_mut(&mut self) -> &mut ColorizingData {
        &mut self.coloring
    }

    pub fn len(&self) -> usize {
        self.by_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_state.is_empty()
    }

    /// Drop every binding owned by a blockset, ahead of reloading it.
    pub fn reset_blockset(&mut self, blockset: &str) {
        self.by_state.retain(|_, e| e.blockset != blockset);
        self.named.retain(|_, m| m.blockset != blockset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_decode() {
        assert_eq!(TextureOp::from_code(0), TextureOp::None);
        assert_eq!(TextureOp::from_code(1), TextureOp::GrassToned);
        assert_eq!(TextureOp::from_code(12), TextureOp::ClearInside);
        assert_eq!(TextureOp::from_code(17), TextureOp::MultToned);
        assert_eq!(TextureOp::from_code(22), TextureOp::FoliageMultToned);
        // 16 was never assigned.
        assert_eq!(TextureOp::from_code(16), TextureOp::None);
    }

    #[test]
    fn test_face_and_layers() {
        let mut map = BlockTextureMap::blank();
        map.faces[0] = TextureRef::new(5, TextureOp::None);
        map.layers = Some(vec![-1, 3, -1, -1, -1, -1]);
        assert_eq!(map.face(0).tile, 5);
        assert!(map.face(1).is_blank());
        assert!(map.face(99).is_blank());
        assert_eq!(map.next_layer(1), Some(3));
        assert_eq!(map.next_layer(0), None);
        assert_eq!(map.next_layer(3), None);
    }

    #[test]
    fn test_table_defaults_blank() {
        let maps = TextureMaps::new();
        assert!(maps.get(42).face(0).is_blank());
        assert!(!maps.is_mapped(42));
    }

    #[test]
    fn test_copy_with_transparency_override() {
        let mut maps = TextureMaps::new();
        let mut src = BlockTextureMap::blank();
        src.faces[2] = TextureRef::new(9, TextureOp::Rot90);
        src.transparency = Transparency::Opaque;
        let src = Arc::new(src);
        maps.set(1, Arc::clone(&src));
        maps.copy_to_state(2, &src, Some(Transparency::Transparent));
        maps.copy_to_state(3, &src, None);
        assert_eq!(maps.get(2).face(2).tile, 9);
        assert_eq!(maps.get(2).transparency, Transparency::Transparent);
        // No override shares the source allocation.
        assert!(Arc::ptr_eq(maps.get(3), &src));
    }

    #[test]
    fn test_named_map_growth() {
        let mut maps = TextureMaps::new();
        let named = maps.named_mut("beds");
        named.set_key(4, TextureRef::new(12, TextureOp::None));
        named.set_key(1, TextureRef::new(7, TextureOp::None));
        let named = maps.named("beds").unwrap();
        assert_eq!(named.textures.len(), 5);
        assert_eq!(named.textures[1].tile, 7);
        assert!(named.textures[0].is_blank());
        assert_eq!(named.textures[4].tile, 12);
    }

    #[test]
    fn test_coloring_scrub() {
        let mut data = ColorizingData::default();
        data.set(1, FileHandle(3));
        data.set(2, FileHandle(4));
        let mut failed = HashSet::new();
        failed.insert(FileHandle(4));
        data.scrub_failed(&failed);
        assert_eq!(data.get(1), Some(FileHandle(3)));
        assert_eq!(data.get(2), None);
    }

    #[test]
    fn test_blockset_reset() {
        let mut maps = TextureMaps::new();
        let mut a = BlockTextureMap::blank();
        a.blockset = "core".to_string();
        let mut b = BlockTextureMap::blank();
        b.blockset = "mods".to_string();
        maps.set(1, Arc::new(a));
        maps.set(2, Arc::new(b));
        maps.reset_blockset("mods");
        assert!(maps.is_mapped(1));
        assert!(!maps.is_mapped(2));
    }
}

//! World access seam for the color resolver.
//!
//! Rendering a pixel needs more than the hit block: neighbor lookups for
//! connected textures, and biome data for tinting. [`MapIterator`] is the
//! interface the renderer's world cursor implements; the provided method
//! defaults do single-sample biome shading, and smoothing implementations
//! override them with neighborhood averaging.

use std::collections::HashMap;

use crate::pack::biome::{BiomeInfo, BiomeRamp};
use crate::types::{BlockState, BlockStep};

pub trait MapIterator {
    fn x(&self) -> i32;
    fn y(&self) -> i32;
    fn z(&self) -> i32;

    /// Block at the cursor.
    fn block(&self) -> &BlockState;

    /// Block one step away from the cursor.
    fn block_at(&self, step: BlockStep) -> &BlockState;

    /// Block two steps away, `first` then `second`. Used by the grass-side
    /// substitution to inspect the block under the viewer-side neighbor.
    fn block_at2(&self, first: BlockStep, second: BlockStep) -> &BlockState;

    /// Biome data at the cursor.
    fn biome(&self) -> BiomeInfo;

    /// Grass tint at the cursor. Swamp biomes prefer the swamp-variant
    /// ramp when the pack carries one.
    fn smooth_grass_multiplier(&self, ramp: &BiomeRamp, swamp: Option<&BiomeRamp>) -> u32 {
        let biome = self.biome();
        if let Some(mult) = biome.grass_mult {
            return mult;
        }
        let ramp = match swamp {
            Some(s) if biome.swampy => s,
            _ => ramp,
        };
        ramp.lookup(biome.temperature, biome.rainfall) & 0x00FF_FFFF
    }

    fn smooth_foliage_multiplier(&self, ramp: &BiomeRamp, swamp: Option<&BiomeRamp>) -> u32 {
        let biome = self.biome();
        if let Some(mult) = biome.foliage_mult {
            return mult;
        }
        let ramp = match swamp {
            Some(s) if biome.swampy => s,
            _ => ramp,
        };
        ramp.lookup(biome.temperature, biome.rainfall) & 0x00FF_FFFF
    }

    /// Water tint; packs without a water colormap fall back to per-biome
    /// overrides, untinted otherwise.
    fn smooth_water_multiplier(&self, ramp: Option<&BiomeRamp>) -> u32 {
        let biome = self.biome();
        match ramp {
            Some(r) if r.is_loaded() => r.lookup(biome.temperature, biome.rainfall) & 0x00FF_FFFF,
            _ => biome.water_mult.unwrap_or(0x00FF_FFFF),
        }
    }
}

/// A fixed-position iterator over explicit block data, for tests and
/// single-block rendering.
#[derive(Debug, Clone)]
pub struct StaticMapIterator {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub block: BlockState,
    pub neighbors: HashMap<BlockStep, BlockState>,
    pub neighbors2: HashMap<(BlockStep, BlockStep), BlockState>,
    pub biome: BiomeInfo,
    air: BlockState,
}

impl StaticMapIterator {
    pub fn new(x: i32, y: i32, z: i32, block: BlockState) -> StaticMapIterator {
        StaticMapIterator {
            x,
            y,
            z,
            block,
            neighbors: HashMap::new(),
            neighbors2: HashMap::new(),
            biome: BiomeInfo::default(),
            air: BlockState::air(),
        }
    }

    pub fn with_neighbor(mut self, step: BlockStep, block: BlockState) -> StaticMapIterator {
        self.neighbors.insert(step, block);
        self
    }

    pub fn with_neighbor2(
        mut self,
        first: BlockStep,
        second: BlockStep,
        block: BlockState,
    ) -> StaticMapIterator {
        self.neighbors2.insert((first, second), block);
        self
    }

    pub fn with_biome(mut self, biome: BiomeInfo) -> StaticMapIterator {
        self.biome = biome;
        self
    }
}

impl MapIterator for StaticMapIterator {
    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }

    fn z(&self) -> i32 {
        self.z
    }

    fn block(&self) -> &BlockState {
        &self.block
    }

    fn block_at(&self, step: BlockStep) -> &BlockState {
        self.neighbors.get(&step).unwrap_or(&self.air)
    }

    fn block_at2(&self, first: BlockStep, second: BlockStep) -> &BlockState {
        self.neighbors2.get(&(first, second)).unwrap_or(&self.air)
    }

    fn biome(&self) -> BiomeInfo {
        self.biome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_iterator_neighbors() {
        let it = StaticMapIterator::new(0, 64, 0, BlockState::named("minecraft:stone"))
            .with_neighbor(BlockStep::YPlus, BlockState::named("minecraft:snow"));
        assert_eq!(it.block().name, "minecraft:stone");
        assert_eq!(it.block_at(BlockStep::YPlus).name, "minecraft:snow");
        assert!(it.block_at(BlockStep::XPlus).is_air());
    }

    #[test]
    fn test_default_biome_multipliers() {
        let ramp = BiomeRamp::missing();
        let it = StaticMapIterator::new(0, 0, 0, BlockState::named("minecraft:grass_block"));
        // Missing ramps read white.
        assert_eq!(it.smooth_grass_multiplier(&ramp, None), 0x00FF_FFFF);
        let mut biome = BiomeInfo::default();
        biome.grass_mult = Some(0x112233);
        let it = it.with_biome(biome);
        assert_eq!(it.smooth_grass_multiplier(&ramp, None), 0x112233);
    }

    #[test]
    fn test_water_multiplier_fallbacks() {
        let it = StaticMapIterator::new(0, 0, 0, BlockState::named("minecraft:water"));
        assert_eq!(it.smooth_water_multiplier(None), 0x00FF_FFFF);
        let mut biome = BiomeInfo::default();
        biome.water_mult = Some(0x3F76E4);
        let it = it.with_biome(biome);
        assert_eq!(it.smooth_water_multiplier(None), 0x3F76E4);
    }
}

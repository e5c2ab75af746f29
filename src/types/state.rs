//! Block state identity and the interned state table.
//!
//! Every per-block lookup table in the engine is keyed by a stable integer
//! `global_state_index`. The table is built once at startup from the fixed
//! list of known blocks and their state counts, and is immutable afterwards.

use std::collections::HashMap;

/// One block type plus a state/data variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockState {
    /// Namespaced block name, e.g. `minecraft:grass_block`.
    pub name: String,
    /// State/data variant within the block.
    pub variant: u16,
    /// Stable key into all per-block tables.
    pub global_index: u32,
    /// Whether this variant holds water in addition to its own geometry.
    pub waterlogged: bool,
}

impl BlockState {
    /// A detached state for a bare block name, outside any table.
    pub fn named(name: &str) -> BlockState {
        BlockState {
            name: name.to_string(),
            variant: 0,
            global_index: 0,
            waterlogged: false,
        }
    }

    pub fn air() -> BlockState {
        BlockState::named("minecraft:air")
    }

    pub fn is_air(&self) -> bool {
        matches!(
            base_name(&self.name),
            "air" | "cave_air" | "void_air"
        )
    }

    pub fn is_water(&self) -> bool {
        matches!(base_name(&self.name), "water" | "flowing_water")
    }

    pub fn is_snow(&self) -> bool {
        matches!(base_name(&self.name), "snow" | "snow_block")
    }

    pub fn is_grass(&self) -> bool {
        matches!(base_name(&self.name), "grass_block" | "grass")
    }

    /// True when water occupies this block, either directly or by logging.
    pub fn is_water_filled(&self) -> bool {
        self.is_water() || self.waterlogged
    }

    /// Same block type, ignoring the state variant.
    pub fn is_same_base(&self, other: &BlockState) -> bool {
        self.name == other.name
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Interned table of all known block states.
///
/// States for one block occupy a contiguous index range, so
/// `global_index = base_index + variant`.
#[derive(Debug, Default)]
pub struct BlockStateTable {
    states: Vec<BlockState>,
    base_by_name: HashMap<String, u32>,
    variant_counts: HashMap<String, u16>,
}

impl BlockStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block with `variants` state variants, allocating contiguous
    /// global indices. Re-registering an existing block is a no-op returning
    /// the original base index.
    pub fn register_block(&mut self, name: &str, variants: u16) -> u32 {
        if let Some(&base) = self.base_by_name.get(name) {
            return base;
        }
        let base = self.states.len() as u32;
        for variant in 0..variants.max(1) {
            self.states.push(BlockState {
                name: name.to_string(),
                variant,
                global_index: base + variant as u32,
                waterlogged: false,
            });
        }
        self.base_by_name.insert(name.to_string(), base);
        self.variant_counts.insert(name.to_string(), variants.max(1));
        base
    }

    /// Mark a specific variant as waterlogged.
    pub fn set_waterlogged(&mut self, name: &str, variant: u16) {
        if let Some(idx) = self.state_index(name, variant) {
            self.states[idx as usize].waterlogged = true;
        }
    }

    pub fn state_index(&self, name: &str, variant: u16) -> Option<u32> {
        let base = *self.base_by_name.get(name)?;
        let count = *self.variant_counts.get(name)?;
        if variant < count {
            Some(base + variant as u32)
        } else {
            None
        }
    }

    pub fn get(&self, global_index: u32) -> Option<&BlockState> {
        self.states.get(global_index as usize)
    }

    pub fn variant_count(&self, name: &str) -> Option<u16> {
        self.variant_counts.get(name).copied()
    }

    /// Total number of registered states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterate all states in global-index order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockState> {
        self.states.iter()
    }
}

//! Pluggable renderers and color multipliers for `customblock:` and
//! `custColorMult=` directives.
//!
//! Description files name implementations by a registry key; unknown keys
//! log and fall back to nothing, matching how a missing plugin behaves.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::model::{add_box, BoxLimits, PatchDefinition, BOX_PATCH_SLOTS};
use crate::world::MapIterator;

/// Position-dependent tint supplied by a plugin instead of a biome ramp.
pub trait CustomColorMultiplier: Send + Sync {
    /// RGB multiplier for the cursor position.
    fn color_multiplier(&self, map: &dyn MapIterator) -> u32;
}

/// Geometry produced by a custom renderer for one block state.
#[derive(Debug, Clone)]
pub struct CustomGeometry {
    pub patches: Vec<PatchDefinition>,
    /// Number of texture slots the mapping file must bind.
    pub texture_count: usize,
}

/// Builds geometry for blocks delegated by `customblock:` lines.
pub trait CustomRenderer: Send + Sync {
    fn geometry(&self, args: &HashMap<String, String>) -> Option<CustomGeometry>;
}

/// Registry of named renderer and color-multiplier implementations.
#[derive(Default)]
pub struct CustomRegistry {
    renderers: HashMap<String, Arc<dyn CustomRenderer>>,
    color_multipliers: HashMap<String, Arc<dyn CustomColorMultiplier>>,
}

impl CustomRegistry {
    /// Registry pre-populated with the built-in renderers.
    pub fn new() -> CustomRegistry {
        let mut reg = CustomRegistry::default();
        reg.register_renderer("fluid", Arc::new(FluidStateRenderer));
        reg
    }

    pub fn register_renderer(&mut self, key: &str, renderer: Arc<dyn CustomRenderer>) {
        self.renderers.insert(key.to_string(), renderer);
    }

    pub fn register_color_multiplier(
        &mut self,
        key: &str,
        mult: Arc<dyn CustomColorMultiplier>,
    ) {
        self.color_multipliers.insert(key.to_string(), mult);
    }

    pub fn renderer(&self, key: &str) -> Option<&Arc<dyn CustomRenderer>> {
        let hit = self.renderers.get(key);
        if hit.is_none() {
            warn!("no custom renderer registered for {}", key);
        }
        hit
    }

    pub fn color_multiplier(&self, key: &str) -> Option<&Arc<dyn CustomColorMultiplier>> {
        let hit = self.color_multipliers.get(key);
        if hit.is_none() {
            warn!("no custom color multiplier registered for {}", key);
        }
        hit
    }
}

/// Built-in renderer for fluids: a box whose top surface drops with the
/// fluid level (0 full through 8 near-empty).
pub struct FluidStateRenderer;

impl CustomRenderer for FluidStateRenderer {
    fn geometry(&self, args: &HashMap<String, String>) -> Option<CustomGeometry> {
        let level: u32 = match args.get("level") {
            Some(v) => v.parse().ok()?,
            None => 0,
        };
        if level > 8 {
            return None;
        }
        let mut patches = Vec::new();
        add_box(
            &mut patches,
            &BoxLimits {
                ymax: 1.0 - (level as f64 / 9.0),
                patches: BOX_PATCH_SLOTS,
                ..BoxLimits::default()
            },
        );
        Some(CustomGeometry {
            patches,
            texture_count: 6,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluid_renderer_levels() {
        let reg = CustomRegistry::new();
        let r = reg.renderer("fluid").unwrap();
        let full = r.geometry(&HashMap::new()).unwrap();
        assert_eq!(full.patches.len(), 6);
        assert_eq!(full.texture_count, 6);
        assert_eq!(full.patches[1].origin.y, 1.0);

        let mut args = HashMap::new();
        args.insert("level".to_string(), "8".to_string());
        let low = r.geometry(&args).unwrap();
        assert!(low.patches[1].origin.y < 0.12);

        args.insert("level".to_string(), "9".to_string());
        assert!(r.geometry(&args).is_none());
    }

    #[test]
    fn test_unknown_keys_are_none() {
        let reg = CustomRegistry::new();
        assert!(reg.renderer("missing").is_none());
        assert!(reg.color_multiplier("missing").is_none());
    }
}

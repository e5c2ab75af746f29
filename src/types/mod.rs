//! Shared vocabulary types: face steps, block states, colors.

pub mod color;
pub mod state;
pub mod step;

pub use color::Color;
pub use state::{BlockState, BlockStateTable};
pub use step::BlockStep;

/// Transparency classification for a block's textures.
///
/// `Leaves` only exists in description files; it is resolved to `Opaque` or
/// `Transparent` at parse time based on the configured leaf rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transparency {
    #[default]
    Opaque,
    Transparent,
    SemiTransparent,
}

impl Transparency {
    /// Parse a transparency keyword, resolving LEAVES via the leaf mode flag.
    pub fn parse(s: &str, leaves_transparent: bool) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPAQUE" => Some(Transparency::Opaque),
            "TRANSPARENT" => Some(Transparency::Transparent),
            "SEMITRANSPARENT" => Some(Transparency::SemiTransparent),
            "LEAVES" => Some(if leaves_transparent {
                Transparency::Transparent
            } else {
                Transparency::Opaque
            }),
            _ => None,
        }
    }
}

//! Face step directions used by the ray tracer and face-binding tables.

use serde::{Deserialize, Serialize};

/// The direction of the last step a traced ray took when entering a block.
///
/// The ordinal values index the per-face texture slot arrays, so their order
/// is part of the description-file contract: `face0`..`face5` in texture
/// files map onto these via [`BlockStep::from_face_ordinal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStep {
    XPlus = 0,
    YPlus = 1,
    ZPlus = 2,
    XMinus = 3,
    YMinus = 4,
    ZMinus = 5,
}

impl BlockStep {
    /// All six steps in ordinal order.
    pub const ALL: [BlockStep; 6] = [
        BlockStep::XPlus,
        BlockStep::YPlus,
        BlockStep::ZPlus,
        BlockStep::XMinus,
        BlockStep::YMinus,
        BlockStep::ZMinus,
    ];

    /// Slot index into a face-binding array.
    #[inline]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Step with the opposite direction.
    #[inline]
    pub fn opposite(self) -> BlockStep {
        Self::ALL[(self.ordinal() + 3) % 6]
    }

    /// World-coordinate offset of one step in this direction.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            BlockStep::XPlus => (1, 0, 0),
            BlockStep::YPlus => (0, 1, 0),
            BlockStep::ZPlus => (0, 0, 1),
            BlockStep::XMinus => (-1, 0, 0),
            BlockStep::YMinus => (0, -1, 0),
            BlockStep::ZMinus => (0, 0, -1),
        }
    }

    /// Map a positional `faceN` ordinal from the texture grammar to a step.
    ///
    /// The grammar's order is `{Y+, Y-, Z+, Z-, X+, X-}`.
    pub fn from_face_ordinal(n: usize) -> Option<BlockStep> {
        const FACE_TO_STEP: [BlockStep; 6] = [
            BlockStep::YPlus,
            BlockStep::YMinus,
            BlockStep::ZPlus,
            BlockStep::ZMinus,
            BlockStep::XPlus,
            BlockStep::XMinus,
        ];
        FACE_TO_STEP.get(n).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_round_trip() {
        for step in BlockStep::ALL {
            assert_eq!(step.opposite().opposite(), step);
            let (x, y, z) = step.offset();
            let (ox, oy, oz) = step.opposite().offset();
            assert_eq!((x + ox, y + oy, z + oz), (0, 0, 0));
        }
    }

    #[test]
    fn test_face_ordinal_mapping() {
        assert_eq!(BlockStep::from_face_ordinal(0), Some(BlockStep::YPlus));
        assert_eq!(BlockStep::from_face_ordinal(1), Some(BlockStep::YMinus));
        assert_eq!(BlockStep::from_face_ordinal(5), Some(BlockStep::XMinus));
        assert_eq!(BlockStep::from_face_ordinal(6), None);
    }

    #[test]
    fn test_ordinals_are_stable() {
        // These values index serialized face arrays; they must never change.
        assert_eq!(BlockStep::XPlus.ordinal(), 0);
        assert_eq!(BlockStep::YMinus.ordinal(), 4);
        assert_eq!(BlockStep::ZMinus.ordinal(), 5);
    }
}

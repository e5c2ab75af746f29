//! Packed ARGB color with the byte-channel blend math used by the renderer.

/// A packed ARGB color. All blending is integer `(a*b)/255` per channel,
/// matching the reference renderer's output bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(u32);

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color(0);

    /// Opaque white, the identity for multiplicative blending.
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    #[inline]
    pub fn from_argb(argb: u32) -> Color {
        Color(argb)
    }

    /// Build from an RGB value with full alpha.
    #[inline]
    pub fn from_rgb(rgb: u32) -> Color {
        Color(0xFF00_0000 | (rgb & 0x00FF_FFFF))
    }

    #[inline]
    pub fn argb(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn alpha(self) -> u32 {
        (self.0 >> 24) & 0xFF
    }

    #[inline]
    pub fn red(self) -> u32 {
        (self.0 >> 16) & 0xFF
    }

    #[inline]
    pub fn green(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    #[inline]
    pub fn blue(self) -> u32 {
        self.0 & 0xFF
    }

    #[inline]
    pub fn is_transparent(self) -> bool {
        self.alpha() == 0
    }

    /// Replace the alpha channel.
    #[inline]
    pub fn with_alpha(self, alpha: u32) -> Color {
        Color(((alpha & 0xFF) << 24) | (self.0 & 0x00FF_FFFF))
    }

    /// Multiplicative blend with `mult`, keeping this color's alpha.
    #[inline]
    pub fn blend(self, mult: Color) -> Color {
        let r = (self.red() * mult.red()) / 255;
        let g = (self.green() * mult.green()) / 255;
        let b = (self.blue() * mult.blue()) / 255;
        Color((self.0 & 0xFF00_0000) | (r << 16) | (g << 8) | b)
    }

    /// Multiplicative blend with a bare RGB multiplier.
    #[inline]
    pub fn blend_rgb(self, rgb: u32) -> Color {
        self.blend(Color::from_rgb(rgb))
    }

    /// Multiplicative blend across all four channels, alpha included.
    /// A multiplier with alpha 0xFF leaves this color's alpha unchanged.
    #[inline]
    pub fn blend_argb(self, argb: u32) -> Color {
        let mult = Color(argb);
        let a = (self.alpha() * mult.alpha()) / 255;
        self.blend(mult).with_alpha(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_accessors() {
        let c = Color::from_argb(0x80FF_8040);
        assert_eq!(c.alpha(), 0x80);
        assert_eq!(c.red(), 0xFF);
        assert_eq!(c.green(), 0x80);
        assert_eq!(c.blue(), 0x40);
    }

    #[test]
    fn test_blend_white_is_identity() {
        let c = Color::from_argb(0xC412_3456);
        assert_eq!(c.blend(Color::WHITE), c);
    }

    #[test]
    fn test_blend_preserves_alpha() {
        let c = Color::from_argb(0x40FF_FFFF);
        let out = c.blend_rgb(0x336699);
        assert_eq!(out.alpha(), 0x40);
        assert_eq!(out.red(), 0x33);
        assert_eq!(out.green(), 0x66);
        assert_eq!(out.blue(), 0x99);
    }

    #[test]
    fn test_blend_argb_scales_alpha() {
        let c = Color::from_argb(0xFFCC_CCCC);
        // Full-alpha multiplier leaves alpha alone.
        assert_eq!(c.blend_argb(0xFFFF_FFFF), c);
        let out = c.blend_argb(0x80FF_FFFF);
        assert_eq!(out.alpha(), 0x80);
        assert_eq!(out.red(), 0xCC);
    }

    #[test]
    fn test_transparent_predicate() {
        assert!(Color::TRANSPARENT.is_transparent());
        assert!(Color::from_argb(0x00FF_FFFF).is_transparent());
        assert!(!Color::WHITE.is_transparent());
    }
}

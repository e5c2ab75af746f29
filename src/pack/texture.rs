//! Image decoding into packed ARGB pixel buffers.

use crate::error::Result;

/// A decoded image: width, height, and row-major packed ARGB pixels.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub width: usize,
    pub height: usize,
    pub argb: Vec<u32>,
}

impl LoadedImage {
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.argb[y * self.width + x]
    }
}

/// Decode a PNG (or other supported container) into a [`LoadedImage`].
pub fn decode_image(data: &[u8]) -> Result<LoadedImage> {
    let img = image::load_from_memory(data)?;
    let rgba = img.to_rgba8();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    let argb = rgba
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
        })
        .collect();
    Ok(LoadedImage {
        width,
        height,
        argb,
    })
}

/// Fully transparent square tile buffer.
pub fn blank_tile(scale: usize) -> Vec<u32> {
    vec![0u32; scale * scale]
}

/// Opaque white square tile buffer.
pub fn white_tile(scale: usize) -> Vec<u32> {
    vec![0xFFFF_FFFFu32; scale * scale]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(width, height, rgba.to_vec()).unwrap();
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_round_trip() {
        let rgba = [255u8, 0, 0, 255, 0, 255, 0, 128, 0, 0, 255, 0, 255, 255, 255, 255];
        let png = encode_png(2, 2, &rgba);
        let img = decode_image(&png).unwrap();
        assert_eq!(img.width, 2);
        assert_eq!(img.height, 2);
        assert_eq!(img.pixel(0, 0), 0xFFFF0000);
        assert_eq!(img.pixel(1, 0), 0x8000FF00);
        assert_eq!(img.pixel(0, 1), 0x000000FF);
        assert_eq!(img.pixel(1, 1), 0xFFFFFFFF);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[test]
    fn test_blank_tiles() {
        assert!(blank_tile(4).iter().all(|&p| p == 0));
        assert!(white_tile(4).iter().all(|&p| p == 0xFFFF_FFFF));
        assert_eq!(blank_tile(16).len(), 256);
    }
}

// THEORY:
// `PixelBuffer` is the immutable raster every stage reads: width x height pixels, four
// bytes each (R, G, B, A), row-major. The orchestrator owns one per detection call and
// lends it out by shared reference, so no stage can mutate the source image.
//
// Decoding PNG/JPEG bytes is delegated to the `image` crate; whatever it decodes is
// normalized to RGBA8 so the rest of the engine only ever sees one layout.

use crate::core_modules::pixel::pixel::{CHANNELS, Channel, Rgb};
use crate::error::{DetectionError, Result};
use image::RgbaImage;

/// A decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes, checking that their length matches the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(DetectionError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decodes PNG, JPEG or any other format the `image` crate recognizes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| DetectionError::decode("input bytes are not a supported image", e))?;
        Ok(Self::from_image(decoded.to_rgba8()))
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The four bytes of pixel `(x, y)`.
    pub fn pixel_at(&self, x: u32, y: u32) -> &[Channel] {
        let start = (y as usize * self.width as usize + x as usize) * CHANNELS;
        &self.data[start..start + CHANNELS]
    }

    pub fn rgb_at(&self, x: u32, y: u32) -> Rgb {
        Rgb::from(self.pixel_at(x, y))
    }

    /// Iterates over every pixel's RGBA bytes in raster order.
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(CHANNELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    #[test]
    fn from_raw_checks_length() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_ok());
        match PixelBuffer::from_raw(2, 2, vec![0; 15]) {
            Err(DetectionError::BufferSize { expected, actual, .. }) => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 15);
            }
            other => panic!("expected BufferSize, got {other:?}"),
        }
    }

    #[test]
    fn decodes_png_bytes() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(2, 1, Rgba([0, 255, 0, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("Error encoding test image.");

        let buffer = PixelBuffer::decode(&bytes).expect("Error decoding test image.");
        assert_eq!(buffer.width(), 3);
        assert_eq!(buffer.height(), 2);
        assert_eq!(buffer.pixel_at(2, 1), &[0, 255, 0, 255]);
        assert_eq!(buffer.rgb_at(0, 0), Rgb::new(0, 0, 0));
        assert_eq!(buffer.pixels().count(), 6);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = PixelBuffer::decode(b"definitely not an image");
        assert!(matches!(result, Err(DetectionError::Decode { .. })));
    }
}

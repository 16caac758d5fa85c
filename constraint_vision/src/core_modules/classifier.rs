// THEORY:
// The classifier is the bridge from color to geometry. It walks the pixel buffer once,
// converts every opaque pixel to HSV and writes 255 into a fresh mask wherever the color
// falls inside the (tolerance-widened) target range. Transparent pixels, which mockup
// templates use for everything outside the product, are never matched.

use crate::core_modules::color_range::ColorRange;
use crate::core_modules::mask::{MATCHED, Mask};
use crate::core_modules::pixel::pixel::{ALPHA_OPAQUE_THRESHOLD, rgb_to_hsv};
use crate::core_modules::pixel_buffer::PixelBuffer;

/// Produces the binary "target color" mask for `buffer`.
pub fn classify_pixels(buffer: &PixelBuffer, range: &ColorRange, tolerance: f32) -> Mask {
    let widened = range.widened(tolerance);
    let mut mask = Mask::new(buffer.width(), buffer.height());

    for (out, pixel) in mask.as_bytes_mut().iter_mut().zip(buffer.pixels()) {
        if pixel[3] < ALPHA_OPAQUE_THRESHOLD {
            continue;
        }
        if widened.contains(&rgb_to_hsv(pixel[0], pixel[1], pixel[2])) {
            *out = MATCHED;
        }
    }

    mask
}

// THEORY:
// Painted constraint areas rarely come out of a JPEG with clean edges. The edge smoother
// blurs the mask with a separable Gaussian (horizontal pass, then vertical pass) and then
// re-binarizes it with a hard threshold. Single-pixel notches get filled, single-pixel
// spurs get shaved, and the result is again a strict 0/255 mask.
//
// Kernel: `ceil(2 * radius) + 1` taps, sigma = radius / 3, normalized to sum to 1.
// Sample coordinates are clamped to the image at the edges; nothing wraps around.

use crate::core_modules::mask::{MATCHED, Mask, UNMATCHED};

/// Largest blur radius the smoother honors; larger radii are clamped to it.
pub const MAX_BLUR_RADIUS: f32 = 50.0;

/// Builds the normalized 1-D Gaussian kernel for `radius`.
///
/// A radius of zero (or less) yields the identity kernel `[1.0]`. Radii above
/// [`MAX_BLUR_RADIUS`] are clamped, so the kernel never exceeds 101 taps.
pub fn gaussian_kernel(radius: f32) -> Vec<f32> {
    if !(radius > 0.0) {
        return vec![1.0];
    }

    let radius = radius.min(MAX_BLUR_RADIUS);
    let size = ((radius * 2.0).ceil() as usize).saturating_add(1);
    let half = (size / 2) as f32;
    let sigma = radius / 3.0;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let offset = i as f32 - half;
            (-(offset * offset) / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

/// Blurs `mask` and thresholds the result: blurred values `>= threshold` become 255.
pub fn smooth_edges(mask: &Mask, blur_radius: f32, threshold: u8) -> Mask {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let mut result = Mask::new(mask.width(), mask.height());
    if width == 0 || height == 0 {
        return result;
    }

    let kernel = gaussian_kernel(blur_radius);
    let half = (kernel.len() / 2) as isize;
    let source = mask.as_bytes();
    let clamp = |value: isize, len: usize| value.clamp(0, len as isize - 1) as usize;

    let mut horizontal = vec![0.0f32; width * height];
    for y in 0..height {
        let row = &source[y * width..(y + 1) * width];
        for x in 0..width {
            horizontal[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sx = clamp(x as isize + k as isize - half, width);
                    row[sx] as f32 * weight
                })
                .sum();
        }
    }

    let threshold = threshold as f32;
    let out = result.as_bytes_mut();
    for y in 0..height {
        for x in 0..width {
            let value: f32 = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sy = clamp(y as isize + k as isize - half, height);
                    horizontal[sy * width + x] * weight
                })
                .sum();
            out[y * width + x] = if value >= threshold { MATCHED } else { UNMATCHED };
        }
    }

    result
}

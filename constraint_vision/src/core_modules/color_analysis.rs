// THEORY:
// The color analyst looks at the original image, not the mask. It answers two questions
// the orchestrator needs when a detection comes back empty or noisy:
//   - Is the target color present at all? (If not, the tolerance is probably too tight.)
//   - How busy is the image? (Many distinct colors suggest texture and JPEG noise that
//     need stronger cleaning; few suggest a flat template.)
//
// Sampling: every 16th byte offset of the RGBA buffer is read as a pixel, i.e. every
// fourth pixel. Transparent samples are skipped. Each sample is converted to HSV and
// dropped into a coarse cell of 10° hue x 20 points saturation x 20 points value; the
// cell histogram is the color distribution, its five fullest cells are the dominant colors.

use crate::core_modules::color_range::ColorRange;
use crate::core_modules::pixel::pixel::{ALPHA_OPAQUE_THRESHOLD, Hsv, rgb_to_hsv};
use crate::core_modules::pixel_buffer::PixelBuffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Byte stride between samples.
pub const SAMPLE_STRIDE_BYTES: usize = 16;
pub const HUE_BUCKET_DEGREES: u16 = 10;
pub const SV_BUCKET_POINTS: u8 = 20;
pub const DOMINANT_COLOR_COUNT: usize = 5;

/// A histogram cell, identified by the lower bound of each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorBucket {
    pub hue: u16,
    pub saturation: u8,
    pub value: u8,
}

impl ColorBucket {
    /// Quantizes `color`. Saturation and value have five cells each; the top cell spans
    /// 80..=100, so fully saturated or fully bright colors share it with 80..99 rather
    /// than getting a sixth, single-value cell.
    pub fn of(color: &Hsv) -> Self {
        let (h, s, v) = color.rounded();
        Self {
            hue: h / HUE_BUCKET_DEGREES * HUE_BUCKET_DEGREES,
            saturation: (s / SV_BUCKET_POINTS * SV_BUCKET_POINTS).min(100 - SV_BUCKET_POINTS),
            value: (v / SV_BUCKET_POINTS * SV_BUCKET_POINTS).min(100 - SV_BUCKET_POINTS),
        }
    }

    /// Key used in the serialized distribution, `"hue-saturation-value"`.
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.hue, self.saturation, self.value)
    }

    /// The color in the middle of the cell.
    pub fn representative(&self) -> Hsv {
        Hsv::new(
            (self.hue + HUE_BUCKET_DEGREES / 2) as f32,
            (self.saturation + SV_BUCKET_POINTS / 2) as f32,
            (self.value + SV_BUCKET_POINTS / 2) as f32,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominantColor {
    pub bucket: ColorBucket,
    /// `#rrggbb` of the cell's middle color.
    pub hex: String,
    pub count: usize,
    /// Share of the opaque samples, 0..=100.
    pub percentage: f32,
}

/// Whole-image color summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub dominant_colors: Vec<DominantColor>,
    /// Sample count per non-empty cell, keyed by [`ColorBucket::key`].
    pub color_distribution: BTreeMap<String, usize>,
    /// Whether any sample matched the target range at the active tolerance.
    pub has_target_color: bool,
    /// Opaque samples that went into the histogram.
    pub sampled_pixels: usize,
}

/// Samples `buffer` and summarizes its colors against `range` widened by `tolerance`.
pub fn analyze_colors(buffer: &PixelBuffer, range: &ColorRange, tolerance: f32) -> ImageAnalysis {
    let widened = range.widened(tolerance);
    let bytes = buffer.as_bytes();
    let mut buckets: BTreeMap<ColorBucket, usize> = BTreeMap::new();
    let mut has_target_color = false;
    let mut sampled_pixels = 0usize;

    for offset in (0..bytes.len().saturating_sub(3)).step_by(SAMPLE_STRIDE_BYTES) {
        let sample = &bytes[offset..offset + 4];
        if sample[3] < ALPHA_OPAQUE_THRESHOLD {
            continue;
        }
        let hsv = rgb_to_hsv(sample[0], sample[1], sample[2]);
        has_target_color |= widened.contains(&hsv);
        *buckets.entry(ColorBucket::of(&hsv)).or_insert(0) += 1;
        sampled_pixels += 1;
    }

    let mut ranked: Vec<(ColorBucket, usize)> = buckets.iter().map(|(b, c)| (*b, *c)).collect();
    // Most frequent first; ties resolved by bucket order so the result is deterministic.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let dominant_colors = ranked
        .into_iter()
        .take(DOMINANT_COLOR_COUNT)
        .map(|(bucket, count)| DominantColor {
            bucket,
            hex: bucket.representative().to_hex(),
            count,
            percentage: count as f32 / sampled_pixels.max(1) as f32 * 100.0,
        })
        .collect();

    ImageAnalysis {
        dominant_colors,
        color_distribution: buckets.iter().map(|(b, c)| (b.key(), *c)).collect(),
        has_target_color,
        sampled_pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets::ALL_GREEN;
    use crate::core_modules::pixel::pixel::hsv_to_rgb;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> PixelBuffer {
        let data = rgba.repeat(width as usize * height as usize);
        PixelBuffer::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn samples_every_fourth_pixel() {
        let analysis = analyze_colors(&solid(8, 8, [0, 255, 0, 255]), &ALL_GREEN.color_range, 10.0);
        assert_eq!(analysis.sampled_pixels, 16);
        assert!(analysis.has_target_color);
        assert_eq!(analysis.dominant_colors.len(), 1);
        assert_eq!(analysis.dominant_colors[0].bucket.hue, 120);
        assert_eq!(analysis.dominant_colors[0].percentage, 100.0);
        assert_eq!(analysis.color_distribution.get("120-80-80"), Some(&16));
    }

    #[test]
    fn transparent_samples_are_skipped() {
        let analysis = analyze_colors(&solid(10, 10, [0, 255, 0, 0]), &ALL_GREEN.color_range, 10.0);
        assert_eq!(analysis.sampled_pixels, 0);
        assert!(!analysis.has_target_color);
        assert!(analysis.dominant_colors.is_empty());
        assert!(analysis.color_distribution.is_empty());
    }

    #[test]
    fn no_green_means_no_target_color() {
        let analysis = analyze_colors(&solid(10, 10, [200, 30, 30, 255]), &ALL_GREEN.color_range, 10.0);
        assert!(!analysis.has_target_color);
        assert_eq!(analysis.dominant_colors[0].bucket.hue, 0);
    }

    #[test]
    fn dominant_colors_are_ranked_and_capped() {
        // Eight runs of distinct hues, 128, 112, ..., 16 pixels long.
        let widths = [8u32, 7, 6, 5, 4, 3, 2, 1];
        let total: u32 = widths.iter().sum::<u32>() * 4;
        let mut data = Vec::new();
        for (i, width) in widths.iter().enumerate() {
            let rgb = hsv_to_rgb(i as f32 * 40.0 + 5.0, 90.0, 90.0);
            for _ in 0..width * 4 * 4 {
                data.extend_from_slice(&[rgb.r, rgb.g, rgb.b, 255]);
            }
        }
        let buffer = PixelBuffer::from_raw(total, 4, data).unwrap();
        let analysis = analyze_colors(&buffer, &ALL_GREEN.color_range, 0.0);

        assert_eq!(analysis.dominant_colors.len(), DOMINANT_COLOR_COUNT);
        let counts: Vec<usize> = analysis.dominant_colors.iter().map(|c| c.count).collect();
        let mut sorted = counts.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(counts, sorted);
        assert_eq!(analysis.dominant_colors[0].bucket.hue, 0);
        assert_eq!(analysis.color_distribution.len(), 8);
    }

    #[test]
    fn bucket_edges() {
        let top = ColorBucket::of(&Hsv::new(359.4, 100.0, 100.0));
        assert_eq!((top.hue, top.saturation, top.value), (350, 80, 80));
        let bottom = ColorBucket::of(&Hsv::new(0.0, 0.0, 0.0));
        assert_eq!(bottom.key(), "0-0-0");
        assert_eq!(ColorBucket::of(&Hsv::new(125.0, 45.0, 65.0)).key(), "120-40-60");
    }

    #[test]
    fn full_saturation_shares_the_top_cell() {
        let full = ColorBucket::of(&Hsv::new(120.0, 100.0, 100.0));
        let strong = ColorBucket::of(&Hsv::new(120.0, 85.0, 81.0));
        assert_eq!(full, strong);
        assert_eq!(full.key(), "120-80-80");
        assert_ne!(full, ColorBucket::of(&Hsv::new(120.0, 79.0, 100.0)));
    }
}

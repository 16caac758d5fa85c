// THEORY:
// The morphological cleaner removes speckle from the classifier's mask with an
// "opening": an erosion (each pixel becomes the minimum of its square neighborhood)
// followed immediately by a dilation (each pixel becomes the maximum). Noise smaller
// than the kernel is eroded away completely and never comes back; regions larger than
// the kernel shrink and then grow back to their original outline.
//
// Edge policy: the square neighborhood is truncated to the image (equivalently,
// sample coordinates are clamped to the nearest edge pixel). A constraint region painted
// up to the template border therefore keeps its border pixels. Because the truncated
// neighborhood relation is symmetric, erosion and dilation stay a proper adjunction and
// the opening is idempotent: cleaning an already cleaned mask changes nothing.
//
// Each pass is done separably, rows then columns. Min/max over a square equals min/max
// over the row window of the column window, so the cost per pixel is `2 * kernel_size`
// comparisons instead of `kernel_size²`.

use crate::core_modules::mask::Mask;

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

impl Extremum {
    #[inline]
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Extremum::Min => a.min(b),
            Extremum::Max => a.max(b),
        }
    }
}

/// Square-window min or max filter, neighborhood truncated at the image edges.
fn rank_filter(mask: &Mask, radius: u32, extremum: Extremum) -> Mask {
    let width = mask.width();
    let height = mask.height();
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }

    let mut horizontal = Mask::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let start = x.saturating_sub(radius);
            let end = x.saturating_add(radius).min(width - 1);
            let value = (start..=end)
                .map(|xx| mask.get(xx, y))
                .reduce(|a, b| extremum.pick(a, b))
                .unwrap_or(0);
            horizontal.set(x, y, value);
        }
    }

    let mut result = Mask::new(width, height);
    for y in 0..height {
        let start = y.saturating_sub(radius);
        let end = y.saturating_add(radius).min(height - 1);
        for x in 0..width {
            let value = (start..=end)
                .map(|yy| horizontal.get(x, yy))
                .reduce(|a, b| extremum.pick(a, b))
                .unwrap_or(0);
            result.set(x, y, value);
        }
    }

    result
}

/// Grayscale erosion over a `(2 * radius + 1)²` square.
pub fn erode(mask: &Mask, radius: u32) -> Mask {
    rank_filter(mask, radius, Extremum::Min)
}

/// Grayscale dilation over a `(2 * radius + 1)²` square.
pub fn dilate(mask: &Mask, radius: u32) -> Mask {
    rank_filter(mask, radius, Extremum::Max)
}

/// Morphological opening, repeated `iterations` times. `kernel_size` should be odd;
/// its radius is `kernel_size / 2`. The input mask is left untouched.
pub fn open(mask: &Mask, kernel_size: u32, iterations: u32) -> Mask {
    let radius = kernel_size / 2;
    let mut current = mask.clone();
    for _ in 0..iterations {
        let eroded = erode(&current, radius);
        current = dilate(&eroded, radius);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::mask::MATCHED;

    #[test]
    fn opening_removes_isolated_pixels() {
        let mut mask = Mask::new(20, 20);
        mask.set(5, 5, MATCHED);
        mask.set(12, 3, MATCHED);
        mask.fill_rect(10, 10, 6, 6);

        let cleaned = open(&mask, 3, 1);
        assert!(!cleaned.is_matched(5, 5));
        assert!(!cleaned.is_matched(12, 3));
        assert_eq!(cleaned.matched_count(), 36);
    }

    #[test]
    fn opening_removes_thin_protrusions() {
        let mask = Mask::from_art(&[
            "..........",
            ".####.....",
            ".#########",
            ".####.....",
            ".####.....",
            "..........",
        ]);
        let cleaned = open(&mask, 3, 1);
        let expected = Mask::from_art(&[
            "..........",
            ".####.....",
            ".####.....",
            ".####.....",
            ".####.....",
            "..........",
        ]);
        assert_eq!(cleaned, expected);
    }

    #[test]
    fn regions_touching_the_border_keep_their_edge_pixels() {
        let mut mask = Mask::new(12, 12);
        mask.fill_rect(0, 0, 12, 12);
        let cleaned = open(&mask, 3, 1);
        assert_eq!(cleaned.matched_count(), 144);

        let mut corner = Mask::new(12, 12);
        corner.fill_rect(0, 0, 4, 4);
        let cleaned = open(&corner, 3, 1);
        assert_eq!(cleaned, corner);
    }

    #[test]
    fn erosion_and_dilation_truncate_at_edges() {
        let mask = Mask::from_art(&["###.", "###.", "###."]);
        let eroded = erode(&mask, 1);
        assert_eq!(eroded, Mask::from_art(&["##..", "##..", "##.."]));
        let dilated = dilate(&eroded, 1);
        assert_eq!(dilated, mask);
    }

    #[test]
    fn opening_is_idempotent() {
        // A deterministic scatter of blobs and speckle.
        let mut mask = Mask::new(48, 40);
        let mut state = 0x2545_f491u32;
        for y in 0..40 {
            for x in 0..48 {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                if state % 3 == 0 {
                    mask.set(x, y, MATCHED);
                }
            }
        }
        mask.fill_rect(4, 4, 10, 8);
        mask.fill_rect(30, 20, 12, 14);

        for (kernel, iterations) in [(3, 1), (5, 1), (3, 2)] {
            let once = open(&mask, kernel, iterations);
            let twice = open(&once, kernel, iterations);
            assert_eq!(once, twice, "kernel {kernel}, iterations {iterations}");
        }
    }

    #[test]
    fn opening_never_adds_pixels() {
        let mask = Mask::from_art(&["#.#.#", ".###.", "#####", ".###.", "#.#.#"]);
        let cleaned = open(&mask, 3, 1);
        for (after, before) in cleaned.as_bytes().iter().zip(mask.as_bytes()) {
            assert!(after <= before);
        }
    }

    #[test]
    fn huge_kernel_is_clamped_to_the_image() {
        let mut mask = Mask::new(6, 6);
        mask.fill_rect(0, 0, 6, 6);
        mask.set(2, 2, 0);
        assert_eq!(erode(&mask, u32::MAX).matched_count(), 0);
        assert_eq!(dilate(&mask, u32::MAX).matched_count(), 36);
    }

    #[test]
    fn zero_iterations_or_unit_kernel_is_identity() {
        let mask = Mask::from_art(&["#..", ".#.", "..#"]);
        assert_eq!(open(&mask, 3, 0), mask);
        assert_eq!(open(&mask, 1, 3), mask);
    }
}

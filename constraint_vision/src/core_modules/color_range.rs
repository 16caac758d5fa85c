// THEORY:
// The range matcher answers one question for the classifier and the color analyst:
// does this HSV color fall inside the configured target range, once the range has been
// widened by the tolerance?
//
// Tolerance is a percentage applied per axis: hue bounds move by `tolerance * 3.6`
// degrees (a percentage of the full circle), saturation and value bounds move by
// `tolerance` points. Bounds are clamped to the axis limits. Colors are compared in
// whole degrees and whole percentages, the units the range is written in.
//
// Hue is circular. A range whose `h_min` exceeds `h_max` straddles 0° (reds, 350..10)
// and matches `h >= h_min || h <= h_max`. Widening such a range far enough makes the two
// arcs meet; at that point it covers the whole circle, which keeps a larger tolerance
// from ever matching fewer colors than a smaller one.

use crate::core_modules::pixel::pixel::Hsv;
use serde::{Deserialize, Serialize};

const HUE_DEGREES_PER_PERCENT: f32 = 3.6;

/// Inclusive bounds on each HSV axis, in the same units as [`Hsv`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorRange {
    pub h_min: f32,
    pub h_max: f32,
    pub s_min: f32,
    pub s_max: f32,
    pub v_min: f32,
    pub v_max: f32,
}

/// A range after tolerance has been applied, ready for per-pixel tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidenedRange {
    pub h_min: f32,
    pub h_max: f32,
    pub s_min: f32,
    pub s_max: f32,
    pub v_min: f32,
    pub v_max: f32,
    /// Set when the original range wraps through 0°.
    pub wraps: bool,
}

impl ColorRange {
    pub fn wraps(&self) -> bool {
        self.h_min > self.h_max
    }

    /// Applies `tolerance` (a percentage) to every bound.
    ///
    /// Computing this once per image instead of once per pixel keeps the classifier
    /// loop down to six comparisons.
    pub fn widened(&self, tolerance: f32) -> WidenedRange {
        let tolerance = tolerance.max(0.0);
        let hue_slack = tolerance * HUE_DEGREES_PER_PERCENT;
        WidenedRange {
            h_min: (self.h_min - hue_slack).max(0.0),
            h_max: (self.h_max + hue_slack).min(360.0),
            s_min: (self.s_min - tolerance).max(0.0),
            s_max: (self.s_max + tolerance).min(100.0),
            v_min: (self.v_min - tolerance).max(0.0),
            v_max: (self.v_max + tolerance).min(100.0),
            wraps: self.wraps(),
        }
    }
}

impl WidenedRange {
    /// Tests the color at whole-degree / whole-percent precision, so a pixel whose
    /// rounded saturation equals `s_min` is inside the range.
    #[inline]
    pub fn contains(&self, color: &Hsv) -> bool {
        let h = color.h.round();
        let s = color.s.round();
        let v = color.v.round();

        let hue_ok = if !self.wraps {
            h >= self.h_min && h <= self.h_max
        } else if self.h_min <= self.h_max {
            true
        } else {
            h >= self.h_min || h <= self.h_max
        };

        hue_ok && s >= self.s_min && s <= self.s_max && v >= self.v_min && v <= self.v_max
    }
}

/// True when `color` lies inside `range` widened by `tolerance` percent.
pub fn is_color_in_range(color: &Hsv, range: &ColorRange, tolerance: f32) -> bool {
    range.widened(tolerance).contains(color)
}

//! Detection settings, presets and the partial-update type used between calls.
//!
//! Settings are plain `Copy` data. A caller may keep a "current" value around, but the
//! engine only ever reads a copy of it; changes happen by merging a [`SettingsPatch`]
//! into a new value or by deriving an adapted copy with
//! [`DetectionSettings::adapted_for`].
//!
//! ```no_run
//! use constraint_vision::config::{DetectionSettings, presets};
//! use std::path::Path;
//!
//! let from_file = DetectionSettings::from_json_file(Path::new("settings.json"))?;
//! let green = presets::ALL_GREEN;
//! # Ok::<(), constraint_vision::DetectionError>(())
//! ```

use crate::core_modules::color_analysis::ImageAnalysis;
use crate::core_modules::color_range::ColorRange;
use crate::core_modules::smoothing::MAX_BLUR_RADIUS;
use crate::error::{DetectionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const TOLERANCE_STEP: f32 = 10.0;
const MAX_ADAPTED_TOLERANCE: f32 = 25.0;
const HIGH_VARIETY_BUCKETS: usize = 50;
const LOW_VARIETY_BUCKETS: usize = 20;
const MIN_KERNEL_SIZE: u32 = 3;
const MAX_KERNEL_SIZE: u32 = 7;
const MAX_ITERATIONS: u32 = 3;
const LARGEST_KERNEL_SIZE: u32 = 31;
const LARGEST_ITERATIONS: u32 = 10;

/// Speckle removal (morphological opening) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseReduction {
    pub enabled: bool,
    /// Side of the square kernel. Must be odd; the radius is `kernel_size / 2`.
    pub kernel_size: u32,
    pub iterations: u32,
}

/// Gaussian blur + threshold parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSmoothing {
    pub enabled: bool,
    pub blur_radius: f32,
    /// Blurred intensities at or above this become 255.
    pub threshold: u8,
}

/// Everything one detection call needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSettings {
    pub color_range: ColorRange,
    /// Percentage by which the color range is widened on every axis.
    pub tolerance: f32,
    /// Smallest region kept, in pixels.
    pub min_area: u64,
    /// Largest region kept, in pixels.
    pub max_area: u64,
    pub noise_reduction: NoiseReduction,
    pub edge_smoothing: EdgeSmoothing,
}

/// A partial settings value. Fields left as `None` keep their current value.
///
/// Nested values are replaced as a whole, not merged field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub color_range: Option<ColorRange>,
    pub tolerance: Option<f32>,
    pub min_area: Option<u64>,
    pub max_area: Option<u64>,
    pub noise_reduction: Option<NoiseReduction>,
    pub edge_smoothing: Option<EdgeSmoothing>,
}

pub mod presets {
    use super::*;

    /// Any reasonably saturated green. The recommended default.
    pub const ALL_GREEN: DetectionSettings = DetectionSettings {
        color_range: ColorRange {
            h_min: 80.0,
            h_max: 160.0,
            s_min: 15.0,
            s_max: 100.0,
            v_min: 15.0,
            v_max: 100.0,
        },
        tolerance: 10.0,
        min_area: 50,
        max_area: 50_000,
        noise_reduction: NoiseReduction {
            enabled: true,
            kernel_size: 3,
            iterations: 1,
        },
        edge_smoothing: EdgeSmoothing {
            enabled: true,
            blur_radius: 1.0,
            threshold: 128,
        },
    };

    /// Vivid chroma-key green only; ignores olive and dark greens in the product photo.
    pub const BRIGHT_GREEN: DetectionSettings = DetectionSettings {
        color_range: ColorRange {
            h_min: 90.0,
            h_max: 150.0,
            s_min: 50.0,
            s_max: 100.0,
            v_min: 50.0,
            v_max: 100.0,
        },
        tolerance: 5.0,
        ..ALL_GREEN
    };

    /// Blue-screen marked templates, for products that are themselves green.
    pub const CHROMA_BLUE: DetectionSettings = DetectionSettings {
        color_range: ColorRange {
            h_min: 200.0,
            h_max: 250.0,
            s_min: 40.0,
            s_max: 100.0,
            v_min: 30.0,
            v_max: 100.0,
        },
        ..ALL_GREEN
    };

    /// Looks a preset up by name, ignoring case and `-`/`_` differences.
    pub fn by_name(name: &str) -> Option<DetectionSettings> {
        match name.to_ascii_uppercase().replace('-', "_").as_str() {
            "ALL_GREEN" => Some(ALL_GREEN),
            "BRIGHT_GREEN" => Some(BRIGHT_GREEN),
            "CHROMA_BLUE" => Some(CHROMA_BLUE),
            _ => None,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        presets::ALL_GREEN
    }
}

impl DetectionSettings {
    /// Parses and validates settings from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: DetectionSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates settings from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Rejects settings that could only ever produce an empty or meaningless result.
    ///
    /// `h_min > h_max` is accepted: it is a range that wraps through 0°.
    pub fn validate(&self) -> Result<()> {
        let range = &self.color_range;
        for (name, value, max) in [
            ("colorRange.hMin", range.h_min, 360.0),
            ("colorRange.hMax", range.h_max, 360.0),
            ("colorRange.sMin", range.s_min, 100.0),
            ("colorRange.sMax", range.s_max, 100.0),
            ("colorRange.vMin", range.v_min, 100.0),
            ("colorRange.vMax", range.v_max, 100.0),
        ] {
            if !value.is_finite() || !(0.0..=max).contains(&value) {
                return Err(DetectionError::invalid(name, value, "outside the axis limits"));
            }
        }
        if range.s_min > range.s_max {
            return Err(DetectionError::invalid(
                "colorRange.sMin",
                range.s_min,
                "greater than sMax",
            ));
        }
        if range.v_min > range.v_max {
            return Err(DetectionError::invalid(
                "colorRange.vMin",
                range.v_min,
                "greater than vMax",
            ));
        }
        if !self.tolerance.is_finite() || !(0.0..=100.0).contains(&self.tolerance) {
            return Err(DetectionError::invalid(
                "tolerance",
                self.tolerance,
                "must be a percentage between 0 and 100",
            ));
        }
        if self.min_area > self.max_area {
            return Err(DetectionError::invalid(
                "minArea",
                self.min_area,
                "greater than maxArea",
            ));
        }
        let kernel_size = self.noise_reduction.kernel_size;
        if kernel_size == 0 || kernel_size % 2 == 0 || kernel_size > LARGEST_KERNEL_SIZE {
            return Err(DetectionError::invalid(
                "noiseReduction.kernelSize",
                kernel_size,
                "must be an odd number between 1 and 31",
            ));
        }
        let iterations = self.noise_reduction.iterations;
        if iterations > LARGEST_ITERATIONS {
            return Err(DetectionError::invalid(
                "noiseReduction.iterations",
                iterations,
                "must be at most 10",
            ));
        }
        let radius = self.edge_smoothing.blur_radius;
        if !radius.is_finite() || !(0.0..=MAX_BLUR_RADIUS).contains(&radius) {
            return Err(DetectionError::invalid(
                "edgeSmoothing.blurRadius",
                radius,
                "must be between 0 and 50",
            ));
        }
        Ok(())
    }

    /// Returns a copy with every field present in `patch` replaced. `self` is untouched.
    pub fn merged(&self, patch: &SettingsPatch) -> DetectionSettings {
        DetectionSettings {
            color_range: patch.color_range.unwrap_or(self.color_range),
            tolerance: patch.tolerance.unwrap_or(self.tolerance),
            min_area: patch.min_area.unwrap_or(self.min_area),
            max_area: patch.max_area.unwrap_or(self.max_area),
            noise_reduction: patch.noise_reduction.unwrap_or(self.noise_reduction),
            edge_smoothing: patch.edge_smoothing.unwrap_or(self.edge_smoothing),
        }
    }

    /// Recommends settings for an image given its color analysis.
    ///
    /// This is a heuristic. When no sampled pixel matched, the tolerance grows by 10
    /// (up to 25, never lowering an already higher tolerance). Busy images get a larger
    /// cleaning kernel and one more iteration; flat images get a smaller kernel and
    /// fewer iterations.
    pub fn adapted_for(&self, analysis: &ImageAnalysis) -> DetectionSettings {
        let mut adapted = *self;

        if !analysis.has_target_color {
            adapted.tolerance = (self.tolerance + TOLERANCE_STEP)
                .min(MAX_ADAPTED_TOLERANCE)
                .max(self.tolerance);
        }

        let variety = analysis.color_distribution.len();
        let noise = &mut adapted.noise_reduction;
        if variety > HIGH_VARIETY_BUCKETS {
            noise.kernel_size = noise.kernel_size.saturating_add(2).min(MAX_KERNEL_SIZE).max(noise.kernel_size);
            noise.iterations = noise.iterations.saturating_add(1).min(MAX_ITERATIONS).max(noise.iterations);
        } else if variety < LOW_VARIETY_BUCKETS {
            noise.kernel_size = noise.kernel_size.saturating_sub(2).max(MIN_KERNEL_SIZE).min(noise.kernel_size);
            noise.iterations = noise.iterations.saturating_sub(1).max(1).min(noise.iterations);
        }

        debug!(
            variety,
            has_target_color = analysis.has_target_color,
            tolerance = adapted.tolerance,
            kernel_size = adapted.noise_reduction.kernel_size,
            iterations = adapted.noise_reduction.iterations,
            "adapted detection settings"
        );
        adapted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn analysis(has_target_color: bool, buckets: usize) -> ImageAnalysis {
        let color_distribution: BTreeMap<String, usize> =
            (0..buckets).map(|i| (format!("bucket-{i}"), 1)).collect();
        ImageAnalysis {
            dominant_colors: Vec::new(),
            color_distribution,
            has_target_color,
            sampled_pixels: buckets,
        }
    }

    #[test]
    fn all_green_is_default_and_valid() {
        let settings = DetectionSettings::default();
        assert_eq!(settings, presets::ALL_GREEN);
        assert_eq!(settings.color_range.h_min, 80.0);
        assert_eq!(settings.color_range.h_max, 160.0);
        assert_eq!(settings.min_area, 50);
        assert_eq!(settings.max_area, 50_000);
        assert!(settings.noise_reduction.enabled);
        assert_eq!(settings.edge_smoothing.threshold, 128);
        settings.validate().expect("preset should validate");
        presets::BRIGHT_GREEN.validate().expect("preset should validate");
        presets::CHROMA_BLUE.validate().expect("preset should validate");
    }

    #[test]
    fn presets_resolve_by_name() {
        assert_eq!(presets::by_name("all-green"), Some(presets::ALL_GREEN));
        assert_eq!(presets::by_name("Chroma_Blue"), Some(presets::CHROMA_BLUE));
        assert_eq!(presets::by_name("purple"), None);
    }

    #[test]
    fn wraparound_hue_is_valid() {
        let mut settings = presets::ALL_GREEN;
        settings.color_range.h_min = 350.0;
        settings.color_range.h_max = 10.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn inverted_saturation_is_rejected() {
        let mut settings = presets::ALL_GREEN;
        settings.color_range.s_min = 80.0;
        settings.color_range.s_max = 20.0;
        match settings.validate() {
            Err(DetectionError::InvalidSettings { parameter, .. }) => {
                assert_eq!(parameter, "colorRange.sMin")
            }
            other => panic!("expected InvalidSettings, got {other:?}"),
        }
    }

    #[test]
    fn bad_scalars_are_rejected() {
        let mut even_kernel = presets::ALL_GREEN;
        even_kernel.noise_reduction.kernel_size = 4;
        assert!(even_kernel.validate().is_err());

        let mut areas = presets::ALL_GREEN;
        areas.min_area = 100;
        areas.max_area = 10;
        assert!(areas.validate().is_err());

        let mut radius = presets::ALL_GREEN;
        radius.edge_smoothing.blur_radius = -1.0;
        assert!(radius.validate().is_err());

        let mut hue = presets::ALL_GREEN;
        hue.color_range.h_max = 400.0;
        assert!(hue.validate().is_err());
    }

    #[test]
    fn oversized_cleaning_and_blur_are_rejected() {
        let mut radius = presets::ALL_GREEN;
        radius.edge_smoothing.blur_radius = 1e30;
        match radius.validate() {
            Err(DetectionError::InvalidSettings { parameter, .. }) => {
                assert_eq!(parameter, "edgeSmoothing.blurRadius")
            }
            other => panic!("expected InvalidSettings, got {other:?}"),
        }
        radius.edge_smoothing.blur_radius = 50.0;
        assert!(radius.validate().is_ok());

        let mut kernel = presets::ALL_GREEN;
        kernel.noise_reduction.kernel_size = u32::MAX;
        assert!(kernel.validate().is_err());
        kernel.noise_reduction.kernel_size = 33;
        assert!(kernel.validate().is_err());
        kernel.noise_reduction.kernel_size = 31;
        assert!(kernel.validate().is_ok());

        let mut iterations = presets::ALL_GREEN;
        iterations.noise_reduction.iterations = 11;
        match iterations.validate() {
            Err(DetectionError::InvalidSettings { parameter, .. }) => {
                assert_eq!(parameter, "noiseReduction.iterations")
            }
            other => panic!("expected InvalidSettings, got {other:?}"),
        }
        iterations.noise_reduction.iterations = 10;
        assert!(iterations.validate().is_ok());
    }

    #[test]
    fn adaptation_saturates_on_extreme_values() {
        let mut extreme = presets::ALL_GREEN;
        extreme.noise_reduction.kernel_size = u32::MAX;
        extreme.noise_reduction.iterations = u32::MAX;
        let busy = extreme.adapted_for(&analysis(true, 60));
        assert_eq!(busy.noise_reduction.kernel_size, u32::MAX);
        assert_eq!(busy.noise_reduction.iterations, u32::MAX);
    }

    #[test]
    fn merge_replaces_only_given_fields() {
        let base = presets::ALL_GREEN;
        let patch = SettingsPatch {
            tolerance: Some(20.0),
            min_area: Some(10),
            ..Default::default()
        };
        let merged = base.merged(&patch);
        assert_eq!(merged.tolerance, 20.0);
        assert_eq!(merged.min_area, 10);
        assert_eq!(merged.max_area, base.max_area);
        assert_eq!(merged.color_range, base.color_range);
        assert_eq!(base.tolerance, 10.0);
    }

    #[test]
    fn json_round_trip_uses_camel_case() {
        let json = serde_json::to_string(&presets::ALL_GREEN).unwrap();
        assert!(json.contains("\"hMin\":80.0"));
        assert!(json.contains("\"kernelSize\":3"));
        let parsed = DetectionSettings::from_json_str(&json).unwrap();
        assert_eq!(parsed, presets::ALL_GREEN);
    }

    #[test]
    fn patch_parses_from_sparse_json() {
        let patch: SettingsPatch = serde_json::from_str(r#"{"tolerance": 15}"#).unwrap();
        assert_eq!(patch.tolerance, Some(15.0));
        assert!(patch.color_range.is_none());
    }

    #[test]
    fn invalid_json_settings_are_rejected() {
        let mut settings = presets::ALL_GREEN;
        settings.tolerance = 150.0;
        let json = serde_json::to_string(&settings).unwrap();
        assert!(matches!(
            DetectionSettings::from_json_str(&json),
            Err(DetectionError::InvalidSettings { .. })
        ));
        assert!(matches!(
            DetectionSettings::from_json_str("{not json"),
            Err(DetectionError::SettingsParse(_))
        ));
    }

    #[test]
    fn missing_target_color_raises_tolerance() {
        let settings = presets::ALL_GREEN;
        let adapted = settings.adapted_for(&analysis(false, 30));
        assert_eq!(adapted.tolerance, 20.0);
        let again = adapted.adapted_for(&analysis(false, 30));
        assert_eq!(again.tolerance, 25.0);
        assert_eq!(settings.tolerance, 10.0);

        let mut high = presets::ALL_GREEN;
        high.tolerance = 40.0;
        assert_eq!(high.adapted_for(&analysis(false, 30)).tolerance, 40.0);
    }

    #[test]
    fn present_target_color_keeps_tolerance() {
        let adapted = presets::ALL_GREEN.adapted_for(&analysis(true, 30));
        assert_eq!(adapted, presets::ALL_GREEN);
    }

    #[test]
    fn variety_scales_noise_reduction() {
        let busy = presets::ALL_GREEN.adapted_for(&analysis(true, 80));
        assert_eq!(busy.noise_reduction.kernel_size, 5);
        assert_eq!(busy.noise_reduction.iterations, 2);

        let mut strong = presets::ALL_GREEN;
        strong.noise_reduction.kernel_size = 7;
        strong.noise_reduction.iterations = 3;
        let flat = strong.adapted_for(&analysis(true, 5));
        assert_eq!(flat.noise_reduction.kernel_size, 5);
        assert_eq!(flat.noise_reduction.iterations, 2);

        let minimal = presets::ALL_GREEN.adapted_for(&analysis(true, 5));
        assert_eq!(minimal.noise_reduction.kernel_size, 3);
        assert_eq!(minimal.noise_reduction.iterations, 1);
    }
}

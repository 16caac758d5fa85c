// THEORY:
// The `pipeline` module is the top-level API of the detection engine. It wraps the stage
// stack into one call: decode the uploaded template, classify its pixels, clean and
// smooth the mask, extract regions, and package them with a whole-image color analysis
// and the time it all took.
//
// Stage order for one call:
//   Classifier -> Cleaner (if enabled) -> Smoother (if enabled) -> Extractor
//   Color Analyst (reads the same immutable buffer, independent of the mask stages)
//
// The `ConstraintDetector` holds a "current settings" value between calls, but no call
// ever mutates it. `analyze_image` merges an optional override into a copy, and
// `update_settings` swaps in a validated replacement. Nothing is global; callers that
// want concurrency either own a detector per thread or use `DetectionPool`.

use crate::config::{DetectionSettings, SettingsPatch};
use crate::core_modules::classifier::classify_pixels;
use crate::core_modules::color_analysis::analyze_colors;
use crate::core_modules::mask::Mask;
use crate::core_modules::morphology;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region_extractor::region_extractor;
use crate::core_modules::smoothing::smooth_edges;
use crate::error::Result;
use crate::visualizer;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::color_analysis::{ColorBucket, DominantColor, ImageAnalysis};
pub use crate::core_modules::region::{BoundingBox, DetectedRegion, Point, RelativeRegion};

/// Everything one detection call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Regions in raster order of their top-left-most pixel.
    pub regions: Vec<DetectedRegion>,
    /// Sum of region areas, in pixels.
    pub total_area: u64,
    /// Mean region confidence, 0 when there are no regions.
    pub average_confidence: f32,
    /// Wall-clock time of the whole call, decode included when there was one.
    pub processing_time_ms: f64,
    pub image_analysis: ImageAnalysis,
    pub image_width: u32,
    pub image_height: u32,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions scaled to fractions of the image size.
    pub fn relative_regions(&self) -> Vec<RelativeRegion> {
        self.regions
            .iter()
            .map(|r| r.relative_to(self.image_width, self.image_height))
            .collect()
    }
}

/// Runs the full stage stack over an already decoded buffer with `settings`.
///
/// Settings are validated first; the stages themselves cannot fail.
pub fn detect(buffer: &PixelBuffer, settings: &DetectionSettings) -> Result<DetectionResult> {
    let started = Instant::now();
    settings.validate()?;
    Ok(run_stages(buffer, settings, started))
}

/// Decodes `image_bytes` and runs [`detect`] on the result.
pub fn detect_bytes(image_bytes: &[u8], settings: &DetectionSettings) -> Result<DetectionResult> {
    let started = Instant::now();
    settings.validate()?;
    let buffer = PixelBuffer::decode(image_bytes)?;
    debug!(
        width = buffer.width(),
        height = buffer.height(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "decoded image"
    );
    Ok(run_stages(&buffer, settings, started))
}

fn run_stages(buffer: &PixelBuffer, settings: &DetectionSettings, started: Instant) -> DetectionResult {
    // Stage 1: Pixel Classification
    let stage = Instant::now();
    let mut mask: Mask = classify_pixels(buffer, &settings.color_range, settings.tolerance);
    let matched = mask.matched_count();
    debug!(
        stage = "classify",
        matched,
        elapsed_us = stage.elapsed().as_micros() as u64
    );

    if matched == 0 {
        warn!("no pixel matched the color range, skipping noise reduction and edge smoothing");
    } else {
        // Stage 2: Noise Reduction
        let noise = &settings.noise_reduction;
        if noise.enabled {
            let stage = Instant::now();
            mask = morphology::open(&mask, noise.kernel_size, noise.iterations);
            debug!(
                stage = "open",
                matched = mask.matched_count(),
                elapsed_us = stage.elapsed().as_micros() as u64
            );
        }

        // Stage 3: Edge Smoothing
        let smoothing = &settings.edge_smoothing;
        if smoothing.enabled {
            let stage = Instant::now();
            mask = smooth_edges(&mask, smoothing.blur_radius, smoothing.threshold);
            debug!(
                stage = "smooth",
                matched = mask.matched_count(),
                elapsed_us = stage.elapsed().as_micros() as u64
            );
        }
    }

    // Stage 4: Region Extraction
    let stage = Instant::now();
    let regions = region_extractor::find_regions(&mask, settings.min_area, settings.max_area);
    debug!(
        stage = "extract",
        regions = regions.len(),
        elapsed_us = stage.elapsed().as_micros() as u64
    );
    drop(mask);

    // Stage 5: Whole-image Color Analysis
    let image_analysis = analyze_colors(buffer, &settings.color_range, settings.tolerance);
    if !image_analysis.has_target_color {
        debug!(
            sampled = image_analysis.sampled_pixels,
            "no sampled pixel matched the target color range"
        );
    }

    let total_area: u64 = regions.iter().map(|r| r.area).sum();
    let average_confidence = if regions.is_empty() {
        0.0
    } else {
        regions.iter().map(|r| r.confidence as f32).sum::<f32>() / regions.len() as f32
    };
    let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    info!(
        regions = regions.len(),
        total_area,
        average_confidence,
        processing_time_ms,
        "constraint detection finished"
    );

    DetectionResult {
        regions,
        total_area,
        average_confidence,
        processing_time_ms,
        image_analysis,
        image_width: buffer.width(),
        image_height: buffer.height(),
    }
}

/// The engine a caller owns: current settings plus the detection entry points.
#[derive(Debug, Clone, Default)]
pub struct ConstraintDetector {
    settings: DetectionSettings,
}

impl ConstraintDetector {
    /// Builds a detector, rejecting invalid settings up front.
    pub fn new(settings: DetectionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// The current settings.
    pub fn settings(&self) -> &DetectionSettings {
        &self.settings
    }

    /// Merges `patch` into the current settings. On a validation error the current
    /// settings are kept unchanged.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<()> {
        let updated = self.settings.merged(patch);
        updated.validate()?;
        debug!(?patch, "detection settings updated");
        self.settings = updated;
        Ok(())
    }

    /// Detects constraint regions in encoded image bytes (PNG, JPEG, ...).
    ///
    /// `settings_override` applies to this call only.
    pub fn analyze_image(
        &self,
        image_bytes: &[u8],
        settings_override: Option<&SettingsPatch>,
    ) -> Result<DetectionResult> {
        let settings = self.effective_settings(settings_override);
        detect_bytes(image_bytes, &settings)
    }

    /// Same as [`analyze_image`](Self::analyze_image) for a buffer the caller already decoded.
    pub fn analyze_buffer(
        &self,
        buffer: &PixelBuffer,
        settings_override: Option<&SettingsPatch>,
    ) -> Result<DetectionResult> {
        let settings = self.effective_settings(settings_override);
        detect(buffer, &settings)
    }

    /// Recommends settings for an image based on its color analysis. Does not change the
    /// detector; pass the result to a new detector or as an override.
    pub fn adapt_settings_for_image(&self, analysis: &ImageAnalysis) -> DetectionSettings {
        self.settings.adapted_for(analysis)
    }

    /// Renders the regions over the image for inspection, returned as PNG bytes.
    pub fn create_visualization_mask(
        &self,
        image_bytes: &[u8],
        regions: &[DetectedRegion],
    ) -> Result<Vec<u8>> {
        visualizer::create_visualization_mask(image_bytes, regions)
    }

    fn effective_settings(&self, settings_override: Option<&SettingsPatch>) -> DetectionSettings {
        match settings_override {
            Some(patch) => self.settings.merged(patch),
            None => self.settings,
        }
    }
}

// THEORY:
// This file is the main entry point for the `constraint_vision` library crate.
// It defines the public API exposed to the application that hosts the template editor:
// upload a template image, get back the painted constraint areas as rectangles.
//
// The primary goal is to export the `ConstraintDetector` and its associated data
// structures (`DetectionSettings`, `DetectionResult`, `DetectedRegion`, etc.) as the
// high-level interface of the engine, plus `DetectionPool` for callers that analyze many
// templates at once. The stage modules in `core_modules` stay public for tools and
// benchmarks, but normal callers never need them.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod visualizer;

pub use config::{DetectionSettings, EdgeSmoothing, NoiseReduction, SettingsPatch, presets};
pub use core_modules::color_range::ColorRange;
pub use core_modules::pixel_buffer::PixelBuffer;
pub use error::{DetectionError, Result};
pub use parallel_pipeline::DetectionPool;
pub use pipeline::{
    BoundingBox, ConstraintDetector, DetectedRegion, DetectionResult, DominantColor,
    ImageAnalysis, Point, RelativeRegion, detect, detect_bytes,
};

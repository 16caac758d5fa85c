// THEORY:
// The `core_modules` are the individual stages of the detection engine, ordered here
// from the lowest-level building blocks up to the whole-image analysis. Each stage is a
// stateless function over plain data containers; the `pipeline` module wires them.

pub mod pixel;
pub mod color_range;
pub mod pixel_buffer;
pub mod mask;
pub mod classifier;
pub mod morphology;
pub mod smoothing;
pub mod region;
pub mod region_extractor;
pub mod color_analysis;

use anyhow::{Context, bail};
use constraint_vision::{ConstraintDetector, DetectionSettings, presets};
use std::env;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // --- 1. Logging ---
    // Logs go to stderr so the JSON report on stdout can be piped.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    // --- 2. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("Usage: visual_tester <input_image> <output_png> [settings.json | preset] [--adapt]");
        println!("Presets: ALL_GREEN (default), BRIGHT_GREEN, CHROMA_BLUE");
        return Ok(());
    }
    let input_path = &args[1];
    let output_path = &args[2];
    let adapt = args.iter().skip(3).any(|a| a == "--adapt");
    let settings = match args.iter().skip(3).find(|a| !a.starts_with("--")) {
        Some(choice) => load_settings(choice)?,
        None => presets::ALL_GREEN,
    };

    let image_bytes =
        std::fs::read(input_path).with_context(|| format!("failed to read {input_path}"))?;

    // --- 3. Detection ---
    let mut detector = ConstraintDetector::new(settings)?;
    let mut result = detector.analyze_image(&image_bytes, None)?;

    if adapt {
        let adapted = detector.adapt_settings_for_image(&result.image_analysis);
        if adapted != *detector.settings() {
            info!(
                tolerance = adapted.tolerance,
                kernel_size = adapted.noise_reduction.kernel_size,
                iterations = adapted.noise_reduction.iterations,
                "re-running with adapted settings"
            );
            detector = ConstraintDetector::new(adapted)?;
            result = detector.analyze_image(&image_bytes, None)?;
        }
    }

    // --- 4. Report ---
    println!("{}", serde_json::to_string_pretty(&result)?);

    // --- 5. Visualization ---
    let png = detector.create_visualization_mask(&image_bytes, &result.regions)?;
    std::fs::write(output_path, png).with_context(|| format!("failed to write {output_path}"))?;
    info!(
        regions = result.regions.len(),
        output = %output_path,
        "visualization written"
    );

    Ok(())
}

/// A path ending in `.json` is read as a settings file; anything else is a preset name.
fn load_settings(choice: &str) -> anyhow::Result<DetectionSettings> {
    if choice.ends_with(".json") {
        return DetectionSettings::from_json_file(Path::new(choice))
            .with_context(|| format!("failed to load settings from {choice}"));
    }
    match presets::by_name(choice) {
        Some(settings) => Ok(settings),
        None => bail!("unknown preset {choice:?}"),
    }
}

//! Inspect command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::gradient::GradientRoi;

use super::{load_effective_config, open_rgba, SearchArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the inspect command
pub fn run_inspect(
    config_path: Option<&Path>,
    image_path: &Path,
    center: (i32, i32),
    search: &SearchArgs,
    json: bool,
) -> ExitCode {
    let config = match load_effective_config(config_path, search) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let image = match open_rgba(image_path) {
        Ok(img) => img,
        Err(code) => return code,
    };

    let align = &config.align;
    let Some(roi) =
        GradientRoi::extract(&image, center, align.roi_width, align.roi_height, align.threshold)
    else {
        eprintln!(
            "Error: Region {}x{} at ({}, {}) lies outside '{}' ({}x{})",
            align.roi_width,
            align.roi_height,
            center.0,
            center.1,
            image_path.display(),
            image.width(),
            image.height()
        );
        return ExitCode::from(EXIT_ERROR);
    };

    let stats = roi.stats();
    if json {
        let output = serde_json::json!({
            "image": image_path.display().to_string(),
            "center": [center.0, center.1],
            "threshold": align.threshold,
            "stats": stats,
        });
        println!("{}", output);
    } else {
        println!("Region {}x{} at origin ({}, {})", stats.width, stats.height, stats.origin[0], stats.origin[1]);
        println!("  Max magnitude:  {:.1}", stats.max_magnitude);
        println!("  Mean magnitude: {:.1}", stats.mean_magnitude);
        println!("  Edge pixels:    {} (threshold {:.1})", stats.edge_pixels, align.threshold);
        println!("  Opaque pixels:  {}", stats.opaque_pixels);
    }

    ExitCode::from(EXIT_SUCCESS)
}

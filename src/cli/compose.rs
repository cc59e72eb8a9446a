//! Compose command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use image::RgbaImage;

use crate::composition::{compose_override, patched_cells};
use crate::config::{load_config, SheetConfig};
use crate::source::{load_atlas, load_image};
use crate::spritesheet::SpriteSheetConfig;

use super::{load_layout, open_rgba, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Sheet inputs resolved for a compose run
struct Composed {
    atlas: RgbaImage,
    base: String,
    applied_override: Option<PathBuf>,
    overlay: Option<RgbaImage>,
}

/// Execute the compose command
///
/// With both `base` and `overlay` the two files are composed directly and a
/// size mismatch is an error. Otherwise the `[sheet]` section of
/// spritecal.toml supplies the missing inputs and the atlas is resolved with
/// the usual fallbacks.
pub fn run_compose(
    config_path: Option<&Path>,
    base_path: Option<&Path>,
    overlay_path: Option<&Path>,
    output: &Path,
    layout_path: Option<&Path>,
    json: bool,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let layout_path = layout_path.or(config.sheet.layout.as_deref());

    let composed = match (base_path, overlay_path) {
        (Some(base), Some(overlay)) => match compose_files(base, overlay) {
            Ok(c) => c,
            Err(code) => return code,
        },
        (base, _) => {
            let sheet = SheetConfig {
                base: base.map(Path::to_path_buf).or_else(|| config.sheet.base.clone()),
                ..config.sheet.clone()
            };
            compose_configured(&sheet, &load_layout(layout_path))
        }
    };

    if let Err(e) = composed.atlas.save(output) {
        eprintln!("Error: Failed to save '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    // Only a readable layout is used for the patched-frame report
    let patched = composed.overlay.as_ref().and_then(|overlay| {
        layout_path
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|json| SpriteSheetConfig::from_json(&json))
            .map(|layout| patched_cells(overlay, &layout))
    });
    let atlas = &composed.atlas;

    if json {
        let out = serde_json::json!({
            "output": output.display().to_string(),
            "size": [atlas.width(), atlas.height()],
            "base": composed.base,
            "override": composed.applied_override.as_ref().map(|p| p.display().to_string()),
            "patched_frames": patched,
        });
        println!("{}", out);
    } else {
        println!("Saved: {} ({}x{})", output.display(), atlas.width(), atlas.height());
        println!("Base: {}", composed.base);
        match composed.applied_override {
            Some(ref p) => println!("Override: {}", p.display()),
            None => println!("Override: not applied"),
        }
        if let Some(frames) = patched {
            let list: Vec<String> = frames.iter().map(|f| f.to_string()).collect();
            println!("Patched frames: {}", if list.is_empty() { "none".to_string() } else { list.join(", ") });
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

fn compose_files(base_path: &Path, overlay_path: &Path) -> Result<Composed, ExitCode> {
    let base = open_rgba(base_path)?;
    let overlay = open_rgba(overlay_path)?;

    let atlas = compose_override(&base, &overlay).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })?;

    Ok(Composed {
        atlas,
        base: base_path.display().to_string(),
        applied_override: Some(overlay_path.to_path_buf()),
        overlay: Some(overlay),
    })
}

fn compose_configured(sheet: &SheetConfig, layout: &SpriteSheetConfig) -> Composed {
    let (atlas, origin) = load_atlas(sheet, layout);
    let overlay = origin.applied_override.as_deref().and_then(load_image);
    Composed {
        atlas,
        base: origin.base.describe(),
        applied_override: origin.applied_override,
        overlay,
    }
}

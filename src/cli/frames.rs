//! Frames command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::load_config;
use crate::state::DebugState;

use super::{load_layout, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the frames command
pub fn run_frames(
    config_path: Option<&Path>,
    layout_path: Option<&Path>,
    state_path: Option<&Path>,
    json: bool,
) -> ExitCode {
    let state = match state_path {
        Some(path) => DebugState::load_or_default(path),
        None => {
            let config = match load_config(config_path) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::from(EXIT_INVALID_ARGS);
                }
            };
            let layout = layout_path.or(config.sheet.layout.as_deref());
            DebugState::from_config(load_layout(layout))
        }
    };

    let maps = state.frame_maps();
    let relative = maps.relative_y_offsets();

    if json {
        let frames: Vec<_> = maps
            .offsets
            .iter()
            .map(|(index, (x, y))| {
                serde_json::json!({
                    "index": index,
                    "x": x,
                    "y": y,
                    "relative_y": relative.get(index),
                })
            })
            .collect();
        let output = serde_json::json!({
            "frame_size": [maps.frame_size.0, maps.frame_size.1],
            "columns": maps.columns,
            "frames": frames,
        });
        println!("{}", output);
    } else {
        println!("Frame size: {}x{}, {} columns", maps.frame_size.0, maps.frame_size.1, maps.columns);
        for (index, (x, y)) in &maps.offsets {
            let rel = relative.get(index).copied().unwrap_or(0);
            println!("  frame {:>3}: ({:>4}, {:>4})  row offset {:+}", index, x, y, rel);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

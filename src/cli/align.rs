//! Align command implementation

use std::path::Path;
use std::process::ExitCode;

use tracing::info;

use crate::search::{align_frames, search_offset, CancelToken, FrameAlignment, MatchResult};
use crate::source::load_atlas;
use crate::spritesheet::FrameMaps;
use crate::state::DebugState;

use super::{
    load_effective_config, load_layout, open_rgba, SearchArgs, EXIT_ERROR, EXIT_INVALID_ARGS,
    EXIT_SUCCESS,
};

/// Execute the align command
pub fn run_align(
    config_path: Option<&Path>,
    reference_path: &Path,
    target_path: Option<&Path>,
    center: Option<(i32, i32)>,
    all_frames: bool,
    state_path: Option<&Path>,
    min_score: f32,
    search: &SearchArgs,
    json: bool,
) -> ExitCode {
    if center.is_none() && !all_frames {
        eprintln!("Error: Either --x/--y or --all-frames is required");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let config = match load_effective_config(config_path, search) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let params = config.align.search_params();

    let reference = match open_rgba(reference_path) {
        Ok(img) => img,
        Err(code) => return code,
    };
    let target = match target_path {
        Some(path) => match open_rgba(path) {
            Ok(img) => img,
            Err(code) => return code,
        },
        None => {
            let (atlas, origin) = load_atlas(&config.sheet, &load_layout(config.sheet.layout.as_deref()));
            info!(base = %origin.base.describe(), applied_override = ?origin.applied_override, "aligning against configured atlas");
            atlas
        }
    };

    let cancel = CancelToken::new();

    if let Some(center) = center {
        let result = match search_offset(&reference, &target, center, &params, &cancel) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        print_single(center, result.as_ref(), json);
        return if result.is_some() {
            ExitCode::from(EXIT_SUCCESS)
        } else {
            ExitCode::from(EXIT_ERROR)
        };
    }

    // --all-frames: boxes come from the state if given, otherwise the layout grid
    let mut state = match state_path {
        Some(path) => DebugState::load_or_default(path),
        None => DebugState::from_config(load_layout(config.sheet.layout.as_deref())),
    };
    let maps: FrameMaps = state.frame_maps();

    let alignments = match align_frames(&reference, &target, &maps, &params, &cancel) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let applied = match state_path {
        Some(path) => {
            let count = state.apply_alignments(&alignments, min_score);
            if let Err(e) = state.save(path) {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
            Some(count)
        }
        None => None,
    };

    print_frames(&alignments, applied, json);
    ExitCode::from(EXIT_SUCCESS)
}

fn print_single(center: (i32, i32), result: Option<&MatchResult>, json: bool) {
    if json {
        let output = serde_json::json!({
            "center": [center.0, center.1],
            "result": result,
        });
        println!("{}", output);
        return;
    }

    match result {
        Some(r) => println!(
            "Best offset at ({}, {}): dx={} dy={} score={:.3}",
            center.0, center.1, r.offset.dx, r.offset.dy, r.score
        ),
        None => println!("No comparable region at ({}, {})", center.0, center.1),
    }
}

fn print_frames(alignments: &[FrameAlignment], applied: Option<usize>, json: bool) {
    if json {
        let output = serde_json::json!({
            "frames": alignments,
            "applied": applied,
        });
        println!("{}", output);
        return;
    }

    for a in alignments {
        match a.result {
            Some(r) => println!(
                "frame {:>3}: dx={:>3} dy={:>3} score={:.3}",
                a.frame_index, r.offset.dx, r.offset.dy, r.score
            ),
            None => println!("frame {:>3}: no comparable region", a.frame_index),
        }
    }
    if let Some(count) = applied {
        println!("Applied {} offset{} to state", count, if count == 1 { "" } else { "s" });
    }
}

//! Validate command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::spritesheet::SpriteSheetConfig;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Execute the validate command
pub fn run_validate(layout_path: &Path, json: bool) -> ExitCode {
    let contents = match std::fs::read_to_string(layout_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", layout_path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let errors = match SpriteSheetConfig::from_json(&contents) {
        Some(config) => config.validate(),
        None => vec!["not a valid sprite sheet layout (malformed JSON or wrong field types)".to_string()],
    };

    if json {
        let output = serde_json::json!({
            "file": layout_path.display().to_string(),
            "valid": errors.is_empty(),
            "errors": errors,
        });
        println!("{}", output);
    } else if errors.is_empty() {
        println!("{}: OK", layout_path.display());
    } else {
        println!("{}: {} problem{}", layout_path.display(), errors.len(), if errors.len() == 1 { "" } else { "s" });
        for e in &errors {
            println!("  - {}", e);
        }
    }

    if errors.is_empty() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

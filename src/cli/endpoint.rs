//! Endpoint command implementation

use std::process::ExitCode;

use crate::endpoint::normalize_base_url;

use super::{EXIT_ERROR, EXIT_SUCCESS};

/// Execute the endpoint command
pub fn run_endpoint(url: &str, json: bool) -> ExitCode {
    let result = normalize_base_url(url);

    if json {
        let output = match &result {
            Ok(normalized) => serde_json::json!({ "valid": true, "url": normalized }),
            Err(e) => serde_json::json!({ "valid": false, "error": e.to_string() }),
        };
        println!("{}", output);
    } else {
        match &result {
            Ok(normalized) => println!("{}", normalized),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    if result.is_ok() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

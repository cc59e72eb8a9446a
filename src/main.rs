//! Spritecal - Command-line tool for sprite sheet calibration

use std::process::ExitCode;

use spritecal::cli;

fn main() -> ExitCode {
    cli::run()
}

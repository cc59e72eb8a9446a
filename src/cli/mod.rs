//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod align;
mod compose;
mod endpoint;
mod frames;
mod inspect;
mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, SpritecalConfig};
use crate::spritesheet::SpriteSheetConfig;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SPRITECAL_LOG";

/// Spritecal - Sprite sheet calibration and gradient-based frame alignment
#[derive(Parser)]
#[command(name = "spritecal")]
#[command(about = "Spritecal - Calibrate sprite sheet frames with gradient matching")]
#[command(version)]
pub struct Cli {
    /// Path to spritecal.toml (default: search upward from the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Search options shared by commands that extract gradient regions
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Gradient magnitude at which a pixel counts as an edge
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Region size as WIDTHxHEIGHT (e.g., "32x32")
    #[arg(long)]
    pub roi: Option<String>,

    /// Search radius in pixels
    #[arg(long)]
    pub radius: Option<u32>,

    /// Score with magnitude-weighted similarity instead of IoU
    #[arg(long, conflicts_with = "iou")]
    pub weighted: bool,

    /// Score with binary edge IoU
    #[arg(long)]
    pub iou: bool,

    /// Sprite sheet layout JSON
    #[arg(long)]
    pub layout: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show gradient statistics for a region of an image
    Inspect {
        /// Image to analyse
        image: PathBuf,

        /// Region centre X
        #[arg(long)]
        x: i32,

        /// Region centre Y
        #[arg(long)]
        y: i32,

        #[command(flatten)]
        search: SearchArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the offset that best aligns a target sheet with a reference sheet
    Align {
        /// Reference sprite sheet
        reference: PathBuf,

        /// Sheet to align against the reference (default: the atlas built
        /// from the [sheet] section of spritecal.toml)
        target: Option<PathBuf>,

        /// Sampling centre X (requires --y)
        #[arg(long, requires = "y")]
        x: Option<i32>,

        /// Sampling centre Y (requires --x)
        #[arg(long, requires = "x")]
        y: Option<i32>,

        /// Align every frame of the layout instead of a single point
        #[arg(long, conflicts_with_all = ["x", "y"])]
        all_frames: bool,

        /// Calibration state to update with the suggested offsets (with --all-frames)
        #[arg(long, requires = "all_frames")]
        state: Option<PathBuf>,

        /// Minimum score for an offset to be applied to the state
        #[arg(long, default_value = "0.5")]
        min_score: f32,

        #[command(flatten)]
        search: SearchArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Patch a base sprite sheet with an override image
    ///
    /// Inputs that are not given come from the [sheet] section of spritecal.toml.
    Compose {
        /// Base sprite sheet
        base: Option<PathBuf>,

        /// Override image (opaque pixels replace the base)
        overlay: Option<PathBuf>,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Sprite sheet layout JSON, used to report patched frames
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show frame offsets derived from a layout or calibration state
    Frames {
        /// Sprite sheet layout JSON
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Calibration state whose boxes should be used
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a sprite sheet layout JSON
    Validate {
        /// Layout file to check
        layout: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Normalize a model server base URL
    Endpoint {
        /// URL as typed by the user
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Install the tracing subscriber.
///
/// `SPRITECAL_LOG` takes precedence; otherwise the level follows `-v`.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("spritecal={}", default_level)));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Parse a "WIDTHxHEIGHT" size string.
pub(crate) fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Invalid size '{}': expected WIDTHxHEIGHT", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("Invalid width in '{}'", s))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("Invalid height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(format!("Invalid size '{}': dimensions must be positive", s));
    }
    Ok((w, h))
}

/// Load spritecal.toml and apply command-line search overrides.
pub(crate) fn load_effective_config(
    path: Option<&Path>,
    search: &SearchArgs,
) -> Result<SpritecalConfig, String> {
    let mut config = load_config(path).map_err(|e| e.to_string())?;

    let roi_size = search.roi.as_deref().map(parse_size).transpose()?;
    let use_iou = if search.weighted {
        Some(false)
    } else if search.iou {
        Some(true)
    } else {
        None
    };
    let overrides = CliOverrides {
        threshold: search.threshold,
        use_iou,
        radius: search.radius,
        roi_size,
        layout: search.layout.clone(),
    };
    merge_cli_overrides(&mut config, &overrides);

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"));
    }
    Ok(config)
}

/// Read a layout file, falling back to the default 3x3 grid.
pub(crate) fn load_layout(path: Option<&Path>) -> SpriteSheetConfig {
    let Some(path) = path else {
        return SpriteSheetConfig::default();
    };
    match std::fs::read_to_string(path) {
        Ok(json) => SpriteSheetConfig::from_json_or_default(&json),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "layout unreadable, using default grid");
            SpriteSheetConfig::default()
        }
    }
}

/// Load an image for analysis, reporting failures to stderr.
pub(crate) fn open_rgba(path: &Path) -> Result<image::RgbaImage, ExitCode> {
    match image::open(path) {
        Ok(img) => Ok(img.to_rgba8()),
        Err(e) => {
            eprintln!("Error: Cannot open '{}': {}", path.display(), e);
            Err(ExitCode::from(EXIT_ERROR))
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Inspect { image, x, y, search, json } => {
            inspect::run_inspect(config_path, &image, (x, y), &search, json)
        }
        Commands::Align { reference, target, x, y, all_frames, state, min_score, search, json } => {
            let center = x.zip(y);
            align::run_align(
                config_path,
                &reference,
                target.as_deref(),
                center,
                all_frames,
                state.as_deref(),
                min_score,
                &search,
                json,
            )
        }
        Commands::Compose { base, overlay, output, layout, json } => {
            compose::run_compose(
                config_path,
                base.as_deref(),
                overlay.as_deref(),
                &output,
                layout.as_deref(),
                json,
            )
        }
        Commands::Frames { layout, state, json } => {
            frames::run_frames(config_path, layout.as_deref(), state.as_deref(), json)
        }
        Commands::Validate { layout, json } => validate::run_validate(&layout, json),
        Commands::Endpoint { url, json } => endpoint::run_endpoint(&url, json),
    }
}

//! Configuration loading and discovery for `spritecal.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SpritecalConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "spritecal.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse spritecal.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override edge threshold
    pub threshold: Option<f32>,
    /// Override scoring mode (true = IoU)
    pub use_iou: Option<bool>,
    /// Override search radius
    pub radius: Option<u32>,
    /// Override region size
    pub roi_size: Option<(u32, u32)>,
    /// Override sprite sheet layout file
    pub layout: Option<PathBuf>,
}

/// Find spritecal.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for spritecal.toml
/// 2. Check XDG_CONFIG_HOME/spritecal/spritecal.toml (or ~/.config/spritecal/spritecal.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find spritecal.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("spritecal").join(CONFIG_FILE);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find spritecal.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a spritecal.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
pub fn load_config(path: Option<&Path>) -> Result<SpritecalConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            let mut config = load_config_file(&p)?;
            if let Some(root) = p.parent() {
                resolve_sheet_paths(&mut config, root);
            }
            Ok(config)
        }
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<SpritecalConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: SpritecalConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no spritecal.toml is found.
pub fn default_config() -> SpritecalConfig {
    SpritecalConfig::default()
}

/// Make the sheet paths of a loaded config relative to its directory.
fn resolve_sheet_paths(config: &mut SpritecalConfig, root: &Path) {
    let sheet = &mut config.sheet;
    for path in [&mut sheet.base, &mut sheet.override_path, &mut sheet.layout].into_iter().flatten()
    {
        *path = resolve_path(root, path);
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SpritecalConfig, overrides: &CliOverrides) {
    if let Some(threshold) = overrides.threshold {
        config.align.threshold = threshold;
    }

    if let Some(use_iou) = overrides.use_iou {
        config.align.use_iou = use_iou;
    }

    if let Some(radius) = overrides.radius {
        config.align.radius = radius;
    }

    if let Some((w, h)) = overrides.roi_size {
        config.align.roi_width = w;
        config.align.roi_height = h;
    }

    if let Some(ref layout) = overrides.layout {
        config.sheet.layout = Some(layout.clone());
    }
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

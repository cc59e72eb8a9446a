//! Configuration schema types for `spritecal.toml`
//!
//! Defines the structure and validation rules for spritecal project configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::endpoint::normalize_base_url;
use crate::matcher::MatchMode;
use crate::search::SearchParams;

/// Sprite sheet sources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Base sprite sheet PNG. When absent a blank built-in sheet is used.
    #[serde(default)]
    pub base: Option<PathBuf>,
    /// Partial override PNG patched over the base sheet
    #[serde(default, rename = "override")]
    pub override_path: Option<PathBuf>,
    /// Whether the override image is applied
    #[serde(default)]
    pub override_enabled: bool,
    /// Sprite sheet layout JSON (rows, cols, frame size, boxes)
    #[serde(default)]
    pub layout: Option<PathBuf>,
}

/// Alignment search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Gradient magnitude at which a pixel counts as an edge
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Score with binary IoU (true) or magnitude-weighted similarity (false)
    #[serde(default = "default_use_iou")]
    pub use_iou: bool,
    /// Search radius in pixels
    #[serde(default = "default_radius")]
    pub radius: u32,
    /// Region width in pixels
    #[serde(default = "default_roi_size")]
    pub roi_width: u32,
    /// Region height in pixels
    #[serde(default = "default_roi_size")]
    pub roi_height: u32,
}

fn default_threshold() -> f32 {
    128.0
}

fn default_use_iou() -> bool {
    true
}

fn default_radius() -> u32 {
    3
}

fn default_roi_size() -> u32 {
    32
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            use_iou: default_use_iou(),
            radius: default_radius(),
            roi_width: default_roi_size(),
            roi_height: default_roi_size(),
        }
    }
}

impl AlignConfig {
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            roi_width: self.roi_width,
            roi_height: self.roi_height,
            radius: self.radius,
            threshold: self.threshold,
            mode: MatchMode::from_iou_flag(self.use_iou),
        }
    }
}

/// LLM server endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the model server, e.g. `http://192.168.0.2:11434`
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Complete spritecal configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpritecalConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub align: AlignConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Largest accepted search radius; cost grows with `(2r + 1)^2`
pub const MAX_RADIUS: u32 = 64;

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "align.radius")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spritecal.toml: '{}' {}", self.field, self.message)
    }
}

impl SpritecalConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if !self.align.threshold.is_finite() || self.align.threshold < 0.0 {
            errors.push(ConfigValidationError {
                field: "align.threshold".to_string(),
                message: "must be a non-negative number".to_string(),
            });
        }

        if self.align.roi_width == 0 || self.align.roi_height == 0 {
            errors.push(ConfigValidationError {
                field: "align.roi_width/roi_height".to_string(),
                message: "dimensions must be positive".to_string(),
            });
        }

        if self.align.radius > MAX_RADIUS {
            errors.push(ConfigValidationError {
                field: "align.radius".to_string(),
                message: format!("must be at most {}", MAX_RADIUS),
            });
        }

        if self.sheet.override_enabled && self.sheet.override_path.is_none() {
            errors.push(ConfigValidationError {
                field: "sheet.override".to_string(),
                message: "must be set when override_enabled is true".to_string(),
            });
        }

        if let Some(ref url) = self.server.base_url {
            if let Err(e) = normalize_base_url(url) {
                errors.push(ConfigValidationError {
                    field: "server.base_url".to_string(),
                    message: e.to_string(),
                });
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

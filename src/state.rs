//! Calibration session state
//!
//! Holds the boxes being edited, the selected box and the governing sheet
//! configuration. The state is saved as JSON between sessions; an unreadable
//! snapshot silently restores the default state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::search::{FrameAlignment, Offset};
use crate::spritesheet::{boxes_from_config, config_from_boxes, FrameMaps, SpriteBox, SpriteSheetConfig};

/// Error writing a state snapshot
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to write state: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Editable calibration state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugState {
    /// Frame index of the selected box
    #[serde(default)]
    pub selected_box: Option<u32>,
    #[serde(default)]
    pub boxes: Vec<SpriteBox>,
    #[serde(default)]
    pub config: SpriteSheetConfig,
}

impl Default for DebugState {
    fn default() -> Self {
        Self::from_config(SpriteSheetConfig::default())
    }
}

impl DebugState {
    /// Start a session from a sheet configuration
    pub fn from_config(config: SpriteSheetConfig) -> Self {
        Self { selected_box: None, boxes: boxes_from_config(&config), config }
    }

    /// Restore a snapshot, falling back to the default state when it is unreadable.
    pub fn restore(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "discarding corrupted state snapshot");
                Self::default()
            }
        }
    }

    /// Load a snapshot from disk; missing or corrupted files give the default state.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => Self::restore(&json),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no state snapshot");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn box_mut(&mut self, index: u32) -> Option<&mut SpriteBox> {
        self.boxes.iter_mut().find(|b| b.index == index)
    }

    pub fn selected(&self) -> Option<&SpriteBox> {
        let index = self.selected_box?;
        self.boxes.iter().find(|b| b.index == index)
    }

    /// Select a box by frame index. Returns false if no such box exists.
    pub fn select(&mut self, index: u32) -> bool {
        if self.boxes.iter().any(|b| b.index == index) {
            self.selected_box = Some(index);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_box = None;
    }

    /// Move the selected box by a sub-pixel amount
    pub fn nudge(&mut self, dx: f32, dy: f32) -> bool {
        let Some(index) = self.selected_box else {
            return false;
        };
        match self.box_mut(index) {
            Some(b) => {
                b.x += dx;
                b.y += dy;
                true
            }
            None => false,
        }
    }

    /// Resize the selected box; non-positive sizes are rejected
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 {
            return false;
        }
        let Some(index) = self.selected_box else {
            return false;
        };
        match self.box_mut(index) {
            Some(b) => {
                b.width = width;
                b.height = height;
                true
            }
            None => false,
        }
    }

    /// Shift a box by a suggested alignment offset
    pub fn apply_offset(&mut self, index: u32, offset: Offset) -> bool {
        match self.box_mut(index) {
            Some(b) => {
                b.x += offset.dx as f32;
                b.y += offset.dy as f32;
                true
            }
            None => false,
        }
    }

    /// Apply every alignment whose score reaches `min_score`; returns the count applied.
    pub fn apply_alignments(&mut self, alignments: &[FrameAlignment], min_score: f32) -> usize {
        let mut applied = 0;
        for alignment in alignments {
            if let Some(result) = alignment.result {
                if result.score >= min_score && result.offset != Offset::default()
                    && self.apply_offset(alignment.frame_index, result.offset)
                {
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Put every box back on its configured position
    pub fn reset_boxes(&mut self) {
        self.boxes = boxes_from_config(&self.config);
        if let Some(index) = self.selected_box {
            if !self.boxes.iter().any(|b| b.index == index) {
                self.selected_box = None;
            }
        }
    }

    pub fn frame_maps(&self) -> FrameMaps {
        FrameMaps::derive(&self.boxes, &self.config)
    }

    /// Export the edited boxes as a sheet configuration.
    ///
    /// Validation problems are returned as messages and block the export.
    pub fn export_config(&self) -> Result<SpriteSheetConfig, Vec<String>> {
        config_from_boxes(&self.config, &self.boxes)
    }
}

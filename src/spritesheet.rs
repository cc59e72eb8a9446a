//! Sprite sheet layout - frame boxes, sheet configuration and derived frame geometry
//!
//! A sheet is a grid of `rows x cols` frames. Each frame is authored as a
//! [`SpriteBox`] in floating-point pixels while it is being edited, and stored
//! as an integer [`BoxPosition`] in the persisted [`SpriteSheetConfig`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Default grid used when no valid configuration is available
pub const DEFAULT_ROWS: i32 = 3;
pub const DEFAULT_COLS: i32 = 3;
pub const DEFAULT_FRAME_SIZE: i32 = 96;

/// Largest sheet edge, in pixels, that a layout may describe
pub const MAX_SHEET_DIMENSION: u32 = 16_384;

/// A user-edited frame rectangle (floating-point pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteBox {
    /// Frame index, unique within a sheet
    pub index: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SpriteBox {
    pub fn new(index: u32, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { index, x, y, width, height }
    }
}

/// A persisted frame rectangle (integer pixels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxPosition {
    pub frame_index: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Grid layout of a sprite sheet plus one box per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteSheetConfig {
    pub rows: i32,
    pub cols: i32,
    pub frame_width: i32,
    pub frame_height: i32,
    #[serde(default)]
    pub boxes: Vec<BoxPosition>,
}

impl Default for SpriteSheetConfig {
    fn default() -> Self {
        Self::grid(DEFAULT_ROWS, DEFAULT_COLS, DEFAULT_FRAME_SIZE, DEFAULT_FRAME_SIZE)
    }
}

impl SpriteSheetConfig {
    /// Build a configuration whose boxes sit exactly on the grid cells.
    ///
    /// Box coordinates saturate instead of wrapping for oversized grids.
    pub fn grid(rows: i32, cols: i32, frame_width: i32, frame_height: i32) -> Self {
        let mut boxes = Vec::new();
        for row in 0..rows.max(0) {
            for col in 0..cols.max(0) {
                boxes.push(BoxPosition {
                    frame_index: (row as u32).saturating_mul(cols as u32).saturating_add(col as u32),
                    x: col.saturating_mul(frame_width),
                    y: row.saturating_mul(frame_height),
                    width: frame_width,
                    height: frame_height,
                });
            }
        }
        Self { rows, cols, frame_width, frame_height, boxes }
    }

    /// Parse a configuration from JSON. Malformed input yields `None`.
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "malformed sprite sheet config");
                None
            }
        }
    }

    /// Parse a configuration from JSON, falling back to the default 3x3 grid.
    pub fn from_json_or_default(json: &str) -> Self {
        Self::from_json(json).unwrap_or_default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Total number of frames in the grid
    pub fn frame_count(&self) -> usize {
        (self.rows.max(0) as usize) * (self.cols.max(0) as usize)
    }

    /// Size of the whole sheet in pixels.
    ///
    /// `None` when the grid or frame size is not positive, or when an edge
    /// would exceed [`MAX_SHEET_DIMENSION`].
    pub fn sheet_size(&self) -> Option<(u32, u32)> {
        let edge = |count: i32, frame: i32| {
            let count = u32::try_from(count).ok().filter(|&c| c > 0)?;
            let frame = u32::try_from(frame).ok().filter(|&f| f > 0)?;
            count.checked_mul(frame).filter(|&px| px <= MAX_SHEET_DIMENSION)
        };
        Some((edge(self.cols, self.frame_width)?, edge(self.rows, self.frame_height)?))
    }

    /// Validate the configuration and return human-readable problems.
    ///
    /// An empty result means the configuration may be saved.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.rows <= 0 {
            errors.push(format!("rows must be positive (got {})", self.rows));
        }
        if self.cols <= 0 {
            errors.push(format!("cols must be positive (got {})", self.cols));
        }
        if self.frame_width <= 0 || self.frame_height <= 0 {
            errors.push(format!(
                "frame size must be positive (got {}x{})",
                self.frame_width, self.frame_height
            ));
        }
        if self.rows > 0 && self.cols > 0 && self.frame_width > 0 && self.frame_height > 0
            && self.sheet_size().is_none()
        {
            errors.push(format!(
                "sheet of {}x{} frames at {}x{} exceeds {} pixels per edge",
                self.cols, self.rows, self.frame_width, self.frame_height, MAX_SHEET_DIMENSION
            ));
        }

        let expected = self.frame_count();
        if self.boxes.len() != expected {
            errors.push(format!(
                "expected {} boxes for a {}x{} grid, found {}",
                expected,
                self.rows,
                self.cols,
                self.boxes.len()
            ));
        }

        let mut seen = HashSet::new();
        for b in &self.boxes {
            if !seen.insert(b.frame_index) {
                errors.push(format!("duplicate frame index {}", b.frame_index));
            }
            if b.frame_index as usize >= expected {
                errors.push(format!(
                    "frame index {} out of range (0..{})",
                    b.frame_index, expected
                ));
            }
            if b.width <= 0 || b.height <= 0 {
                errors.push(format!(
                    "box {} has non-positive size {}x{}",
                    b.frame_index, b.width, b.height
                ));
            }
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Convert the persisted boxes of a configuration into editable boxes.
pub fn boxes_from_config(config: &SpriteSheetConfig) -> Vec<SpriteBox> {
    let mut boxes: Vec<SpriteBox> = config
        .boxes
        .iter()
        .map(|b| {
            SpriteBox::new(b.frame_index, b.x as f32, b.y as f32, b.width as f32, b.height as f32)
        })
        .collect();
    boxes.sort_by_key(|b| b.index);
    boxes
}

/// Build a new configuration from edited boxes, keeping the grid of `base`.
///
/// Box geometry is rounded to the nearest pixel. Returns the validation
/// messages if the result would not be a valid configuration.
pub fn config_from_boxes(
    base: &SpriteSheetConfig,
    boxes: &[SpriteBox],
) -> Result<SpriteSheetConfig, Vec<String>> {
    let mut positions: Vec<BoxPosition> = boxes
        .iter()
        .map(|b| BoxPosition {
            frame_index: b.index,
            x: b.x.round() as i32,
            y: b.y.round() as i32,
            width: b.width.round() as i32,
            height: b.height.round() as i32,
        })
        .collect();
    positions.sort_by_key(|b| b.frame_index);

    let config = SpriteSheetConfig { boxes: positions, ..base.clone() };
    let errors = config.validate();
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(errors)
    }
}

/// Per-frame draw geometry derived from the current boxes.
///
/// Recomputed whenever boxes change; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMaps {
    /// Common frame size (width, height)
    pub frame_size: (i32, i32),
    /// Number of frames per row
    pub columns: i32,
    /// Frame index to integer top-left pixel offset
    pub offsets: BTreeMap<u32, (i32, i32)>,
}

impl FrameMaps {
    /// Derive frame geometry. Box coordinates are rounded to the nearest pixel.
    pub fn derive(boxes: &[SpriteBox], config: &SpriteSheetConfig) -> Self {
        let offsets =
            boxes.iter().map(|b| (b.index, (b.x.round() as i32, b.y.round() as i32))).collect();
        Self {
            frame_size: (config.frame_width, config.frame_height),
            columns: config.cols,
            offsets,
        }
    }

    /// Row of a frame in the grid
    pub fn row_of(&self, index: u32) -> u32 {
        index / self.columns.max(1) as u32
    }

    /// Vertical offset of each frame relative to its row baseline.
    ///
    /// Negative values mean the box sits above the baseline. Frames whose
    /// offset does not fit in an `i32` (indices far outside the grid) are
    /// left out.
    pub fn relative_y_offsets(&self) -> BTreeMap<u32, i32> {
        self.offsets
            .iter()
            .filter_map(|(&index, &(_, y))| {
                let baseline = i64::from(self.row_of(index)) * i64::from(self.frame_size.1);
                let relative = i32::try_from(i64::from(y) - baseline).ok()?;
                Some((index, relative))
            })
            .collect()
    }

    /// Source rectangle `(x, y, width, height)` of a frame
    pub fn frame_rect(&self, index: u32) -> Option<(i32, i32, i32, i32)> {
        self.offsets.get(&index).map(|&(x, y)| (x, y, self.frame_size.0, self.frame_size.1))
    }

    /// Centre pixel of a frame, used as the alignment sampling point
    pub fn frame_center(&self, index: u32) -> Option<(i32, i32)> {
        self.frame_rect(index).map(|(x, y, w, h)| (x.saturating_add(w / 2), y.saturating_add(h / 2)))
    }

    pub fn frame_indices(&self) -> Vec<u32> {
        self.offsets.keys().copied().collect()
    }
}

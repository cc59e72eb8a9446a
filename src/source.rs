//! Sprite sheet loading with ordered fallbacks
//!
//! Sheets are resolved through a [`SourceChain`]: each source is tried in
//! order and the first one that decodes to a non-empty image wins. The final
//! fallback is a built-in transparent sheet sized from the layout, so loading
//! never fails outright.

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::composition::compose_override;
use crate::config::SheetConfig;
use crate::spritesheet::{SpriteSheetConfig, DEFAULT_COLS, DEFAULT_FRAME_SIZE, DEFAULT_ROWS};

/// A place a sprite sheet can come from
#[derive(Debug, Clone, PartialEq)]
pub enum SheetSource {
    /// PNG (or any format `image` can decode) on disk
    File(PathBuf),
    /// Blank transparent sheet compiled into the tool
    Builtin { width: u32, height: u32 },
}

impl SheetSource {
    /// Try to produce an image from this source.
    pub fn load(&self) -> Option<RgbaImage> {
        match self {
            SheetSource::File(path) => load_image(path),
            SheetSource::Builtin { width, height } => {
                Some(RgbaImage::from_pixel((*width).max(1), (*height).max(1), Rgba([0, 0, 0, 0])))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SheetSource::File(path) => path.display().to_string(),
            SheetSource::Builtin { width, height } => format!("built-in {}x{}", width, height),
        }
    }
}

/// Decode an image file, rejecting missing files and zero-sized images.
pub fn load_image(path: &Path) -> Option<RgbaImage> {
    if !path.exists() {
        debug!(path = %path.display(), "sheet file not found");
        return None;
    }
    match image::open(path) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            if rgba.width() == 0 || rgba.height() == 0 {
                warn!(path = %path.display(), "sheet decoded to an empty image");
                None
            } else {
                Some(rgba)
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to decode sheet");
            None
        }
    }
}

/// Ordered list of sources, highest priority first
#[derive(Debug, Clone, Default)]
pub struct SourceChain {
    sources: Vec<SheetSource>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: SheetSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(&self) -> &[SheetSource] {
        &self.sources
    }

    /// Return the first source that yields a usable image.
    pub fn resolve(&self) -> Option<(RgbaImage, &SheetSource)> {
        self.sources.iter().find_map(|source| source.load().map(|img| (img, source)))
    }
}

/// Where the final atlas came from
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasOrigin {
    pub base: SheetSource,
    /// Override file that was composited on top, if any
    pub applied_override: Option<PathBuf>,
}

/// Size of the built-in sheet for a layout.
///
/// Layouts with no usable size (non-positive or oversized grids) get the
/// size of the default grid.
pub fn builtin_sheet_size(layout: &SpriteSheetConfig) -> (u32, u32) {
    layout.sheet_size().unwrap_or_else(|| {
        warn!(
            rows = layout.rows,
            cols = layout.cols,
            frame_width = layout.frame_width,
            frame_height = layout.frame_height,
            "unusable sheet layout, sizing built-in sheet from the default grid"
        );
        (
            (DEFAULT_COLS * DEFAULT_FRAME_SIZE) as u32,
            (DEFAULT_ROWS * DEFAULT_FRAME_SIZE) as u32,
        )
    })
}

/// Build the runtime atlas: resolve the base sheet and apply the override.
///
/// Override problems (missing file, bad decode, size mismatch) fall back to
/// the base sheet alone.
pub fn load_atlas(sheet: &SheetConfig, layout: &SpriteSheetConfig) -> (RgbaImage, AtlasOrigin) {
    let (width, height) = builtin_sheet_size(layout);
    let mut chain = SourceChain::new();
    if let Some(ref base) = sheet.base {
        chain = chain.with(SheetSource::File(base.clone()));
    }
    chain = chain.with(SheetSource::Builtin { width, height });

    let (base_image, base_source) = match chain.resolve() {
        Some((img, source)) => (img, source.clone()),
        // Builtin sources always load
        None => (
            RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([0, 0, 0, 0])),
            SheetSource::Builtin { width, height },
        ),
    };
    info!(source = %base_source.describe(), "base sheet resolved");

    let mut origin = AtlasOrigin { base: base_source, applied_override: None };

    if !sheet.override_enabled {
        return (base_image, origin);
    }
    let Some(ref override_path) = sheet.override_path else {
        return (base_image, origin);
    };
    let Some(overlay) = load_image(override_path) else {
        warn!(path = %override_path.display(), "override unavailable, using base sheet");
        return (base_image, origin);
    };

    match compose_override(&base_image, &overlay) {
        Ok(atlas) => {
            origin.applied_override = Some(override_path.clone());
            (atlas, origin)
        }
        Err(e) => {
            warn!(error = %e, "override not applied");
            (base_image, origin)
        }
    }
}

//! Sprite sheet composition
//!
//! Patches a base sprite sheet with a partial override image. Every opaque
//! override pixel replaces the base pixel; transparent override pixels leave
//! the base untouched. Inputs are never modified.

mod error;

pub use error::CompositionError;

use image::RgbaImage;

use crate::spritesheet::SpriteSheetConfig;

/// Compose an override image over a base sheet of the same size.
///
/// Pixel selection is binary: any non-zero override alpha wins outright,
/// with no blending.
pub fn compose_override(
    base: &RgbaImage,
    overlay: &RgbaImage,
) -> Result<RgbaImage, CompositionError> {
    if base.dimensions() != overlay.dimensions() {
        return Err(CompositionError::SizeMismatch {
            base_size: base.dimensions(),
            override_size: overlay.dimensions(),
        });
    }

    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(overlay.pixels()) {
        if src[3] != 0 {
            *dst = *src;
        }
    }
    Ok(out)
}

/// Frame indices whose grid cell contains at least one opaque override pixel.
pub fn patched_cells(overlay: &RgbaImage, config: &SpriteSheetConfig) -> Vec<u32> {
    if config.frame_width <= 0 || config.frame_height <= 0 || config.cols <= 0 {
        return Vec::new();
    }

    let frame_w = config.frame_width as u32;
    let frame_h = config.frame_height as u32;
    let grid_cols = config.cols as u32;
    // Cells starting past the overlay edge are never visited
    let cols = grid_cols.min(overlay.width().div_ceil(frame_w));
    let rows = (config.rows.max(0) as u32).min(overlay.height().div_ceil(frame_h));

    let mut cells = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let x0 = col * frame_w;
            let y0 = row * frame_h;
            let x1 = x0.saturating_add(frame_w).min(overlay.width());
            let y1 = y0.saturating_add(frame_h).min(overlay.height());

            let touched = (y0..y1).any(|y| (x0..x1).any(|x| overlay.get_pixel(x, y)[3] != 0));
            if touched {
                cells.push(row.saturating_mul(grid_cols).saturating_add(col));
            }
        }
    }
    cells
}

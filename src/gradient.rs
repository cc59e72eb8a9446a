//! Gradient region-of-interest extraction
//!
//! Converts a rectangular window of a sprite sheet into a per-pixel gradient map:
//! - Sobel-style gradient magnitude (sum of absolute kernel responses)
//! - Edge flags derived from a magnitude threshold
//! - Opacity flags read from the alpha channel
//!
//! The magnitude convention is `|Gx| + |Gy|`, not the Euclidean norm. A hard
//! black/white step produces 1020, and alignment thresholds are calibrated
//! against that scale.

use image::{Rgba, RgbaImage};
use serde::Serialize;

/// Horizontal Sobel kernel (row-major, top to bottom)
const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];

/// Vertical Sobel kernel (row-major, top to bottom)
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Largest magnitude the kernels can produce on 8-bit luminance.
pub const MAX_MAGNITUDE: f32 = 2040.0;

/// Immutable gradient snapshot of a region of an image.
///
/// All per-pixel vectors have `width * height` entries, indexed row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientRoi {
    width: u32,
    height: u32,
    /// Absolute left/top of the region in source image coordinates
    origin: (i32, i32),
    magnitude: Vec<f32>,
    edge: Vec<bool>,
    opaque: Vec<bool>,
}

/// Summary statistics for an extracted region
#[derive(Debug, Clone, Serialize)]
pub struct RoiStats {
    pub width: u32,
    pub height: u32,
    pub origin: [i32; 2],
    pub max_magnitude: f32,
    pub mean_magnitude: f32,
    pub edge_pixels: usize,
    pub opaque_pixels: usize,
}

impl GradientRoi {
    /// Extract the region of `width x height` pixels centred on `center`.
    ///
    /// The window is clipped to the image bounds. Returns `None` when the
    /// requested size is zero or the window lies entirely outside the image.
    pub fn extract(
        image: &RgbaImage,
        center: (i32, i32),
        width: u32,
        height: u32,
        threshold: f32,
    ) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let (img_w, img_h) = (image.width() as i64, image.height() as i64);
        let left = center.0 as i64 - (width / 2) as i64;
        let top = center.1 as i64 - (height / 2) as i64;

        let x0 = left.max(0);
        let y0 = top.max(0);
        let x1 = (left + width as i64).min(img_w);
        let y1 = (top + height as i64).min(img_h);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let roi_w = (x1 - x0) as u32;
        let roi_h = (y1 - y0) as u32;
        let len = (roi_w * roi_h) as usize;

        let mut magnitude = Vec::with_capacity(len);
        let mut opaque = Vec::with_capacity(len);
        for y in y0..y1 {
            for x in x0..x1 {
                magnitude.push(sobel_magnitude(image, x as u32, y as u32));
                opaque.push(image.get_pixel(x as u32, y as u32)[3] != 0);
            }
        }

        let edge = binarize(&magnitude, &opaque, threshold);
        Some(Self {
            width: roi_w,
            height: roi_h,
            origin: (x0 as i32, y0 as i32),
            magnitude,
            edge,
            opaque,
        })
    }

    /// Build a region directly from per-pixel data.
    ///
    /// Returns `None` if the vector lengths don't match `width * height`.
    pub fn from_parts(
        width: u32,
        height: u32,
        magnitude: Vec<f32>,
        opaque: Vec<bool>,
        threshold: f32,
    ) -> Option<Self> {
        let len = (width as usize) * (height as usize);
        if len == 0 || magnitude.len() != len || opaque.len() != len {
            return None;
        }
        let edge = binarize(&magnitude, &opaque, threshold);
        Some(Self { width, height, origin: (0, 0), magnitude, edge, opaque })
    }

    /// Return a copy with edge flags recomputed for a new threshold.
    pub fn rebinarize(&self, threshold: f32) -> Self {
        Self { edge: binarize(&self.magnitude, &self.opaque, threshold), ..self.clone() }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Top-left corner of the region in source image coordinates
    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    /// Row-major index of a region-local coordinate
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitude
    }

    pub fn edges(&self) -> &[bool] {
        &self.edge
    }

    pub fn opacity(&self) -> &[bool] {
        &self.opaque
    }

    /// Gradient magnitude at a region-local coordinate.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width()` or `y >= height()`. Use [`GradientRoi::get`]
    /// for a checked lookup.
    pub fn magnitude_at(&self, x: u32, y: u32) -> f32 {
        self.magnitude[self.index(x, y)]
    }

    /// # Panics
    ///
    /// Panics if the coordinate lies outside the region.
    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.edge[self.index(x, y)]
    }

    /// # Panics
    ///
    /// Panics if the coordinate lies outside the region.
    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        self.opaque[self.index(x, y)]
    }

    /// Checked lookup of `(magnitude, edge, opaque)` at a region-local coordinate
    pub fn get(&self, x: u32, y: u32) -> Option<(f32, bool, bool)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some((self.magnitude[i], self.edge[i], self.opaque[i]))
    }

    pub fn edge_count(&self) -> usize {
        self.edge.iter().filter(|&&e| e).count()
    }

    pub fn stats(&self) -> RoiStats {
        let max_magnitude = self.magnitude.iter().copied().fold(0.0f32, f32::max);
        let mean_magnitude = self.magnitude.iter().sum::<f32>() / self.magnitude.len() as f32;
        RoiStats {
            width: self.width,
            height: self.height,
            origin: [self.origin.0, self.origin.1],
            max_magnitude,
            mean_magnitude,
            edge_pixels: self.edge_count(),
            opaque_pixels: self.opaque.iter().filter(|&&o| o).count(),
        }
    }
}

/// A pixel is an edge when it is opaque and its magnitude reaches the threshold.
fn binarize(magnitude: &[f32], opaque: &[bool], threshold: f32) -> Vec<bool> {
    magnitude.iter().zip(opaque).map(|(&m, &o)| o && m >= threshold).collect()
}

/// Integer luminance of a pixel (Rec. 709 weights; white maps to exactly 255).
///
/// Alpha is ignored.
#[inline]
pub fn luminance(pixel: &Rgba<u8>) -> i32 {
    let [r, g, b, _] = pixel.0;
    (2126 * r as i32 + 7152 * g as i32 + 722 * b as i32) / 10000
}

/// Sobel magnitude `|Gx| + |Gy|` at a pixel.
///
/// Pixels without a full 3x3 neighbourhood inside the image return 0.
pub fn sobel_magnitude(image: &RgbaImage, x: u32, y: u32) -> f32 {
    if x == 0 || y == 0 || x + 1 >= image.width() || y + 1 >= image.height() {
        return 0.0;
    }

    let mut gx = 0;
    let mut gy = 0;
    for ky in 0..3 {
        for kx in 0..3 {
            let l = luminance(image.get_pixel(x + kx - 1, y + ky - 1));
            gx += SOBEL_X[ky as usize][kx as usize] * l;
            gy += SOBEL_Y[ky as usize][kx as usize] * l;
        }
    }

    (gx.abs() + gy.abs()) as f32
}

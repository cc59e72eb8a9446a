//! Similarity scoring between two gradient regions
//!
//! Both regions are binarized against a shared threshold. Positions that are
//! transparent in either region are ignored entirely.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gradient::GradientRoi;

/// How two edge maps are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Intersection-over-union of the binary edge masks
    #[default]
    Iou,
    /// Weighted Jaccard: sum of min magnitudes over sum of max magnitudes
    Weighted,
}

impl MatchMode {
    /// Map a `use_iou` flag to a mode
    pub fn from_iou_flag(use_iou: bool) -> Self {
        if use_iou {
            MatchMode::Iou
        } else {
            MatchMode::Weighted
        }
    }
}

/// Error when two regions cannot be compared
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("Region sizes differ: {left_w}x{left_h} vs {right_w}x{right_h}", left_w = left.0, left_h = left.1, right_w = right.0, right_h = right.1)]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
}

/// Score the similarity of two equally sized gradient regions.
///
/// Returns a value in `[0, 1]`. The score is 0 when no comparable edge pixels
/// exist in either region.
pub fn score(
    a: &GradientRoi,
    b: &GradientRoi,
    threshold: f32,
    mode: MatchMode,
) -> Result<f32, MatchError> {
    if a.dimensions() != b.dimensions() {
        return Err(MatchError::DimensionMismatch { left: a.dimensions(), right: b.dimensions() });
    }

    let mut numerator = 0.0f64;
    let mut denominator = 0.0f64;

    let pixels = a.magnitudes().iter().zip(a.opacity()).zip(b.magnitudes().iter().zip(b.opacity()));
    for ((&mag_a, &opaque_a), (&mag_b, &opaque_b)) in pixels {
        if !opaque_a || !opaque_b {
            continue;
        }

        let edge_a = mag_a >= threshold;
        let edge_b = mag_b >= threshold;
        if !edge_a && !edge_b {
            continue;
        }

        match mode {
            MatchMode::Iou => {
                denominator += 1.0;
                if edge_a && edge_b {
                    numerator += 1.0;
                }
            }
            MatchMode::Weighted => {
                let m_a = if edge_a { mag_a as f64 } else { 0.0 };
                let m_b = if edge_b { mag_b as f64 } else { 0.0 };
                numerator += m_a.min(m_b);
                denominator += m_a.max(m_b);
            }
        }
    }

    if denominator <= 0.0 {
        return Ok(0.0);
    }
    Ok((numerator / denominator) as f32)
}

//! Offset search - finds the pixel displacement that best aligns two sheets
//!
//! A reference region is extracted once. The target region is then sampled
//! at every offset in a square neighbourhood and scored against it. Candidates
//! are visited in a fixed order so results are reproducible:
//!
//! 1. ascending Manhattan distance `|dx| + |dy|`
//! 2. then `dy`, then `dx` (row-major)
//!
//! The first candidate with the highest score wins, so ties resolve to the
//! smallest displacement.

use image::RgbaImage;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

use crate::gradient::GradientRoi;
use crate::matcher::{score, MatchMode};
use crate::spritesheet::FrameMaps;

/// A candidate pixel displacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn manhattan(&self) -> i32 {
        self.dx.abs() + self.dy.abs()
    }

    pub fn apply(&self, (x, y): (i32, i32)) -> (i32, i32) {
        (x.saturating_add(self.dx), y.saturating_add(self.dy))
    }
}

/// Best offset found by a search and its similarity score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub offset: Offset,
    pub score: f32,
}

/// Parameters for a single offset search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub roi_width: u32,
    pub roi_height: u32,
    /// Offsets are searched within `-radius..=radius` on both axes
    pub radius: u32,
    pub threshold: f32,
    pub mode: MatchMode,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { roi_width: 32, roi_height: 32, radius: 3, threshold: 128.0, mode: MatchMode::Iou }
    }
}

/// Error from a search that did not run to completion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Search was cancelled")]
    Cancelled,
    #[error("Search task failed: {0}")]
    Join(String),
}

/// Shared cancellation flag for a running search.
///
/// Checked before each candidate offset; an extraction already in progress
/// always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// All offsets within `radius`, in search order.
pub fn candidate_offsets(radius: u32) -> Vec<Offset> {
    let r = radius as i32;
    let mut offsets: Vec<Offset> =
        (-r..=r).flat_map(|dy| (-r..=r).map(move |dx| Offset::new(dx, dy))).collect();
    offsets.sort_by_key(|o| (o.manhattan(), o.dy, o.dx));
    offsets
}

/// Search for the offset that best aligns `target` with `reference` around `center`.
///
/// Returns `Ok(None)` when the reference region cannot be extracted or no
/// offset produces a target region of the same size.
pub fn search_offset(
    reference: &RgbaImage,
    target: &RgbaImage,
    center: (i32, i32),
    params: &SearchParams,
    cancel: &CancelToken,
) -> Result<Option<MatchResult>, SearchError> {
    search_offset_with(reference, target, center, params, cancel, |_| {})
}

/// [`search_offset`] with a callback run for every candidate that passes the
/// cancellation check, just before its region is extracted.
pub fn search_offset_with<F>(
    reference: &RgbaImage,
    target: &RgbaImage,
    center: (i32, i32),
    params: &SearchParams,
    cancel: &CancelToken,
    mut on_candidate: F,
) -> Result<Option<MatchResult>, SearchError>
where
    F: FnMut(Offset),
{
    let Some(reference_roi) =
        GradientRoi::extract(reference, center, params.roi_width, params.roi_height, params.threshold)
    else {
        debug!(?center, "reference region out of bounds, skipping search");
        return Ok(None);
    };

    let mut best: Option<MatchResult> = None;
    for offset in candidate_offsets(params.radius) {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        on_candidate(offset);

        let shifted = offset.apply(center);
        let Some(candidate) = GradientRoi::extract(
            target,
            shifted,
            params.roi_width,
            params.roi_height,
            params.threshold,
        ) else {
            continue;
        };
        if candidate.dimensions() != reference_roi.dimensions() {
            trace!(?offset, "candidate clipped by image bounds");
            continue;
        }

        let Ok(s) = score(&reference_roi, &candidate, params.threshold, params.mode) else {
            continue;
        };
        if best.map_or(true, |b| s > b.score) {
            best = Some(MatchResult { offset, score: s });
        }
    }

    debug!(?center, ?best, "offset search finished");
    Ok(best)
}

/// Handle to a search running on the blocking thread pool
#[derive(Debug)]
pub struct SearchHandle {
    cancel: CancelToken,
    task: tokio::task::JoinHandle<Result<Option<MatchResult>, SearchError>>,
}

impl SearchHandle {
    /// Stop evaluating further offsets.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the search to finish.
    pub async fn join(self) -> Result<Option<MatchResult>, SearchError> {
        self.task.await.map_err(|e| SearchError::Join(e.to_string()))?
    }
}

/// Run [`search_offset`] off the calling thread.
///
/// Must be called from within a tokio runtime.
pub fn spawn_search(
    reference: Arc<RgbaImage>,
    target: Arc<RgbaImage>,
    center: (i32, i32),
    params: SearchParams,
) -> SearchHandle {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let task = tokio::task::spawn_blocking(move || {
        search_offset(&reference, &target, center, &params, &token)
    });
    SearchHandle { cancel, task }
}

/// Alignment suggestion for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameAlignment {
    pub frame_index: u32,
    pub center: (i32, i32),
    pub result: Option<MatchResult>,
}

/// Search every frame of `candidate` against the same frame of `reference`.
///
/// Frames are processed in parallel; results are ordered by frame index.
pub fn align_frames(
    reference: &RgbaImage,
    candidate: &RgbaImage,
    frames: &FrameMaps,
    params: &SearchParams,
    cancel: &CancelToken,
) -> Result<Vec<FrameAlignment>, SearchError> {
    frames
        .frame_indices()
        .into_par_iter()
        .filter_map(|index| frames.frame_center(index).map(|center| (index, center)))
        .map(|(frame_index, center)| {
            let result = search_offset(reference, candidate, center, params, cancel)?;
            Ok::<_, SearchError>(FrameAlignment { frame_index, center, result })
        })
        .collect()
}

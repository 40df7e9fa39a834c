//! Matching utilities for multi-object tracking.

use ndarray::Array2;

use crate::error::TrackerError;
use crate::tracker::rect::Rect;

/// Cost of padding cells in the square LAPJV matrix, well above any real
/// `1 - IoU` cost.
const PAD_COST: f64 = 1e6;

/// Compute the IoU matrix with detections as rows and tracks as columns.
pub fn iou_matrix(det_boxes: &[Rect], track_boxes: &[Rect]) -> Array2<f32> {
    let mut ious = Array2::zeros((det_boxes.len(), track_boxes.len()));
    for (i, d) in det_boxes.iter().enumerate() {
        for (j, t) in track_boxes.iter().enumerate() {
            let iou = d.iou(t);
            ious[[i, j]] = if iou.is_finite() { iou } else { 0.0 };
        }
    }
    ious
}

/// Partition of one association round. Indices refer to the slices passed
/// to [`associate`]; every input index appears in exactly one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// `(detection, track)` pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_detections: Vec<usize>,
    pub unmatched_tracks: Vec<usize>,
}

/// Pair detections with predicted track boxes so the total IoU is maximal,
/// then reject pairs whose IoU is below `threshold`.
pub fn associate(
    det_boxes: &[Rect],
    track_boxes: &[Rect],
    threshold: f32,
) -> Result<AssignmentResult, TrackerError> {
    if track_boxes.is_empty() {
        return Ok(AssignmentResult {
            matches: vec![],
            unmatched_detections: (0..det_boxes.len()).collect(),
            unmatched_tracks: vec![],
        });
    }

    if det_boxes.is_empty() {
        return Ok(AssignmentResult {
            matches: vec![],
            unmatched_detections: vec![],
            unmatched_tracks: (0..track_boxes.len()).collect(),
        });
    }

    let ious = iou_matrix(det_boxes, track_boxes);
    let assignment = linear_assignment(&ious.mapv(|iou| 1.0 - iou))?;

    let mut matches = vec![];
    let mut det_matched = vec![false; det_boxes.len()];
    let mut track_matched = vec![false; track_boxes.len()];

    for (idet, itrack) in assignment {
        if ious[[idet, itrack]] >= threshold {
            matches.push((idet, itrack));
            det_matched[idet] = true;
            track_matched[itrack] = true;
        }
    }

    Ok(AssignmentResult {
        matches,
        unmatched_detections: unmatched(&det_matched),
        unmatched_tracks: unmatched(&track_matched),
    })
}

/// Minimum-cost assignment on a possibly rectangular cost matrix.
///
/// Returns `(row, col)` pairs covering every row or every column, whichever
/// side is smaller.
pub fn linear_assignment(cost_matrix: &Array2<f32>) -> Result<Vec<(usize, usize)>, TrackerError> {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return Ok(vec![]);
    }

    if num_rows == 1 && num_cols == 1 {
        return Ok(vec![(0, 0)]);
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PAD_COST);

    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]] as f64;
        }
    }

    let (row_to_col, _) =
        lapjv::lapjv(&padded).map_err(|e| TrackerError::Assignment(format!("{e:?}")))?;

    Ok(row_to_col
        .into_iter()
        .enumerate()
        .filter(|&(row, col)| row < num_rows && col < num_cols)
        .collect())
}

fn unmatched(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &m)| if m { None } else { Some(i) })
        .collect()
}

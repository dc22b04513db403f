// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region segmentation — locate every photo on a composite scan and cut it
// out.

use image::RgbImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use splitscan_core::error::{Result, SplitError};
use splitscan_core::{BoundingBox, SplitConfig};
use tracing::{debug, info, instrument};

use super::mask::build_mask;

/// Find the bounding box of each photo on a composite scan.
///
/// ## Pipeline
///
/// 1. Threshold the sheet with `(split_threshold, 255)` as canvas colour
/// 2. Pad the mask with `pad_ratio` of canvas on every side, so photos
///    touching the scan edge still get a closed outer contour
/// 3. Trace the outer contours of the foreground (top-level ones only)
/// 4. Fit a minimum-area rotated rectangle to each contour and take the
///    axis-aligned box enclosing it; a skewed photo's extent is not
///    underestimated this way
/// 5. Drop boxes below `min_object_ratio` of the padded sheet in either axis
/// 6. Optionally drop boxes nested inside another box
/// 7. Shift the survivors back into the unpadded frame
///
/// Padding the mask is equivalent to padding the scan with white first: white
/// is always inside the canvas range.
///
/// The order of the result follows contour discovery and carries no spatial
/// meaning. A blank sheet yields an empty vector.
#[instrument(skip_all, fields(width = composite.width(), height = composite.height()))]
pub fn segment(composite: &RgbImage, config: &SplitConfig) -> Vec<BoundingBox> {
    let (width, height) = composite.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let pad_y = (height as f64 * config.pad_ratio) as u32;
    let pad_x = (width as f64 * config.pad_ratio) as u32;
    let mask = build_mask(composite, config.split_threshold, u8::MAX).padded(pad_y, pad_x);
    let (padded_w, padded_h) = mask.dimensions();
    debug!(pad_y, pad_x, padded_w, padded_h, "Sheet mask padded");

    let contours = find_contours::<i32>(&mask.foreground_image());
    let candidates: Vec<BoundingBox> = contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| enclosing_box(&c.points))
        .collect();
    debug!(
        contours = contours.len(),
        outer = candidates.len(),
        "Contours traced"
    );

    let mut boxes: Vec<BoundingBox> = candidates
        .into_iter()
        .filter(|b| b.meets_min_extent(padded_w, padded_h, config.min_object_ratio))
        .collect();
    if config.suppress_nested_boxes {
        boxes = drop_nested(boxes);
    }

    let boxes: Vec<BoundingBox> = boxes
        .into_iter()
        .map(|b| b.translated(-(pad_y as i32), -(pad_x as i32)))
        .collect();
    info!(regions = boxes.len(), "Sheet segmented");
    boxes
}

/// Cut a region out of the composite.
///
/// The box is clamped to the composite first; a box with nothing left after
/// clamping is a [`SplitError::DegenerateRegion`].
pub fn extract(composite: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage> {
    let clamped = bbox
        .clamped(composite.width(), composite.height())
        .ok_or(SplitError::DegenerateRegion {
            width: bbox.width(),
            height: bbox.height(),
        })?;
    Ok(image::imageops::crop_imm(
        composite,
        clamped.x1 as u32,
        clamped.y1 as u32,
        clamped.width(),
        clamped.height(),
    )
    .to_image())
}

/// Axis-aligned box around the minimum-area rectangle of `points`.
/// Upper bounds are exclusive.
fn enclosing_box(points: &[Point<i32>]) -> Option<BoundingBox> {
    if points.is_empty() {
        return None;
    }
    let corners = min_area_rect(points);
    let min_x = corners.iter().map(|p| p.x).min()?;
    let max_x = corners.iter().map(|p| p.x).max()?;
    let min_y = corners.iter().map(|p| p.y).min()?;
    let max_y = corners.iter().map(|p| p.y).max()?;
    BoundingBox::new(min_y, max_y + 1, min_x, max_x + 1)
}

/// Remove every box lying wholly inside another. Of two identical boxes the
/// first is kept.
fn drop_nested(boxes: Vec<BoundingBox>) -> Vec<BoundingBox> {
    let keep: Vec<bool> = boxes
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            !boxes.iter().enumerate().any(|(j, other)| {
                j != i && other.contains(candidate) && (other != candidate || j < i)
            })
        })
        .collect();
    let before = boxes.len();
    let kept: Vec<BoundingBox> = boxes
        .into_iter()
        .zip(keep)
        .filter_map(|(b, keep)| keep.then_some(b))
        .collect();
    if kept.len() != before {
        debug!(dropped = before - kept.len(), "Nested boxes suppressed");
    }
    kept
}

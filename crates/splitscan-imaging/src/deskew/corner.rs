// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner probing — read the skew of a clean rectangular photo straight off
// the position of its corners.

use tracing::debug;

use crate::detect::mask::Mask;

/// A corner closer than this to a right angle with the axes is too flat to
/// read a tilt from.
pub const MIN_CORNER_DEGREES: f64 = 5.0;

/// Shortest usable leg, as a share of the shorter side of the turned mask.
pub const MIN_LEG_FRACTION: f64 = 0.05;

const MIN_LEG_PIXELS: u32 = 4;

/// Fewest usable corners a measurement needs.
const MIN_CORNERS: usize = 2;

/// Offset of the second reference turn, for photos the first one leaves too
/// close to upright.
const REMEASURE_OFFSET_DEGREES: f64 = 15.0;

/// Largest spread of corner estimates that still counts as agreement.
pub const CONSENSUS_DEGREES: f64 = 3.0;

/// Skew estimate from each usable corner, after turning the photo a further
/// `reference_degrees` clockwise.
///
/// The extra turn normally gives a clear tilt, so the topmost and leftmost
/// corners of the trimmed mask are distinct points. Their offsets along the
/// top row (`x0`) and left column (`y0`) are the legs of a right triangle
/// whose angle `acos(y0 / hypot(x0, y0))` is the total tilt; the reference
/// turn is subtracted back out and the result folded into `[-45, 45)`.
///
/// Corners with a leg shorter than [`MIN_LEG_FRACTION`] of the shorter side
/// (and at least four pixels), or within [`MIN_CORNER_DEGREES`] of the axes,
/// give no estimate. Those are edge jaggies, not corners.
pub fn corner_estimates(mask: &Mask, reference_degrees: f64) -> Vec<f64> {
    let mut turned = mask.rotated_expanded(reference_degrees).trimmed();
    let (width, height) = turned.dimensions();
    let min_leg = ((MIN_LEG_FRACTION * width.min(height) as f64).ceil() as u32).max(MIN_LEG_PIXELS);
    let mut estimates = Vec::with_capacity(4);

    for quarter in 0..4 {
        if turned.has_foreground() {
            let x0 = (0..turned.width()).find(|&x| !turned.is_background(x, 0));
            let y0 = (0..turned.height()).find(|&y| !turned.is_background(0, y));
            if let (Some(x0), Some(y0)) = (x0, y0) {
                match corner_tilt(x0, y0, min_leg) {
                    Some(tilt) => {
                        let estimate = fold(reference_degrees - tilt);
                        debug!(quarter, x0, y0, estimate, "Corner measured");
                        estimates.push(estimate);
                    }
                    None => debug!(quarter, x0, y0, "Corner too flat"),
                }
            }
        }
        turned = turned.rotated90();
    }
    estimates
}

/// Tilt in degrees of the corner with legs `x0` and `y0`, if it is a
/// usable corner.
fn corner_tilt(x0: u32, y0: u32, min_leg: u32) -> Option<f64> {
    if x0.min(y0) < min_leg {
        return None;
    }
    let tilt = (y0 as f64 / (x0 as f64).hypot(y0 as f64)).acos().to_degrees();
    (tilt.min(90.0 - tilt) >= MIN_CORNER_DEGREES).then_some(tilt)
}

/// Skew of the photo from its corners, measured at `reference_degrees` and
/// again at a reference 15 degrees away.
///
/// At each reference only the largest group of estimates agreeing within
/// [`CONSENSUS_DEGREES`] counts, so one torn or folded corner is outvoted.
/// The reference with the larger group wins, ties going to the tighter
/// group, and the result is that group's median. A turn that cancels the
/// photo's tilt leaves it nearly upright, and edge jaggies then give
/// scattered estimates that never form a group; the other reference decides.
/// `None` when neither reference yields two agreeing corners.
pub fn corner_probe_angle(mask: &Mask, reference_degrees: f64) -> Option<f64> {
    let alternate = alternate_reference(reference_degrees);
    let mut best: Option<Vec<f64>> = None;
    for reference in [reference_degrees, alternate] {
        let estimates = corner_estimates(mask, reference);
        let group = consensus(estimates.clone());
        debug!(
            reference,
            usable = estimates.len(),
            agreeing = group.len(),
            "Corners grouped"
        );
        if group.len() < MIN_CORNERS {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => {
                group.len() > current.len()
                    || (group.len() == current.len() && spread(&group) < spread(current))
            }
        };
        if better {
            best = Some(group);
        }
    }
    median(best?)
}

/// Largest run of sorted `values` spanning at most [`CONSENSUS_DEGREES`];
/// of equally large runs the tightest is kept.
fn consensus(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    let mut best = 0..0;
    let mut lo = 0;
    for hi in 0..values.len() {
        while values[hi] - values[lo] > CONSENSUS_DEGREES {
            lo += 1;
        }
        let len = hi + 1 - lo;
        let tighter = len == best.len() && values[hi] - values[lo] < spread(&values[best.clone()]);
        if len > best.len() || tighter {
            best = lo..hi + 1;
        }
    }
    values[best].to_vec()
}

fn spread(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => last - first,
        _ => f64::INFINITY,
    }
}

fn alternate_reference(degrees: f64) -> f64 {
    if degrees + REMEASURE_OFFSET_DEGREES < 45.0 {
        degrees + REMEASURE_OFFSET_DEGREES
    } else {
        degrees - REMEASURE_OFFSET_DEGREES
    }
}

fn fold(mut degrees: f64) -> f64 {
    while degrees >= 45.0 {
        degrees -= 90.0;
    }
    while degrees < -45.0 {
        degrees += 90.0;
    }
    degrees
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    use crate::detect::mask::{BACKGROUND, FOREGROUND};

    fn tilted_photo(tilt: f64) -> Mask {
        let mut gray = GrayImage::from_pixel(400, 400, BACKGROUND);
        draw_filled_rect_mut(&mut gray, Rect::at(80, 120).of_size(240, 160), FOREGROUND);
        Mask::from_gray(gray).rotated(tilt).trimmed()
    }

    #[test]
    fn recovers_clockwise_skew() {
        let angle = corner_probe_angle(&tilted_photo(12.0), 20.0).unwrap();
        assert!((angle + 12.0).abs() < 1.5, "{angle}");
    }

    #[test]
    fn recovers_counter_clockwise_skew() {
        let angle = corner_probe_angle(&tilted_photo(-7.0), 20.0).unwrap();
        assert!((angle - 7.0).abs() < 1.5, "{angle}");
    }

    #[test]
    fn upright_photo_needs_no_rotation() {
        let angle = corner_probe_angle(&tilted_photo(0.0), 20.0).unwrap();
        assert!(angle.abs() < 1.5, "{angle}");
    }

    #[test]
    fn tilt_cancelled_by_the_reference_turn_is_measured_again() {
        let angle = corner_probe_angle(&tilted_photo(-20.0), 20.0).unwrap();
        assert!((angle - 20.0).abs() < 1.5, "{angle}");
        let angle = corner_probe_angle(&tilted_photo(-24.0), 20.0).unwrap();
        assert!((angle - 24.0).abs() < 1.5, "{angle}");
    }

    #[test]
    fn steep_reference_remeasures_below_it() {
        assert_eq!(alternate_reference(20.0), 35.0);
        assert_eq!(alternate_reference(40.0), 25.0);
        let angle = corner_probe_angle(&tilted_photo(-40.0), 40.0).unwrap();
        assert!((angle - 40.0).abs() < 1.5, "{angle}");
    }

    #[test]
    fn either_reference_turn_may_cancel_the_tilt() {
        // -20 cancels the first reference turn, -35 the second.
        for tilt in [-36.0, -35.0, -34.0, -21.0, -20.0, -19.0] {
            let angle = corner_probe_angle(&tilted_photo(tilt), 20.0).unwrap();
            assert!((angle + tilt).abs() < 1.5, "tilt {tilt}: {angle}");
        }
    }

    #[test]
    fn consensus_keeps_the_largest_agreeing_group() {
        // Two stray corners that disagree form no group.
        assert_eq!(consensus(vec![-36.85, 7.24]).len(), 1);
        // A torn corner is outvoted by the other three.
        assert_eq!(consensus(vec![12.1, -30.0, 11.8, 12.4]), vec![11.8, 12.1, 12.4]);
        // Of two equally large groups the tighter one wins.
        assert_eq!(consensus(vec![1.0, 3.5, 10.0, 10.2]), vec![10.0, 10.2]);
        assert!(consensus(Vec::new()).is_empty());
    }

    #[test]
    fn flat_corners_are_rejected() {
        assert_eq!(corner_tilt(0, 0, 4), None);
        assert_eq!(corner_tilt(30, 2, 4), None);
        assert_eq!(corner_tilt(200, 10, 4), None);
        let tilt = corner_tilt(60, 80, 4).unwrap();
        assert!((tilt - 36.87).abs() < 0.01, "{tilt}");
    }

    #[test]
    fn empty_mask_gives_no_estimate() {
        assert_eq!(corner_probe_angle(&Mask::background(50, 50), 20.0), None);
    }

    #[test]
    fn median_and_fold() {
        assert_eq!(median(vec![3.0, -1.0, 100.0]), Some(3.0));
        assert_eq!(median(vec![4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(fold(60.0), -30.0);
        assert_eq!(fold(-50.0), 40.0);
        assert_eq!(fold(45.0), -45.0);
    }
}

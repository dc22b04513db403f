// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Angle losses — how well a candidate rotation squares a photo mask up with
// the axes. Lower is better.

use splitscan_core::LossKind;

use crate::detect::mask::Mask;

/// A row or column counts as background once this share of it is canvas.
pub const BACKGROUND_LINE_FRACTION: f64 = 0.9;

/// Tolerated change in foreground pixel count, relative to the original,
/// before a rotation is treated as clipping content.
pub const FOREGROUND_TOLERANCE: f64 = 0.01;

/// Multiplier applied to the relative foreground change of a clipping
/// rotation.
pub const CLIPPING_PENALTY: f64 = 1e4;

/// Evaluate `kind` at `degrees`. Non-finite results are reported as
/// `f64::INFINITY` so the optimizer never prefers them.
pub fn evaluate(kind: LossKind, mask: &Mask, degrees: f64) -> f64 {
    evaluate_rotated(kind, mask, &mask.rotated(degrees))
}

/// [`evaluate`] for a mask that has already been rotated.
pub fn evaluate_rotated(kind: LossKind, mask: &Mask, rotated: &Mask) -> f64 {
    let value = match kind {
        LossKind::BackgroundFill => background_fill_of(rotated),
        LossKind::ContentPreserving => content_preserving_of(mask, rotated),
    };
    if value.is_finite() { value } else { f64::INFINITY }
}

/// Relative change in foreground pixel count between `mask` and `rotated`.
/// Infinite for a mask without foreground.
pub fn foreground_change(mask: &Mask, rotated: &Mask) -> f64 {
    let foreground = mask.foreground_count();
    if foreground == 0 {
        return f64::INFINITY;
    }
    rotated.foreground_count().abs_diff(foreground) as f64 / foreground as f64
}

/// `1 - (background rows + background columns) / (height + width)` of the
/// mask rotated by `degrees` on its own canvas.
///
/// An upright photo inside a larger canvas leaves whole rows and columns of
/// canvas around it; a tilted one smears its corners over them.
pub fn background_fill_loss(mask: &Mask, degrees: f64) -> f64 {
    background_fill_of(&mask.rotated(degrees))
}

fn background_fill_of(rotated: &Mask) -> f64 {
    let (width, height) = rotated.dimensions();
    if width == 0 || height == 0 {
        return f64::INFINITY;
    }

    let mut row_background = vec![0u32; height as usize];
    let mut col_background = vec![0u32; width as usize];
    for (x, y, _) in rotated.as_gray().enumerate_pixels() {
        if rotated.is_background(x, y) {
            row_background[y as usize] += 1;
            col_background[x as usize] += 1;
        }
    }

    let rows = row_background
        .iter()
        .filter(|&&n| n as f64 / width as f64 > BACKGROUND_LINE_FRACTION)
        .count();
    let cols = col_background
        .iter()
        .filter(|&&n| n as f64 / height as f64 > BACKGROUND_LINE_FRACTION)
        .count();
    1.0 - (rows + cols) as f64 / (height + width) as f64
}

/// Reward canvas removed by re-trimming the rotated mask, but reject any
/// rotation that changes the amount of foreground noticeably.
///
/// * Foreground changed by more than [`FOREGROUND_TOLERANCE`]:
///   `CLIPPING_PENALTY * |change| / original`
/// * Otherwise: `(background after trim - background before) / background
///   before`, which lies in `[-1, 0]` when the trim removes canvas
///
/// This departs from the older signed formulation: the score is symmetric in
/// the angle (no sign factor) and foreground loss and gain are penalised
/// alike.
pub fn content_preserving_loss(mask: &Mask, degrees: f64) -> f64 {
    content_preserving_of(mask, &mask.rotated(degrees))
}

fn content_preserving_of(mask: &Mask, rotated: &Mask) -> f64 {
    let change = foreground_change(mask, rotated);
    if !change.is_finite() {
        return f64::INFINITY;
    }
    if change > FOREGROUND_TOLERANCE {
        return CLIPPING_PENALTY * change;
    }

    let background = mask.background_count();
    let remaining = rotated.trimmed().background_count();
    (remaining as f64 - background as f64) / background.max(1) as f64
}

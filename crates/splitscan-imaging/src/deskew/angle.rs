// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Angle estimation — pick the rotation that squares a photo mask up, by
// either of the two policies.

use rayon::prelude::*;
use splitscan_core::{AnglePolicy, LossKind, RotationAngle, SplitConfig};
use tracing::{debug, warn};

use super::corner::corner_probe_angle;
use super::loss::{evaluate, evaluate_rotated};
use super::search::{SearchOptions, minimize_bounded};
use crate::detect::mask::Mask;

/// Largest magnitude of a seeded starting angle, in degrees.
pub const MAX_SEED_DEGREES: f64 = 3.0;

/// Result of estimating one region's angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleEstimate {
    pub angle: RotationAngle,
    /// `false` when the estimator gave up; the angle is then zero.
    pub converged: bool,
}

impl AngleEstimate {
    fn gave_up() -> Self {
        Self {
            angle: RotationAngle::ZERO,
            converged: false,
        }
    }
}

/// Estimate the deskew angle of `mask` under `policy`.
///
/// A mask with no foreground needs no rotation. Whenever an estimator fails
/// to settle, the region is left unrotated and the failure is logged rather
/// than propagated.
pub fn estimate_angle(mask: &Mask, config: &SplitConfig, policy: AnglePolicy) -> AngleEstimate {
    if !mask.has_foreground() {
        debug!("Empty mask, no rotation");
        return AngleEstimate {
            angle: RotationAngle::ZERO,
            converged: true,
        };
    }

    match policy {
        AnglePolicy::LossMinimization => minimize_loss(mask, config),
        AnglePolicy::CornerProbe => match corner_probe_angle(mask, config.corner_probe_angle_deg) {
            Some(degrees) => AngleEstimate {
                angle: RotationAngle::or_zero(degrees),
                converged: true,
            },
            None => {
                warn!("No usable corner, leaving region unrotated");
                AngleEstimate::gave_up()
            }
        },
    }
}

fn minimize_loss(mask: &Mask, config: &SplitConfig) -> AngleEstimate {
    let kind = config.loss;
    let seed = starting_angle(mask, kind, config.probe_angle_deg);
    let start = coarse_start(mask, kind, config.coarse_step_deg, seed);
    let options = SearchOptions {
        lower: -RotationAngle::MAX_DEGREES,
        upper: RotationAngle::MAX_DEGREES,
        step: config.optimizer_step,
        tolerance: config.optimizer_tolerance,
        max_iterations: config.optimizer_max_iterations,
    };
    let outcome = minimize_bounded(|degrees| evaluate(kind, mask, degrees), start, &options);
    debug!(
        seed,
        start,
        x = outcome.x,
        value = outcome.value,
        iterations = outcome.iterations,
        "Angle search finished"
    );

    if !outcome.converged {
        warn!(
            iterations = outcome.iterations,
            "Angle search did not converge, leaving region unrotated"
        );
        return AngleEstimate::gave_up();
    }
    AngleEstimate {
        angle: RotationAngle::or_zero(outcome.x),
        converged: true,
    }
}

/// Seed for the angle search from the losses at `±offset_degrees`.
///
/// The seed takes the sign of the better side and a magnitude that grows
/// from `offset_degrees` to [`MAX_SEED_DEGREES`] with the relative gap
/// between the two losses. Equal losses seed at zero.
pub fn starting_angle(mask: &Mask, kind: LossKind, offset_degrees: f64) -> f64 {
    let minus = evaluate(kind, mask, -offset_degrees);
    let plus = evaluate(kind, mask, offset_degrees);
    if minus == plus {
        return 0.0;
    }

    let sign = if minus < plus { -1.0 } else { 1.0 };
    let scale = minus.abs().max(plus.abs()).max(f64::EPSILON);
    let gap = (minus - plus).abs() / scale;
    let gap = if gap.is_finite() { gap.clamp(0.0, 1.0) } else { 1.0 };
    let magnitude = (offset_degrees + (MAX_SEED_DEGREES - offset_degrees) * gap)
        .min(MAX_SEED_DEGREES);
    sign * magnitude
}

/// Where the local search starts: the best angle of a scan over
/// `[-45, 45]` every `step_degrees`, with `seed` as an extra candidate.
///
/// Candidates are scored on the mask expanded to its diagonal, so a large
/// rotation never pushes the photo off the canvas. Ties go to the candidate
/// nearest `seed`.
pub fn coarse_start(mask: &Mask, kind: LossKind, step_degrees: f64, seed: f64) -> f64 {
    let limit = RotationAngle::MAX_DEGREES;
    let steps = (2.0 * limit / step_degrees).floor() as u32;
    let candidates: Vec<f64> = std::iter::once(seed)
        .chain((0..=steps).map(|i| -limit + i as f64 * step_degrees))
        .filter(|degrees| degrees.is_finite() && degrees.abs() <= limit)
        .collect();

    let scored: Vec<(f64, f64)> = candidates
        .par_iter()
        .map(|&degrees| {
            let value = evaluate_rotated(kind, mask, &mask.rotated_expanded(degrees));
            (degrees, value)
        })
        .collect();

    let mut best = (seed, f64::INFINITY);
    for (degrees, value) in scored {
        let nearer = (degrees - seed).abs() < (best.0 - seed).abs();
        if value < best.1 || (value == best.1 && nearer) {
            best = (degrees, value);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    use crate::detect::mask::{BACKGROUND, FOREGROUND};

    fn tilted_block(tilt: f64) -> Mask {
        let mut gray = GrayImage::from_pixel(360, 360, BACKGROUND);
        draw_filled_rect_mut(&mut gray, Rect::at(80, 110).of_size(200, 140), FOREGROUND);
        Mask::from_gray(gray).rotated(tilt).trimmed()
    }

    #[test]
    fn seed_points_towards_the_correction() {
        let seed = starting_angle(&tilted_block(10.0), LossKind::BackgroundFill, 2.0);
        assert!(seed < 0.0 && seed >= -MAX_SEED_DEGREES, "{seed}");
        let seed = starting_angle(&tilted_block(-10.0), LossKind::BackgroundFill, 2.0);
        assert!(seed > 0.0 && seed <= MAX_SEED_DEGREES, "{seed}");
    }

    #[test]
    fn tied_losses_seed_at_zero() {
        let full = Mask::from_gray(GrayImage::from_pixel(50, 50, FOREGROUND));
        assert_eq!(starting_angle(&full, LossKind::BackgroundFill, 0.5), 0.0);
    }

    #[test]
    fn loss_minimization_recovers_skew() {
        let estimate = estimate_angle(
            &tilted_block(10.0),
            &SplitConfig::default(),
            AnglePolicy::LossMinimization,
        );
        assert!(estimate.converged);
        assert!((estimate.angle.degrees() + 10.0).abs() < 1.0, "{}", estimate.angle);
    }

    #[test]
    fn loss_minimization_recovers_large_skew_in_both_directions() {
        let config = SplitConfig::default();
        for tilt in [
            -40.0, -35.0, -32.0, -26.0, -24.0, -18.0, -10.0, -3.0, 0.0, 3.0, 12.0, 24.0, 26.0,
            31.0, 35.0, 40.0,
        ] {
            let estimate =
                estimate_angle(&tilted_block(tilt), &config, AnglePolicy::LossMinimization);
            assert!(estimate.converged, "tilt {tilt}");
            assert!(
                (estimate.angle.degrees() + tilt).abs() <= 1.0,
                "tilt {tilt}: {}",
                estimate.angle
            );
        }
    }

    #[test]
    fn coarse_scan_lands_near_the_correction() {
        let mask = tilted_block(33.0);
        let start = coarse_start(&mask, LossKind::BackgroundFill, 1.0, 0.0);
        assert!((start + 33.0).abs() <= 1.0, "{start}");

        let start = coarse_start(&tilted_block(-28.0), LossKind::ContentPreserving, 2.0, 0.0);
        assert!((start - 28.0).abs() <= 2.0, "{start}");
    }

    #[test]
    fn coarse_scan_keeps_an_upright_photo_upright() {
        let full = Mask::from_gray(GrayImage::from_pixel(240, 60, FOREGROUND));
        assert_eq!(coarse_start(&full, LossKind::BackgroundFill, 1.0, 0.0), 0.0);
        let estimate = estimate_angle(&full, &SplitConfig::default(), AnglePolicy::LossMinimization);
        assert!(estimate.converged);
        assert!(estimate.angle.degrees().abs() <= 0.5, "{}", estimate.angle);
    }

    #[test]
    fn content_preserving_loss_recovers_skew() {
        let config = SplitConfig {
            loss: LossKind::ContentPreserving,
            ..Default::default()
        };
        let estimate = estimate_angle(&tilted_block(-8.0), &config, AnglePolicy::LossMinimization);
        assert!(estimate.converged);
        assert!((estimate.angle.degrees() - 8.0).abs() < 1.0, "{}", estimate.angle);
    }

    #[test]
    fn upright_photo_filling_its_canvas_stays_put() {
        let full = Mask::from_gray(GrayImage::from_pixel(120, 80, FOREGROUND));
        let estimate = estimate_angle(&full, &SplitConfig::default(), AnglePolicy::LossMinimization);
        assert!(estimate.converged);
        assert!(estimate.angle.is_zero());
    }

    #[test]
    fn corner_policy_recovers_skew() {
        let estimate = estimate_angle(
            &tilted_block(6.0),
            &SplitConfig::default(),
            AnglePolicy::CornerProbe,
        );
        assert!(estimate.converged);
        assert!((estimate.angle.degrees() + 6.0).abs() < 1.5, "{}", estimate.angle);
    }

    #[test]
    fn corner_policy_handles_tilt_opposite_the_reference_turn() {
        let config = SplitConfig::default();
        let tilt = -config.corner_probe_angle_deg;
        let estimate = estimate_angle(&tilted_block(tilt), &config, AnglePolicy::CornerProbe);
        assert!(estimate.converged);
        assert!((estimate.angle.degrees() + tilt).abs() < 1.5, "{}", estimate.angle);
    }

    #[test]
    fn exhausted_search_leaves_region_unrotated() {
        let config = SplitConfig {
            optimizer_max_iterations: 1,
            ..Default::default()
        };
        let estimate = estimate_angle(&tilted_block(10.0), &config, AnglePolicy::LossMinimization);
        assert!(!estimate.converged);
        assert!(estimate.angle.is_zero());
    }

    #[test]
    fn empty_mask_needs_no_rotation() {
        let estimate = estimate_angle(
            &Mask::background(40, 40),
            &SplitConfig::default(),
            AnglePolicy::CornerProbe,
        );
        assert!(estimate.angle.is_zero());
    }
}

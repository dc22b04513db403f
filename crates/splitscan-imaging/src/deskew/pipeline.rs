// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-region deskew: trim, mask, estimate, rotate, trim again.

use image::RgbImage;
use splitscan_core::error::{Result, SplitError};
use splitscan_core::{AnglePolicy, RotationAngle, SplitConfig};
use tracing::{debug, instrument};

use super::angle::estimate_angle;
use super::rotate::rotate;
use super::trim::{has_foreground, shave_margin, trim};
use crate::detect::mask::build_object_mask;

/// Stages a region passes through, in order. Used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeskewStage {
    Cropped0,
    MaskBuilt,
    AngleEstimated,
    Rotated,
    Cropped1,
    Done,
}

impl DeskewStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cropped0 => "cropped0",
            Self::MaskBuilt => "mask_built",
            Self::AngleEstimated => "angle_estimated",
            Self::Rotated => "rotated",
            Self::Cropped1 => "cropped1",
            Self::Done => "done",
        }
    }
}

/// A deskewed photo and the rotation that produced it.
#[derive(Debug, Clone)]
pub struct Deskewed {
    pub image: RgbImage,
    pub angle: RotationAngle,
    /// `false` when the estimator gave up and the photo was left unrotated.
    pub converged: bool,
}

/// Deskew one extracted region.
///
/// 1. Trim canvas margins (`corner_threshold`)
/// 2. Build the photo mask, dropping specks and optionally keeping only the
///    largest object
/// 3. Estimate the angle under `policy`
/// 4. Rotate the trimmed image, filling exposed corners white
/// 5. Trim again and shave `margin_trim_ratio` off every side
///
/// A region with no foreground after the first trim is a
/// [`SplitError::DegenerateRegion`]. An estimator that fails to settle is
/// not an error: the photo is returned unrotated with `converged == false`.
#[instrument(skip_all, fields(width = sub_image.width(), height = sub_image.height(), policy = policy.as_str()))]
pub fn deskew(sub_image: &RgbImage, config: &SplitConfig, policy: AnglePolicy) -> Result<Deskewed> {
    let threshold = config.corner_threshold;
    let trimmed = trim(sub_image, threshold);
    if trimmed.width() == 0 || trimmed.height() == 0 || !has_foreground(&trimmed, threshold) {
        return Err(SplitError::DegenerateRegion {
            width: trimmed.width(),
            height: trimmed.height(),
        });
    }
    debug!(
        stage = DeskewStage::Cropped0.as_str(),
        width = trimmed.width(),
        height = trimmed.height()
    );

    let mask = build_object_mask(
        &trimmed,
        threshold,
        u8::MAX,
        config.min_object_ratio,
        config.single_object_mask,
    );
    debug!(
        stage = DeskewStage::MaskBuilt.as_str(),
        foreground = mask.foreground_count()
    );

    let estimate = estimate_angle(&mask, config, policy);
    debug!(
        stage = DeskewStage::AngleEstimated.as_str(),
        angle = estimate.angle.degrees(),
        converged = estimate.converged
    );

    let rotated = rotate(&trimmed, estimate.angle.degrees());
    debug!(stage = DeskewStage::Rotated.as_str());

    let image = shave_margin(&trim(&rotated, threshold), config.margin_trim_ratio);
    debug!(
        stage = DeskewStage::Cropped1.as_str(),
        width = image.width(),
        height = image.height()
    );

    debug!(stage = DeskewStage::Done.as_str(), angle = %estimate.angle);
    Ok(Deskewed {
        image,
        angle: estimate.angle,
        converged: estimate.converged,
    })
}

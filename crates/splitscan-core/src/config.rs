// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};
use crate::types::{AnglePolicy, LossKind};

/// Tuning for one split-and-deskew run.
///
/// The value is immutable once a run starts and is shared by reference with
/// every stage, so differently tuned pipelines can run side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Lower bound of the background range when locating photos on the
    /// sheet. Pixels with every channel in `[split_threshold, 255]` are canvas.
    pub split_threshold: u8,
    /// Background bound used when masking and trimming a single photo.
    pub corner_threshold: u8,
    /// Border added around the sheet before contour search, as a fraction of
    /// the sheet height (top/bottom) and width (left/right).
    pub pad_ratio: f64,
    /// Minimum photo extent as a fraction of the sheet dimensions.
    pub min_object_ratio: f64,
    /// Edge shave applied after the final trim, as a fraction of the smaller
    /// output dimension.
    pub margin_trim_ratio: f64,
    /// Magnitude of the two trial rotations that seed the angle search.
    pub probe_angle_deg: f64,
    /// Spacing of the coarse scan over `[-45, 45]` that picks where the
    /// local angle search starts.
    pub coarse_step_deg: f64,
    /// Finite-difference step and initial search stride, in degrees.
    pub optimizer_step: f64,
    /// The search stops once its stride drops below this, in degrees.
    pub optimizer_tolerance: f64,
    /// Iteration cap; hitting it counts as non-convergence.
    pub optimizer_max_iterations: u32,
    /// Reference rotation applied before probing corners.
    pub corner_probe_angle_deg: f64,
    /// Policy used by the batch driver.
    pub angle_policy: AnglePolicy,
    /// Loss minimized by [`AnglePolicy::LossMinimization`].
    pub loss: LossKind,
    /// Drop boxes that lie wholly inside another box.
    pub suppress_nested_boxes: bool,
    /// Keep only the largest component when masking a photo for deskew.
    pub single_object_mask: bool,
    /// Longer side of exported thumbnails, in pixels.
    pub thumbnail_max_dimension: u32,
    /// Worker threads for region processing; 0 means one per core.
    pub worker_threads: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            split_threshold: 200,
            corner_threshold: 235,
            pad_ratio: 0.1,
            min_object_ratio: 0.1,
            margin_trim_ratio: 0.005,
            probe_angle_deg: 0.5,
            coarse_step_deg: 1.0,
            optimizer_step: 0.5,
            optimizer_tolerance: 0.01,
            optimizer_max_iterations: 200,
            corner_probe_angle_deg: 20.0,
            angle_policy: AnglePolicy::LossMinimization,
            loss: LossKind::BackgroundFill,
            suppress_nested_boxes: true,
            single_object_mask: true,
            thumbnail_max_dimension: 200,
            worker_threads: 0,
        }
    }
}

impl SplitConfig {
    /// Parse a JSON document. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Reject values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SplitError::InvalidConfig(msg));

        for (name, value) in [
            ("pad_ratio", self.pad_ratio),
            ("min_object_ratio", self.min_object_ratio),
        ] {
            if !(0.0..1.0).contains(&value) {
                return invalid(format!("{name} must be in [0, 1), got {value}"));
            }
        }
        if !(0.0..0.5).contains(&self.margin_trim_ratio) {
            return invalid(format!(
                "margin_trim_ratio must be in [0, 0.5), got {}",
                self.margin_trim_ratio
            ));
        }
        if !(self.probe_angle_deg > 0.0 && self.probe_angle_deg <= 3.0) {
            return invalid(format!(
                "probe_angle_deg must be in (0, 3], got {}",
                self.probe_angle_deg
            ));
        }
        if !(self.coarse_step_deg > 0.0 && self.coarse_step_deg <= 10.0) {
            return invalid(format!(
                "coarse_step_deg must be in (0, 10], got {}",
                self.coarse_step_deg
            ));
        }
        if !(self.optimizer_step > 0.0 && self.optimizer_tolerance > 0.0) {
            return invalid("optimizer_step and optimizer_tolerance must be positive".into());
        }
        if self.optimizer_tolerance > self.optimizer_step {
            return invalid(format!(
                "optimizer_tolerance ({}) exceeds optimizer_step ({})",
                self.optimizer_tolerance, self.optimizer_step
            ));
        }
        if self.optimizer_max_iterations == 0 {
            return invalid("optimizer_max_iterations must be at least 1".into());
        }
        if !(self.corner_probe_angle_deg > 0.0 && self.corner_probe_angle_deg < 45.0) {
            return invalid(format!(
                "corner_probe_angle_deg must be in (0, 45), got {}",
                self.corner_probe_angle_deg
            ));
        }
        if self.thumbnail_max_dimension == 0 {
            return invalid("thumbnail_max_dimension must be positive".into());
        }
        Ok(())
    }
}

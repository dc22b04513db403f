// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Splitscan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned region of one photo, in the coordinate frame of the
/// composite scan it was found in.
///
/// Upper bounds are exclusive, so `height() == y2 - y1`. Coordinates are
/// signed: the enclosing rectangle of a skewed photo may poke a pixel or two
/// past the composite edge, and [`BoundingBox::clamped`] resolves that when
/// the region is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBoundingBox")]
pub struct BoundingBox {
    pub y1: i32,
    pub y2: i32,
    pub x1: i32,
    pub x2: i32,
}

impl BoundingBox {
    /// Build a box, returning `None` unless `y1 < y2` and `x1 < x2`.
    pub fn new(y1: i32, y2: i32, x1: i32, x2: i32) -> Option<Self> {
        (y1 < y2 && x1 < x2).then_some(Self { y1, y2, x1, x2 })
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1) as u32
    }

    /// Whether `other` lies entirely inside `self` (edges may coincide).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.x1 <= other.x1 && self.y1 <= other.y1 && self.x2 >= other.x2 && self.y2 >= other.y2
    }

    /// Shift the box by `(dy, dx)`.
    pub fn translated(&self, dy: i32, dx: i32) -> Self {
        Self {
            y1: self.y1 + dy,
            y2: self.y2 + dy,
            x1: self.x1 + dx,
            x2: self.x2 + dx,
        }
    }

    /// Intersect the box with a `width` x `height` canvas anchored at the
    /// origin. Returns `None` when nothing of the box is left.
    pub fn clamped(&self, width: u32, height: u32) -> Option<Self> {
        let x1 = self.x1.clamp(0, width as i32);
        let x2 = self.x2.clamp(0, width as i32);
        let y1 = self.y1.clamp(0, height as i32);
        let y2 = self.y2.clamp(0, height as i32);
        Self::new(y1, y2, x1, x2)
    }

    /// Whether both extents reach `ratio` of the given canvas dimensions.
    pub fn meets_min_extent(&self, canvas_width: u32, canvas_height: u32, ratio: f64) -> bool {
        self.width() as f64 >= ratio * canvas_width as f64
            && self.height() as f64 >= ratio * canvas_height as f64
    }
}

/// Unchecked wire form of [`BoundingBox`].
#[derive(Deserialize)]
struct RawBoundingBox {
    y1: i32,
    y2: i32,
    x1: i32,
    x2: i32,
}

impl TryFrom<RawBoundingBox> for BoundingBox {
    type Error = String;

    fn try_from(raw: RawBoundingBox) -> Result<Self, Self::Error> {
        Self::new(raw.y1, raw.y2, raw.x1, raw.x2).ok_or_else(|| {
            format!(
                "empty bounding box: y {}..{}, x {}..{}",
                raw.y1, raw.y2, raw.x1, raw.x2
            )
        })
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "y {}..{}, x {}..{} ({}x{})",
            self.y1,
            self.y2,
            self.x1,
            self.x2,
            self.width(),
            self.height()
        )
    }
}

/// A deskew rotation in degrees, positive = clockwise on screen.
///
/// The value always lies in `[-MAX_DEGREES, MAX_DEGREES]`. Anything outside
/// (or not finite) collapses to zero rather than being clamped, so a bogus
/// optimizer result never turns into a large rotation.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RotationAngle(f64);

impl RotationAngle {
    pub const MAX_DEGREES: f64 = 45.0;
    pub const ZERO: Self = Self(0.0);

    /// Accept `degrees` if it is finite and inside the bound.
    pub fn new(degrees: f64) -> Option<Self> {
        (degrees.is_finite() && degrees.abs() <= Self::MAX_DEGREES).then_some(Self(degrees))
    }

    /// Like [`RotationAngle::new`], but falls back to zero.
    pub fn or_zero(degrees: f64) -> Self {
        Self::new(degrees).unwrap_or(Self::ZERO)
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl TryFrom<f64> for RotationAngle {
    type Error = String;

    fn try_from(degrees: f64) -> Result<Self, Self::Error> {
        Self::new(degrees).ok_or_else(|| {
            format!(
                "rotation of {degrees} degrees is outside ±{}",
                Self::MAX_DEGREES
            )
        })
    }
}

impl From<RotationAngle> for f64 {
    fn from(angle: RotationAngle) -> Self {
        angle.0
    }
}

impl std::fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}°", self.0)
    }
}

/// How the deskew angle of a region is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnglePolicy {
    /// Bounded minimization of a mask loss over `[-45, 45]` degrees.
    #[default]
    LossMinimization,
    /// Geometric probing of the four photo corners. Only reliable for clean,
    /// undamaged rectangular photos.
    CornerProbe,
}

impl AnglePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LossMinimization => "loss_minimization",
            Self::CornerProbe => "corner_probe",
        }
    }
}

impl std::str::FromStr for AnglePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "loss" | "loss_minimization" | "loss-minimization" => Ok(Self::LossMinimization),
            "corner" | "corner_probe" | "corner-probe" => Ok(Self::CornerProbe),
            other => Err(format!("unknown angle policy: {other}")),
        }
    }
}

/// Loss function minimized by [`AnglePolicy::LossMinimization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Share of rows and columns that are not (almost) entirely background.
    #[default]
    BackgroundFill,
    /// Penalizes rotations that change the amount of foreground, otherwise
    /// rewards background removed by re-trimming the rotated mask.
    ContentPreserving,
}

/// Per-region entry of a run manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    /// 1-based region number within its sheet.
    pub index: usize,
    pub bbox: BoundingBox,
    /// Applied rotation, absent when the region failed.
    pub angle: Option<RotationAngle>,
    /// `false` when the angle search gave up and no rotation was applied.
    pub converged: Option<bool>,
    /// Output dimensions `(width, height)`.
    pub size: Option<(u32, u32)>,
    /// Where the region was written, if it was.
    pub output: Option<String>,
    /// Failure description for regions that produced no image.
    pub error: Option<String>,
}

impl RegionReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-sheet entry of a run manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetReport {
    pub source: String,
    /// Set when the sheet itself could not be read.
    pub error: Option<String>,
    pub regions: Vec<RegionReport>,
}

impl SheetReport {
    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            error: Some(error.into()),
            regions: Vec::new(),
        }
    }

    pub fn extracted_count(&self) -> usize {
        self.regions.iter().filter(|r| r.succeeded()).count()
    }
}

/// Summary of one batch run, written next to the extracted photos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub policy: AnglePolicy,
    pub sheets: Vec<SheetReport>,
}

impl RunManifest {
    pub fn new(policy: AnglePolicy) -> Self {
        Self {
            generated_at: Utc::now(),
            policy,
            sheets: Vec::new(),
        }
    }

    pub fn extracted_count(&self) -> usize {
        self.sheets.iter().map(SheetReport::extracted_count).sum()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_rejects_inverted_extents() {
        assert!(BoundingBox::new(10, 5, 0, 4).is_none());
        assert!(BoundingBox::new(0, 5, 4, 4).is_none());
        let bbox = BoundingBox::new(2, 12, 3, 8).unwrap();
        assert_eq!((bbox.width(), bbox.height()), (5, 10));
    }

    #[test]
    fn bounding_box_containment_and_clamp() {
        let outer = BoundingBox::new(0, 100, 0, 100).unwrap();
        let inner = BoundingBox::new(10, 20, 10, 20).unwrap();
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));

        let overhang = BoundingBox::new(-3, 50, 90, 104).unwrap();
        let clamped = overhang.clamped(100, 100).unwrap();
        assert_eq!(clamped, BoundingBox::new(0, 50, 90, 100).unwrap());
        assert!(BoundingBox::new(-10, -2, 0, 5).unwrap().clamped(100, 100).is_none());
    }

    #[test]
    fn bounding_box_min_extent() {
        let bbox = BoundingBox::new(0, 30, 0, 10).unwrap();
        assert!(bbox.meets_min_extent(100, 100, 0.1));
        assert!(!bbox.meets_min_extent(101, 100, 0.1));
    }

    #[test]
    fn rotation_angle_out_of_bound_falls_back_to_zero() {
        assert_eq!(RotationAngle::or_zero(12.5).degrees(), 12.5);
        assert_eq!(RotationAngle::or_zero(-45.0).degrees(), -45.0);
        assert!(RotationAngle::or_zero(45.1).is_zero());
        assert!(RotationAngle::or_zero(f64::NAN).is_zero());
        assert!(RotationAngle::new(-90.0).is_none());
    }

    #[test]
    fn deserialization_enforces_the_same_bounds() {
        let angle: RotationAngle = serde_json::from_str("-12.5").unwrap();
        assert_eq!(angle.degrees(), -12.5);
        assert_eq!(serde_json::to_string(&angle).unwrap(), "-12.5");
        assert!(serde_json::from_str::<RotationAngle>("90.0").is_err());

        let bbox: BoundingBox =
            serde_json::from_str(r#"{"y1":0,"y2":10,"x1":5,"x2":9}"#).unwrap();
        assert_eq!((bbox.width(), bbox.height()), (4, 10));
        assert!(serde_json::from_str::<BoundingBox>(r#"{"y1":10,"y2":10,"x1":0,"x2":5}"#).is_err());
        assert!(serde_json::from_str::<BoundingBox>(r#"{"y1":0,"y2":10,"x1":7,"x2":2}"#).is_err());
    }

    #[test]
    fn angle_policy_parses_short_names() {
        assert_eq!("loss".parse::<AnglePolicy>(), Ok(AnglePolicy::LossMinimization));
        assert_eq!("Corner".parse::<AnglePolicy>(), Ok(AnglePolicy::CornerProbe));
        assert!("hough".parse::<AnglePolicy>().is_err());
    }

    #[test]
    fn manifest_round_trips_through_json() {
        let mut manifest = RunManifest::new(AnglePolicy::CornerProbe);
        manifest.sheets.push(SheetReport {
            source: "sheet.tif".into(),
            error: None,
            regions: vec![RegionReport {
                index: 1,
                bbox: BoundingBox::new(0, 10, 0, 20).unwrap(),
                angle: Some(RotationAngle::or_zero(-3.0)),
                converged: Some(true),
                size: Some((20, 10)),
                output: Some("sheet_1.png".into()),
                error: None,
            }],
        });
        manifest.sheets.push(SheetReport::failed("broken.tif", "truncated"));

        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"corner_probe\""));
        let parsed: RunManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sheets, manifest.sheets);
        assert_eq!(parsed.extracted_count(), 1);
    }
}

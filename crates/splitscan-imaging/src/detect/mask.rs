// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background/foreground masks — threshold classification of a colour scan,
// connected-component filtering, hole filling, and the geometric helpers
// (pad, rotate, trim) that the segmenter and the angle estimators run on.

use std::collections::{HashMap, HashSet};

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::region_labelling::{Connectivity, connected_components};

/// Mask value for canvas (near-white) pixels.
pub const BACKGROUND: Luma<u8> = Luma([255]);
/// Mask value for photo content.
pub const FOREGROUND: Luma<u8> = Luma([0]);

/// Whether every channel of `pixel` lies in `[lower, upper]`.
#[inline]
pub fn in_background_range(pixel: &Rgb<u8>, lower: u8, upper: u8) -> bool {
    pixel.0.iter().all(|&c| c >= lower && c <= upper)
}

/// Binary classification of an image, same dimensions as its source.
///
/// Stored as a `GrayImage` holding [`BACKGROUND`] or [`FOREGROUND`], which
/// lets the `imageproc` contour, labelling and warp routines run on it
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pixels: GrayImage,
}

impl Mask {
    // -- Construction ---------------------------------------------------------

    /// Wrap a grey image; values >= 128 are read as background.
    pub fn from_gray(gray: GrayImage) -> Self {
        let pixels = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y).0[0] >= 128 {
                BACKGROUND
            } else {
                FOREGROUND
            }
        });
        Self { pixels }
    }

    /// A mask with no foreground at all.
    pub fn background(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::from_pixel(width, height, BACKGROUND),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_background(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] == BACKGROUND.0[0]
    }

    pub fn background_count(&self) -> u64 {
        self.pixels
            .as_raw()
            .iter()
            .filter(|&&v| v == BACKGROUND.0[0])
            .count() as u64
    }

    pub fn foreground_count(&self) -> u64 {
        self.pixels.as_raw().len() as u64 - self.background_count()
    }

    pub fn has_foreground(&self) -> bool {
        self.pixels.as_raw().iter().any(|&v| v != BACKGROUND.0[0])
    }

    /// Borrow the underlying grey image.
    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    /// Inverted copy with foreground = 255, the polarity `imageproc` expects
    /// for contour tracing and component labelling.
    pub fn foreground_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            if self.is_background(x, y) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    /// Inclusive `(x_min, x_max, y_min, y_max)` of the foreground, or `None`
    /// for an all-background mask.
    pub fn foreground_extent(&self) -> Option<(u32, u32, u32, u32)> {
        let mut extent: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in self.pixels.enumerate_pixels() {
            if pixel.0[0] == BACKGROUND.0[0] {
                continue;
            }
            extent = Some(match extent {
                None => (x, x, y, y),
                Some((x0, x1, y0, y1)) => (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
            });
        }
        extent
    }

    // -- Geometry (each returns a new mask) -----------------------------------

    /// Surround the mask with `pad_y` background rows above and below and
    /// `pad_x` background columns left and right.
    pub fn padded(&self, pad_y: u32, pad_x: u32) -> Self {
        let mut canvas = Self::background(self.width() + 2 * pad_x, self.height() + 2 * pad_y);
        image::imageops::replace(&mut canvas.pixels, &self.pixels, pad_x as i64, pad_y as i64);
        canvas
    }

    /// Rotate about the centre by `degrees` (clockwise), keeping the canvas
    /// size. Exposed corners become background.
    pub fn rotated(&self, degrees: f64) -> Self {
        if degrees == 0.0 || self.width() == 0 || self.height() == 0 {
            return self.clone();
        }
        let pixels = rotate_about_center(
            &self.pixels,
            (degrees as f32).to_radians(),
            Interpolation::Nearest,
            BACKGROUND,
        );
        Self { pixels }
    }

    /// Rotate on a canvas large enough to hold every corner of the original.
    pub fn rotated_expanded(&self, degrees: f64) -> Self {
        let (width, height) = self.dimensions();
        let diagonal = (width as f64).hypot(height as f64).ceil() as u32;
        let pad_x = (diagonal.saturating_sub(width)).div_ceil(2);
        let pad_y = (diagonal.saturating_sub(height)).div_ceil(2);
        self.padded(pad_y, pad_x).rotated(degrees)
    }

    /// Quarter turn clockwise.
    pub fn rotated90(&self) -> Self {
        Self {
            pixels: image::imageops::rotate90(&self.pixels),
        }
    }

    /// Crop to the foreground extent. An all-background mask is returned
    /// unchanged.
    pub fn trimmed(&self) -> Self {
        match self.foreground_extent() {
            None => self.clone(),
            Some((x0, x1, y0, y1)) => Self {
                pixels: image::imageops::crop_imm(&self.pixels, x0, y0, x1 - x0 + 1, y1 - y0 + 1)
                    .to_image(),
            },
        }
    }
}

/// Classify every pixel of `image`: background iff all three channels lie in
/// `[lower, upper]`.
pub fn build_mask(image: &RgbImage, lower: u8, upper: u8) -> Mask {
    let pixels = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if in_background_range(image.get_pixel(x, y), lower, upper) {
            BACKGROUND
        } else {
            FOREGROUND
        }
    });
    Mask { pixels }
}

/// Per-component statistics gathered from a label image.
#[derive(Debug, Clone, Copy)]
struct Component {
    min_x: u32,
    max_x: u32,
    pixel_count: u64,
}

impl Component {
    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }
}

/// Mask of the photo object(s) in a single extracted region.
///
/// Starts from [`build_mask`], then labels 8-connected foreground
/// components, drops those narrower than `min_object_ratio` of the image
/// width (dust, watermark specks), optionally keeps only the largest
/// survivor, and fills each survivor solid so that bright areas inside a
/// photo do not read as canvas. With no survivor the result is all
/// background.
pub fn build_object_mask(
    image: &RgbImage,
    lower: u8,
    upper: u8,
    min_object_ratio: f64,
    single_object: bool,
) -> Mask {
    let (width, height) = image.dimensions();
    let raw = build_mask(image, lower, upper);
    let labels = connected_components(&raw.foreground_image(), Connectivity::Eight, Luma([0u8]));

    let mut components: HashMap<u32, Component> = HashMap::new();
    for (x, _y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }
        components
            .entry(label)
            .and_modify(|c| {
                c.min_x = c.min_x.min(x);
                c.max_x = c.max_x.max(x);
                c.pixel_count += 1;
            })
            .or_insert(Component {
                min_x: x,
                max_x: x,
                pixel_count: 1,
            });
    }

    let min_width = min_object_ratio * width as f64;
    let mut kept: Vec<(u32, Component)> = components
        .into_iter()
        .filter(|(_, c)| c.width() as f64 >= min_width)
        .collect();

    if single_object {
        kept = kept
            .into_iter()
            .max_by_key(|(label, c)| (c.pixel_count, std::cmp::Reverse(*label)))
            .into_iter()
            .collect();
    }
    if kept.is_empty() {
        return Mask::background(width, height);
    }

    let kept: HashSet<u32> = kept.into_iter().map(|(label, _)| label).collect();
    let solid = GrayImage::from_fn(width, height, |x, y| {
        if kept.contains(&labels.get_pixel(x, y).0[0]) {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    Mask::from_foreground(&fill_holes(&solid))
}

impl Mask {
    /// Inverse of [`Mask::foreground_image`].
    fn from_foreground(foreground: &GrayImage) -> Self {
        let pixels = GrayImage::from_fn(foreground.width(), foreground.height(), |x, y| {
            if foreground.get_pixel(x, y).0[0] == 0 {
                BACKGROUND
            } else {
                FOREGROUND
            }
        });
        Self { pixels }
    }
}

/// Set every zero pixel that cannot reach the image border through other
/// zero pixels. Zero regions are 4-connected, the dual of the 8-connected
/// foreground.
fn fill_holes(solid: &GrayImage) -> GrayImage {
    let (width, height) = solid.dimensions();
    let gaps = GrayImage::from_fn(width, height, |x, y| {
        if solid.get_pixel(x, y).0[0] == 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let regions = connected_components(&gaps, Connectivity::Four, Luma([0u8]));

    let mut exterior: HashSet<u32> = HashSet::new();
    for (x, y, label) in regions.enumerate_pixels() {
        let on_border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
        if on_border && label.0[0] != 0 {
            exterior.insert(label.0[0]);
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = regions.get_pixel(x, y).0[0];
        if label == 0 || !exterior.contains(&label) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

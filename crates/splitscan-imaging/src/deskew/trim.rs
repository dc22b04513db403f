// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Border trimming — strip uniform canvas margins from a photo.

use image::{Rgb, RgbImage};

/// A pixel is foreground when any channel is darker than `threshold`.
#[inline]
pub fn is_foreground(pixel: &Rgb<u8>, threshold: u8) -> bool {
    pixel.0.iter().any(|&c| c < threshold)
}

/// Inclusive `(x_min, x_max, y_min, y_max)` of the foreground pixels.
pub fn foreground_extent(image: &RgbImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut extent: Option<(u32, u32, u32, u32)> = None;
    for (y, row) in image.enumerate_rows() {
        let mut row_span: Option<(u32, u32)> = None;
        for (x, _, pixel) in row {
            if is_foreground(pixel, threshold) {
                row_span = Some(match row_span {
                    None => (x, x),
                    Some((first, _)) => (first, x),
                });
            }
        }
        if let Some((first, last)) = row_span {
            extent = Some(match extent {
                None => (first, last, y, y),
                Some((x0, x1, y0, _)) => (x0.min(first), x1.max(last), y0, y),
            });
        }
    }
    extent
}

pub fn has_foreground(image: &RgbImage, threshold: u8) -> bool {
    image.pixels().any(|p| is_foreground(p, threshold))
}

/// Crop `image` to the rows and columns holding foreground.
///
/// An all-background image is returned unchanged.
pub fn trim(image: &RgbImage, threshold: u8) -> RgbImage {
    match foreground_extent(image, threshold) {
        None => image.clone(),
        Some((x0, x1, y0, y1)) => {
            image::imageops::crop_imm(image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
    }
}

/// Trim one side at a time: drop background rows off the top, turn the image
/// a quarter clockwise, and repeat for all four sides.
///
/// Gives the same result as [`trim`]; kept for callers that want the
/// side-by-side behaviour on images that are not a single blob.
pub fn trim_iterative(image: &RgbImage, threshold: u8) -> RgbImage {
    if !has_foreground(image, threshold) {
        return image.clone();
    }
    let mut current = image.clone();
    for _ in 0..4 {
        let (width, height) = current.dimensions();
        let blank_rows = (0..height)
            .take_while(|&y| (0..width).all(|x| !is_foreground(current.get_pixel(x, y), threshold)))
            .count() as u32;
        if blank_rows > 0 {
            current =
                image::imageops::crop_imm(&current, 0, blank_rows, width, height - blank_rows)
                    .to_image();
        }
        current = image::imageops::rotate90(&current);
    }
    current
}

/// Shave `floor(ratio * min(width, height))` pixels off every side.
///
/// Removes the anti-aliased fringe a rotation leaves along the photo edge.
/// A margin that would consume a whole side leaves the image unchanged. With
/// a ratio below one half (what the configuration allows) that cannot happen,
/// so a shave never empties the image.
pub fn shave_margin(image: &RgbImage, ratio: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    let margin = (ratio * width.min(height) as f64).floor() as u32;
    if margin == 0 || 2 * margin >= width || 2 * margin >= height {
        return image.clone();
    }
    image::imageops::crop_imm(image, margin, margin, width - 2 * margin, height - 2 * margin)
        .to_image()
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

/// Fill for the corners a rotation exposes; the next trim removes them.
pub const FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Rotate `image` clockwise by `degrees` about its centre, keeping the
/// canvas size. Bilinear sampling; exposed areas are white.
pub fn rotate(image: &RgbImage, degrees: f64) -> RgbImage {
    if degrees == 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    rotate_about_center(
        image,
        (degrees as f32).to_radians(),
        Interpolation::Bilinear,
        FILL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rotation_is_identity() {
        let mut img = RgbImage::from_pixel(8, 5, FILL);
        img.put_pixel(1, 2, Rgb([10, 20, 30]));
        assert_eq!(rotate(&img, 0.0), img);
    }

    #[test]
    fn keeps_canvas_and_fills_corners_white() {
        let img = RgbImage::from_pixel(60, 40, Rgb([0, 0, 0]));
        let rotated = rotate(&img, 15.0);
        assert_eq!(rotated.dimensions(), (60, 40));
        assert_eq!(*rotated.get_pixel(0, 0), FILL);
        assert_eq!(*rotated.get_pixel(30, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn positive_angle_turns_clockwise() {
        // A horizontal bar through the centre, rotated clockwise, dips on the
        // right-hand side (image y grows downwards).
        let mut img = RgbImage::from_pixel(101, 101, FILL);
        for x in 10..91 {
            img.put_pixel(x, 50, Rgb([0, 0, 0]));
        }
        let rotated = rotate(&img, 20.0);
        let darkest_row = |x: u32| {
            (0..101)
                .min_by_key(|&y| rotated.get_pixel(x, y).0[0])
                .unwrap()
        };
        assert!(darkest_row(80) > 50);
        assert!(darkest_row(20) < 50);
    }
}

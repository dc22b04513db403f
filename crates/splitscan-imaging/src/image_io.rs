// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image I/O — decode scans from disk or memory, encode extracted photos and
// their thumbnails as PNG.

use std::path::Path;

use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use splitscan_core::error::{Result, SplitError};
use tracing::{debug, info, instrument};

/// Load a composite scan from a file, converted to 8-bit RGB.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_sheet(path: impl AsRef<Path>) -> Result<RgbImage> {
    let img = image::open(path.as_ref()).map_err(|err| {
        SplitError::Decode(format!("failed to open {}: {}", path.as_ref().display(), err))
    })?;
    info!(width = img.width(), height = img.height(), "Sheet loaded");
    Ok(img.to_rgb8())
}

/// Decode raw encoded bytes (TIFF, PNG, JPEG, ...).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| SplitError::Decode(format!("failed to decode image: {}", err)))?;
    debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
    Ok(img.to_rgb8())
}

/// Downscale so the longer side is at most `max_dimension`, preserving the
/// aspect ratio. Images already small enough are returned as-is.
pub fn thumbnail(image: &RgbImage, max_dimension: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension || max_dimension == 0 {
        return image.clone();
    }
    let scale = max_dimension as f64 / longest as f64;
    let new_w = ((width as f64 * scale).round() as u32).max(1);
    let new_h = ((height as f64 * scale).round() as u32).max(1);
    image::imageops::resize(image, new_w, new_h, FilterType::Lanczos3)
}

/// Encode as PNG bytes.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| SplitError::Encode(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Write a PNG file.
pub fn save_png(image: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    image
        .save_with_format(path.as_ref(), ImageFormat::Png)
        .map_err(|err| {
            SplitError::Encode(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Directory runner — feed every scan in a folder through the splitter and
// write the photos, thumbnails and a JSON manifest to the output folder.

use std::path::{Path, PathBuf};

use splitscan_core::error::Result;
use splitscan_core::{AnglePolicy, RegionReport, RunManifest, SheetReport, SplitConfig};
use splitscan_imaging::RegionOutcome;
use splitscan_imaging::image_io::{load_sheet, save_png, thumbnail};
use splitscan_imaging::process_sheet;
use tracing::{info, warn};

/// File extensions picked up from the input directory (case-insensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg", "bmp"];

/// Name of the manifest written next to the extracted photos.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Per-run switches that are not part of the tuning configuration.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub policy: AnglePolicy,
    pub thumbnails: bool,
}

/// Scan files in `dir`, sorted by name.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// `<stem>_<index>.png`, with a `_thumb` suffix for thumbnails.
pub fn output_name(stem: &str, index: usize, thumb: bool) -> String {
    if thumb {
        format!("{stem}_{index}_thumb.png")
    } else {
        format!("{stem}_{index}.png")
    }
}

/// Process every scan in `input_dir` and return the manifest that was
/// written to `output_dir`.
///
/// Only setup problems (unreadable input directory, unwritable output
/// directory or manifest) are errors. Undecodable scans and failing regions
/// are logged and recorded in the manifest.
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    config: &SplitConfig,
    options: RunOptions,
) -> Result<RunManifest> {
    std::fs::create_dir_all(output_dir)?;
    let inputs = collect_inputs(input_dir)?;
    info!(count = inputs.len(), dir = %input_dir.display(), "Scans found");

    let mut manifest = RunManifest::new(options.policy);
    let total = inputs.len();
    for (i, path) in inputs.iter().enumerate() {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!("Working on {}: {} of {}", source, i + 1, total);

        let sheet = match load_sheet(path) {
            Ok(sheet) => sheet,
            Err(err) => {
                warn!(file = %source, error = %err, "Skipping unreadable scan");
                manifest.sheets.push(SheetReport::failed(source, err.to_string()));
                continue;
            }
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        let regions = process_sheet(Some(&sheet), config, options.policy)
            .iter()
            .map(|outcome| export_region(outcome, &stem, output_dir, config, options.thumbnails))
            .collect();
        manifest.sheets.push(SheetReport {
            source,
            error: None,
            regions,
        });
    }

    let manifest_path = output_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, manifest.to_json()?)?;
    info!(
        sheets = manifest.sheets.len(),
        extracted = manifest.extracted_count(),
        manifest = %manifest_path.display(),
        "Run complete"
    );
    Ok(manifest)
}

/// Write one region (and its thumbnail) and describe the result.
fn export_region(
    outcome: &RegionOutcome,
    stem: &str,
    output_dir: &Path,
    config: &SplitConfig,
    thumbnails: bool,
) -> RegionReport {
    let Ok(deskewed) = &outcome.result else {
        return outcome.report(None);
    };

    let name = output_name(stem, outcome.index, false);
    if let Err(err) = save_png(&deskewed.image, output_dir.join(&name)) {
        warn!(file = %name, error = %err, "Could not write region");
        let mut report = outcome.report(None);
        report.error = Some(err.to_string());
        return report;
    }

    if thumbnails {
        let thumb_name = output_name(stem, outcome.index, true);
        let thumb = thumbnail(&deskewed.image, config.thumbnail_max_dimension);
        if let Err(err) = save_png(&thumb, output_dir.join(&thumb_name)) {
            warn!(file = %thumb_name, error = %err, "Could not write thumbnail");
        }
    }
    outcome.report(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn two_photo_sheet() -> RgbImage {
        let mut img = RgbImage::from_pixel(600, 400, Rgb([255, 255, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(40, 40).of_size(220, 160), Rgb([30, 60, 90]));
        draw_filled_rect_mut(&mut img, Rect::at(330, 180).of_size(230, 190), Rgb([90, 60, 30]));
        img
    }

    fn options(thumbnails: bool) -> RunOptions {
        RunOptions {
            policy: AnglePolicy::LossMinimization,
            thumbnails,
        }
    }

    #[test]
    fn inputs_are_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.TIF", "a.png", "notes.txt", "c.jpeg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = collect_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.TIF", "c.jpeg"]);
    }

    #[test]
    fn output_names_are_one_based_per_sheet() {
        assert_eq!(output_name("album_03", 1, false), "album_03_1.png");
        assert_eq!(output_name("album_03", 2, true), "album_03_2_thumb.png");
    }

    #[test]
    fn writes_regions_thumbnails_and_manifest() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        save_png(&two_photo_sheet(), input.path().join("sheet.png")).unwrap();
        std::fs::write(input.path().join("broken.jpg"), b"not a jpeg").unwrap();

        let out_dir = output.path().join("photos");
        let manifest = run(input.path(), &out_dir, &SplitConfig::default(), options(true)).unwrap();

        assert_eq!(manifest.sheets.len(), 2);
        let broken = &manifest.sheets[0];
        assert_eq!(broken.source, "broken.jpg");
        assert!(broken.error.is_some());

        let sheet = &manifest.sheets[1];
        assert_eq!(sheet.extracted_count(), 2);
        for n in 1..=2 {
            assert!(out_dir.join(format!("sheet_{n}.png")).is_file());
            let thumb = load_sheet(out_dir.join(format!("sheet_{n}_thumb.png"))).unwrap();
            assert!(thumb.width().max(thumb.height()) <= 200);
        }

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out_dir.join(MANIFEST_FILE)).unwrap())
                .unwrap();
        assert_eq!(written["sheets"].as_array().unwrap().len(), 2);
        assert_eq!(written["policy"], "loss_minimization");
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let output = tempfile::tempdir().unwrap();
        let missing = output.path().join("does-not-exist");
        assert!(run(&missing, output.path(), &SplitConfig::default(), options(false)).is_err());
    }
}

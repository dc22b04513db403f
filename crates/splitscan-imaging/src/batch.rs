// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch driver — segment sheets and deskew their regions in parallel.
//
// Regions share nothing but the read-only configuration, so they are fanned
// out over rayon's pool. A failing region is logged and reported; it never
// takes its siblings or its sheet down with it.

use image::RgbImage;
use rayon::prelude::*;
use splitscan_core::error::{Result, SplitError};
use splitscan_core::{AnglePolicy, BoundingBox, RegionReport, SplitConfig};
use tracing::{error, info, instrument, warn};

use crate::deskew::{Deskewed, deskew};
use crate::detect::{extract, segment};

/// What became of one region of a sheet.
#[derive(Debug)]
pub struct RegionOutcome {
    /// 1-based position in segmentation order.
    pub index: usize,
    pub bbox: BoundingBox,
    pub result: Result<Deskewed>,
}

impl RegionOutcome {
    /// Manifest entry for this region; `output` names the file it was
    /// written to, if any.
    pub fn report(&self, output: Option<String>) -> RegionReport {
        match &self.result {
            Ok(deskewed) => RegionReport {
                index: self.index,
                bbox: self.bbox,
                angle: Some(deskewed.angle),
                converged: Some(deskewed.converged),
                size: Some(deskewed.image.dimensions()),
                output,
                error: None,
            },
            Err(err) => RegionReport {
                index: self.index,
                bbox: self.bbox,
                angle: None,
                converged: None,
                size: None,
                output: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Segment one composite and deskew every region found on it.
///
/// An absent composite (one that could not be decoded) yields no outcomes.
/// Outcomes come back sorted by region index.
#[instrument(skip_all, fields(policy = policy.as_str()))]
pub fn process_sheet(
    composite: Option<&RgbImage>,
    config: &SplitConfig,
    policy: AnglePolicy,
) -> Vec<RegionOutcome> {
    let Some(composite) = composite else {
        warn!("No image to split, skipping sheet");
        return Vec::new();
    };

    let boxes = segment(composite, config);
    if boxes.is_empty() {
        info!("No regions found on sheet");
        return Vec::new();
    }

    let mut outcomes: Vec<RegionOutcome> = boxes
        .into_par_iter()
        .enumerate()
        .map(|(i, bbox)| {
            let index = i + 1;
            let result = extract(composite, &bbox).and_then(|sub| deskew(&sub, config, policy));
            match &result {
                Ok(deskewed) => info!(
                    index,
                    angle = %deskewed.angle,
                    converged = deskewed.converged,
                    "Region deskewed"
                ),
                Err(err) if err.is_region_local() => {
                    warn!(index, %bbox, error = %err, "Region skipped")
                }
                Err(err) => error!(index, %bbox, error = %err, "Region failed"),
            }
            RegionOutcome {
                index,
                bbox,
                result,
            }
        })
        .collect();
    outcomes.sort_by_key(|o| o.index);

    let extracted = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!(regions = outcomes.len(), extracted, "Sheet processed");
    outcomes
}

/// [`process_sheet`] over many sheets in parallel. The result is in input
/// order.
pub fn process_sheets(
    sheets: &[Option<RgbImage>],
    config: &SplitConfig,
    policy: AnglePolicy,
) -> Vec<Vec<RegionOutcome>> {
    sheets
        .par_iter()
        .map(|sheet| process_sheet(sheet.as_ref(), config, policy))
        .collect()
}

/// Run `f` inside a dedicated rayon pool of `threads` workers (0 = one per
/// core), so parallel stages called from `f` use that pool.
pub fn with_worker_pool<R, F>(threads: usize, f: F) -> Result<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("splitscan-worker-{i}"))
        .build()
        .map_err(|err| SplitError::WorkerPool(err.to_string()))?;
    Ok(pool.install(f))
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// splitscan-imaging — Split composite scans into individual photos.
//
// Locates each photo on a flatbed scan holding several of them (masking and
// contour search), cuts it out, estimates and corrects its skew, and trims
// the canvas margin left around it. The batch driver fans regions out over a
// rayon pool.

pub mod batch;
pub mod deskew;
pub mod detect;
pub mod image_io;

// Re-export the entry points so callers can use `splitscan_imaging::segment` etc.
pub use batch::{RegionOutcome, process_sheet, process_sheets, with_worker_pool};
pub use deskew::{Deskewed, deskew, rotate, trim};
pub use detect::{extract, segment};

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection — background masks and region segmentation of composite scans.

pub mod mask;
pub mod segment;

pub use mask::{Mask, build_mask, build_object_mask};
pub use segment::{extract, segment};

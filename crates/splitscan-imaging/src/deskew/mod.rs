// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deskew — border trimming, angle estimation (loss minimization or corner
// probing) and rotation of a single extracted photo.

pub mod angle;
pub mod corner;
pub mod loss;
pub mod pipeline;
pub mod rotate;
pub mod search;
pub mod trim;

pub use angle::{AngleEstimate, estimate_angle};
pub use pipeline::{DeskewStage, Deskewed, deskew};
pub use rotate::rotate;
pub use trim::{shave_margin, trim, trim_iterative};

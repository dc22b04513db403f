// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Splitscan.

use thiserror::Error;

/// Top-level error type for all Splitscan operations.
///
/// None of these are fatal to a batch: the driver catches them at the
/// region (or sheet) boundary, logs them and moves on to the next one.
#[derive(Debug, Error)]
pub enum SplitError {
    // -- Imaging errors --
    #[error("failed to decode source image: {0}")]
    Decode(String),

    #[error("failed to encode output image: {0}")]
    Encode(String),

    /// The region held no foreground once its background margin was trimmed,
    /// or its box did not intersect the composite at all.
    #[error("degenerate region ({width}x{height}): no foreground content after trimming")]
    DegenerateRegion { width: u32, height: u32 },

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SplitError {
    /// Whether the error only concerns a single region and the rest of the
    /// sheet can still be processed.
    pub fn is_region_local(&self) -> bool {
        matches!(self, Self::DegenerateRegion { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SplitError>;

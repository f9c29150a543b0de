//! # Alignment Module
//!
//! Compares the live orientation against the reference target, one axis
//! at a time. There is no hysteresis, so the flags may flicker when the
//! device hovers right at the tolerance edge.

use crate::orientation::Orientation;
use serde::{Deserialize, Serialize};

/// Maximum per-axis difference, in degrees, that still counts as aligned.
pub const DEFAULT_TOLERANCE_DEG: f64 = 2.0;

/// Per-axis alignment flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub pitch_aligned: bool,
    pub roll_aligned: bool,
}

impl AlignmentResult {
    /// Both axes are within tolerance.
    pub fn is_aligned(&self) -> bool {
        self.pitch_aligned && self.roll_aligned
    }
}

/// Evaluates `current` against an optional `target`.
///
/// Without a target nothing is ever aligned. The comparison is strict:
/// a difference of exactly `tolerance_deg` is not aligned.
pub fn evaluate(current: Orientation, target: Option<Orientation>, tolerance_deg: f64) -> AlignmentResult {
    match target {
        None => AlignmentResult::default(),
        Some(target) => AlignmentResult {
            pitch_aligned: (current.pitch - target.pitch).abs() < tolerance_deg,
            roll_aligned: (current.roll - target.roll).abs() < tolerance_deg,
        },
    }
}

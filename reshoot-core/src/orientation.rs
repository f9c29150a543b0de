//! # Orientation Module
//!
//! Converts raw accelerometer readings into a pitch/roll tilt estimate.
//!
//! Only gravity is used, so this is a tilt approximation and not a full
//! attitude solution: yaw is unobservable and linear motion leaks into
//! the angles. Every sample is converted on its own; there is no
//! filtering between samples.

use serde::{Deserialize, Serialize};

/// A single 3-axis accelerometer reading.
///
/// Units are arbitrary but must be proportional to gravity plus motion,
/// so the angles come out the same for m/s² or g.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelerationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerationSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Device tilt in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    /// Rotation about the device's horizontal axis.
    pub pitch: f64,
    /// Rotation about the device's longitudinal axis.
    pub roll: f64,
}

impl Orientation {
    pub fn new(pitch: f64, roll: f64) -> Self {
        Self { pitch, roll }
    }
}

/// Estimates pitch and roll from one accelerometer sample.
///
/// ```text
/// pitch = atan2(-x, sqrt(y² + z²))
/// roll  = atan2(y, z)
/// ```
///
/// An all-zero sample is not an error: `atan2(0, 0)` is 0, so it yields
/// a level orientation.
pub fn estimate(sample: AccelerationSample) -> Orientation {
    let AccelerationSample { x, y, z } = sample;
    let pitch_rad = (-x).atan2((y * y + z * z).sqrt());
    let roll_rad = y.atan2(z);

    Orientation {
        pitch: pitch_rad.to_degrees(),
        roll: roll_rad.to_degrees(),
    }
}

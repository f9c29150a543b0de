//! # Configuration Module
//!
//! Tunables for the live view and the capture flow, stored as JSON.
//! Every field has a default, so partial or missing files are fine.
//!
//! The blur threshold is intentionally absent: it is tied to the
//! Laplacian kernel and lives next to it in [`crate::sharpness`].

use crate::alignment::DEFAULT_TOLERANCE_DEG;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Per-axis alignment tolerance in degrees.
    pub tolerance_deg: f64,
    /// How long to wait for the camera before giving up on a trigger.
    /// Must be non-zero.
    pub acquire_timeout_ms: u64,
    /// Capacity of the accelerometer sample queue.
    pub sensor_queue: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            tolerance_deg: DEFAULT_TOLERANCE_DEG,
            acquire_timeout_ms: 5_000,
            sensor_queue: 64,
        }
    }
}

impl CoreConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Loads settings from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("[CONFIG] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("writing config {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if !(self.tolerance_deg.is_finite() && self.tolerance_deg > 0.0) {
            anyhow::bail!("tolerance_deg must be a positive number, got {}", self.tolerance_deg);
        }
        if self.acquire_timeout_ms == 0 {
            anyhow::bail!("acquire_timeout_ms must be at least 1");
        }
        if self.sensor_queue == 0 {
            anyhow::bail!("sensor_queue must be at least 1");
        }
        Ok(())
    }
}

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

// ─── Tracker configuration ───────────────────────────────────────────────────

/// Shortest tick period a session will schedule
pub const MIN_INTERVAL_MS: u64 = 1;

/// Scheduling knobs for a tracking session. Detection thresholds are
/// fixed constants in their own modules and are not configurable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // ── Periodic ticks ──
    pub classification_interval_ms: u64,
    pub metrics_interval_ms: u64,

    // ── On-demand metrics ──
    /// Publish a metrics snapshot after every accepted location fix
    pub metrics_on_location: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            classification_interval_ms: 1_000,
            metrics_interval_ms: 60_000,
            metrics_on_location: false,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> TrackerResult<Self> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> TrackerResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if self.classification_interval_ms == 0 {
            return Err(TrackerError::Config(
                "classification_interval_ms must be > 0".to_string(),
            ));
        }
        if self.metrics_interval_ms == 0 {
            return Err(TrackerError::Config(
                "metrics_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy with every interval raised to at least `MIN_INTERVAL_MS`.
    /// Sessions run on this, since the fields are public and may skip `validate`.
    pub fn clamped(mut self) -> Self {
        if let Err(e) = self.validate() {
            log::warn!("{}; clamping to {} ms", e, MIN_INTERVAL_MS);
            self.classification_interval_ms = self.classification_interval_ms.max(MIN_INTERVAL_MS);
            self.metrics_interval_ms = self.metrics_interval_ms.max(MIN_INTERVAL_MS);
        }
        self
    }

    pub fn classification_interval(&self) -> Duration {
        Duration::from_millis(self.classification_interval_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }
}

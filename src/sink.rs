use std::fs;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::metrics::HealthMetrics;

/// Downstream consumer of metrics snapshots (health store, status file, ...).
///
/// Pushes are best effort: the session logs a failed push and moves on.
pub trait HealthSink: Send + Sync {
    fn name(&self) -> &str;
    fn push(&self, metrics: &HealthMetrics) -> TrackerResult<()>;
}

/// Status file contents written by `JsonStatusSink`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StatusFile {
    pub updated_at: String,
    pub metrics: HealthMetrics,
}

/// Overwrites a JSON file with the latest metrics on every push
pub struct JsonStatusSink {
    path: PathBuf,
}

impl JsonStatusSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> TrackerResult<StatusFile> {
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl HealthSink for JsonStatusSink {
    fn name(&self) -> &str {
        "status_file"
    }

    fn push(&self, metrics: &HealthMetrics) -> TrackerResult<()> {
        let updated_at = Utc
            .timestamp_millis_opt(metrics.timestamp_ms)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let status = StatusFile {
            updated_at,
            metrics: metrics.clone(),
        };
        let json = serde_json::to_string_pretty(&status)?;
        fs::write(&self.path, json).map_err(|e| TrackerError::Sink {
            sink: self.name().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsAggregator;
    use crate::tracking_state::TrackingState;

    #[test]
    fn test_status_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonStatusSink::new(dir.path().join("live_status.json"));
        assert!(sink.path().ends_with("live_status.json"));

        let mut state = TrackingState::new(0);
        state.total_distance = 250.0;
        let metrics = MetricsAggregator::new().derive(&state, 1_700_000_000_000);
        sink.push(&metrics).unwrap();

        let status = sink.read().unwrap();
        assert_eq!(status.metrics.distance, 250.0);
        assert!(status.updated_at.starts_with("2023-11-14"));
    }

    #[test]
    fn test_unwritable_path_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonStatusSink::new(dir.path().join("missing").join("status.json"));
        let metrics = MetricsAggregator::new().derive(&TrackingState::new(0), 0);
        let err = sink.push(&metrics).unwrap_err();
        assert!(matches!(err, TrackerError::Sink { .. }));
    }
}

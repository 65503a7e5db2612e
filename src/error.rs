use thiserror::Error;

/// Errors raised at the edges of the tracker (configuration, sinks, replay).
/// Sample ingestion and classification never fail.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sink {sink} rejected metrics: {reason}")]
    Sink { sink: String, reason: String },

    #[error("Replay error at record {line}: {reason}")]
    Replay { line: usize, reason: String },
}

pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TrackerError::Sink {
            sink: "status_file".to_string(),
            reason: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "Sink status_file rejected metrics: disk full");

        let err = TrackerError::Config("classification_interval_ms must be > 0".to_string());
        assert!(err.to_string().starts_with("Invalid configuration"));
    }

    #[test]
    fn test_io_conversion() {
        fn open_missing() -> TrackerResult<()> {
            std::fs::read("/definitely/not/here.json")?;
            Ok(())
        }
        assert!(matches!(open_missing(), Err(TrackerError::Io(_))));
    }
}

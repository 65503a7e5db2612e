//! Offline replay of recorded sensor sessions.
//!
//! Accepts a JSON array or JSON lines of tagged records, optionally gzip
//! compressed:
//!
//! ```text
//! {"type":"location","timestamp_ms":0,"latitude":0.0,"longitude":0.0,"speed":0.0}
//! {"type":"motion","kind":"accelerometer","values":[0.1,0.2,1.3],"timestamp_ms":20}
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::metrics::HealthMetrics;
use crate::session::{Clock, ManualClock, TrackingSession};
use crate::types::{LocationSample, MotionSample};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordedSample {
    Location(LocationSample),
    Motion(MotionSample),
}

impl RecordedSample {
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            RecordedSample::Location(fix) => fix.timestamp_ms,
            RecordedSample::Motion(sample) => sample.timestamp_ms,
        }
    }
}

/// Load a recording, sorted by timestamp
pub fn read_recording<P: AsRef<Path>>(path: P) -> TrackerResult<Vec<RecordedSample>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut text = String::new();
    if path.extension().and_then(|ext| ext.to_str()) == Some("gz") {
        GzDecoder::new(BufReader::new(file)).read_to_string(&mut text)?;
    } else {
        BufReader::new(file).read_to_string(&mut text)?;
    }
    parse_recording(&text)
}

pub fn parse_recording(text: &str) -> TrackerResult<Vec<RecordedSample>> {
    let mut samples: Vec<RecordedSample> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).map_err(|e| TrackerError::Replay {
            line: e.line(),
            reason: e.to_string(),
        })?
    } else {
        let mut samples = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let sample = serde_json::from_str(line).map_err(|e| TrackerError::Replay {
                line: idx + 1,
                reason: e.to_string(),
            })?;
            samples.push(sample);
        }
        samples
    };
    samples.sort_by_key(RecordedSample::timestamp_ms);
    Ok(samples)
}

#[derive(Clone, Debug, Serialize)]
pub struct ReplaySummary {
    pub locations: usize,
    pub motions: usize,
    pub classification_ticks: usize,
    pub metrics_ticks: usize,
    /// Mean ground speed over the replayed session (m/s)
    pub average_speed: f64,
    pub final_metrics: HealthMetrics,
}

/// Drive a session through `samples` in sample time. Ticks fire whenever
/// sample time crosses a multiple of the configured intervals.
pub fn replay(
    session: &TrackingSession,
    clock: &Arc<ManualClock>,
    samples: &[RecordedSample],
) -> ReplaySummary {
    let classification_every = session.config().classification_interval_ms as i64;
    let metrics_every = session.config().metrics_interval_ms as i64;

    let start = samples.first().map_or(0, RecordedSample::timestamp_ms);
    clock.set(start);
    session.start();

    let mut next_classification = start + classification_every;
    let mut next_metrics = start + metrics_every;
    let (mut locations, mut motions) = (0, 0);
    let (mut classification_ticks, mut metrics_ticks) = (0, 0);

    for sample in samples {
        let ts = sample.timestamp_ms();

        while next_classification <= ts {
            clock.set(next_classification);
            session.tick_classification();
            classification_ticks += 1;
            next_classification += classification_every;
        }
        while next_metrics <= ts {
            clock.set(next_metrics);
            session.tick_metrics();
            metrics_ticks += 1;
            next_metrics += metrics_every;
        }

        clock.set(ts);
        match sample {
            RecordedSample::Location(fix) => {
                session.submit_location(fix.clone());
                locations += 1;
            }
            RecordedSample::Motion(motion) => {
                session.submit_motion(motion.clone());
                motions += 1;
            }
        }
    }

    session.tick_classification();
    classification_ticks += 1;
    session.stop();

    ReplaySummary {
        locations,
        motions,
        classification_ticks,
        metrics_ticks,
        average_speed: session.snapshot().average_speed(clock.now_ms()),
        final_metrics: session.metrics(),
    }
}

//! Step cadence from raw accelerometer magnitude.
//!
//! A step is a rising edge of the magnitude signal through `MOVEMENT_THRESHOLD`.
//! Edges closer together than `MIN_STEP_INTERVAL_MS` are bounce, edges further
//! apart than `MAX_STEP_INTERVAL_MS` follow a pause; neither updates cadence,
//! but both move the edge baseline forward.

use serde::{Deserialize, Serialize};

use crate::tracking_state::TrackingState;
use crate::types::MotionSample;

/// Magnitude above which the device counts as moving (sensor units, m/s²)
pub const MOVEMENT_THRESHOLD: f64 = 0.5;
pub const MIN_STEP_INTERVAL_MS: i64 = 300;
pub const MAX_STEP_INTERVAL_MS: i64 = 1_500;

/// Step accepted by the detector
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub timestamp_ms: i64,
    pub interval_ms: i64,
    /// Steps per minute implied by `interval_ms`
    pub cadence: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PeakDetector {
    previous_magnitude: f64,
    last_rising_edge_ms: Option<i64>,
}

impl PeakDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one accelerometer sample. Under-length or non-finite readings
    /// leave both the detector and `state` untouched.
    pub fn process(&mut self, sample: &MotionSample, state: &mut TrackingState) -> Option<StepEvent> {
        let magnitude = sample.magnitude()?;
        let now = sample.timestamp_ms;

        state.accelerometer_magnitude = magnitude;

        let above = magnitude > MOVEMENT_THRESHOLD;
        if above {
            state.movement_detected = true;
            state.last_movement_time_ms = Some(now);
        }

        let rising_edge = above && self.previous_magnitude <= MOVEMENT_THRESHOLD;
        self.previous_magnitude = magnitude;
        if !rising_edge {
            return None;
        }

        let previous_edge = self.last_rising_edge_ms.replace(now)?;
        let interval_ms = now - previous_edge;
        if !(MIN_STEP_INTERVAL_MS..=MAX_STEP_INTERVAL_MS).contains(&interval_ms) {
            return None;
        }

        let cadence = 60_000.0 / interval_ms as f64;
        state.cadence = cadence;
        state.step_count += 1;

        Some(StepEvent {
            timestamp_ms: now,
            interval_ms,
            cadence,
        })
    }

    pub fn last_rising_edge_ms(&self) -> Option<i64> {
        self.last_rising_edge_ms
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

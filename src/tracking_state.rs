//! Mutable per-session aggregate.
//!
//! Fields are partitioned by the producer that writes them:
//!   - location fixes: distance, altitude, pace, location history
//!   - accelerometer (through `PeakDetector`): magnitude, cadence, steps, movement
//!   - gyroscope: rotation rate
//!   - classification tick: current activity
//!
//! The session wraps the whole struct in one mutex, so every update below runs
//! as a single critical section and readers never see half-applied fixes.

use std::collections::VecDeque;

use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityType, LocationSample};

/// Capacity of the recent-location history
pub const RECENT_LOCATION_CAPACITY: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingState {
    pub start_time_ms: i64,
    pub end_time_ms: Option<i64>,
    pub is_active: bool,

    // Location-owned
    pub total_distance: f64,
    pub total_altitude_gain: f64,
    /// Meters per minute since session start
    pub pace: f64,
    pub current_location: Option<LocationSample>,
    pub last_location: Option<LocationSample>,
    pub recent_locations: VecDeque<LocationSample>,
    /// Most recent valid (> 0) altitude, `None` until the first one arrives
    pub last_altitude: Option<f64>,

    // Accelerometer-owned
    pub step_count: u64,
    /// Steps per minute, instantaneous
    pub cadence: f64,
    pub accelerometer_magnitude: f64,
    pub movement_detected: bool,
    pub last_movement_time_ms: Option<i64>,

    // Gyroscope-owned
    pub rotation_rate: f64,

    // Classification-owned
    pub current_activity: ActivityType,
}

impl TrackingState {
    /// Fresh, zeroed state for a session starting at `start_time_ms`
    pub fn new(start_time_ms: i64) -> Self {
        Self {
            start_time_ms,
            end_time_ms: None,
            is_active: true,
            total_distance: 0.0,
            total_altitude_gain: 0.0,
            pace: 0.0,
            current_location: None,
            last_location: None,
            recent_locations: VecDeque::with_capacity(RECENT_LOCATION_CAPACITY),
            last_altitude: None,
            step_count: 0,
            cadence: 0.0,
            accelerometer_magnitude: 0.0,
            movement_detected: false,
            last_movement_time_ms: None,
            rotation_rate: 0.0,
            current_activity: ActivityType::Unknown,
        }
    }

    /// Placeholder state held by an idle session that has never started.
    /// Zero-length, so derived durations and calories stay at zero.
    pub fn idle() -> Self {
        let mut state = Self::new(0);
        state.finish(0);
        state
    }

    /// Apply a location fix. Returns false when the fix was discarded.
    pub fn apply_location(&mut self, fix: &LocationSample) -> bool {
        if !fix.has_valid_position() {
            return false;
        }

        self.current_location = Some(fix.clone());

        if let Some(prev) = self.last_location.as_ref() {
            let delta = surface_distance(prev, fix);
            if delta.is_finite() && delta > 0.0 {
                self.total_distance += delta;
            }
        }

        if self.recent_locations.len() >= RECENT_LOCATION_CAPACITY {
            self.recent_locations.pop_front();
        }
        self.recent_locations.push_back(fix.clone());
        self.last_location = Some(fix.clone());

        if let Some(altitude) = fix.valid_altitude() {
            if let Some(prev_altitude) = self.last_altitude {
                let climb = altitude - prev_altitude;
                if climb > 0.0 {
                    self.total_altitude_gain += climb;
                }
            }
            self.last_altitude = Some(altitude);
        }

        let elapsed_minutes = (fix.timestamp_ms - self.start_time_ms) as f64 / 60_000.0;
        if self.total_distance > 0.0 && elapsed_minutes > 0.0 {
            self.pace = self.total_distance / elapsed_minutes;
        }

        true
    }

    /// Gyroscope update: rotation rate is instantaneous, never accumulated
    pub fn apply_rotation(&mut self, rotation_rate: f64) {
        self.rotation_rate = rotation_rate;
    }

    /// Current fix speed, if any fix has arrived
    pub fn current_speed(&self) -> Option<f64> {
        self.current_location.as_ref().map(|loc| loc.speed)
    }

    /// Session duration up to `now_ms`, or up to the end time once stopped
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        let end = self.end_time_ms.unwrap_or(now_ms);
        (end - self.start_time_ms).max(0)
    }

    pub fn elapsed_minutes(&self, now_ms: i64) -> f64 {
        self.elapsed_ms(now_ms) as f64 / 60_000.0
    }

    /// Mean ground speed over the session in m/s
    pub fn average_speed(&self, now_ms: i64) -> f64 {
        let secs = self.elapsed_ms(now_ms) as f64 / 1000.0;
        if secs > 0.0 {
            self.total_distance / secs
        } else {
            0.0
        }
    }

    /// Mark the session finished. Totals are kept for the final snapshot.
    pub fn finish(&mut self, end_time_ms: i64) {
        self.is_active = false;
        self.end_time_ms = Some(end_time_ms);
    }
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Great-circle distance between two fixes in meters
pub fn surface_distance(a: &LocationSample, b: &LocationSample) -> f64 {
    let p1 = Point::new(a.longitude, a.latitude);
    let p2 = Point::new(b.longitude, b.latitude);
    p1.haversine_distance(&p2)
}

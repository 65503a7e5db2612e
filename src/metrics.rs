use serde::{Deserialize, Serialize};

use crate::classifier;
use crate::tracking_state::TrackingState;
use crate::types::ActivityType;

/// Body weight used by the calorie model (kg)
pub const ASSUMED_BODY_WEIGHT_KG: f64 = 70.0;

/// Read-only snapshot published to listeners and sinks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub timestamp_ms: i64,
    /// Meters
    pub distance: f64,
    pub steps: u64,
    /// kcal
    pub calories: f64,
    /// Meters per minute
    pub pace: f64,
    /// m/s, from the latest fix
    pub speed: f64,
    pub altitude: f64,
    pub altitude_gain: f64,
    /// Steps per minute
    pub cadence: f64,
    pub activity: ActivityType,
    pub confidence: f64,
    pub location_accuracy: f64,
}

/// Metabolic equivalent for each activity
pub fn met_for(activity: ActivityType) -> f64 {
    match activity {
        ActivityType::Stationary => 1.0,
        ActivityType::Walking => 3.5,
        ActivityType::Running => 9.8,
        ActivityType::Cycling => 7.5,
        ActivityType::IntenseExercise => 12.0,
        ActivityType::Unknown => 2.0,
    }
}

/// kcal burned at `activity`'s MET over `elapsed_minutes`
pub fn calories_for(activity: ActivityType, elapsed_minutes: f64) -> f64 {
    if elapsed_minutes <= 0.0 {
        return 0.0;
    }
    met_for(activity) * ASSUMED_BODY_WEIGHT_KG * elapsed_minutes / 60.0
}

/// Derives `HealthMetrics` from the tracking state. Stateless apart from a
/// counter; cheap enough to run on every fix or on a slow tick.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    derived: u64,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(&mut self, state: &TrackingState, now_ms: i64) -> HealthMetrics {
        self.derived += 1;

        let elapsed_minutes = state.elapsed_minutes(now_ms);
        let location = state.current_location.as_ref();

        HealthMetrics {
            timestamp_ms: now_ms,
            distance: state.total_distance,
            steps: state.step_count,
            calories: calories_for(state.current_activity, elapsed_minutes),
            pace: state.pace,
            speed: location.map_or(0.0, |l| l.speed),
            altitude: location.and_then(|l| l.altitude).unwrap_or(0.0),
            altitude_gain: state.total_altitude_gain,
            cadence: state.cadence,
            activity: state.current_activity,
            confidence: classifier::confidence(state.current_activity, state),
            location_accuracy: location.map_or(0.0, |l| l.accuracy),
        }
    }

    /// Number of snapshots derived so far
    pub fn derived_count(&self) -> u64 {
        self.derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationSample;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_met_table() {
        assert_eq!(met_for(ActivityType::Stationary), 1.0);
        assert_eq!(met_for(ActivityType::Walking), 3.5);
        assert_eq!(met_for(ActivityType::Running), 9.8);
        assert_eq!(met_for(ActivityType::Cycling), 7.5);
        assert_eq!(met_for(ActivityType::IntenseExercise), 12.0);
        assert_eq!(met_for(ActivityType::Unknown), 2.0);
    }

    #[test]
    fn test_calories_half_hour_run() {
        // 9.8 * 70 * 30 / 60
        assert_abs_diff_eq!(calories_for(ActivityType::Running, 30.0), 343.0, epsilon = 1e-9);
        assert_eq!(calories_for(ActivityType::Running, 0.0), 0.0);
    }

    #[test]
    fn test_empty_state_yields_zeroes() {
        let mut aggregator = MetricsAggregator::new();
        let state = TrackingState::new(1_000);
        let metrics = aggregator.derive(&state, 1_000);
        assert_eq!(metrics.distance, 0.0);
        assert_eq!(metrics.steps, 0);
        assert_eq!(metrics.calories, 0.0);
        assert_eq!(metrics.speed, 0.0);
        assert_eq!(metrics.altitude, 0.0);
        assert_eq!(metrics.location_accuracy, 0.0);
        assert_eq!(metrics.activity, ActivityType::Unknown);
        assert_eq!(aggregator.derived_count(), 1);
    }

    #[test]
    fn test_derive_copies_state() {
        let mut state = TrackingState::new(0);
        state.total_distance = 1_200.0;
        state.total_altitude_gain = 15.0;
        state.pace = 120.0;
        state.step_count = 1_500;
        state.cadence = 150.0;
        state.movement_detected = true;
        state.current_activity = ActivityType::Walking;
        state.current_location = Some(LocationSample::new(0, 1.0, 2.0, Some(42.0), 1.5, 4.0));

        let metrics = MetricsAggregator::new().derive(&state, 600_000);
        assert_eq!(metrics.timestamp_ms, 600_000);
        assert_eq!(metrics.distance, 1_200.0);
        assert_eq!(metrics.steps, 1_500);
        assert_eq!(metrics.altitude, 42.0);
        assert_eq!(metrics.altitude_gain, 15.0);
        assert_eq!(metrics.speed, 1.5);
        assert_eq!(metrics.location_accuracy, 4.0);
        // 3.5 MET * 70 kg * 10 min / 60
        assert_abs_diff_eq!(metrics.calories, 40.833_333, epsilon = 1e-5);
        assert_abs_diff_eq!(metrics.confidence, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calories_stop_at_end_time() {
        let mut state = TrackingState::new(0);
        state.current_activity = ActivityType::Stationary;
        state.finish(60_000);
        let metrics = MetricsAggregator::new().derive(&state, 3_600_000);
        // One minute at 1 MET
        assert_abs_diff_eq!(metrics.calories, 70.0 / 60.0, epsilon = 1e-9);
    }
}

//! Rule-based activity classification.
//!
//! Rules are evaluated top to bottom and the first match wins. The order is
//! data (`DEFAULT_RULES`), so it can be inspected and tested on its own.

use serde::{Deserialize, Serialize};

use crate::tracking_state::TrackingState;
use crate::types::ActivityType;

/// GPS speed above which the user is running (m/s)
pub const RUNNING_SPEED: f64 = 3.5;
/// GPS speed above which the user is walking (m/s)
pub const WALKING_SPEED: f64 = 1.4;
/// Rotation rate above which the motion looks like pedalling (rad/s)
pub const CYCLING_ROTATION_THRESHOLD: f64 = 2.0;
/// Accelerometer magnitude treated as high-intensity exercise
pub const HIGH_INTENSITY_THRESHOLD: f64 = 25.0;

pub const WALKING_CADENCE: (f64, f64) = (120.0, 160.0);
pub const RUNNING_CADENCE: (f64, f64) = (161.0, 200.0);

const BASE_CONFIDENCE: f64 = 0.5;
const MOVEMENT_BONUS: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub activity: ActivityType,
    pub confidence: f64,
}

/// One `(predicate, outcome)` entry of the decision list
#[derive(Clone, Copy)]
pub struct ClassificationRule {
    pub name: &'static str,
    pub predicate: fn(&TrackingState) -> bool,
    pub outcome: ActivityType,
}

impl std::fmt::Debug for ClassificationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationRule")
            .field("name", &self.name)
            .field("outcome", &self.outcome)
            .finish()
    }
}

fn speed_above(state: &TrackingState, limit: f64) -> bool {
    state.current_speed().map_or(false, |speed| speed > limit)
}

/// Cadence is compared in whole steps per minute
fn cadence_in(state: &TrackingState, range: (f64, f64)) -> bool {
    let cadence = state.cadence.round();
    cadence >= range.0 && cadence <= range.1
}

pub const DEFAULT_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "no_movement",
        predicate: |s| !s.movement_detected,
        outcome: ActivityType::Stationary,
    },
    ClassificationRule {
        name: "running_speed",
        predicate: |s| speed_above(s, RUNNING_SPEED),
        outcome: ActivityType::Running,
    },
    ClassificationRule {
        name: "walking_speed",
        predicate: |s| speed_above(s, WALKING_SPEED),
        outcome: ActivityType::Walking,
    },
    ClassificationRule {
        name: "cycling_rotation",
        predicate: |s| s.rotation_rate > CYCLING_ROTATION_THRESHOLD,
        outcome: ActivityType::Cycling,
    },
    ClassificationRule {
        name: "high_intensity",
        predicate: |s| s.accelerometer_magnitude > HIGH_INTENSITY_THRESHOLD,
        outcome: ActivityType::IntenseExercise,
    },
    ClassificationRule {
        name: "walking_cadence",
        predicate: |s| cadence_in(s, WALKING_CADENCE),
        outcome: ActivityType::Walking,
    },
    ClassificationRule {
        name: "running_cadence",
        predicate: |s| cadence_in(s, RUNNING_CADENCE),
        outcome: ActivityType::Running,
    },
];

#[derive(Clone, Debug)]
pub struct ActivityClassifier {
    rules: Vec<ClassificationRule>,
}

impl ActivityClassifier {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }

    /// Classifier with a custom decision list; unmatched states map to `Unknown`
    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Name of the first rule matching `state`
    pub fn matching_rule(&self, state: &TrackingState) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(state))
            .map(|rule| rule.name)
    }

    pub fn classify(&self, state: &TrackingState) -> ActivityType {
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(state))
            .map_or(ActivityType::Unknown, |rule| rule.outcome)
    }

    pub fn evaluate(&self, state: &TrackingState) -> Classification {
        let activity = self.classify(state);
        Classification {
            activity,
            confidence: confidence(activity, state),
        }
    }
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Confidence in `activity` for the given state, in `[0, 1]`
pub fn confidence(activity: ActivityType, state: &TrackingState) -> f64 {
    let mut score = BASE_CONFIDENCE;

    if let Some(speed) = state.current_speed() {
        score = match activity {
            ActivityType::Walking => (0.5 + speed / 2.0).min(1.0),
            ActivityType::Running => (0.5 + speed / 4.0).min(1.0),
            ActivityType::Cycling => (0.6 + speed / 10.0).min(1.0),
            _ => score,
        };
    }

    if state.movement_detected {
        score += MOVEMENT_BONUS;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationSample;
    use approx::assert_abs_diff_eq;

    fn moving() -> TrackingState {
        let mut state = TrackingState::new(0);
        state.movement_detected = true;
        state
    }

    fn with_speed(mut state: TrackingState, speed: f64) -> TrackingState {
        state.current_location = Some(LocationSample::new(0, 0.0, 0.0, None, speed, 3.0));
        state
    }

    #[test]
    fn test_no_movement_overrides_everything() {
        let mut state = with_speed(TrackingState::new(0), 6.0);
        state.rotation_rate = 10.0;
        state.accelerometer_magnitude = 40.0;
        state.cadence = 140.0;
        assert_eq!(ActivityClassifier::new().classify(&state), ActivityType::Stationary);
    }

    #[test]
    fn test_speed_rules() {
        let classifier = ActivityClassifier::new();
        assert_eq!(classifier.classify(&with_speed(moving(), 4.0)), ActivityType::Running);
        assert_eq!(classifier.classify(&with_speed(moving(), 2.0)), ActivityType::Walking);
        // Thresholds are strict
        assert_eq!(classifier.classify(&with_speed(moving(), 1.4)), ActivityType::Unknown);
    }

    #[test]
    fn test_speed_beats_rotation() {
        let mut state = with_speed(moving(), 2.0);
        state.rotation_rate = 5.0;
        assert_eq!(ActivityClassifier::new().classify(&state), ActivityType::Walking);
    }

    #[test]
    fn test_rotation_beats_intensity() {
        let mut state = moving();
        state.rotation_rate = 2.5;
        state.accelerometer_magnitude = 30.0;
        assert_eq!(ActivityClassifier::new().classify(&state), ActivityType::Cycling);

        state.rotation_rate = 1.0;
        assert_eq!(ActivityClassifier::new().classify(&state), ActivityType::IntenseExercise);
    }

    #[test]
    fn test_cadence_ranges() {
        let classifier = ActivityClassifier::new();
        let mut state = moving();

        state.cadence = 120.0;
        assert_eq!(classifier.classify(&state), ActivityType::Walking);
        state.cadence = 160.0;
        assert_eq!(classifier.classify(&state), ActivityType::Walking);
        state.cadence = 160.4;
        assert_eq!(classifier.classify(&state), ActivityType::Walking);
        state.cadence = 160.6;
        assert_eq!(classifier.classify(&state), ActivityType::Running);
        state.cadence = 200.0;
        assert_eq!(classifier.classify(&state), ActivityType::Running);
        state.cadence = 201.0;
        assert_eq!(classifier.classify(&state), ActivityType::Unknown);
        state.cadence = 90.0;
        assert_eq!(classifier.classify(&state), ActivityType::Unknown);
    }

    #[test]
    fn test_rule_order_is_data() {
        let classifier = ActivityClassifier::new();
        let names: Vec<&str> = classifier.rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "no_movement",
                "running_speed",
                "walking_speed",
                "cycling_rotation",
                "high_intensity",
                "walking_cadence",
                "running_cadence",
            ]
        );

        let mut state = with_speed(moving(), 2.0);
        state.rotation_rate = 5.0;
        assert_eq!(classifier.matching_rule(&state), Some("walking_speed"));

        // Promote rotation above speed without touching anything else
        let mut reordered = DEFAULT_RULES.to_vec();
        let cycling = reordered.remove(3);
        reordered.insert(1, cycling);
        let custom = ActivityClassifier::with_rules(reordered);
        assert_eq!(custom.classify(&state), ActivityType::Cycling);
    }

    #[test]
    fn test_empty_rules_is_unknown() {
        let classifier = ActivityClassifier::with_rules(Vec::new());
        assert_eq!(classifier.classify(&TrackingState::new(0)), ActivityType::Unknown);
    }

    #[test]
    fn test_confidence_clamped() {
        let state = with_speed(moving(), 5.0);
        assert_abs_diff_eq!(confidence(ActivityType::Walking, &state), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_confidence_terms() {
        let state = with_speed(TrackingState::new(0), 1.0);
        assert_abs_diff_eq!(confidence(ActivityType::Walking, &state), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(confidence(ActivityType::Running, &state), 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(confidence(ActivityType::Cycling, &state), 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(confidence(ActivityType::Unknown, &state), 0.5, epsilon = 1e-12);

        let state = moving();
        assert_abs_diff_eq!(confidence(ActivityType::Stationary, &state), 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(confidence(ActivityType::Walking, &state), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate() {
        let result = ActivityClassifier::new().evaluate(&with_speed(moving(), 4.0));
        assert_eq!(result.activity, ActivityType::Running);
        assert_abs_diff_eq!(result.confidence, 1.0, epsilon = 1e-12);
    }
}

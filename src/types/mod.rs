use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Location fix from the platform location provider
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub timestamp_ms: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level; `None` when the provider has no altitude
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Ground speed in m/s
    #[serde(default)]
    pub speed: f64,
    /// Horizontal accuracy radius in meters
    #[serde(default)]
    pub accuracy: f64,
}

impl LocationSample {
    pub fn new(
        timestamp_ms: i64,
        latitude: f64,
        longitude: f64,
        altitude: Option<f64>,
        speed: f64,
        accuracy: f64,
    ) -> Self {
        Self {
            timestamp_ms,
            latitude,
            longitude,
            altitude,
            speed,
            accuracy,
        }
    }

    pub fn has_valid_position(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Altitude usable for gain computation (finite and above zero)
    pub fn valid_altitude(&self) -> Option<f64> {
        self.altitude.filter(|alt| alt.is_finite() && *alt > 0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Accelerometer,
    Gyroscope,
}

/// Raw inertial reading. `values` mirrors the platform sensor event array,
/// which is not guaranteed to carry three axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub kind: MotionKind,
    pub values: Vec<f64>,
    pub timestamp_ms: i64,
}

impl MotionSample {
    pub fn new(kind: MotionKind, values: Vec<f64>, timestamp_ms: i64) -> Self {
        Self {
            kind,
            values,
            timestamp_ms,
        }
    }

    pub fn accelerometer(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self::new(MotionKind::Accelerometer, vec![x, y, z], timestamp_ms)
    }

    pub fn gyroscope(x: f64, y: f64, z: f64, timestamp_ms: i64) -> Self {
        Self::new(MotionKind::Gyroscope, vec![x, y, z], timestamp_ms)
    }

    /// First three axes as a vector, or `None` for under-length or non-finite readings
    pub fn axes(&self) -> Option<Vector3<f64>> {
        if self.values.len() < 3 {
            return None;
        }
        let v = Vector3::new(self.values[0], self.values[1], self.values[2]);
        if v.iter().all(|c| c.is_finite()) {
            Some(v)
        } else {
            None
        }
    }

    pub fn magnitude(&self) -> Option<f64> {
        self.axes().map(|v| v.norm())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Stationary,
    Walking,
    Running,
    Cycling,
    IntenseExercise,
    Unknown,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Stationary => "STATIONARY",
            ActivityType::Walking => "WALKING",
            ActivityType::Running => "RUNNING",
            ActivityType::Cycling => "CYCLING",
            ActivityType::IntenseExercise => "INTENSE_EXERCISE",
            ActivityType::Unknown => "UNKNOWN",
        }
    }
}

impl Default for ActivityType {
    fn default() -> Self {
        ActivityType::Unknown
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_magnitude() {
        let accel = MotionSample::accelerometer(3.0, 4.0, 0.0, 0);
        assert_eq!(accel.magnitude(), Some(5.0));
    }

    #[test]
    fn test_short_vector_rejected() {
        let sample = MotionSample::new(MotionKind::Gyroscope, vec![1.0, 2.0], 0);
        assert!(sample.axes().is_none());
    }

    #[test]
    fn test_extra_axes_ignored() {
        // Rotation-vector style events carry a 4th component
        let sample = MotionSample::new(MotionKind::Gyroscope, vec![0.6, 0.8, 0.0, 9.0], 0);
        assert_eq!(sample.magnitude(), Some(1.0));
    }

    #[test]
    fn test_non_finite_rejected() {
        let sample = MotionSample::accelerometer(f64::NAN, 1.0, 1.0, 0);
        assert!(sample.magnitude().is_none());
    }

    #[test]
    fn test_valid_altitude() {
        let mut fix = LocationSample::new(0, 1.0, 2.0, Some(0.0), 0.0, 5.0);
        assert!(fix.valid_altitude().is_none());
        fix.altitude = Some(12.5);
        assert_eq!(fix.valid_altitude(), Some(12.5));
        fix.altitude = None;
        assert!(fix.valid_altitude().is_none());
    }

    #[test]
    fn test_sample_json_shape() {
        let json = r#"{"kind":"accelerometer","values":[0.1,0.2,9.8],"timestamp_ms":42}"#;
        let sample: MotionSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.kind, MotionKind::Accelerometer);
        assert_eq!(sample.timestamp_ms, 42);

        let fix: LocationSample =
            serde_json::from_str(r#"{"timestamp_ms":1,"latitude":1.0,"longitude":2.0}"#).unwrap();
        assert_eq!(fix.altitude, None);
        assert_eq!(fix.speed, 0.0);
    }
}

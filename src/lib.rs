//! Fitness tracking core: fuses location, accelerometer and gyroscope
//! streams into distance, altitude gain, pace, cadence, a classified
//! activity and calorie estimates.
//!
//! ```no_run
//! use activity_tracker_rs::{LocationSample, MotionSample, TrackerConfig, TrackingSession};
//!
//! let session = TrackingSession::new(TrackerConfig::default());
//! session.start();
//! session.submit_location(LocationSample::new(0, 52.52, 13.40, Some(34.0), 1.6, 4.0));
//! session.submit_motion(MotionSample::accelerometer(0.2, 0.9, 0.4, 20));
//! session.tick_classification();
//! println!("{:?}", session.metrics());
//! session.stop();
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod metrics;
pub mod peak_detector;
pub mod replay;
pub mod session;
pub mod sink;
pub mod tracking_state;
pub mod types;

pub use classifier::{ActivityClassifier, Classification};
pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use metrics::{HealthMetrics, MetricsAggregator};
pub use peak_detector::PeakDetector;
pub use session::{
    Clock, ManualClock, SessionState, SubscriptionId, SystemClock, TrackingListener,
    TrackingSession,
};
pub use sink::{HealthSink, JsonStatusSink};
pub use tracking_state::TrackingState;
pub use types::{ActivityType, LocationSample, MotionKind, MotionSample};

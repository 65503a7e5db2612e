use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::classifier::{ActivityClassifier, Classification};
use crate::config::TrackerConfig;
use crate::metrics::{HealthMetrics, MetricsAggregator};
use crate::peak_detector::PeakDetector;
use crate::sink::HealthSink;
use crate::tracking_state::TrackingState;
use crate::types::{ActivityType, LocationSample, MotionKind, MotionSample};

// ─── Clocks ──────────────────────────────────────────────────────────────────

/// Wall-clock source for session start/stop and metric timestamps
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Externally driven clock for replays and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ─── Listeners ───────────────────────────────────────────────────────────────

/// Receives session output. Called outside the state lock, possibly from a
/// tick task, so implementations must not block for long.
pub trait TrackingListener: Send + Sync {
    fn on_activity_changed(&self, _activity: ActivityType, _confidence: f64) {}
    fn on_metrics_updated(&self, _metrics: &HealthMetrics) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Active,
}

struct SessionCore {
    phase: SessionState,
    state: TrackingState,
    peak_detector: PeakDetector,
    aggregator: MetricsAggregator,
    last_published: Option<ActivityType>,
}

struct Shared {
    core: Mutex<SessionCore>,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn TrackingListener>)>>,
    sinks: Mutex<Vec<Arc<dyn HealthSink>>>,
    next_subscription: AtomicU64,
    classifier: ActivityClassifier,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn classification_tick(&self) -> Option<Classification> {
        let (result, changed) = {
            let mut core = lock(&self.core);
            if core.phase != SessionState::Active {
                return None;
            }
            let result = self.classifier.evaluate(&core.state);
            core.state.current_activity = result.activity;
            let changed = core.last_published != Some(result.activity);
            if changed {
                core.last_published = Some(result.activity);
            }
            (result, changed)
        };

        if changed {
            log::info!(
                "Activity -> {} (confidence {:.2})",
                result.activity,
                result.confidence
            );
            for listener in self.listeners_snapshot() {
                listener.on_activity_changed(result.activity, result.confidence);
            }
        }
        Some(result)
    }

    fn metrics_tick(&self) -> Option<HealthMetrics> {
        let metrics = {
            let mut core = lock(&self.core);
            if core.phase != SessionState::Active {
                return None;
            }
            let now = self.clock.now_ms();
            let core = &mut *core;
            core.aggregator.derive(&core.state, now)
        };
        self.publish_metrics(&metrics);
        Some(metrics)
    }

    fn publish_metrics(&self, metrics: &HealthMetrics) {
        for listener in self.listeners_snapshot() {
            listener.on_metrics_updated(metrics);
        }
        let sinks: Vec<Arc<dyn HealthSink>> = lock(&self.sinks).clone();
        for sink in sinks {
            if let Err(e) = sink.push(metrics) {
                log::warn!("Metrics push to {} failed: {}", sink.name(), e);
            }
        }
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn TrackingListener>> {
        lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

/// Owns one tracking session: ingestion, periodic ticks and listeners.
///
/// Every ingestion call and every tick takes the same lock for its whole
/// update, so concurrent producers on different threads are serialized and
/// `snapshot()` always returns a consistent copy.
pub struct TrackingSession {
    shared: Arc<Shared>,
    ticks: Mutex<Vec<JoinHandle<()>>>,
}

impl TrackingSession {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_classifier(config, clock, ActivityClassifier::new())
    }

    pub fn with_classifier(
        config: TrackerConfig,
        clock: Arc<dyn Clock>,
        classifier: ActivityClassifier,
    ) -> Self {
        let core = SessionCore {
            phase: SessionState::Idle,
            state: TrackingState::idle(),
            peak_detector: PeakDetector::new(),
            aggregator: MetricsAggregator::new(),
            last_published: None,
        };

        TrackingSession {
            shared: Arc::new(Shared {
                core: Mutex::new(core),
                listeners: Mutex::new(Vec::new()),
                sinks: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
                classifier,
                clock,
                config: config.clamped(),
            }),
            ticks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Idle → Active. No-op when already active.
    ///
    /// Periodic ticks are spawned on the current tokio runtime; outside a
    /// runtime the caller drives `tick_classification` / `tick_metrics`.
    pub fn start(&self) {
        // Held across the phase flip so a concurrent stop() sees either no
        // session or a session with its ticks registered.
        let mut ticks = lock(&self.ticks);
        let start_time = {
            let mut core = lock(&self.shared.core);
            if core.phase == SessionState::Active {
                log::debug!("start() ignored: session already active");
                return;
            }
            let now = self.shared.clock.now_ms();
            core.state = TrackingState::new(now);
            core.peak_detector.reset();
            core.last_published = None;
            core.phase = SessionState::Active;
            now
        };

        self.spawn_ticks(&mut ticks);
        log::info!("Tracking session started at {}", start_time);
    }

    /// Active → Idle. No-op when already idle. Cancels the ticks, records the
    /// end time and publishes one final metrics snapshot.
    pub fn stop(&self) {
        let mut ticks = lock(&self.ticks);
        for handle in ticks.drain(..) {
            handle.abort();
        }

        let (metrics, snapshots) = {
            let mut core = lock(&self.shared.core);
            if core.phase == SessionState::Idle {
                log::debug!("stop() ignored: session not active");
                return;
            }
            let now = self.shared.clock.now_ms();
            core.phase = SessionState::Idle;
            core.state.finish(now);
            let core = &mut *core;
            let metrics = core.aggregator.derive(&core.state, now);
            (metrics, core.aggregator.derived_count())
        };
        drop(ticks);

        log::info!(
            "Tracking session stopped: {:.1} m, {} steps, {:.1} kcal ({} snapshots)",
            metrics.distance,
            metrics.steps,
            metrics.calories,
            snapshots
        );
        self.shared.publish_metrics(&metrics);
    }

    pub fn state(&self) -> SessionState {
        lock(&self.shared.core).phase
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    fn spawn_ticks(&self, ticks: &mut Vec<JoinHandle<()>>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::warn!("No tokio runtime: periodic ticks disabled, drive them manually");
                return;
            }
        };

        ticks.push(handle.spawn(classification_loop(
            Arc::clone(&self.shared),
            self.shared.config.classification_interval(),
        )));
        ticks.push(handle.spawn(metrics_loop(
            Arc::clone(&self.shared),
            self.shared.config.metrics_interval(),
        )));
    }

    // ── Ingestion ────────────────────────────────────────────────────────

    /// Accept one location fix. Dropped silently while idle.
    pub fn submit_location(&self, fix: LocationSample) {
        let metrics = {
            let mut core = lock(&self.shared.core);
            if core.phase != SessionState::Active {
                return;
            }
            if !core.state.apply_location(&fix) {
                log::debug!("Discarded location fix with non-finite position");
                return;
            }
            if !self.shared.config.metrics_on_location {
                return;
            }
            let now = self.shared.clock.now_ms();
            let core = &mut *core;
            core.aggregator.derive(&core.state, now)
        };
        self.shared.publish_metrics(&metrics);
    }

    /// Accept one motion reading. Dropped silently while idle or when it
    /// carries fewer than three finite axes.
    pub fn submit_motion(&self, sample: MotionSample) {
        let mut core = lock(&self.shared.core);
        if core.phase != SessionState::Active {
            return;
        }
        let core = &mut *core;
        match sample.kind {
            MotionKind::Accelerometer => {
                if sample.axes().is_none() {
                    log::debug!("Discarded accelerometer sample with {} values", sample.values.len());
                    return;
                }
                if let Some(step) = core.peak_detector.process(&sample, &mut core.state) {
                    log::debug!(
                        "Step at {} ms: {} ms interval, {:.0} spm",
                        step.timestamp_ms,
                        step.interval_ms,
                        step.cadence
                    );
                }
            }
            MotionKind::Gyroscope => match sample.magnitude() {
                Some(rate) => core.state.apply_rotation(rate),
                None => {
                    log::debug!("Discarded gyroscope sample with {} values", sample.values.len())
                }
            },
        }
    }

    // ── Ticks ────────────────────────────────────────────────────────────

    /// Classify the current state, store the activity and notify listeners
    /// on change. Returns `None` while idle.
    pub fn tick_classification(&self) -> Option<Classification> {
        self.shared.classification_tick()
    }

    /// Derive and publish a metrics snapshot. Returns `None` while idle.
    pub fn tick_metrics(&self) -> Option<HealthMetrics> {
        self.shared.metrics_tick()
    }

    // ── Read side ────────────────────────────────────────────────────────

    /// Consistent copy of the tracking state
    pub fn snapshot(&self) -> TrackingState {
        lock(&self.shared.core).state.clone()
    }

    /// On-demand metrics derivation; nothing is published
    pub fn metrics(&self) -> HealthMetrics {
        let now = self.shared.clock.now_ms();
        let mut core = lock(&self.shared.core);
        let core = &mut *core;
        core.aggregator.derive(&core.state, now)
    }

    pub fn subscribe(&self, listener: Arc<dyn TrackingListener>) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.shared.listeners).push((id, listener));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.shared.listeners);
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    pub fn add_sink(&self, sink: Arc<dyn HealthSink>) {
        lock(&self.shared.sinks).push(sink);
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        for handle in lock(&self.ticks).drain(..) {
            handle.abort();
        }
    }
}

async fn classification_loop(shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if shared.classification_tick().is_none() {
            break;
        }
    }
}

async fn metrics_loop(shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if shared.metrics_tick().is_none() {
            break;
        }
    }
}

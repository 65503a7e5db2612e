use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use activity_tracker_rs::replay::{read_recording, replay};
use activity_tracker_rs::{
    ActivityType, JsonStatusSink, ManualClock, TrackerConfig, TrackingListener, TrackingSession,
};

#[derive(Parser, Debug)]
#[command(name = "activity_tracker")]
#[command(about = "Replay a recorded sensor session through the activity tracker", long_about = None)]
struct Args {
    /// Recorded session (JSON array or JSON lines, optionally .gz)
    #[arg(long)]
    input: PathBuf,

    /// Tracker configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every metrics snapshot to this JSON file
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Publish metrics after every location fix
    #[arg(long, default_value_t = false)]
    metrics_on_location: bool,
}

struct ActivityLog;

impl TrackingListener for ActivityLog {
    fn on_activity_changed(&self, activity: ActivityType, confidence: f64) {
        log::debug!("listener: {} ({:.2})", activity, confidence);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if args.metrics_on_location {
        config.metrics_on_location = true;
    }

    let samples = read_recording(&args.input)
        .with_context(|| format!("reading recording {}", args.input.display()))?;
    log::info!("Loaded {} samples from {}", samples.len(), args.input.display());

    let clock = Arc::new(ManualClock::new(0));
    let session = TrackingSession::with_clock(config, clock.clone());
    session.subscribe(Arc::new(ActivityLog));
    if let Some(path) = &args.status_file {
        let sink = JsonStatusSink::new(path);
        log::info!("Writing status snapshots to {}", sink.path().display());
        session.add_sink(Arc::new(sink));
    }

    let summary = replay(&session, &clock, &samples);
    log::info!(
        "Replayed {} fixes, {} motion samples ({} classification ticks), avg {:.2} m/s",
        summary.locations,
        summary.motions,
        summary.classification_ticks,
        summary.average_speed
    );

    println!("{}", serde_json::to_string_pretty(&summary.final_metrics)?);
    Ok(())
}

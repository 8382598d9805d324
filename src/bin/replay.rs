use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use crossbeam::channel::unbounded;
use gps_tracker_rs::{ChannelObserver, GpsTracker, ReplaySource, TrackerConfig, TrackerEvent};
use tokio::time::{sleep, Duration};

#[derive(Parser, Debug)]
#[command(name = "gps_replay")]
#[command(about = "Replay a recorded GPS log through the tracking pipeline", long_about = None)]
struct Args {
    /// Path to a {"events": [...]} log (.json or .json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Tracker config JSON (missing fields use defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the resubscribe delay after a timeout (ms)
    #[arg(long)]
    restart_delay_ms: Option<u64>,

    /// Write the diagnostic export here
    #[arg(long)]
    export: Option<PathBuf>,

    /// Write the accepted track as GPX here
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Print every tracker event as JSON
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(delay) = args.restart_delay_ms {
        config.timeout_restart_delay_ms = delay;
    }
    let restart_delay = config.timeout_restart_delay();

    let source = ReplaySource::from_path(&args.log)?;
    log::info!("Loaded {} events from {}", source.remaining(), args.log.display());

    let (tx, rx) = unbounded::<TrackerEvent>();
    let mut tracker = GpsTracker::new(source, config).with_observer(ChannelObserver::new(tx));

    if let Err(e) = tracker.start_tracking().await {
        bail!("{}", e.user_message());
    }

    loop {
        tracker.poll();
        for event in rx.try_iter() {
            if args.verbose {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        if !tracker.get_state().is_tracking {
            log::warn!("Tracking interrupted");
            break;
        }
        if tracker.has_pending_restart() {
            sleep(restart_delay).await;
            continue;
        }
        if tracker.source().is_exhausted() {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    tracker.stop_tracking();

    let state = tracker.get_state();
    let stats = tracker.get_stats();
    println!("Distance:        {:.3} km", state.total_distance);
    println!("Accepted fixes:  {}", stats.valid_positions);
    println!("Filtered fixes:  {}", stats.filtered_positions);
    println!(
        "Rejections:      accuracy {} | speed {} | coordinates {} | teleport {}",
        stats.rejections.accuracy,
        stats.rejections.speed,
        stats.rejections.coordinates,
        stats.rejections.teleport
    );
    println!("Avg accuracy:    {:.1} m", stats.average_accuracy);
    println!(
        "Speed:           avg {:.2} m/s | max {:.2} m/s",
        stats.average_speed, stats.max_speed
    );
    println!("Elevation gain:  {:.1} m", stats.total_elevation_gain);
    println!("Signal:          {:?}", state.signal_strength);
    println!("Restarts:        {}", tracker.restart_count());

    let export = tracker.export();
    if let Some(path) = &args.export {
        export.write_json(path)?;
        log::info!("Export written to {}", path.display());
    }
    if let Some(path) = &args.gpx {
        let name = args
            .log
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "GPS track".to_string());
        export.to_gpx(&name).write(path)?;
        log::info!("GPX written to {}", path.display());
    }

    Ok(())
}

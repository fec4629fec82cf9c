//! # PARA Head Tracker
//!
//! Streams head pan, tilt and roll to a radio as PARA trainer frames.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use head_tracker::config::{Config, LoggingConfig};
use head_tracker::imu::replay::ReplayImu;
use head_tracker::orientation::fusion::FusionEstimator;
use head_tracker::orientation::pipeline::HeadTracker;
use head_tracker::serial::TrainerLink;
use head_tracker::telemetry::{TraceRecord, TraceWriter};

/// Used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name of the rolling log inside `[logging].directory`
const LOG_FILE_NAME: &str = "head-tracker.log";

/// Main entry point for the head tracker
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging with tracing subscriber
///    - Open the replay sensor, seed the fusion filter and capture the start reference
///    - Open the trainer link and send the boot sequence
///
/// 2. **Main Loop**
///    - Tick at the configured sample rate and send one frame per tick
///    - Log status every `status_interval_ticks`
///    - Re-zero on SIGUSR1
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Shutdown**
///    - Ctrl+C, or the end of a non-looping replay
///
/// # Errors
///
/// Returns error if:
/// - Configuration cannot be loaded
/// - The replay file cannot be read
/// - No trainer serial device can be opened
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO head_tracker: PARA Head Tracker v0.1.0 starting...
/// INFO head_tracker::serial: Opened trainer link at /dev/rfcomm0 (115200 baud)
/// INFO head_tracker: Tracking at 50Hz
/// INFO head_tracker: Sent 50 frames (yaw 0.0, pitch 0.0, roll 0.0)
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref())?;

    let _log_guard = init_logging(&config.logging)?;

    info!("PARA Head Tracker v{} starting...", env!("CARGO_PKG_VERSION"));

    let sensor = ReplayImu::open(&config.imu.replay_path, config.imu.replay_loop)
        .with_context(|| format!("Failed to open replay {}", config.imu.replay_path))?;

    let estimator = FusionEstimator::new(config.imu.fusion_gain);
    let mut tracker = HeadTracker::new(sensor, estimator, &config)?;
    tracker.begin()?;

    let mut link = TrainerLink::open(&config.serial)?;
    link.announce().await?;

    let mut trace = if config.telemetry.enabled {
        Some(TraceWriter::new(&config.telemetry)?)
    } else {
        None
    };

    let mut ticker = interval(config.tick_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut rezero_signal = signal(SignalKind::user_defined1())?;

    info!("Tracking at {}Hz", config.imu.sample_rate_hz);
    info!("Send SIGUSR1 to re-zero, press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let output = match tracker.tick() {
                    Ok(output) => output,
                    Err(_) if tracker.sensor().is_exhausted() => {
                        info!("Replay finished after {} ticks", tracker.ticks());
                        break;
                    }
                    Err(e) => {
                        warn!("Tick failed: {}", e);
                        continue;
                    }
                };

                if let Err(e) = link.send_frame(&output.frame).await {
                    warn!("Failed to send frame: {}", e);
                }

                let ticks = tracker.ticks();

                if is_due(ticks, config.logging.status_interval_ticks) {
                    info!(
                        "Sent {} frames (yaw {:.1}, pitch {:.1}, roll {:.1})",
                        link.frames_sent(), output.angles.yaw, output.angles.pitch, output.angles.roll
                    );
                }

                if let Some(writer) = trace.as_mut() {
                    if is_due(ticks, config.telemetry.trace_interval_ticks) {
                        let record = TraceRecord::now(
                            ticks,
                            &output.angles,
                            tracker.channels().values(),
                            tracker.gyro_bias().map(|bias| bias.is_stable()),
                        );
                        if let Err(e) = writer.write(&record) {
                            warn!("Failed to write trace record: {}", e);
                        }
                    }
                }
            }

            _ = rezero_signal.recv() => {
                if let Err(e) = tracker.rezero() {
                    warn!("Re-zero failed: {}", e);
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total frames sent: {}", link.frames_sent());
    Ok(())
}

/// Load the given file, the default file if present, or built-in defaults
fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("Failed to load config {}", path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG_PATH)),
        None => Ok(Config::default()),
    }
}

/// Console logging, plus a daily rolling file when a directory is configured
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the program.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// True on every `interval`-th tick
fn is_due(ticks: u64, interval: u64) -> bool {
    interval > 0 && ticks > 0 && ticks % interval == 0
}

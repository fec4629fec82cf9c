//! # Telemetry Module
//!
//! Optional JSON-lines trace of the tracker output.
//!
//! This module handles:
//! - Formatting one record per traced tick as JSONL (JSON Lines)
//! - Writing to rotating trace files (max N records per file)
//! - Retaining only the last M files
//!
//! ## Record Format
//!
//! ```text
//! {"timestamp":"2026-01-01T12:00:00.000+00:00","tick":50,"yaw":1.5,"pitch":-0.2,"roll":0.0,"channels":[1516,1497,1500,1500,1500,1500,1500,1500],"gyro_bias_stable":null}
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::orientation::estimator::Attitude;
use crate::para::protocol::TrainerChannels;

const FILE_PREFIX: &str = "trace_";
const FILE_EXTENSION: &str = "jsonl";

/// One traced tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    /// RFC 3339 wall-clock time
    pub timestamp: String,
    pub tick: u64,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub channels: TrainerChannels,
    /// `None` when bias tracking is disabled
    pub gyro_bias_stable: Option<bool>,
}

impl TraceRecord {
    /// Build a record stamped with the current time
    pub fn now(
        tick: u64,
        angles: &Attitude,
        channels: &TrainerChannels,
        gyro_bias_stable: Option<bool>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            tick,
            yaw: angles.yaw,
            pitch: angles.pitch,
            roll: angles.roll,
            channels: *channels,
            gyro_bias_stable,
        }
    }
}

/// Rotating JSONL trace writer.
pub struct TraceWriter {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current: Option<BufWriter<File>>,
    records_in_file: usize,
    files_created: u64,
}

impl TraceWriter {
    /// Create the trace directory
    ///
    /// No file is opened until the first record is written.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        info!("Telemetry trace directory: {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            current: None,
            records_in_file: 0,
            files_created: 0,
        })
    }

    /// Append one record, rotating first if the current file is full
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be serialized or written
    pub fn write(&mut self, record: &TraceRecord) -> Result<()> {
        if self.current.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(writer) = self.current.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    /// Trace directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.current.take() {
            writer.flush()?;
        }

        // The counter keeps names unique and ordered within one second
        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.files_created,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        let file = File::create(&path)?;
        debug!("Opened trace file {}", path.display());

        self.current = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.files_created += 1;

        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let mut files = trace_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        let excess = files.len() - self.max_files_to_keep;
        for old in files.drain(..excess) {
            if let Err(e) = fs::remove_file(&old) {
                warn!("Failed to remove old trace file {}: {}", old.display(), e);
            }
        }
        Ok(())
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.current.as_mut() {
            let _ = writer.flush();
        }
    }
}

/// Trace files in `dir`, oldest first
fn trace_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let is_trace = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(FILE_PREFIX));
            is_trace && path.extension().map_or(false, |ext| ext == FILE_EXTENSION)
        })
        .collect();
    files.sort();
    Ok(files)
}

//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Calibration data is compiled in; the file only selects a profile and a
//! board mounting by name.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{HeadTrackerError, Result};
use crate::imu::Mounting;
use crate::orientation::calibration::CalibrationProfile;
use crate::para::protocol::{
    ChecksumMode, PARA_BYTE_STUFF, PARA_FRAMETYPE_TRAINER, PARA_NUM_CHANNELS, PARA_START_STOP,
};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub imu: ImuConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub para: ParaConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sensor and orientation pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: f32,

    #[serde(default = "default_lag_filter_beta")]
    pub lag_filter_beta: f32,

    /// Separate seeded filter for the magnetometer
    #[serde(default)]
    pub mag_filter_beta: Option<f32>,

    #[serde(default)]
    pub calibration: CalibrationProfile,

    #[serde(default)]
    pub mounting: Mounting,

    /// Samples averaged for the start reference
    #[serde(default = "default_begin_samples")]
    pub begin_samples: usize,

    #[serde(default)]
    pub gyro_bias_tracking: bool,

    /// Accelerometer and magnetometer correction gain of the fusion filter
    #[serde(default = "default_fusion_gain")]
    pub fusion_gain: f32,

    #[serde(default = "default_replay_path")]
    pub replay_path: String,

    #[serde(default = "default_replay_loop")]
    pub replay_loop: bool,
}

/// Channel assignment configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    #[serde(default = "default_pan_channel")]
    pub pan: usize,

    #[serde(default = "default_tilt_channel")]
    pub tilt: usize,

    #[serde(default = "default_roll_channel")]
    pub roll: usize,

    #[serde(default = "default_angle_max")]
    pub angle_max: f32,

    #[serde(default)]
    pub channel_reverse: Vec<usize>,
}

/// PARA framing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ParaConfig {
    #[serde(default = "default_frame_type")]
    pub frame_type: u8,

    #[serde(default)]
    pub checksum: ChecksumMode,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_trace_interval_ticks")]
    pub trace_interval_ticks: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Daily rolling log files are written here when set
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
}

// Default value functions
fn default_sample_rate_hz() -> f32 { 50.0 }
fn default_lag_filter_beta() -> f32 { 0.5 }
fn default_begin_samples() -> usize { 10 }
fn default_fusion_gain() -> f32 { 0.5 }
fn default_replay_path() -> String { "data/stationary.jsonl".to_string() }
fn default_replay_loop() -> bool { true }

fn default_pan_channel() -> usize { 0 }
fn default_tilt_channel() -> usize { 1 }
fn default_roll_channel() -> usize { 2 }
fn default_angle_max() -> f32 { 45.0 }

fn default_frame_type() -> u8 { PARA_FRAMETYPE_TRAINER }

fn default_baud_rate() -> u32 { 115200 }

fn default_telemetry_enabled() -> bool { false }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_trace_interval_ticks() -> u64 { 50 }

fn default_status_interval_ticks() -> u64 { 50 }

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate_hz(),
            lag_filter_beta: default_lag_filter_beta(),
            mag_filter_beta: None,
            calibration: CalibrationProfile::default(),
            mounting: Mounting::default(),
            begin_samples: default_begin_samples(),
            gyro_bias_tracking: false,
            fusion_gain: default_fusion_gain(),
            replay_path: default_replay_path(),
            replay_loop: default_replay_loop(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            pan: default_pan_channel(),
            tilt: default_tilt_channel(),
            roll: default_roll_channel(),
            angle_max: default_angle_max(),
            channel_reverse: Vec::new(),
        }
    }
}

impl Default for ParaConfig {
    fn default() -> Self {
        Self {
            frame_type: default_frame_type(),
            checksum: ChecksumMode::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            trace_interval_ticks: default_trace_interval_ticks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            status_interval_ticks: default_status_interval_ticks(),
        }
    }
}

/// Serial baud rates accepted by the trainer link
pub const VALID_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];

fn invalid(msg: impl std::fmt::Display) -> HeadTrackerError {
    HeadTrackerError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use head_tracker::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Sample rate drives the tick period
        if !(1.0..=1000.0).contains(&self.imu.sample_rate_hz) {
            return Err(invalid("sample_rate_hz must be between 1 and 1000"));
        }

        // Filter coefficients
        if !(self.imu.lag_filter_beta > 0.0 && self.imu.lag_filter_beta <= 1.0) {
            return Err(invalid("lag_filter_beta must be in (0.0, 1.0]"));
        }

        if let Some(beta) = self.imu.mag_filter_beta {
            if !(beta > 0.0 && beta <= 1.0) {
                return Err(invalid("mag_filter_beta must be in (0.0, 1.0]"));
            }
        }

        if self.imu.begin_samples == 0 || self.imu.begin_samples > 10000 {
            return Err(invalid("begin_samples must be between 1 and 10000"));
        }

        if !(self.imu.fusion_gain > 0.0 && self.imu.fusion_gain <= 10.0) {
            return Err(invalid("fusion_gain must be in (0.0, 10.0]"));
        }

        if self.imu.replay_path.is_empty() {
            return Err(invalid("replay_path cannot be empty"));
        }

        // Channel assignment
        for (name, index) in [
            ("pan", self.channels.pan),
            ("tilt", self.channels.tilt),
            ("roll", self.channels.roll),
        ] {
            if index >= PARA_NUM_CHANNELS {
                return Err(invalid(format!(
                    "{} channel {} is out of bounds (must be 0-{})",
                    name,
                    index,
                    PARA_NUM_CHANNELS - 1
                )));
            }
        }

        if self.channels.pan == self.channels.tilt
            || self.channels.pan == self.channels.roll
            || self.channels.tilt == self.channels.roll
        {
            return Err(invalid("pan, tilt and roll must use distinct channels"));
        }

        if !(self.channels.angle_max > 0.0 && self.channels.angle_max <= 180.0) {
            return Err(invalid("angle_max must be in (0.0, 180.0]"));
        }

        for &channel_idx in &self.channels.channel_reverse {
            if channel_idx >= PARA_NUM_CHANNELS {
                return Err(invalid(format!(
                    "channel_reverse index {} is out of bounds (must be 0-{})",
                    channel_idx,
                    PARA_NUM_CHANNELS - 1
                )));
            }
        }

        // A delimiter-valued frame type would always need stuffing
        if self.para.frame_type == PARA_START_STOP || self.para.frame_type == PARA_BYTE_STUFF {
            return Err(invalid("frame_type cannot be a delimiter or escape byte"));
        }

        // Validate baud rate
        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                VALID_BAUD_RATES
            )));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.trace_interval_ticks == 0 {
            return Err(invalid("trace_interval_ticks must be greater than 0"));
        }

        if self.logging.status_interval_ticks == 0 {
            return Err(invalid("status_interval_ticks must be greater than 0"));
        }

        Ok(())
    }

    /// Tick period derived from the sample rate
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_micros((1_000_000.0 / self.imu.sample_rate_hz) as u64)
    }
}

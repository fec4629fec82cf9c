//! # Error Types
//!
//! Custom error types for the head tracker using `thiserror`.

use thiserror::Error;

/// Main error type for the head tracker
#[derive(Debug, Error)]
pub enum HeadTrackerError {
    /// PARA trainer protocol errors
    #[error("PARA protocol error: {0}")]
    ParaProtocol(String),

    /// IMU sensor read errors
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No trainer serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Malformed replay records
    #[error("Replay data error: {0}")]
    Replay(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the head tracker
pub type Result<T> = std::result::Result<T, HeadTrackerError>;

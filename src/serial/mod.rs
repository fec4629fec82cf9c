//! # Serial Transport Module
//!
//! Hands encoded PARA frames to the trainer link.
//!
//! This module handles:
//! - Opening the configured serial device, or auto-detecting one
//! - Sending the CRLF wake-up sequence the receiver expects on connect
//! - Writing each frame as one atomic payload, fire-and-forget
//!
//! Delivery, pairing and subscription state belong to the device on the
//! other end of the port.

pub mod port_trait;

use crate::config::SerialConfig;
use crate::error::{HeadTrackerError, Result};
use crate::para::encoder::Frame;
use port_trait::{SerialPortIO, TokioSerialPort};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default link baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Sent once after connecting, before the first frame
pub const BOOT_SEQUENCE: [u8; 2] = [0x0d, 0x0a];

/// Device paths tried when no port is configured (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/rfcomm0", // Bluetooth serial bound with rfcomm
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Trainer link over a serial port.
pub struct TrainerLink<P: SerialPortIO = TokioSerialPort> {
    port: P,
    device_path: String,
    frames_sent: u64,
}

impl<P: SerialPortIO> std::fmt::Debug for TrainerLink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainerLink")
            .field("device_path", &self.device_path)
            .field("frames_sent", &self.frames_sent)
            .finish_non_exhaustive()
    }
}

impl TrainerLink<TokioSerialPort> {
    /// Open the link described by `config`
    ///
    /// An empty `port` auto-detects the device by trying common paths.
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use head_tracker::config::SerialConfig;
    /// use head_tracker::serial::TrainerLink;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let link = TrainerLink::open(&SerialConfig::default())?;
    ///     println!("Connected to: {}", link.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate)
        }
    }

    /// Open the first device in `paths` that succeeds
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/rfcomm0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened trainer link at {} ({} baud)", path, baud_rate);
                    return Ok(Self::with_port(TokioSerialPort::new(port), path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(HeadTrackerError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open one device as 8N1 without flow control
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| HeadTrackerError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<P: SerialPortIO> TrainerLink<P> {
    /// Wrap an already opened port
    pub fn with_port(port: P, device_path: &str) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            frames_sent: 0,
        }
    }

    /// Send the connect sequence
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    pub async fn announce(&mut self) -> Result<()> {
        self.write(&BOOT_SEQUENCE).await?;
        debug!("Sent boot sequence to {}", self.device_path);
        Ok(())
    }

    /// Send one frame as a single write
    ///
    /// # Errors
    ///
    /// Returns error if the write or flush fails. The caller decides whether
    /// to drop the frame; the next tick supersedes it either way.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write(frame.as_bytes()).await?;
        self.frames_sent += 1;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.port
            .write_all(bytes)
            .await
            .map_err(|e| HeadTrackerError::Serial(format!("Failed to write frame: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| HeadTrackerError::Serial(format!("Failed to flush serial port: {}", e)))?;

        Ok(())
    }

    /// Path of the opened device
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Frames written successfully
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

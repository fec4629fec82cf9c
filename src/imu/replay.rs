//! # Replay IMU
//!
//! File-backed [`ImuSensor`] that plays back recorded raw samples, one JSON
//! object per line:
//!
//! ```text
//! {"gyro": [0.1, -0.2, 0.0], "accel": [0.0, 0.0, 1.0], "mag": [0.3, 0.0, -0.4]}
//! ```
//!
//! Each sensor keeps its own cursor, so a tick that reads gyro, accel and mag
//! consumes exactly one record.

use std::fs;
use std::path::Path;

use nalgebra::Vector3;
use serde::Deserialize;
use tracing::info;

use super::{ImuSensor, RawSample};
use crate::error::{HeadTrackerError, Result};

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    gyro: [f32; 3],
    accel: [f32; 3],
    mag: [f32; 3],
}

impl From<ReplayRecord> for RawSample {
    fn from(record: ReplayRecord) -> Self {
        Self {
            gyro: Vector3::from(record.gyro),
            accel: Vector3::from(record.accel),
            mag: Vector3::from(record.mag),
        }
    }
}

/// Plays back a recorded sample stream.
#[derive(Debug, Clone)]
pub struct ReplayImu {
    samples: Vec<RawSample>,
    looping: bool,
    gyro_cursor: usize,
    accel_cursor: usize,
    mag_cursor: usize,
}

impl ReplayImu {
    /// Load samples from a JSON-lines file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, a line is malformed, or the
    /// file holds no samples
    pub fn open<P: AsRef<Path>>(path: P, looping: bool) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let replay = Self::parse(&contents, looping)?;
        info!(
            "Loaded {} replay samples from {}",
            replay.len(),
            path.as_ref().display()
        );
        Ok(replay)
    }

    /// Parse samples from JSON-lines text. Blank lines and `#` comments are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if a line is malformed or no samples are present
    pub fn parse(contents: &str, looping: bool) -> Result<Self> {
        let samples = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| serde_json::from_str::<ReplayRecord>(line).map(RawSample::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Self::from_samples(samples, looping)
    }

    /// Build a replay from in-memory samples
    ///
    /// # Errors
    ///
    /// Returns error if `samples` is empty
    pub fn from_samples(samples: Vec<RawSample>, looping: bool) -> Result<Self> {
        if samples.is_empty() {
            return Err(HeadTrackerError::Sensor("replay contains no samples".to_string()));
        }

        Ok(Self {
            samples,
            looping,
            gyro_cursor: 0,
            accel_cursor: 0,
            mag_cursor: 0,
        })
    }

    /// Number of recorded samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false, a replay holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once every sensor has consumed the last record of a non-looping replay
    pub fn is_exhausted(&self) -> bool {
        !self.looping
            && [self.gyro_cursor, self.accel_cursor, self.mag_cursor]
                .iter()
                .all(|&cursor| cursor >= self.samples.len())
    }

    fn take(
        samples: &[RawSample],
        looping: bool,
        cursor: &mut usize,
        sensor: &str,
    ) -> Result<RawSample> {
        if looping && *cursor >= samples.len() {
            *cursor = 0;
        }
        let sample = samples.get(*cursor).copied().ok_or_else(|| {
            HeadTrackerError::Sensor(format!("{} replay exhausted", sensor))
        })?;
        *cursor += 1;
        Ok(sample)
    }
}

// Recorded data is always ready. An exhausted replay still reports ready so
// the following read surfaces the end of the recording instead of spinning.
impl ImuSensor for ReplayImu {
    fn gyro_available(&mut self) -> bool {
        true
    }

    fn accel_available(&mut self) -> bool {
        true
    }

    fn mag_available(&mut self) -> bool {
        true
    }

    fn read_gyro(&mut self) -> Result<Vector3<f32>> {
        Self::take(&self.samples, self.looping, &mut self.gyro_cursor, "gyroscope").map(|s| s.gyro)
    }

    fn read_accel(&mut self) -> Result<Vector3<f32>> {
        Self::take(&self.samples, self.looping, &mut self.accel_cursor, "accelerometer")
            .map(|s| s.accel)
    }

    fn read_mag(&mut self) -> Result<Vector3<f32>> {
        Self::take(&self.samples, self.looping, &mut self.mag_cursor, "magnetometer").map(|s| s.mag)
    }
}

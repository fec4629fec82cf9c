//! # Calibration Module
//!
//! Per-axis affine sensor calibration.
//!
//! Every axis of every sensor is corrected with a gain and an offset:
//!
//! `calibrated = gain × (raw − offset)`
//!
//! - For the gyroscope and accelerometer the offset is bias, the gain is scale error.
//! - For the magnetometer the offset is hard-iron, the gain a diagonal soft-iron correction.
//!
//! ## Usage
//!
//! ```
//! use nalgebra::Vector3;
//! use head_tracker::orientation::calibration::calibrate;
//!
//! let raw = Vector3::new(1.0, 2.0, 3.0);
//! let gain = Vector3::new(2.0, 2.0, 2.0);
//! let offset = Vector3::new(0.5, 0.5, 0.5);
//!
//! assert_eq!(calibrate(&raw, &gain, &offset), Vector3::new(1.0, 3.0, 5.0));
//! ```

use nalgebra::Vector3;
use serde::Deserialize;

use crate::imu::RawSample;

/// Applies `gain × (raw − offset)` per axis.
///
/// NaN and infinities propagate.
#[must_use]
#[inline]
pub fn calibrate(raw: &Vector3<f32>, gain: &Vector3<f32>, offset: &Vector3<f32>) -> Vector3<f32> {
    (raw - offset).component_mul(gain)
}

/// Gain and offset for one sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCalibration {
    pub gain: Vector3<f32>,
    pub offset: Vector3<f32>,
}

impl SensorCalibration {
    /// Unity gain, zero offset
    pub fn identity() -> Self {
        Self {
            gain: Vector3::new(1.0, 1.0, 1.0),
            offset: Vector3::zeros(),
        }
    }

    fn from_rows(gain: [f32; 3], offset: [f32; 3]) -> Self {
        Self {
            gain: Vector3::new(gain[0], gain[1], gain[2]),
            offset: Vector3::new(offset[0], offset[1], offset[2]),
        }
    }

    /// Calibrates one reading of this sensor.
    #[must_use]
    pub fn apply(&self, raw: &Vector3<f32>) -> Vector3<f32> {
        calibrate(raw, &self.gain, &self.offset)
    }
}

impl Default for SensorCalibration {
    fn default() -> Self {
        Self::identity()
    }
}

/// Calibration for all three sensors.
///
/// Row layout, columns x, y, z:
///
/// | Row | Content |
/// |-----|---------|
/// | 0 | gyroscope gain |
/// | 1 | gyroscope offset |
/// | 2 | accelerometer gain |
/// | 3 | accelerometer offset |
/// | 4 | magnetometer gain (soft iron) |
/// | 5 | magnetometer offset (hard iron) |
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationMatrix {
    pub gyro: SensorCalibration,
    pub accel: SensorCalibration,
    pub mag: SensorCalibration,
}

impl CalibrationMatrix {
    /// Builds a matrix from its 6 × 3 row form.
    pub fn from_rows(rows: [[f32; 3]; 6]) -> Self {
        Self {
            gyro: SensorCalibration::from_rows(rows[0], rows[1]),
            accel: SensorCalibration::from_rows(rows[2], rows[3]),
            mag: SensorCalibration::from_rows(rows[4], rows[5]),
        }
    }

    /// Returns the 6 × 3 row form.
    pub fn to_rows(&self) -> [[f32; 3]; 6] {
        let row = |v: &Vector3<f32>| [v.x, v.y, v.z];
        [
            row(&self.gyro.gain),
            row(&self.gyro.offset),
            row(&self.accel.gain),
            row(&self.accel.offset),
            row(&self.mag.gain),
            row(&self.mag.offset),
        ]
    }

    /// Calibrates every sensor of a sample with its own gain/offset pair.
    #[must_use]
    pub fn apply(&self, sample: &RawSample) -> RawSample {
        RawSample {
            gyro: self.gyro.apply(&sample.gyro),
            accel: self.accel.apply(&sample.accel),
            mag: self.mag.apply(&sample.mag),
        }
    }
}

/// Compiled-in calibration sets. Exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalibrationProfile {
    /// Unity gain, zero offset on every axis
    #[default]
    Identity,
    /// First Nano 33 BLE prototype
    #[serde(rename = "board-1")]
    Board1,
    /// Second Nano 33 BLE prototype
    #[serde(rename = "board-2")]
    Board2,
    /// Nano 33 BLE unit 7BF5 (accelerometer and magnetometer only)
    #[serde(rename = "board-7bf5")]
    Board7bf5,
}

const BOARD_1: [[f32; 3]; 6] = [
    [1.00, 1.00, 1.00],
    [1.12, 0.07, 0.00],
    [0.99, 0.99, 0.99],
    [0.00, 0.00, 0.00],
    [1.16, 1.12, 1.14],
    [12.11, 24.21, -2.76],
];

const BOARD_2: [[f32; 3]; 6] = [
    [1.00, 1.00, 1.00],
    [0.70, 0.10, -2.30],
    [1.00, 1.00, 1.00],
    [0.00, 0.00, 0.00],
    [1.11, 1.12, 1.17],
    [3.50, 24.60, 0.30],
];

const BOARD_7BF5: [[f32; 3]; 6] = [
    [1.00, 1.00, 1.00],
    [0.00, 0.00, 0.00],
    [0.99, 0.99, 1.00],
    [-0.01, -0.01, -0.01],
    [1.35, 1.32, 1.38],
    [17.57, 21.24, -0.21],
];

impl CalibrationProfile {
    /// The calibration matrix for this profile
    pub fn matrix(&self) -> CalibrationMatrix {
        match self {
            CalibrationProfile::Identity => CalibrationMatrix::default(),
            CalibrationProfile::Board1 => CalibrationMatrix::from_rows(BOARD_1),
            CalibrationProfile::Board2 => CalibrationMatrix::from_rows(BOARD_2),
            CalibrationProfile::Board7bf5 => CalibrationMatrix::from_rows(BOARD_7BF5),
        }
    }
}

//! # IMU Module
//!
//! Sensor input boundary: gyroscope, accelerometer and magnetometer reads.
//!
//! This module handles:
//! - The `ImuSensor` trait implemented by hardware drivers and replay sources
//! - Waiting on data-ready signals before each read
//! - Axis sign conventions for the supported board mountings
//! - Averaging several reads into one sample

pub mod replay;

use nalgebra::Vector3;
use serde::Deserialize;

use crate::error::{HeadTrackerError, Result};

/// One 9-axis reading: gyro (°/s), accel (g), mag (sensor units)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub gyro: Vector3<f32>,
    pub accel: Vector3<f32>,
    pub mag: Vector3<f32>,
}

impl Default for RawSample {
    fn default() -> Self {
        Self {
            gyro: Vector3::zeros(),
            accel: Vector3::zeros(),
            mag: Vector3::zeros(),
        }
    }
}

/// A 9-axis IMU.
///
/// The `*_available` methods report the hardware data-ready signal; reads are
/// only issued once the matching check returns true.
pub trait ImuSensor {
    fn gyro_available(&mut self) -> bool;
    fn accel_available(&mut self) -> bool;
    fn mag_available(&mut self) -> bool;

    fn read_gyro(&mut self) -> Result<Vector3<f32>>;
    fn read_accel(&mut self) -> Result<Vector3<f32>>;
    fn read_mag(&mut self) -> Result<Vector3<f32>>;
}

/// Per-sensor axis signs (each component is +1.0 or -1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSigns {
    pub gyro: Vector3<f32>,
    pub accel: Vector3<f32>,
    pub mag: Vector3<f32>,
}

impl AxisSigns {
    /// No axis inverted
    pub fn identity() -> Self {
        Self {
            gyro: Vector3::new(1.0, 1.0, 1.0),
            accel: Vector3::new(1.0, 1.0, 1.0),
            mag: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Flips the sensor frame of `sample` into the estimator frame.
    #[must_use]
    pub fn apply(&self, sample: RawSample) -> RawSample {
        RawSample {
            gyro: sample.gyro.component_mul(&self.gyro),
            accel: sample.accel.component_mul(&self.accel),
            mag: sample.mag.component_mul(&self.mag),
        }
    }
}

impl Default for AxisSigns {
    fn default() -> Self {
        Self::identity()
    }
}

/// Board mountings with known sensor-to-estimator axis conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mounting {
    /// Sensor frame already matches the estimator frame
    #[default]
    Identity,
    /// Arduino Nano 33 BLE (LSM9DS1): gyro and accel X inverted
    #[serde(rename = "nano-33-ble")]
    Nano33Ble,
    /// Seeed XIAO BLE Sense (LSM6DS3): gyro Y/Z and accel X inverted
    XiaoBle,
}

impl Mounting {
    /// Axis signs for this mounting
    pub fn signs(&self) -> AxisSigns {
        match self {
            Mounting::Identity => AxisSigns::identity(),
            Mounting::Nano33Ble => AxisSigns {
                gyro: Vector3::new(-1.0, 1.0, 1.0),
                accel: Vector3::new(-1.0, 1.0, 1.0),
                mag: Vector3::new(1.0, 1.0, 1.0),
            },
            Mounting::XiaoBle => AxisSigns {
                gyro: Vector3::new(1.0, -1.0, -1.0),
                accel: Vector3::new(-1.0, 1.0, 1.0),
                mag: Vector3::new(1.0, 1.0, 1.0),
            },
        }
    }
}

/// Spins until `ready` reports data. Bounded by the sensor output rate.
fn wait_until(mut ready: impl FnMut() -> bool) {
    while !ready() {
        std::hint::spin_loop();
    }
}

/// Reads one sample from each sensor and applies the axis signs
///
/// # Errors
///
/// Returns error if any of the three reads fails
pub fn read_sample<S: ImuSensor + ?Sized>(sensor: &mut S, signs: &AxisSigns) -> Result<RawSample> {
    wait_until(|| sensor.gyro_available());
    let gyro = sensor.read_gyro()?;

    wait_until(|| sensor.accel_available());
    let accel = sensor.read_accel()?;

    wait_until(|| sensor.mag_available());
    let mag = sensor.read_mag()?;

    Ok(signs.apply(RawSample { gyro, accel, mag }))
}

/// Reads `n` samples and returns their per-axis mean
///
/// `n == 1` is a plain [`read_sample`].
///
/// # Errors
///
/// Returns error if `n` is zero or any read fails
pub fn read_averaged<S: ImuSensor + ?Sized>(
    sensor: &mut S,
    signs: &AxisSigns,
    n: usize,
) -> Result<RawSample> {
    if n == 0 {
        return Err(HeadTrackerError::Sensor(
            "sample count for averaging must be at least 1".to_string(),
        ));
    }

    let mut sum = RawSample::default();
    for _ in 0..n {
        let sample = read_sample(sensor, signs)?;
        sum.gyro += sample.gyro;
        sum.accel += sample.accel;
        sum.mag += sample.mag;
    }

    let scale = 1.0 / n as f32;
    Ok(RawSample {
        gyro: sum.gyro * scale,
        accel: sum.accel * scale,
        mag: sum.mag * scale,
    })
}


#[cfg(test)]
mod tests {
    use super::mocks::MockImu;
    use super::*;

    fn sample(g: f32, a: f32, m: f32) -> RawSample {
        RawSample {
            gyro: Vector3::new(g, g + 1.0, g + 2.0),
            accel: Vector3::new(a, a + 1.0, a + 2.0),
            mag: Vector3::new(m, m + 1.0, m + 2.0),
        }
    }

    #[test]
    fn test_read_sample_identity() {
        let mut imu = MockImu::new(vec![sample(1.0, 10.0, 100.0)]);
        let read = read_sample(&mut imu, &AxisSigns::identity()).unwrap();
        assert_eq!(read, sample(1.0, 10.0, 100.0));
    }

    #[test]
    fn test_read_sample_waits_for_ready() {
        let mut imu = MockImu::new(vec![sample(1.0, 2.0, 3.0)]);
        imu.not_ready_polls = 5;

        let read = read_sample(&mut imu, &AxisSigns::identity()).unwrap();

        assert_eq!(read, sample(1.0, 2.0, 3.0));
        assert_eq!(imu.polls, 3 * 6); // 5 misses + 1 hit per sensor
    }

    #[test]
    fn test_read_sample_applies_signs() {
        let mut imu = MockImu::new(vec![sample(1.0, 10.0, 100.0)]);
        let read = read_sample(&mut imu, &Mounting::XiaoBle.signs()).unwrap();

        assert_eq!(read.gyro, Vector3::new(1.0, -2.0, -3.0));
        assert_eq!(read.accel, Vector3::new(-10.0, 11.0, 12.0));
        assert_eq!(read.mag, Vector3::new(100.0, 101.0, 102.0));
    }

    #[test]
    fn test_nano_mounting_signs() {
        let signs = Mounting::Nano33Ble.signs();
        assert_eq!(signs.gyro, Vector3::new(-1.0, 1.0, 1.0));
        assert_eq!(signs.accel, Vector3::new(-1.0, 1.0, 1.0));
        assert_eq!(signs.mag, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_read_averaged_single_is_plain_read() {
        let mut a = MockImu::new(vec![sample(1.0, 2.0, 3.0)]);
        let mut b = MockImu::new(vec![sample(1.0, 2.0, 3.0)]);
        let signs = AxisSigns::identity();

        assert_eq!(
            read_averaged(&mut a, &signs, 1).unwrap(),
            read_sample(&mut b, &signs).unwrap()
        );
    }

    #[test]
    fn test_read_averaged_mean() {
        let mut imu = MockImu::new(vec![sample(0.0, 0.0, 0.0), sample(2.0, 4.0, 6.0)]);
        let avg = read_averaged(&mut imu, &AxisSigns::identity(), 2).unwrap();

        assert!((avg.gyro - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-6);
        assert!((avg.accel - Vector3::new(2.0, 3.0, 4.0)).norm() < 1e-6);
        assert!((avg.mag - Vector3::new(3.0, 4.0, 5.0)).norm() < 1e-6);
    }

    #[test]
    fn test_read_averaged_zero_count() {
        let mut imu = MockImu::new(vec![sample(0.0, 0.0, 0.0)]);
        let result = read_averaged(&mut imu, &AxisSigns::identity(), 0);

        assert!(matches!(result, Err(HeadTrackerError::Sensor(_))));
        assert_eq!(imu.samples.len(), 1, "no sample should be consumed");
    }

    #[test]
    fn test_read_averaged_propagates_read_error() {
        let mut imu = MockImu::new(vec![sample(0.0, 0.0, 0.0)]);
        let result = read_averaged(&mut imu, &AxisSigns::identity(), 3);
        assert!(result.is_err());
    }
}

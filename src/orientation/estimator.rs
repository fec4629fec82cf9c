//! # Attitude Estimator Boundary
//!
//! The fusion algorithm sits behind [`AttitudeEstimator`] so any
//! implementation (or a test double) can be plugged into the pipeline.
//!
//! Units at the boundary: gyroscope in °/s, accelerometer in g, magnetometer
//! in sensor units. Angles come back in degrees.

use std::f32::consts::PI;

use nalgebra::{UnitQuaternion, Vector3};

/// Yaw, pitch and roll in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Attitude {
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Reads the current estimate.
    ///
    /// Only valid after [`AttitudeEstimator::begin`].
    pub fn of<E: AttitudeEstimator + ?Sized>(estimator: &E) -> Self {
        Self {
            yaw: estimator.yaw(),
            pitch: estimator.pitch(),
            roll: estimator.roll(),
        }
    }
}

/// Sensor fusion capability.
///
/// `update` is called once per tick at the rate passed to `begin`. The angle
/// getters must not be called before `begin`.
#[cfg_attr(test, mockall::automock)]
pub trait AttitudeEstimator {
    /// Initialize the estimate from a first (averaged) accelerometer and magnetometer reading.
    fn begin(&mut self, sample_rate_hz: f32, accel: &Vector3<f32>, mag: &Vector3<f32>);

    /// Advance the estimate by one calibrated, filtered sample.
    fn update(&mut self, gyro: &Vector3<f32>, accel: &Vector3<f32>, mag: &Vector3<f32>);

    fn yaw(&self) -> f32;
    fn pitch(&self) -> f32;
    fn roll(&self) -> f32;
}

/// Rotation that takes sensor-frame vectors into a world frame where
/// magnetic north (horizontal component) is +X and gravity is +Z.
///
/// Degenerate inputs (zero vectors, accel parallel to mag) leave the
/// affected step as identity.
pub fn orientation_from_vectors(accel: &Vector3<f32>, mag: &Vector3<f32>) -> UnitQuaternion<f32> {
    let north = accel.cross(mag).cross(accel);

    let heading = UnitQuaternion::rotation_between(&north, &Vector3::x())
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI));

    let gravity = heading * accel;
    let level = UnitQuaternion::rotation_between(&gravity, &Vector3::z())
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI));

    level * heading
}

/// Stateless estimator that aligns every sample to gravity and magnetic north.
///
/// Ignores the gyroscope. Gives pipeline tests exact, noise-free angles.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct AlignmentEstimator {
    attitude: UnitQuaternion<f32>,
    sample_rate_hz: f32,
}

#[cfg(test)]
impl Default for AlignmentEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl AlignmentEstimator {
    pub fn new() -> Self {
        Self {
            attitude: UnitQuaternion::identity(),
            sample_rate_hz: 0.0,
        }
    }

    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }

    pub fn quaternion(&self) -> &UnitQuaternion<f32> {
        &self.attitude
    }
}

#[cfg(test)]
impl AttitudeEstimator for AlignmentEstimator {
    fn begin(&mut self, sample_rate_hz: f32, accel: &Vector3<f32>, mag: &Vector3<f32>) {
        self.sample_rate_hz = sample_rate_hz;
        self.attitude = orientation_from_vectors(accel, mag);
    }

    fn update(&mut self, _gyro: &Vector3<f32>, accel: &Vector3<f32>, mag: &Vector3<f32>) {
        self.attitude = orientation_from_vectors(accel, mag);
    }

    fn yaw(&self) -> f32 {
        self.attitude.euler_angles().2.to_degrees()
    }

    fn pitch(&self) -> f32 {
        self.attitude.euler_angles().1.to_degrees()
    }

    fn roll(&self) -> f32 {
        self.attitude.euler_angles().0.to_degrees()
    }
}

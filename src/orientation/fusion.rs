//! # Fusion AHRS Estimator
//!
//! [`AttitudeEstimator`] backed by the `fusion-ahrs` complementary filter:
//! the gyroscope is integrated every tick and the accelerometer and
//! magnetometer pull the estimate back towards gravity and north.
//!
//! Earth frame is NWU (X north, Y west, Z up), the same frame
//! [`orientation_from_vectors`] seeds the estimate in.

use std::fmt;

use fusion_ahrs::{Ahrs, AhrsSettings};
use nalgebra::{UnitQuaternion, Vector3};

use super::estimator::{orientation_from_vectors, AttitudeEstimator};

/// Default fusion gain
pub const DEFAULT_FUSION_GAIN: f32 = 0.5;

/// Gyro-integrating attitude estimator.
pub struct FusionEstimator {
    ahrs: Ahrs,
    delta_time: f32,
}

impl fmt::Debug for FusionEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FusionEstimator")
            .field("quaternion", &self.ahrs.quaternion())
            .field("delta_time", &self.delta_time)
            .finish_non_exhaustive()
    }
}

impl Default for FusionEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_FUSION_GAIN)
    }
}

impl FusionEstimator {
    /// Create an estimator with default settings and the given gain
    ///
    /// # Arguments
    ///
    /// * `gain` - How strongly accelerometer and magnetometer correct the gyro (typically 0.5)
    pub fn new(gain: f32) -> Self {
        Self::with_settings(AhrsSettings {
            gain,
            ..AhrsSettings::default()
        })
    }

    pub fn with_settings(settings: AhrsSettings) -> Self {
        Self {
            ahrs: Ahrs::with_settings(settings),
            delta_time: 0.0,
        }
    }

    /// Seconds per update, set by `begin`
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.ahrs.quaternion()
    }

    /// True while the filter still runs its start-up gain ramp
    pub fn is_initialising(&self) -> bool {
        self.ahrs.flags().initialising
    }
}

impl AttitudeEstimator for FusionEstimator {
    fn begin(&mut self, sample_rate_hz: f32, accel: &Vector3<f32>, mag: &Vector3<f32>) {
        self.delta_time = if sample_rate_hz > 0.0 {
            1.0 / sample_rate_hz
        } else {
            0.0
        };
        self.ahrs.reset();
        self.ahrs.set_quaternion(orientation_from_vectors(accel, mag));
    }

    fn update(&mut self, gyro: &Vector3<f32>, accel: &Vector3<f32>, mag: &Vector3<f32>) {
        // Ahrs checks the magnetometer against the earth west axis, so it
        // gets accel × mag (west in the sensor frame)
        self.ahrs
            .update(*gyro, *accel, accel.cross(mag), self.delta_time);
    }

    fn yaw(&self) -> f32 {
        self.ahrs.quaternion().euler_angles().2.to_degrees()
    }

    fn pitch(&self) -> f32 {
        self.ahrs.quaternion().euler_angles().1.to_degrees()
    }

    fn roll(&self) -> f32 {
        self.ahrs.quaternion().euler_angles().0.to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE_HZ: f32 = 50.0;

    fn up() -> Vector3<f32> {
        Vector3::new(0.0, 0.0, 1.0)
    }

    fn north() -> Vector3<f32> {
        Vector3::new(0.4, 0.0, -0.3)
    }

    #[test]
    fn test_begin_seeds_from_accel_and_mag() {
        let mut estimator = FusionEstimator::default();
        estimator.begin(RATE_HZ, &up(), &Vector3::new(0.0, 1.0, 0.0));

        assert!((estimator.delta_time() - 0.02).abs() < 1e-6);
        assert!((estimator.yaw() + 90.0).abs() < 1e-3, "yaw {}", estimator.yaw());
        assert!(estimator.pitch().abs() < 1e-3);
        assert!(estimator.roll().abs() < 1e-3);
        assert!(estimator.is_initialising());
    }

    #[test]
    fn test_begin_with_zero_rate() {
        let mut estimator = FusionEstimator::default();
        estimator.begin(0.0, &up(), &north());
        assert_eq!(estimator.delta_time(), 0.0);
    }

    #[test]
    fn test_stationary_holds_attitude() {
        let mut estimator = FusionEstimator::default();
        estimator.begin(RATE_HZ, &up(), &north());

        for _ in 0..200 {
            estimator.update(&Vector3::zeros(), &up(), &north());
        }

        assert!(estimator.yaw().abs() < 0.5, "yaw {}", estimator.yaw());
        assert!(estimator.pitch().abs() < 0.5);
        assert!(estimator.roll().abs() < 0.5);
    }

    #[test]
    fn test_integrates_gyro_without_magnetometer() {
        let mut estimator = FusionEstimator::default();
        estimator.begin(RATE_HZ, &up(), &Vector3::zeros());

        // One second at 90 °/s about the vertical axis
        for _ in 0..50 {
            estimator.update(&Vector3::new(0.0, 0.0, 90.0), &up(), &Vector3::zeros());
        }

        assert!((estimator.yaw() - 90.0).abs() < 0.5, "yaw {}", estimator.yaw());
        assert!(estimator.pitch().abs() < 0.5);
        assert!(estimator.roll().abs() < 0.5);
    }

    #[test]
    fn test_gyro_moves_yaw_with_magnetometer() {
        let mut estimator = FusionEstimator::default();
        estimator.begin(RATE_HZ, &up(), &north());

        for _ in 0..50 {
            estimator.update(&Vector3::new(0.0, 0.0, 90.0), &up(), &north());
        }

        let yaw = estimator.yaw();
        assert!(yaw > 5.0 && yaw < 90.5, "yaw {}", yaw);
    }

    #[test]
    fn test_debug_output() {
        let estimator = FusionEstimator::new(1.0);
        assert!(format!("{:?}", estimator).contains("FusionEstimator"));
    }
}

//! # Gyroscope Bias Tracker
//!
//! Runtime bias estimation for slowly rotating objects such as a head.
//!
//! While (nearly) stationary, calibrated gyroscope readings should average to
//! zero. Readings are summed per axis over a batch; at the end of the batch
//! half of the mean is folded into the axis offset. Readings beyond the escape
//! threshold are clamped and counted, and a batch with too many escapes is
//! discarded as movement, except during the first forced batches.
//!
//! The tracker is [`stable`](GyroBiasTracker::is_stable) once every axis'
//! last correction is non-zero and small. From then on each correction is
//! capped, so fast movement cannot drag the offsets far.

use nalgebra::Vector3;

/// Samples per batch (1 s at warm-up rates, 20 s at 50 Hz)
pub const BATCH_SIZE: u32 = 1000;

/// Escapes tolerated per batch (3%)
pub const BATCH_ESCAPE_MAX: u32 = BATCH_SIZE / 100 * 3;

/// Batches applied regardless of escapes
pub const FORCED_BATCHES: u32 = 10;

/// Readings beyond this magnitude (°/s) count as movement
pub const ESCAPE_THRESHOLD_DPS: f32 = 4.0;

/// Corrections below this (°/s) on every axis mark the tracker stable
pub const STABLE_CHECK_DPS: f32 = 0.1;

/// Correction cap (°/s) once stable
pub const STABLE_CORRECTION_CAP_DPS: f32 = 0.025;

#[derive(Debug, Clone, Copy, Default)]
struct AxisState {
    offset: f32,
    correction_last: f32,
    correction_sum: f32,
    applied: u32,
    escaped: u32,
    forced: u32,
}

impl AxisState {
    fn accumulate(&mut self, value: f32, stable: bool) {
        let mut value = value - self.offset;
        if value.abs() > ESCAPE_THRESHOLD_DPS {
            value = value.signum() * ESCAPE_THRESHOLD_DPS;
            self.escaped += 1;
        }
        self.correction_sum += value / BATCH_SIZE as f32;
        self.applied += 1;

        if self.applied >= BATCH_SIZE {
            self.adjust(stable);
        }
    }

    fn adjust(&mut self, stable: bool) {
        if self.escaped < BATCH_ESCAPE_MAX || self.forced < FORCED_BATCHES {
            let mut correction = self.correction_sum / 2.0;
            if stable && correction.abs() > STABLE_CORRECTION_CAP_DPS {
                correction = correction.signum() * STABLE_CORRECTION_CAP_DPS;
            }
            self.correction_last = correction;
            self.offset += correction;
            if self.forced < FORCED_BATCHES {
                self.forced += 1;
            }
        }
        self.correction_sum = 0.0;
        self.applied = 0;
        self.escaped = 0;
    }
}

/// Tracks gyroscope bias per axis.
#[derive(Debug, Clone, Default)]
pub struct GyroBiasTracker {
    axes: [AxisState; 3],
    stable: bool,
}

impl GyroBiasTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously learned offsets.
    ///
    /// Non-zero offsets skip the forced warm-up batches, so a noisy start
    /// cannot undo them.
    pub fn with_offsets(offsets: Vector3<f32>) -> Self {
        let mut tracker = Self::default();
        let warm = offsets != Vector3::zeros();
        for (axis, offset) in tracker.axes.iter_mut().zip(offsets.iter()) {
            axis.offset = *offset;
            if warm {
                axis.forced = FORCED_BATCHES;
            }
        }
        tracker
    }

    /// Feeds one gyroscope reading (°/s) into the bias estimate.
    pub fn update(&mut self, gyro: &Vector3<f32>) {
        for (axis, value) in self.axes.iter_mut().zip(gyro.iter()) {
            axis.accumulate(*value, self.stable);
        }

        if !self.stable {
            self.stable = self.axes.iter().all(|axis| {
                axis.correction_last != 0.0 && axis.correction_last.abs() < STABLE_CHECK_DPS
            });
        }
    }

    /// Removes the current bias estimate from a reading.
    #[must_use]
    pub fn correct(&self, gyro: &Vector3<f32>) -> Vector3<f32> {
        gyro - self.offsets()
    }

    pub fn offsets(&self) -> Vector3<f32> {
        Vector3::new(self.axes[0].offset, self.axes[1].offset, self.axes[2].offset)
    }

    /// Last correction applied to each axis
    pub fn last_corrections(&self) -> Vector3<f32> {
        Vector3::new(
            self.axes[0].correction_last,
            self.axes[1].correction_last,
            self.axes[2].correction_last,
        )
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(tracker: &mut GyroBiasTracker, gyro: Vector3<f32>, batches: u32) {
        for _ in 0..batches * BATCH_SIZE {
            tracker.update(&gyro);
        }
    }

    #[test]
    fn test_new_tracker_is_neutral() {
        let tracker = GyroBiasTracker::new();
        let gyro = Vector3::new(1.0, -2.0, 3.0);

        assert!(!tracker.is_stable());
        assert_eq!(tracker.correct(&gyro), gyro);
    }

    #[test]
    fn test_no_adjustment_before_batch_end() {
        let mut tracker = GyroBiasTracker::new();
        for _ in 0..BATCH_SIZE - 1 {
            tracker.update(&Vector3::new(1.0, 1.0, 1.0));
        }
        assert_eq!(tracker.offsets(), Vector3::zeros());
    }

    #[test]
    fn test_half_step_correction() {
        let mut tracker = GyroBiasTracker::new();
        feed(&mut tracker, Vector3::new(1.0, -0.5, 0.2), 1);

        let offsets = tracker.offsets();
        assert!((offsets.x - 0.5).abs() < 5e-3);
        assert!((offsets.y + 0.25).abs() < 5e-3);
        assert!((offsets.z - 0.1).abs() < 5e-3);
    }

    #[test]
    fn test_converges_to_constant_bias() {
        let bias = Vector3::new(1.12, 0.07, -0.4);
        let mut tracker = GyroBiasTracker::new();
        feed(&mut tracker, bias, 20);

        assert!((tracker.offsets() - bias).norm() < 0.01);
        assert!(tracker.correct(&bias).norm() < 0.01);
        assert!(tracker.is_stable());
    }

    #[test]
    fn test_escaped_values_are_clamped() {
        let mut tracker = GyroBiasTracker::new();
        feed(&mut tracker, Vector3::new(100.0, 0.0, 0.0), 1);

        // Forced batch, mean clamped to the threshold
        assert!((tracker.offsets().x - ESCAPE_THRESHOLD_DPS / 2.0).abs() < 5e-3);
    }

    #[test]
    fn test_movement_batch_ignored_after_warm_up() {
        let mut tracker = GyroBiasTracker::with_offsets(Vector3::new(0.5, 0.5, 0.5));
        feed(&mut tracker, Vector3::new(90.0, 0.5, 0.5), 1);

        assert_eq!(tracker.offsets().x, 0.5);
    }

    #[test]
    fn test_stable_corrections_are_capped() {
        let bias = Vector3::new(0.3, 0.3, 0.3);
        let mut tracker = GyroBiasTracker::new();
        feed(&mut tracker, bias, 20);
        assert!(tracker.is_stable());

        // Bias jumps by 2 °/s, below the escape threshold
        let before = tracker.offsets();
        feed(&mut tracker, bias + Vector3::new(2.0, 0.0, 0.0), 1);

        let step = tracker.offsets().x - before.x;
        assert!((step - STABLE_CORRECTION_CAP_DPS).abs() < 1e-5, "step {}", step);
    }

    #[test]
    fn test_zero_input_never_stable() {
        let mut tracker = GyroBiasTracker::new();
        feed(&mut tracker, Vector3::zeros(), 3);

        // Zero corrections do not count as converged
        assert!(!tracker.is_stable());
    }

    #[test]
    fn test_with_zero_offsets_keeps_forced_batches() {
        let mut tracker = GyroBiasTracker::with_offsets(Vector3::zeros());
        feed(&mut tracker, Vector3::new(90.0, 0.0, 0.0), 1);

        assert!(tracker.offsets().x > 0.0);
    }
}

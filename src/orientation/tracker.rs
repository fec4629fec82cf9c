//! # Orientation Tracker
//!
//! Reports attitude relative to a captured start reference.
//!
//! ```text
//!  Uncalibrated ──capture()──> Tracking ──rezero()──┐
//!                                  ^                │
//!                                  └────────────────┘
//! ```
//!
//! Angles are differences against the reference, wrapped into (−180, 180]
//! so they stay continuous across the ±180° yaw discontinuity.

use super::estimator::Attitude;

/// Tracker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No start reference captured yet
    Uncalibrated,
    /// Reporting angles against the start reference
    Tracking,
}

/// Wraps an angle difference into (−180, 180].
///
/// Assumes the difference of two angles each within [−180, 180], so one
/// correction step is enough.
///
/// # Examples
///
/// ```
/// use head_tracker::orientation::tracker::wrap_degrees;
///
/// assert_eq!(wrap_degrees(190.0), -170.0);
/// assert_eq!(wrap_degrees(-180.0), 180.0);
/// assert_eq!(wrap_degrees(45.0), 45.0);
/// ```
#[must_use]
#[inline]
pub fn wrap_degrees(d: f32) -> f32 {
    if d <= -180.0 {
        d + 360.0
    } else if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Start reference and wrap-safe differencing.
#[derive(Debug, Clone, Default)]
pub struct OrientationTracker {
    start: Option<Attitude>,
}

impl OrientationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        match self.start {
            Some(_) => TrackerState::Tracking,
            None => TrackerState::Uncalibrated,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }

    /// Captures `current` as the start reference, entering `Tracking`.
    pub fn capture(&mut self, current: Attitude) {
        self.start = Some(current);
    }

    /// Replaces the start reference. Same as [`capture`](Self::capture).
    pub fn rezero(&mut self, current: Attitude) {
        self.capture(current);
    }

    pub fn start_reference(&self) -> Option<Attitude> {
        self.start
    }

    /// Angles of `current` relative to the start reference.
    ///
    /// # Panics
    ///
    /// Panics if no reference has been captured. Querying angles before
    /// calibration is a programming error.
    pub fn angles(&self, current: &Attitude) -> Attitude {
        match self.try_angles(current) {
            Some(angles) => angles,
            None => panic!("orientation angles queried before start reference was captured"),
        }
    }

    /// Like [`angles`](Self::angles), returning `None` while uncalibrated.
    pub fn try_angles(&self, current: &Attitude) -> Option<Attitude> {
        let start = self.start?;
        Some(Attitude {
            yaw: wrap_degrees(current.yaw - start.yaw),
            pitch: wrap_degrees(current.pitch - start.pitch),
            roll: wrap_degrees(current.roll - start.roll),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_boundaries() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert_eq!(wrap_degrees(180.5), -179.5);
        assert_eq!(wrap_degrees(-180.5), 179.5);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(-360.0), 0.0);
    }

    #[test]
    fn test_wrap_range_over_grid() {
        let mut a = -180.0f32;
        while a <= 180.0 {
            let mut b = -180.0f32;
            while b <= 180.0 {
                let w = wrap_degrees(a - b);
                assert!(w > -180.0 && w <= 180.0, "wrap({} - {}) = {}", a, b, w);
                b += 7.5;
            }
            assert_eq!(wrap_degrees(a - a), 0.0);
            a += 7.5;
        }
    }

    #[test]
    fn test_initial_state_uncalibrated() {
        let tracker = OrientationTracker::new();
        assert_eq!(tracker.state(), TrackerState::Uncalibrated);
        assert!(!tracker.is_tracking());
        assert!(tracker.try_angles(&Attitude::default()).is_none());
    }

    #[test]
    #[should_panic(expected = "before start reference")]
    fn test_angles_before_capture_panics() {
        OrientationTracker::new().angles(&Attitude::default());
    }

    #[test]
    fn test_capture_enters_tracking() {
        let mut tracker = OrientationTracker::new();
        tracker.capture(Attitude::new(10.0, 5.0, -3.0));

        assert_eq!(tracker.state(), TrackerState::Tracking);
        assert_eq!(tracker.start_reference(), Some(Attitude::new(10.0, 5.0, -3.0)));
    }

    #[test]
    fn test_angles_relative_to_start() {
        let mut tracker = OrientationTracker::new();
        tracker.capture(Attitude::new(10.0, 5.0, -3.0));

        let angles = tracker.angles(&Attitude::new(40.0, -5.0, 0.0));
        assert_eq!(angles, Attitude::new(30.0, -10.0, 3.0));
    }

    #[test]
    fn test_yaw_continuous_across_discontinuity() {
        let mut tracker = OrientationTracker::new();
        tracker.capture(Attitude::new(170.0, 0.0, 0.0));

        // Turning 20° right crosses from +180 to -180
        let angles = tracker.angles(&Attitude::new(-170.0, 0.0, 0.0));
        assert_eq!(angles.yaw, 20.0);

        let mut tracker = OrientationTracker::new();
        tracker.capture(Attitude::new(-170.0, 0.0, 0.0));
        assert_eq!(tracker.angles(&Attitude::new(170.0, 0.0, 0.0)).yaw, -20.0);
    }

    #[test]
    fn test_rezero_twice_reads_zero() {
        let mut tracker = OrientationTracker::new();
        tracker.capture(Attitude::new(0.0, 0.0, 0.0));

        let current = Attitude::new(-123.0, 45.0, 67.0);
        tracker.rezero(current);
        tracker.rezero(current);

        assert_eq!(tracker.state(), TrackerState::Tracking);
        assert_eq!(tracker.angles(&current), Attitude::new(0.0, 0.0, 0.0));
    }
}

//! # Lag Filter Module
//!
//! First-order exponential smoothing of the nine sensor axes.
//!
//! `filtered = β·current + (1 − β)·previous`
//!
//! Each axis owns one state cell in [`FilterState`]; there is no cross-axis
//! interaction. The magnetometer can optionally use a [`SeededLagFilter`]
//! with its own β.

use nalgebra::Vector3;

use crate::imu::RawSample;

/// First-order lag filter with a fixed β in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagFilter {
    beta: f32,
}

impl LagFilter {
    /// Create a filter. β outside (0, 1] is clamped into it.
    ///
    /// # Arguments
    ///
    /// * `beta` - Weight of the new sample, higher is more responsive
    pub fn new(beta: f32) -> Self {
        let beta = if beta.is_nan() { 1.0 } else { beta.clamp(f32::EPSILON, 1.0) };
        Self { beta }
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Filters one value and stores the result as the new state.
    #[inline]
    pub fn apply(&self, current: f32, state: &mut f32) -> f32 {
        let filtered = self.beta * current + (1.0 - self.beta) * *state;
        *state = filtered;
        filtered
    }

    /// Filters a vector against three consecutive state cells.
    pub fn apply_vector(&self, current: &Vector3<f32>, state: &mut [f32]) -> Vector3<f32> {
        Vector3::new(
            self.apply(current.x, &mut state[0]),
            self.apply(current.y, &mut state[1]),
            self.apply(current.z, &mut state[2]),
        )
    }
}

/// Lag filter that treats an exact-zero state as unset.
///
/// The first reading seeds the state and passes through unfiltered, so the
/// output is not pulled toward zero on the first tick. A genuine reading of
/// exactly 0.0 leaves the cell looking unset and the next reading seeds again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeededLagFilter {
    inner: LagFilter,
}

impl SeededLagFilter {
    pub fn new(beta: f32) -> Self {
        Self {
            inner: LagFilter::new(beta),
        }
    }

    pub fn beta(&self) -> f32 {
        self.inner.beta()
    }

    #[inline]
    pub fn apply(&self, current: f32, state: &mut f32) -> f32 {
        if *state == 0.0 {
            *state = current;
            return current;
        }
        self.inner.apply(current, state)
    }

    pub fn apply_vector(&self, current: &Vector3<f32>, state: &mut [f32]) -> Vector3<f32> {
        Vector3::new(
            self.apply(current.x, &mut state[0]),
            self.apply(current.y, &mut state[1]),
            self.apply(current.z, &mut state[2]),
        )
    }
}

/// Previous-value cells: gx gy gz, ax ay az, mx my mz
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterState(pub [f32; 9]);

impl FilterState {
    fn gyro_mut(&mut self) -> &mut [f32] {
        &mut self.0[0..3]
    }

    fn accel_mut(&mut self) -> &mut [f32] {
        &mut self.0[3..6]
    }

    fn mag_mut(&mut self) -> &mut [f32] {
        &mut self.0[6..9]
    }
}

/// Filters whole samples, owning the nine state cells.
#[derive(Debug, Clone)]
pub struct SampleFilter {
    lag: LagFilter,
    mag: Option<SeededLagFilter>,
    state: FilterState,
}

impl SampleFilter {
    /// # Arguments
    ///
    /// * `beta` - β for every axis
    /// * `mag_beta` - When set, the magnetometer uses a seeded filter with this β
    ///   on the raw reading instead (see [`apply_raw_mag`](Self::apply_raw_mag))
    pub fn new(beta: f32, mag_beta: Option<f32>) -> Self {
        Self {
            lag: LagFilter::new(beta),
            mag: mag_beta.map(SeededLagFilter::new),
            state: FilterState::default(),
        }
    }

    /// Seeded magnetometer filter, run on the raw reading before calibration.
    ///
    /// Returns the reading unchanged when no `mag_beta` was given.
    pub fn apply_raw_mag(&mut self, raw: &Vector3<f32>) -> Vector3<f32> {
        match &self.mag {
            Some(seeded) => seeded.apply_vector(raw, self.state.mag_mut()),
            None => *raw,
        }
    }

    /// Filters one calibrated sample.
    ///
    /// With a seeded magnetometer filter the magnetometer passes through,
    /// it was already filtered by [`apply_raw_mag`](Self::apply_raw_mag).
    pub fn apply(&mut self, sample: &RawSample) -> RawSample {
        let gyro = self.lag.apply_vector(&sample.gyro, self.state.gyro_mut());
        let accel = self.lag.apply_vector(&sample.accel, self.state.accel_mut());
        let mag = match &self.mag {
            Some(_) => sample.mag,
            None => self.lag.apply_vector(&sample.mag, self.state.mag_mut()),
        };
        RawSample { gyro, accel, mag }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }
}

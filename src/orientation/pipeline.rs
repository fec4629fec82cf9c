//! # Head Tracker Pipeline
//!
//! One tick: read sensors → (raw mag filter) → calibrate → (gyro bias) → lag filter →
//! estimator update → relative angles → channels → PARA frame.
//!
//! All per-tick state (filter cells, start reference, bias estimate) is owned
//! here and mutated only through `&mut self`.

use tracing::{debug, info};

use super::calibration::CalibrationMatrix;
use super::channel_mapper::ChannelMapper;
use super::estimator::{Attitude, AttitudeEstimator};
use super::filter::SampleFilter;
use super::gyro_bias::GyroBiasTracker;
use super::tracker::{OrientationTracker, TrackerState};
use crate::config::Config;
use crate::error::Result;
use crate::imu::{read_averaged, read_sample, AxisSigns, ImuSensor, RawSample};
use crate::para::channels::ChannelBuffer;
use crate::para::encoder::{Frame, FrameEncoder};

/// Result of one tick
#[derive(Debug, Clone, Copy)]
pub struct TickOutput {
    /// Angles relative to the start reference
    pub angles: Attitude,
    /// Frame to hand to the transport
    pub frame: Frame,
}

/// Sensor-to-frame pipeline.
pub struct HeadTracker<S: ImuSensor, E: AttitudeEstimator> {
    sensor: S,
    estimator: E,
    signs: AxisSigns,
    calibration: CalibrationMatrix,
    gyro_bias: Option<GyroBiasTracker>,
    filter: SampleFilter,
    tracker: OrientationTracker,
    mapper: ChannelMapper,
    channels: ChannelBuffer,
    encoder: FrameEncoder,
    sample_rate_hz: f32,
    begin_samples: usize,
    ticks: u64,
}

impl<S: ImuSensor, E: AttitudeEstimator> HeadTracker<S, E> {
    /// Build the pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the channel assignment is invalid
    pub fn new(sensor: S, estimator: E, config: &Config) -> Result<Self> {
        let mapper = ChannelMapper::new()
            .with_channels(config.channels.pan, config.channels.tilt, config.channels.roll)?
            .with_angle_max(config.channels.angle_max)
            .with_reversed(&config.channels.channel_reverse);

        Ok(Self {
            sensor,
            estimator,
            signs: config.imu.mounting.signs(),
            calibration: config.imu.calibration.matrix(),
            gyro_bias: config.imu.gyro_bias_tracking.then(GyroBiasTracker::new),
            filter: SampleFilter::new(config.imu.lag_filter_beta, config.imu.mag_filter_beta),
            tracker: OrientationTracker::new(),
            mapper,
            channels: ChannelBuffer::new(),
            encoder: FrameEncoder::new(config.para.frame_type, config.para.checksum),
            sample_rate_hz: config.imu.sample_rate_hz,
            begin_samples: config.imu.begin_samples,
            ticks: 0,
        })
    }

    /// Initialize the estimator and capture the start reference.
    ///
    /// # Errors
    ///
    /// Returns error if reading the sensor fails
    pub fn begin(&mut self) -> Result<()> {
        let raw = read_averaged(&mut self.sensor, &self.signs, self.begin_samples)?;
        let sample = self.calibration.apply(&raw);

        self.estimator.begin(self.sample_rate_hz, &sample.accel, &sample.mag);

        let start = Attitude::of(&self.estimator);
        self.tracker.capture(start);
        info!(
            "Start reference captured: yaw {:.1}, pitch {:.1}, roll {:.1}",
            start.yaw, start.pitch, start.roll
        );
        Ok(())
    }

    /// Re-capture the start reference from the current estimate.
    ///
    /// Runs [`begin`](Self::begin) instead if not tracking yet.
    ///
    /// # Errors
    ///
    /// Returns error if `begin` has to run and fails
    pub fn rezero(&mut self) -> Result<()> {
        if !self.tracker.is_tracking() {
            return self.begin();
        }
        let current = Attitude::of(&self.estimator);
        self.tracker.rezero(current);
        info!(
            "Re-zeroed: yaw {:.1}, pitch {:.1}, roll {:.1}",
            current.yaw, current.pitch, current.roll
        );
        Ok(())
    }

    /// Run one read → frame pass.
    ///
    /// # Errors
    ///
    /// Returns error if reading the sensor fails
    ///
    /// # Panics
    ///
    /// Panics if called before [`begin`](Self::begin)
    pub fn tick(&mut self) -> Result<TickOutput> {
        assert!(
            self.tracker.is_tracking(),
            "tick called before start reference was captured"
        );

        let raw = read_sample(&mut self.sensor, &self.signs)?;
        let sample = self.front_end(&raw);

        self.estimator.update(&sample.gyro, &sample.accel, &sample.mag);

        let angles = self.tracker.angles(&Attitude::of(&self.estimator));
        self.mapper.map(&angles, &mut self.channels)?;
        let frame = self.encoder.encode(self.channels.values());
        self.ticks += 1;

        debug!(
            tick = self.ticks,
            yaw = angles.yaw,
            pitch = angles.pitch,
            roll = angles.roll,
            "{:?}",
            frame
        );

        Ok(TickOutput { angles, frame })
    }

    /// Raw magnetometer filter, calibration, bias removal and lag filtering
    fn front_end(&mut self, raw: &RawSample) -> RawSample {
        let raw = RawSample {
            mag: self.filter.apply_raw_mag(&raw.mag),
            ..*raw
        };
        let mut sample = self.calibration.apply(&raw);
        if let Some(bias) = self.gyro_bias.as_mut() {
            bias.update(&sample.gyro);
            sample.gyro = bias.correct(&sample.gyro);
        }
        self.filter.apply(&sample)
    }

    pub fn state(&self) -> TrackerState {
        self.tracker.state()
    }

    /// Ticks run since construction
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn channels(&self) -> &ChannelBuffer {
        &self.channels
    }

    /// Channels not assigned to an axis can be set here and pass through.
    pub fn channels_mut(&mut self) -> &mut ChannelBuffer {
        &mut self.channels
    }

    /// `None` when bias tracking is disabled
    pub fn gyro_bias(&self) -> Option<&GyroBiasTracker> {
        self.gyro_bias.as_ref()
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::mocks::MockImu;
    use crate::orientation::calibration::CalibrationProfile;
    use crate::orientation::estimator::{AlignmentEstimator, MockAttitudeEstimator};
    use crate::orientation::fusion::FusionEstimator;
    use crate::para::decoder::decode_frame;
    use crate::para::protocol::ChecksumMode;
    use mockall::predicate::*;
    use mockall::Sequence;
    use nalgebra::Vector3;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn level(mag: Vector3<f32>) -> RawSample {
        RawSample {
            gyro: Vector3::zeros(),
            accel: Vector3::new(0.0, 0.0, 1.0),
            mag,
        }
    }

    #[test]
    fn test_begin_captures_reference() {
        let mut estimator = MockAttitudeEstimator::new();
        estimator
            .expect_begin()
            .with(eq(50.0f32), eq(Vector3::new(0.0, 0.0, 1.0)), always())
            .times(1)
            .return_const(());
        estimator.expect_yaw().return_const(30.0f32);
        estimator.expect_pitch().return_const(0.0f32);
        estimator.expect_roll().return_const(0.0f32);

        let imu = MockImu::constant(level(Vector3::x()), 10);
        let mut tracker = HeadTracker::new(imu, estimator, &Config::default()).unwrap();
        assert_eq!(tracker.state(), TrackerState::Uncalibrated);

        tracker.begin().unwrap();

        assert_eq!(tracker.state(), TrackerState::Tracking);
        assert!(tracker.sensor().samples.is_empty(), "begin averages begin_samples reads");
    }

    #[test]
    fn test_update_called_once_per_tick() {
        let mut estimator = MockAttitudeEstimator::new();
        estimator.expect_begin().times(1).return_const(());
        estimator.expect_update().times(3).return_const(());
        estimator.expect_yaw().return_const(0.0f32);
        estimator.expect_pitch().return_const(0.0f32);
        estimator.expect_roll().return_const(0.0f32);

        let mut config = Config::default();
        config.imu.begin_samples = 1;
        let imu = MockImu::constant(level(Vector3::x()), 4);
        let mut tracker = HeadTracker::new(imu, estimator, &config).unwrap();

        tracker.begin().unwrap();
        for _ in 0..3 {
            tracker.tick().unwrap();
        }
        assert_eq!(tracker.ticks(), 3);
    }

    #[test]
    fn test_begin_precedes_angle_queries() {
        let mut seq = Sequence::new();
        let mut estimator = MockAttitudeEstimator::new();
        estimator
            .expect_begin()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        estimator
            .expect_yaw()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(0.0f32);
        estimator.expect_pitch().return_const(0.0f32);
        estimator.expect_roll().return_const(0.0f32);

        let mut config = Config::default();
        config.imu.begin_samples = 1;
        let imu = MockImu::constant(level(Vector3::x()), 1);
        let mut tracker = HeadTracker::new(imu, estimator, &config).unwrap();
        tracker.begin().unwrap();
    }

    #[test]
    fn test_tick_maps_relative_angles() {
        let yaw = Arc::new(AtomicU32::new(10.0f32.to_bits()));
        let yaw_reader = Arc::clone(&yaw);

        let mut estimator = MockAttitudeEstimator::new();
        estimator.expect_begin().return_const(());
        estimator.expect_update().return_const(());
        estimator
            .expect_yaw()
            .returning(move || f32::from_bits(yaw_reader.load(Ordering::SeqCst)));
        estimator.expect_pitch().return_const(0.0f32);
        estimator.expect_roll().return_const(0.0f32);

        let mut config = Config::default();
        config.imu.begin_samples = 1;
        let imu = MockImu::constant(level(Vector3::x()), 3);
        let mut tracker = HeadTracker::new(imu, estimator, &config).unwrap();
        tracker.begin().unwrap();

        // Head turned 22.5° from the start reference
        yaw.store(32.5f32.to_bits(), Ordering::SeqCst);
        let out = tracker.tick().unwrap();

        assert!((out.angles.yaw - 22.5).abs() < 1e-4);
        let decoded = decode_frame(&out.frame, ChecksumMode::Plain).unwrap();
        assert_eq!(decoded.channels, [1750, 1500, 1500, 1500, 1500, 1500, 1500, 1500]);

        // Re-zero at the new heading
        tracker.rezero().unwrap();
        let out = tracker.tick().unwrap();
        assert_eq!(out.angles.yaw, 0.0);
        assert_eq!(tracker.channels().get(0), Some(1500));
    }

    #[test]
    #[should_panic(expected = "before start reference")]
    fn test_tick_before_begin_panics() {
        let imu = MockImu::constant(level(Vector3::x()), 1);
        let mut tracker =
            HeadTracker::new(imu, AlignmentEstimator::new(), &Config::default()).unwrap();
        let _ = tracker.tick();
    }

    #[test]
    fn test_rezero_before_begin_runs_begin() {
        let mut config = Config::default();
        config.imu.begin_samples = 1;
        let imu = MockImu::constant(level(Vector3::x()), 1);
        let mut tracker = HeadTracker::new(imu, AlignmentEstimator::new(), &config).unwrap();

        tracker.rezero().unwrap();
        assert_eq!(tracker.state(), TrackerState::Tracking);
    }

    #[test]
    fn test_stationary_end_to_end() {
        let mut config = Config::default();
        config.imu.begin_samples = 5;
        let imu = MockImu::constant(level(Vector3::new(0.4, 0.0, -0.3)), 25);
        let mut tracker = HeadTracker::new(imu, AlignmentEstimator::new(), &config).unwrap();

        tracker.begin().unwrap();
        let mut last = None;
        for _ in 0..20 {
            last = Some(tracker.tick().unwrap());
        }

        let out = last.unwrap();
        assert!(out.angles.yaw.abs() < 0.1);
        assert_eq!(out.frame.first(), Some(&0x7E));
        assert_eq!(out.frame.last(), Some(&0x7E));
        assert_eq!(
            decode_frame(&out.frame, ChecksumMode::Plain).unwrap().channels,
            [1500; 8]
        );
    }

    #[test]
    fn test_pass_through_channels() {
        let mut config = Config::default();
        config.imu.begin_samples = 1;
        let imu = MockImu::constant(level(Vector3::x()), 2);
        let mut tracker = HeadTracker::new(imu, AlignmentEstimator::new(), &config).unwrap();
        tracker.channels_mut().set(7, 1100).unwrap();

        tracker.begin().unwrap();
        let out = tracker.tick().unwrap();

        let decoded = decode_frame(&out.frame, ChecksumMode::Plain).unwrap();
        assert_eq!(decoded.channels[7], 1100);
    }

    #[test]
    fn test_gyro_bias_tracking_optional() {
        let imu = MockImu::constant(level(Vector3::x()), 1);
        let tracker = HeadTracker::new(imu, AlignmentEstimator::new(), &Config::default()).unwrap();
        assert!(tracker.gyro_bias().is_none());

        let mut config = Config::default();
        config.imu.gyro_bias_tracking = true;
        let imu = MockImu::constant(level(Vector3::x()), 1);
        let tracker = HeadTracker::new(imu, AlignmentEstimator::new(), &config).unwrap();
        assert!(tracker.gyro_bias().is_some());
    }

    #[test]
    fn test_sensor_error_propagates() {
        let mut config = Config::default();
        config.imu.begin_samples = 1;
        let imu = MockImu::constant(level(Vector3::x()), 1);
        let mut tracker = HeadTracker::new(imu, AlignmentEstimator::new(), &config).unwrap();
        tracker.begin().unwrap();

        assert!(tracker.tick().is_err());
    }

    #[test]
    fn test_invalid_assignment_rejected() {
        let mut config = Config::default();
        config.channels.tilt = config.channels.pan;
        let imu = MockImu::constant(level(Vector3::x()), 1);
        assert!(HeadTracker::new(imu, AlignmentEstimator::new(), &config).is_err());
    }

    #[test]
    fn test_gyro_rate_moves_yaw() {
        let mut config = Config::default();
        config.imu.begin_samples = 1;
        let turning = RawSample {
            gyro: Vector3::new(0.0, 0.0, 90.0),
            ..level(Vector3::new(0.4, 0.0, -0.3))
        };
        let imu = MockImu::constant(turning, 51);
        let estimator = FusionEstimator::new(config.imu.fusion_gain);
        let mut tracker = HeadTracker::new(imu, estimator, &config).unwrap();

        tracker.begin().unwrap();
        let mut last = None;
        for _ in 0..50 {
            last = Some(tracker.tick().unwrap());
        }

        let out = last.unwrap();
        assert!(out.angles.yaw > 10.0, "yaw {}", out.angles.yaw);
        assert!(tracker.channels().get(0).unwrap() > 1600);
        assert_eq!(tracker.channels().get(1), Some(1500));
    }

    #[test]
    fn test_mag_seeded_before_calibration() {
        let mut config = Config::default();
        config.imu.begin_samples = 1;
        config.imu.calibration = CalibrationProfile::Board7bf5;
        config.imu.mag_filter_beta = Some(0.25);
        let matrix = config.imu.calibration.matrix();

        let first = Vector3::new(10.0, 20.0, 30.0);
        let second = Vector3::new(30.0, 20.0, 10.0);
        let calibrated_mag = |mag: Vector3<f32>| matrix.apply(&level(mag)).mag;
        // Seeded from the first raw reading, then 0.25 of the second
        let expected = [
            calibrated_mag(first),
            calibrated_mag(Vector3::new(15.0, 20.0, 25.0)),
        ];

        let mut seq = Sequence::new();
        let mut estimator = MockAttitudeEstimator::new();
        estimator.expect_begin().return_const(());
        for mag in expected {
            estimator
                .expect_update()
                .times(1)
                .in_sequence(&mut seq)
                .withf(move |_, _, m| (m - mag).norm() < 1e-3)
                .return_const(());
        }
        estimator.expect_yaw().return_const(0.0f32);
        estimator.expect_pitch().return_const(0.0f32);
        estimator.expect_roll().return_const(0.0f32);

        let imu = MockImu::new(vec![level(first), level(first), level(second)]);
        let mut tracker = HeadTracker::new(imu, estimator, &config).unwrap();

        tracker.begin().unwrap();
        tracker.tick().unwrap();
        tracker.tick().unwrap();
    }
}

//! # PARA Head Tracker Library
//!
//! Turn head orientation into pan, tilt and roll trainer channels for a
//! radio transmitter.
//!
//! This library provides the pipeline from raw IMU samples (gyroscope,
//! accelerometer, magnetometer) through calibration, lag filtering and an
//! attitude estimator to angles relative to a captured start pose, and the
//! FrSky PARA trainer frames those angles are sent as.

pub mod config;
pub mod error;
pub mod imu;
pub mod orientation;
pub mod para;
pub mod serial;
pub mod telemetry;

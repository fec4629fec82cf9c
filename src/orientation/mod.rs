//! # Orientation Module
//!
//! Turns raw 9-axis samples into head angles and trainer channels.
//!
//! This module handles:
//! - Per-axis gain/offset calibration
//! - Lag filtering of every sensor axis
//! - Runtime gyroscope bias tracking
//! - The attitude estimator boundary and its fusion-ahrs implementation
//! - Start reference capture and wrap-safe angle differences
//! - Mapping angles to trainer channels

pub mod calibration;
pub mod channel_mapper;
pub mod estimator;
pub mod filter;
pub mod fusion;
pub mod gyro_bias;
pub mod pipeline;
pub mod tracker;

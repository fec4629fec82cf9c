//! # Angle to Channel Mapper
//!
//! Maps relative head angles to trainer channel values.
//!
//! ## Channel Assignments (default)
//!
//! | Channel | Angle | Function |
//! |---------|-------|----------|
//! | CH1 | Yaw | Pan |
//! | CH2 | Pitch | Tilt |
//! | CH3 | Roll | Roll |
//!
//! Channels not assigned to an axis keep their current value.
//!
//! ## Value Ranges
//!
//! - Angle input: ±`angle_max` degrees maps to 1000-2000
//! - Output clamped to 988-2012 (beyond ±`angle_max`)
//! - Center value: 1500
//!
//! ## Usage
//!
//! ```
//! use head_tracker::orientation::channel_mapper::ChannelMapper;
//! use head_tracker::orientation::estimator::Attitude;
//! use head_tracker::para::channels::ChannelBuffer;
//!
//! let mapper = ChannelMapper::new();
//! let mut buffer = ChannelBuffer::new();
//! mapper.map(&Attitude::new(45.0, 0.0, -45.0), &mut buffer).unwrap();
//!
//! assert_eq!(buffer.values()[..3], [2000, 1500, 1000]);
//! ```

use super::estimator::Attitude;
use crate::error::{HeadTrackerError, Result};
use crate::para::channels::ChannelBuffer;
use crate::para::protocol::{
    PARA_CHANNEL_PULSE_MAX, PARA_CHANNEL_PULSE_MIN, PARA_CHANNEL_VALUE_CENTER, PARA_NUM_CHANNELS,
};

/// Angle (degrees) that maps to full deflection by default
pub const DEFAULT_ANGLE_MAX: f32 = 45.0;

/// Default channel indices for semantic access.
pub mod channels {
    /// Pan - yaw
    pub const PAN: usize = 0;
    /// Tilt - pitch
    pub const TILT: usize = 1;
    /// Roll
    pub const ROLL: usize = 2;
}

/// Converts an angle to a channel value.
///
/// `1500 + 500 / angle_max × angle`, truncated toward zero, clamped to
/// 988-2012.
///
/// # Examples
///
/// ```
/// use head_tracker::orientation::channel_mapper::angle_to_channel;
///
/// assert_eq!(angle_to_channel(0.0, 45.0), 1500);
/// assert_eq!(angle_to_channel(22.5, 45.0), 1750);
/// assert_eq!(angle_to_channel(90.0, 45.0), 2012);
/// ```
#[must_use]
#[inline]
pub fn angle_to_channel(angle: f32, angle_max: f32) -> u16 {
    let value = PARA_CHANNEL_VALUE_CENTER as f32 + 500.0 / angle_max * angle;
    // NaN passes through the clamp; map it to the low end
    if value.is_nan() {
        return PARA_CHANNEL_PULSE_MIN;
    }
    value.clamp(PARA_CHANNEL_PULSE_MIN as f32, PARA_CHANNEL_PULSE_MAX as f32) as u16
}

/// Maps attitude angles to trainer channels.
#[derive(Debug, Clone)]
pub struct ChannelMapper {
    pan: usize,
    tilt: usize,
    roll: usize,
    angle_max: f32,
    /// Channels to reverse (mirror around center).
    reversed_channels: [bool; PARA_NUM_CHANNELS],
}

impl Default for ChannelMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelMapper {
    /// Creates a mapper with the default assignment and ±45° range.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pan: channels::PAN,
            tilt: channels::TILT,
            roll: channels::ROLL,
            angle_max: DEFAULT_ANGLE_MAX,
            reversed_channels: [false; PARA_NUM_CHANNELS],
        }
    }

    /// Assigns pan, tilt and roll to channels (0-7).
    ///
    /// # Errors
    ///
    /// Returns error if an index is out of range or two axes share a channel
    pub fn with_channels(mut self, pan: usize, tilt: usize, roll: usize) -> Result<Self> {
        for index in [pan, tilt, roll] {
            if index >= PARA_NUM_CHANNELS {
                return Err(HeadTrackerError::ParaProtocol(format!(
                    "Channel index {} out of range (0-{})",
                    index,
                    PARA_NUM_CHANNELS - 1
                )));
            }
        }
        if pan == tilt || pan == roll || tilt == roll {
            return Err(HeadTrackerError::ParaProtocol(format!(
                "Pan, tilt and roll must use distinct channels (got {}, {}, {})",
                pan, tilt, roll
            )));
        }
        self.pan = pan;
        self.tilt = tilt;
        self.roll = roll;
        Ok(self)
    }

    /// Sets the angle mapped to full deflection. Non-positive values are ignored.
    #[must_use]
    pub fn with_angle_max(mut self, angle_max: f32) -> Self {
        if angle_max > 0.0 {
            self.angle_max = angle_max;
        }
        self
    }

    /// Reverses channels.
    ///
    /// # Arguments
    ///
    /// * `reversed` - Channel indices to reverse (0-7), others are ignored
    #[must_use]
    pub fn with_reversed(mut self, reversed: &[usize]) -> Self {
        for &ch in reversed {
            if let Some(slot) = self.reversed_channels.get_mut(ch) {
                *slot = true;
            }
        }
        self
    }

    pub fn angle_max(&self) -> f32 {
        self.angle_max
    }

    /// Pan, tilt and roll channel indices
    pub fn assignment(&self) -> (usize, usize, usize) {
        (self.pan, self.tilt, self.roll)
    }

    /// Writes pan, tilt and roll into `buffer`.
    ///
    /// # Errors
    ///
    /// Returns error if an assigned channel is not in the buffer
    pub fn map(&self, angles: &Attitude, buffer: &mut ChannelBuffer) -> Result<()> {
        buffer.set(self.pan, self.map_axis(angles.yaw, self.pan))?;
        buffer.set(self.tilt, self.map_axis(angles.pitch, self.tilt))?;
        buffer.set(self.roll, self.map_axis(angles.roll, self.roll))?;
        Ok(())
    }

    fn map_axis(&self, angle: f32, channel: usize) -> u16 {
        self.apply_reverse(angle_to_channel(angle, self.angle_max), channel)
    }

    #[inline]
    fn apply_reverse(&self, value: u16, channel: usize) -> u16 {
        if self.reversed_channels[channel] {
            2 * PARA_CHANNEL_VALUE_CENTER - value
        } else {
            value
        }
    }
}

//! # Trainer Channel Buffer
//!
//! Holds the 8 channel values sent in every trainer frame. The head tracker
//! writes pan, tilt and roll; the remaining channels keep whatever value was
//! last set (center by default).

use super::protocol::{TrainerChannels, PARA_CHANNEL_VALUE_CENTER, PARA_NUM_CHANNELS};
use crate::error::{HeadTrackerError, Result};

/// Mapping from channel index (0..7) to trainer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelBuffer {
    values: TrainerChannels,
}

impl Default for ChannelBuffer {
    fn default() -> Self {
        Self {
            values: [PARA_CHANNEL_VALUE_CENTER; PARA_NUM_CHANNELS],
        }
    }
}

impl ChannelBuffer {
    /// Creates a buffer with every channel centered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer from explicit values.
    #[must_use]
    pub fn from_values(values: TrainerChannels) -> Self {
        Self { values }
    }

    /// Sets a single channel.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is not a valid channel (0-7)
    pub fn set(&mut self, index: usize, value: u16) -> Result<()> {
        let slot = self.values.get_mut(index).ok_or_else(|| {
            HeadTrackerError::ParaProtocol(format!(
                "Channel index {} out of range (0-{})",
                index,
                PARA_NUM_CHANNELS - 1
            ))
        })?;
        *slot = value;
        Ok(())
    }

    /// Returns a channel value, or `None` for an invalid index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied()
    }

    /// Returns all channel values in order.
    #[must_use]
    pub fn values(&self) -> &TrainerChannels {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_centered() {
        let buffer = ChannelBuffer::new();
        assert!(buffer.values().iter().all(|&v| v == 1500));
    }

    #[test]
    fn test_set_and_get() {
        let mut buffer = ChannelBuffer::new();
        buffer.set(0, 1000).unwrap();
        buffer.set(7, 2000).unwrap();

        assert_eq!(buffer.get(0), Some(1000));
        assert_eq!(buffer.get(7), Some(2000));
        assert_eq!(buffer.get(3), Some(1500)); // untouched channel passes through
    }

    #[test]
    fn test_set_out_of_range() {
        let mut buffer = ChannelBuffer::new();
        let result = buffer.set(8, 1000);

        match result {
            Err(HeadTrackerError::ParaProtocol(msg)) => assert!(msg.contains("8")),
            other => panic!("Expected ParaProtocol error, got: {:?}", other),
        }
        assert_eq!(buffer, ChannelBuffer::new());
    }

    #[test]
    fn test_get_out_of_range() {
        assert_eq!(ChannelBuffer::new().get(8), None);
    }
}

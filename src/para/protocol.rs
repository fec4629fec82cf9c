//! # PARA Protocol Constants and Types
//!
//! Core protocol definitions for the PARA trainer link.
//!
//! Frame layout on the wire:
//!
//! ```text
//! START_STOP | type | payload (12 logical bytes, stuffed) | checksum | START_STOP
//! ```

use serde::Deserialize;

/// Frame delimiter, used for both start and end (always 0x7E)
pub const PARA_START_STOP: u8 = 0x7E;

/// Escape byte preceding a stuffed value
pub const PARA_BYTE_STUFF: u8 = 0x7D;

/// XOR mask applied to a stuffed value
pub const PARA_STUFF_MASK: u8 = 0x20;

/// Trainer frame type
pub const PARA_FRAMETYPE_TRAINER: u8 = 0x80;

/// Number of trainer channels
pub const PARA_NUM_CHANNELS: usize = 8;

/// Logical payload size (8 channels × 11 bits packed as 3 bytes per pair)
pub const PARA_PAYLOAD_SIZE: usize = PARA_NUM_CHANNELS / 2 * 3;

/// Maximum frame size accepted by the transport in a single write
pub const PARA_MAX_FRAME_SIZE: usize = 32;

/// Frame size when every stuffable byte gets escaped:
/// start(1) + type(≤2) + payload(≤2×12) + checksum(≤2) + end(1)
pub const PARA_WORST_CASE_FRAME_SIZE: usize = 1 + 2 * (1 + PARA_PAYLOAD_SIZE) + 2 + 1;

const _: () = assert!(PARA_WORST_CASE_FRAME_SIZE <= PARA_MAX_FRAME_SIZE);

/// Channel value range (11-bit: 0-2047)
pub const PARA_CHANNEL_VALUE_MIN: u16 = 0;
pub const PARA_CHANNEL_VALUE_MAX: u16 = 2047;

/// Nominal trainer pulse range in microseconds
pub const PARA_CHANNEL_PULSE_MIN: u16 = 988;
pub const PARA_CHANNEL_PULSE_MAX: u16 = 2012;
pub const PARA_CHANNEL_VALUE_CENTER: u16 = 1500;

/// Trainer channels array type (8 channels, 11-bit values)
pub type TrainerChannels = [u16; PARA_NUM_CHANNELS];

/// How the trailing checksum byte is emitted.
///
/// The reference encoder appends the checksum as a raw byte, so a checksum
/// equal to a delimiter is never escaped. `Stuffed` escapes it like payload
/// bytes for receivers that unstuff everything between delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// Raw checksum byte (reference behavior)
    #[default]
    Plain,
    /// Checksum byte passes through byte stuffing
    Stuffed,
}

/// Returns true if `byte` must be escaped inside a frame
#[inline]
pub fn needs_stuffing(byte: u8) -> bool {
    byte == PARA_START_STOP || byte == PARA_BYTE_STUFF
}

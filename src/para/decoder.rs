//! # PARA Frame Decoder
//!
//! Decodes trainer frames back into channel values. The head tracker only
//! transmits, so this is the receiving side used to verify encoder output.

use super::checksum::XorChecksum;
use super::protocol::*;
use crate::error::{HeadTrackerError, Result};

/// Decoded trainer frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerFrame {
    /// Frame type byte
    pub frame_type: u8,

    /// Channel values
    pub channels: TrainerChannels,
}

/// Reads bytes from a frame, undoing byte stuffing.
struct FrameReader<'a> {
    bytes: &'a [u8],
    index: usize,
    checksum: XorChecksum,
}

impl<'a> FrameReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            index: 0,
            checksum: XorChecksum::new(),
        }
    }

    fn next_raw(&mut self) -> Result<u8> {
        let byte = *self.bytes.get(self.index).ok_or_else(|| {
            HeadTrackerError::ParaProtocol(format!("Frame truncated at byte {}", self.index))
        })?;
        self.index += 1;
        Ok(byte)
    }

    fn next_unescaped(&mut self) -> Result<u8> {
        let byte = self.next_raw()?;
        if byte == PARA_BYTE_STUFF {
            return Ok(self.next_raw()? ^ PARA_STUFF_MASK);
        }
        Ok(byte)
    }

    fn next_logical(&mut self) -> Result<u8> {
        let byte = self.next_unescaped()?;
        self.checksum.update(byte);
        Ok(byte)
    }
}

/// Decode a complete PARA frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (start, type, payload, checksum, end)
/// * `checksum_mode` - How the sender emitted the checksum byte
///
/// # Returns
///
/// * `Result<TrainerFrame>` - Decoded frame, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Start or end delimiter is missing
/// - Frame type is not the trainer frame type
/// - Frame ends in the middle of a stuffed byte or payload
/// - Checksum check fails
pub fn decode_frame(frame: &[u8], checksum_mode: ChecksumMode) -> Result<TrainerFrame> {
    let mut reader = FrameReader::new(frame);

    let start = reader.next_raw()?;
    if start != PARA_START_STOP {
        return Err(HeadTrackerError::ParaProtocol(format!(
            "Invalid start byte: 0x{:02X}",
            start
        )));
    }

    let frame_type = reader.next_logical()?;
    if frame_type != PARA_FRAMETYPE_TRAINER {
        return Err(HeadTrackerError::ParaProtocol(format!(
            "Invalid frame type: 0x{:02X}",
            frame_type
        )));
    }

    let mut channels = [0u16; PARA_NUM_CHANNELS];
    for pair in channels.chunks_exact_mut(2) {
        let b0 = reader.next_logical()? as u16;
        let b1 = reader.next_logical()? as u16;
        let b2 = reader.next_logical()? as u16;

        pair[0] = b0 | ((b1 & 0xF0) << 4);
        pair[1] = ((b1 & 0x0F) << 4) | ((b2 & 0x0F) << 8) | ((b2 & 0xF0) >> 4);
    }

    let expected = reader.checksum.value();
    let received = match checksum_mode {
        ChecksumMode::Plain => reader.next_raw()?,
        ChecksumMode::Stuffed => reader.next_unescaped()?,
    };
    if received != expected {
        return Err(HeadTrackerError::ParaProtocol(format!(
            "Checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
            expected, received
        )));
    }

    let end = reader.next_raw()?;
    if end != PARA_START_STOP {
        return Err(HeadTrackerError::ParaProtocol(format!(
            "Invalid stop byte: 0x{:02X}",
            end
        )));
    }

    Ok(TrainerFrame {
        frame_type,
        channels,
    })
}

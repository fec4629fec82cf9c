//! # PARA Frame Encoder
//!
//! Encodes trainer channels into PARA frames byte-exactly as OpenTX/EdgeTX
//! radios expect them.

use std::fmt;
use std::ops::Deref;

use super::checksum::XorChecksum;
use super::protocol::*;

/// One encoded trainer frame.
///
/// Backed by a fixed buffer sized for the transport bound, so encoding never
/// allocates.
#[derive(Clone, Copy)]
pub struct Frame {
    bytes: [u8; PARA_MAX_FRAME_SIZE],
    len: usize,
}

impl Frame {
    fn empty() -> Self {
        Self {
            bytes: [0u8; PARA_MAX_FRAME_SIZE],
            len: 0,
        }
    }

    /// Encoded bytes, delimiters included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Frame {}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[")?;
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        write!(f, "]")
    }
}

/// Appends bytes to a frame while maintaining the running checksum.
struct FrameWriter {
    frame: Frame,
    checksum: XorChecksum,
}

impl FrameWriter {
    fn new() -> Self {
        Self {
            frame: Frame::empty(),
            checksum: XorChecksum::new(),
        }
    }

    /// Appends a byte verbatim. Overrunning the buffer is a programming error.
    fn push_raw(&mut self, byte: u8) {
        assert!(
            self.frame.len < PARA_MAX_FRAME_SIZE,
            "PARA frame exceeds {} bytes",
            PARA_MAX_FRAME_SIZE
        );
        self.frame.bytes[self.frame.len] = byte;
        self.frame.len += 1;
    }

    /// Appends a byte, escaping delimiter values.
    fn push_escaped(&mut self, byte: u8) {
        if needs_stuffing(byte) {
            self.push_raw(PARA_BYTE_STUFF);
            self.push_raw(byte ^ PARA_STUFF_MASK);
        } else {
            self.push_raw(byte);
        }
    }

    /// Checksums the unescaped value, then appends it escaped.
    fn push_logical(&mut self, byte: u8) {
        self.checksum.update(byte);
        self.push_escaped(byte);
    }

    fn finish(self) -> Frame {
        self.frame
    }
}

/// Serializes a channel set into the PARA wire format.
///
/// # Examples
///
/// ```
/// use head_tracker::para::encoder::FrameEncoder;
///
/// let encoder = FrameEncoder::default();
/// let frame = encoder.encode(&[1500u16; 8]);
///
/// assert_eq!(frame.len(), 16);
/// assert_eq!(frame[0], 0x7E);
/// assert_eq!(frame[15], 0x7E);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEncoder {
    frame_type: u8,
    checksum_mode: ChecksumMode,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(PARA_FRAMETYPE_TRAINER, ChecksumMode::Plain)
    }
}

impl FrameEncoder {
    /// Creates an encoder for the given frame type and checksum handling.
    #[must_use]
    pub fn new(frame_type: u8, checksum_mode: ChecksumMode) -> Self {
        Self {
            frame_type,
            checksum_mode,
        }
    }

    /// Frame type byte written after the start delimiter
    #[must_use]
    pub fn frame_type(&self) -> u8 {
        self.frame_type
    }

    /// Checksum handling used by this encoder
    #[must_use]
    pub fn checksum_mode(&self) -> ChecksumMode {
        self.checksum_mode
    }

    /// Encode trainer channels into a complete frame
    ///
    /// # Arguments
    ///
    /// * `channels` - Array of 8 channel values (11-bit, values above 2047 are clamped)
    ///
    /// # Returns
    ///
    /// * `Frame` - start + type + stuffed payload + checksum + end
    pub fn encode(&self, channels: &TrainerChannels) -> Frame {
        let mut writer = FrameWriter::new();

        writer.push_raw(PARA_START_STOP);
        writer.push_logical(self.frame_type);
        for byte in encode_trainer_payload(channels) {
            writer.push_logical(byte);
        }

        let checksum = writer.checksum.value();
        match self.checksum_mode {
            ChecksumMode::Plain => writer.push_raw(checksum),
            ChecksumMode::Stuffed => writer.push_escaped(checksum),
        }

        writer.push_raw(PARA_START_STOP);
        writer.finish()
    }
}

/// Encode trainer channels with the default trainer frame type and plain checksum
pub fn encode_trainer_frame(channels: &TrainerChannels) -> Frame {
    FrameEncoder::default().encode(channels)
}

/// Encode trainer channels into the logical (unstuffed) payload
///
/// Channels are processed in pairs (0/1, 2/3, 4/5, 6/7), each pair packed
/// into 3 bytes:
///
/// ```text
/// Byte 0: A[0:7]
/// Byte 1: A[8:11] << 4 | B[4:7]
/// Byte 2: B[0:3] << 4  | B[8:11]
/// ```
pub fn encode_trainer_payload(channels: &TrainerChannels) -> [u8; PARA_PAYLOAD_SIZE] {
    let mut payload = [0u8; PARA_PAYLOAD_SIZE];

    for (pair, out) in channels.chunks_exact(2).zip(payload.chunks_exact_mut(3)) {
        let a = clamp_channel_value(pair[0]);
        let b = clamp_channel_value(pair[1]);

        out[0] = (a & 0x00FF) as u8;
        out[1] = (((a & 0x0F00) >> 4) | ((b & 0x00F0) >> 4)) as u8;
        out[2] = (((b & 0x000F) << 4) | ((b & 0x0F00) >> 8)) as u8;
    }

    payload
}

/// Clamp a channel value to the 11-bit range (0-2047)
pub fn clamp_channel_value(value: u16) -> u16 {
    value.min(PARA_CHANNEL_VALUE_MAX)
}

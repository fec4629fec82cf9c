//! # PARA Trainer Protocol Module
//!
//! Implementation of FrSky's PARA wireless trainer framing, as consumed by
//! OpenTX/EdgeTX radios in "Bluetooth trainer" master mode.
//!
//! This module handles:
//! - Channel buffer (8 channels, nominal 1500 center)
//! - Trainer frame encoding (11-bit channels, 3 bytes per channel pair)
//! - Byte stuffing of reserved delimiter bytes
//! - XOR checksum calculation
//! - Frame decoding for verification and diagnostics

pub mod protocol;
pub mod channels;
pub mod checksum;
pub mod encoder;
pub mod decoder;

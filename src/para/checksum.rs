//! # XOR Checksum
//!
//! The PARA frame checksum is a running XOR over every logical (pre-stuffing)
//! byte between the delimiters: frame type and payload. Delimiters and the
//! checksum byte itself are not included.
//!
//! **Initial Value**: 0x00

/// Running 8-bit XOR checksum, local to one encode or decode pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XorChecksum {
    value: u8,
}

impl XorChecksum {
    /// Creates an accumulator starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one logical byte into the checksum.
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.value ^= byte;
    }

    /// Current checksum value.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.value
    }
}

/// Calculate the XOR checksum over a byte slice
///
/// # Examples
///
/// ```
/// use head_tracker::para::checksum::xor_checksum;
///
/// assert_eq!(xor_checksum(&[0x80, 0x01, 0x01]), 0x80);
/// ```
pub fn xor_checksum(data: &[u8]) -> u8 {
    let mut checksum = XorChecksum::new();

    for &byte in data {
        checksum.update(byte);
    }

    checksum.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(xor_checksum(&[]), 0x00);
    }

    #[test]
    fn test_checksum_single_byte() {
        assert_eq!(xor_checksum(&[0x80]), 0x80);
        assert_eq!(xor_checksum(&[0xFF]), 0xFF);
    }

    #[test]
    fn test_checksum_repeated_pairs_cancel() {
        assert_eq!(xor_checksum(&[0xDC, 0x5D, 0xDC, 0x5D]), 0x00);
    }

    #[test]
    fn test_accumulator_matches_slice() {
        let data = [0x80, 0xDC, 0x5D, 0xC5, 0x7E, 0x7D];
        let mut checksum = XorChecksum::new();
        for &byte in &data {
            checksum.update(byte);
        }
        assert_eq!(checksum.value(), xor_checksum(&data));
    }

    #[test]
    fn test_checksum_changes_with_data() {
        let data1 = [0x80, 0x00, 0x04];
        let data2 = [0x80, 0x00, 0x05];

        assert_ne!(
            xor_checksum(&data1),
            xor_checksum(&data2),
            "Checksum should change when data changes"
        );
    }
}

//! Error types for caption transport framing.

use thiserror::Error;

/// Framing errors that can occur while reading or writing caption data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The `cc_data()` block does not start with the expected marker byte.
    #[error("Invalid cc_data marker: expected 0x03, got 0x{0:02X}")]
    InvalidMarker(u8),

    /// The buffer ends before a complete header or record.
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    /// A line-21 pair was delivered on a line that carries no captions.
    #[error("Invalid VBI line: {0} (expected 21, 22 or 284)")]
    InvalidLine(u32),

    /// A line-21 byte failed the odd parity check.
    #[error("Parity error: 0x{0:02X}")]
    Parity(u8),

    /// More triplets than the 5-bit count field can describe.
    #[error("Too many triplets: {0} (max: {1})")]
    TooManyTriplets(usize, usize),

    /// A text dump line could not be parsed.
    #[error("Malformed input: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ProtocolError::InvalidMarker(0x41).to_string(),
            "Invalid cc_data marker: expected 0x03, got 0x41"
        );
        assert_eq!(
            ProtocolError::InvalidLine(20).to_string(),
            "Invalid VBI line: 20 (expected 21, 22 or 284)"
        );
        assert_eq!(
            ProtocolError::IncompleteFrame { expected: 3, actual: 1 }.to_string(),
            "Incomplete frame: expected 3 bytes, got 1"
        );
    }
}

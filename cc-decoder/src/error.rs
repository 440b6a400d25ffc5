//! Error types for the caption decoders.

use cc_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while interpreting one DTVCC syntactic element.
///
/// None of these abort the stream: the element is dropped and decoding
/// continues, except for [`DecodeError::IncompleteElement`] which stops the
/// current service buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The element declares more bytes than the buffer holds.
    #[error("Incomplete element: need {needed} bytes, have {available}")]
    IncompleteElement { needed: usize, available: usize },

    /// A window command arrived before any window was selected.
    #[error("No current window")]
    NoCurrentWindow,

    /// The addressed window has not been defined.
    #[error("Window {0} has not been created")]
    WindowNotCreated(u8),

    /// A command parameter carries a reserved or out-of-range value.
    #[error("Invalid {command} parameter: 0x{value:02X}")]
    InvalidParameter { command: &'static str, value: u8 },

    /// Set-pen-location outside the window grid.
    #[error("Pen location out of range: row {row}, column {column}")]
    InvalidPenLocation { row: u8, column: u8 },

    /// A grid access outside the window capacity.
    #[error("Cell out of bounds: row {row}, column {column}")]
    OutOfBounds { row: usize, column: usize },
}

/// Errors raised by the XDS state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XdsError {
    /// Informational or end bytes arrived without a start code.
    #[error("No XDS packet in progress")]
    NotCapturing,

    /// The class/type pair has no handler.
    #[error("Unknown XDS type 0x{kind:02X} in class 0x{class:02X}")]
    UnknownType { class: u8, kind: u8 },

    /// A continue code does not match the packet in progress.
    #[error("Continue code for another packet: class 0x{class:02X}, type 0x{kind:02X}")]
    Interrupted { class: u8, kind: u8 },

    /// The packet checksum does not match.
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The packet ended with a field count the type does not accept.
    #[error("Incomplete {kind} packet: {count} bytes")]
    Incomplete { kind: &'static str, count: usize },
}

/// Errors returned by the public decoder API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transport framing error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Page number outside 1..=14.
    #[error("Invalid page number: {0}")]
    InvalidPage(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_conversion() {
        let err: Error = ProtocolError::InvalidLine(5).into();
        assert_eq!(err, Error::Protocol(ProtocolError::InvalidLine(5)));
        assert_eq!(err.to_string(), "Invalid VBI line: 5 (expected 21, 22 or 284)");
    }

    #[test]
    fn test_decode_error_messages() {
        assert_eq!(
            DecodeError::InvalidParameter { command: "SPA", value: 0x38 }.to_string(),
            "Invalid SPA parameter: 0x38"
        );
        assert_eq!(
            XdsError::ChecksumMismatch { expected: 0x12, actual: 0x13 }.to_string(),
            "Checksum mismatch: expected 0x12, got 0x13"
        );
    }
}

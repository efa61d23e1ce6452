//! Error types for QR Code encoding.

use thiserror::Error;

use crate::segment::Mode;

/// Errors that can occur while building segments or a QR Code symbol.
///
/// Ways to handle a capacity error ([`QrError::SegmentTooLong`] or
/// [`QrError::DataOverCapacity`]) include:
///
/// - Decrease the error correction level if it was greater than `QrCodeEcc::Low`.
/// - Increase the maxversion argument if it was less than `Version::MAX`.
/// - Split the text data into better or optimal segments to reduce the number of bits required.
/// - Change the text or binary data to be shorter.
/// - Change the text to fit the character set of a particular segment mode (e.g. alphanumeric).
/// - Propagate the error upward to the caller/user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QrError {
    /// A segment's character count does not fit its count field at any allowed version.
    #[error("Segment too long")]
    SegmentTooLong,

    /// The encoded data needs more bits than the largest allowed version holds.
    #[error("Data length = {used} bits, Max capacity = {capacity} bits")]
    DataOverCapacity { used: usize, capacity: usize },

    #[error("Version number out of range: {0}")]
    InvalidVersion(u8),

    #[error("Invalid version range: min {min}, max {max}")]
    InvalidVersionRange { min: u8, max: u8 },

    #[error("Mask value out of range: {0}")]
    InvalidMask(u8),

    #[error("ECI assignment value out of range: {0}")]
    EciOutOfRange(u32),

    #[error("Character {ch:?} cannot be encoded in {mode:?} mode")]
    InvalidCharacter { mode: Mode, ch: char },

    #[error("Value {value} does not fit in {bits} bits")]
    BitValueOutOfRange { value: u32, bits: u8 },

    #[error("Maximum bit buffer length reached")]
    BufferOverflow,

    #[error("Reed-Solomon degree out of range: {0}")]
    DegreeOutOfRange(usize),

    /// Data codeword count disagrees with the version and ECC level tables.
    #[error("Codeword length mismatch: expected {expected}, got {actual}")]
    CodewordLengthMismatch { expected: usize, actual: usize },
}

/// Result type alias for QR Code operations.
pub type Result<T> = std::result::Result<T, QrError>;

impl QrError {
    /// Check if this error means the payload does not fit, rather than a bad argument.
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            QrError::SegmentTooLong | QrError::DataOverCapacity { .. }
        )
    }
}

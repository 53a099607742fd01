//! Protocol-level error types
//!
//! Every variant here is recoverable: the correlator logs it, drops the
//! offending frame and keeps sniffing.

use thiserror::Error;

/// Result type for rtu-sniff operations
pub type Result<T> = std::result::Result<T, SniffError>;

/// Reasons a frame or a request/response pair was discarded
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SniffError {
    /// Frame corrupted or torn on the wire
    #[error("CRC mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Slave answered with an exception response
    #[error("Exception response: FC={function_code:02X}, code={exception_code:02X}")]
    ProtocolException {
        function_code: u8,
        exception_code: u8,
    },

    /// Frame classified as a request that cannot be one
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Payload does not split into registers of a known width
    #[error("Unsupported register width {width} (payload: {})", hex::encode(.payload))]
    DecodeWidthUnsupported { width: usize, payload: Vec<u8> },

    /// Request for zero registers
    #[error("Request quantity is zero")]
    QuantityZero,

    /// Frame shorter than its kind requires
    #[error("Frame too short: {len} bytes, need at least {min}")]
    FrameTooShort { len: usize, min: usize },

    /// Response does not belong to the pending request
    #[error(
        "Response mismatch: expected slave {expected_slave}/FC {expected_fc:02X}, got slave {slave}/FC {fc:02X}"
    )]
    ResponseMismatch {
        expected_slave: u8,
        expected_fc: u8,
        slave: u8,
        fc: u8,
    },

    /// Response observed while no request was pending
    #[error("Response without pending request")]
    NoPendingRequest,
}

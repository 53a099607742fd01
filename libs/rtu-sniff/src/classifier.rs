//! Request/response classification
//!
//! A sniffer cannot know which side of the bus transmitted a frame, so the
//! kind is guessed from the frame shape. The guess is a hint only; CRC
//! validation and a successful decode confirm it.
//!
//! Known failure modes of `ClassifierMode::Length`:
//! - every 8-byte response is taken for a request (FC05/FC06 echoes,
//!   FC15/FC16 acknowledgements, a read returning 3 data bytes)
//! - requests of any other length (FC15/FC16 with data) are taken for
//!   responses
//!
//! `ClassifierMode::Strict` only recovers the 3-data-byte read response.

use serde::{Deserialize, Serialize};

use crate::constants::{is_read_function, REQUEST_FRAME_LEN};
use crate::frame::{FrameKind, RawFrame};

/// Byte count that makes an FC01-FC04 response exactly 8 bytes long
const AMBIGUOUS_BYTE_COUNT: u8 = 3;

/// Classification strictness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// 8-byte frames are requests, everything else is a response
    #[default]
    Length,
    /// As `Length`, but an 8-byte read frame whose third byte is a byte
    /// count of 3 is a response
    Strict,
}

/// Label a frame as request or response
pub fn classify(frame: &RawFrame, mode: ClassifierMode) -> FrameKind {
    if frame.len() != REQUEST_FRAME_LEN {
        return FrameKind::Response;
    }

    let data = frame.as_bytes();
    match mode {
        // Third byte 3 could be a byte count, but reads in 0x0300-0x03FF are
        // kept as requests
        ClassifierMode::Length => FrameKind::Request,
        ClassifierMode::Strict => {
            if is_read_function(data[1]) && data[2] == AMBIGUOUS_BYTE_COUNT {
                FrameKind::Response
            } else {
                FrameKind::Request
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(bytes: &[u8]) -> RawFrame {
        RawFrame::from(bytes)
    }

    #[test]
    fn test_length_mode_eight_bytes_is_request() {
        let frame = raw(&[0x01, 0x03, 0x00, 0x01, 0x00, 0x02, 0x95, 0xCB]);
        assert_eq!(classify(&frame, ClassifierMode::Length), FrameKind::Request);
    }

    #[test]
    fn test_length_mode_third_byte_three_still_request() {
        let frame = raw(&[0x01, 0x03, 0x03, 0x00, 0x00, 0x02, 0x00, 0x00]);
        assert_eq!(classify(&frame, ClassifierMode::Length), FrameKind::Request);
    }

    #[test]
    fn test_other_lengths_are_responses() {
        for len in [0usize, 1, 4, 5, 7, 9, 13, 300] {
            let frame = RawFrame::from(vec![0x01; len]);
            assert_eq!(
                classify(&frame, ClassifierMode::Length),
                FrameKind::Response,
                "len={len}"
            );
            assert_eq!(
                classify(&frame, ClassifierMode::Strict),
                FrameKind::Response,
                "len={len}"
            );
        }
    }

    #[test]
    fn test_strict_mode_three_byte_read_response() {
        let frame = raw(&[0x01, 0x01, 0x03, 0xCD, 0x6B, 0x05, 0x00, 0x00]);
        assert_eq!(classify(&frame, ClassifierMode::Strict), FrameKind::Response);
        assert_eq!(classify(&frame, ClassifierMode::Length), FrameKind::Request);
    }

    #[test]
    fn test_strict_mode_keeps_write_frames_as_requests() {
        // FC06 with a value of 0x03xx in the address high byte position
        let frame = raw(&[0x01, 0x06, 0x03, 0x00, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(classify(&frame, ClassifierMode::Strict), FrameKind::Request);
    }

    #[test]
    fn test_mode_deserializes_from_snake_case() {
        let mode: ClassifierMode = serde_json::from_str("\"strict\"").unwrap_or_default();
        assert_eq!(mode, ClassifierMode::Strict);
        assert_eq!(ClassifierMode::default(), ClassifierMode::Length);
    }
}

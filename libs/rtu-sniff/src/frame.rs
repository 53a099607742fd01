//! Frame model
//!
//! A `RawFrame` is what the assembler cuts out of the byte stream. Once the
//! classifier has picked a kind it is parsed into a `RequestFrame` or a
//! `ResponseFrame`, carried together as the `Frame` sum type.

use bytes::Bytes;
use std::fmt;

use crate::constants::{CRC_LEN, EXCEPTION_BIT, MIN_RESPONSE_LEN, REQUEST_FRAME_LEN};
use crate::error::{Result, SniffError};

/// Bytes delimited by inter-frame silence, not yet classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(Bytes);

impl RawFrame {
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slave id byte, if present
    pub fn slave_id(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Function code byte, if present
    pub fn function_code(&self) -> Option<u8> {
        self.0.get(1).copied()
    }

    /// Bytes between the function code and the CRC
    pub fn data(&self) -> &[u8] {
        if self.0.len() < 2 + CRC_LEN {
            return &[];
        }
        &self.0[2..self.0.len() - CRC_LEN]
    }

    /// Trailing two bytes as transmitted
    pub fn crc_bytes(&self) -> &[u8] {
        let start = self.0.len().saturating_sub(CRC_LEN);
        &self.0[start..]
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&[u8]> for RawFrame {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// Heuristic label assigned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Request,
    Response,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Request => f.pad("Request"),
            FrameKind::Response => f.pad("Response"),
        }
    }
}

/// Read request: slave, FC, start address, quantity, CRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub slave_id: u8,
    pub function_code: u8,
    pub start_register: u16,
    pub quantity: u16,
    pub crc: u16,
}

impl RequestFrame {
    /// Parse a frame already classified as a request.
    ///
    /// Rejects frames of the wrong length, function codes in the exception
    /// range and zero quantities.
    pub fn parse(frame: &RawFrame) -> Result<Self> {
        let data = frame.as_bytes();
        if data.len() != REQUEST_FRAME_LEN {
            return Err(SniffError::MalformedRequest(format!(
                "expected {} bytes, got {}",
                REQUEST_FRAME_LEN,
                data.len()
            )));
        }

        let function_code = data[1];
        if function_code & EXCEPTION_BIT != 0 {
            return Err(SniffError::MalformedRequest(format!(
                "function code 0x{function_code:02X} is in the exception range"
            )));
        }

        let quantity = u16::from_be_bytes([data[4], data[5]]);
        if quantity == 0 {
            return Err(SniffError::QuantityZero);
        }

        Ok(Self {
            slave_id: data[0],
            function_code,
            start_register: u16::from_be_bytes([data[2], data[3]]),
            quantity,
            crc: u16::from_be_bytes([data[6], data[7]]),
        })
    }

    /// Length of a response carrying one 16-bit word per requested register
    pub fn expected_response_len(&self) -> usize {
        // slave + FC + byte count + data + CRC
        3 + 2 * usize::from(self.quantity) + CRC_LEN
    }

    /// Whether `address` lies in `[start_register, start_register + quantity)`
    pub fn covers(&self, address: u16) -> bool {
        let start = u32::from(self.start_register);
        let end = start + u32::from(self.quantity);
        (start..end).contains(&u32::from(address))
    }
}

/// Response: slave, FC, byte count, payload, CRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub slave_id: u8,
    pub function_code: u8,
    /// Declared byte count, or the exception code for exception responses
    pub byte_count: u8,
    pub payload: Bytes,
    pub crc: u16,
}

impl ResponseFrame {
    /// Parse a frame already classified as a response.
    ///
    /// The payload is everything between the byte count and the CRC; a
    /// disagreeing byte count is kept as declared and not enforced.
    pub fn parse(frame: &RawFrame) -> Result<Self> {
        let len = frame.len();
        if len < MIN_RESPONSE_LEN {
            return Err(SniffError::FrameTooShort {
                len,
                min: MIN_RESPONSE_LEN,
            });
        }

        let data = frame.as_bytes();
        Ok(Self {
            slave_id: data[0],
            function_code: data[1],
            byte_count: data[2],
            payload: frame.0.slice(3..len - CRC_LEN),
            crc: u16::from_be_bytes([data[len - 2], data[len - 1]]),
        })
    }

    pub fn is_exception(&self) -> bool {
        self.function_code & EXCEPTION_BIT != 0
    }

    /// Exception code carried by an exception response
    pub fn exception_code(&self) -> Option<u8> {
        self.is_exception().then_some(self.byte_count)
    }
}

/// A classified and parsed frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Request(RequestFrame),
    Response(ResponseFrame),
}

impl Frame {
    /// Parse `raw` as the given kind
    pub fn parse(kind: FrameKind, raw: &RawFrame) -> Result<Self> {
        match kind {
            FrameKind::Request => RequestFrame::parse(raw).map(Frame::Request),
            FrameKind::Response => ResponseFrame::parse(raw).map(Frame::Response),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::crc::append_crc;

    fn framed(body: &[u8]) -> RawFrame {
        let mut frame = body.to_vec();
        append_crc(&mut frame);
        RawFrame::from(frame)
    }

    #[test]
    fn test_parse_read_request() {
        let raw = framed(&[0x01, 0x03, 0x00, 0x01, 0x00, 0x02]);
        let req = RequestFrame::parse(&raw).unwrap();

        assert_eq!(req.slave_id, 1);
        assert_eq!(req.function_code, 0x03);
        assert_eq!(req.start_register, 1);
        assert_eq!(req.quantity, 2);
        assert_eq!(req.crc, u16::from_be_bytes([raw.as_bytes()[6], raw.as_bytes()[7]]));
        assert_eq!(req.expected_response_len(), 9);
    }

    #[test]
    fn test_request_rejects_exception_function_code() {
        let raw = framed(&[0x01, 0x83, 0x00, 0x01, 0x00, 0x02]);
        let err = RequestFrame::parse(&raw).unwrap_err();
        assert!(matches!(err, SniffError::MalformedRequest(_)));

        // 0x80 itself is already in the exception range
        let raw = framed(&[0x01, 0x80, 0x00, 0x01, 0x00, 0x02]);
        assert!(RequestFrame::parse(&raw).is_err());
    }

    #[test]
    fn test_request_rejects_zero_quantity() {
        let raw = framed(&[0x01, 0x03, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(RequestFrame::parse(&raw).unwrap_err(), SniffError::QuantityZero);
    }

    #[test]
    fn test_request_rejects_wrong_length() {
        let raw = framed(&[0x01, 0x03, 0x00, 0x01, 0x00]);
        assert!(matches!(
            RequestFrame::parse(&raw).unwrap_err(),
            SniffError::MalformedRequest(_)
        ));
    }

    #[test]
    fn test_request_covers_range() {
        let raw = framed(&[0x01, 0x03, 0x00, 0x01, 0x00, 0x02]);
        let req = RequestFrame::parse(&raw).unwrap();
        assert!(!req.covers(0));
        assert!(req.covers(1));
        assert!(req.covers(2));
        assert!(!req.covers(3));
    }

    #[test]
    fn test_request_covers_top_of_address_space() {
        let raw = framed(&[0x01, 0x03, 0xFF, 0xFF, 0x00, 0x02]);
        let req = RequestFrame::parse(&raw).unwrap();
        assert!(req.covers(0xFFFF));
        assert!(!req.covers(0));
    }

    #[test]
    fn test_parse_response() {
        let raw = framed(&[0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x14]);
        let resp = ResponseFrame::parse(&raw).unwrap();

        assert_eq!(resp.slave_id, 1);
        assert_eq!(resp.function_code, 0x03);
        assert_eq!(resp.byte_count, 4);
        assert_eq!(resp.payload.as_ref(), &[0x00, 0x0A, 0x00, 0x14]);
        assert!(!resp.is_exception());
        assert_eq!(resp.exception_code(), None);
    }

    #[test]
    fn test_parse_exception_response() {
        let raw = framed(&[0x01, 0x83, 0x02]);
        let resp = ResponseFrame::parse(&raw).unwrap();

        assert!(resp.is_exception());
        assert_eq!(resp.exception_code(), Some(0x02));
        assert!(resp.payload.is_empty());
    }

    #[test]
    fn test_response_too_short() {
        let raw = framed(&[0x01, 0x03]);
        assert_eq!(
            ResponseFrame::parse(&raw).unwrap_err(),
            SniffError::FrameTooShort { len: 4, min: 5 }
        );
    }

    #[test]
    fn test_raw_frame_accessors() {
        let raw = framed(&[0x11, 0x04, 0xAA, 0xBB]);
        assert_eq!(raw.slave_id(), Some(0x11));
        assert_eq!(raw.function_code(), Some(0x04));
        assert_eq!(raw.data(), &[0xAA, 0xBB]);
        assert_eq!(raw.crc_bytes().len(), 2);

        let tiny = RawFrame::from(vec![0x01]);
        assert_eq!(tiny.function_code(), None);
        assert!(tiny.data().is_empty());
        assert_eq!(tiny.crc_bytes(), &[0x01]);
    }

    #[test]
    fn test_raw_frame_display() {
        let raw = RawFrame::from(vec![0x01, 0x03, 0xAB]);
        assert_eq!(raw.to_string(), "01 03 AB");
        assert_eq!(RawFrame::from(vec![0x0F]).to_string(), "0F");
        assert_eq!(RawFrame::from(Vec::new()).to_string(), "");
    }

    #[test]
    fn test_frame_parse_dispatch() {
        let raw = framed(&[0x01, 0x03, 0x00, 0x01, 0x00, 0x02]);
        let frame = Frame::parse(FrameKind::Request, &raw).unwrap();
        assert!(matches!(frame, Frame::Request(ref r) if r.quantity == 2));

        let frame = Frame::parse(FrameKind::Response, &raw).unwrap();
        assert!(matches!(frame, Frame::Response(ref r) if r.byte_count == 0x00));

        assert_eq!(
            Frame::parse(FrameKind::Request, &framed(&[0x01, 0x03])).unwrap_err(),
            SniffError::MalformedRequest("expected 8 bytes, got 4".to_string())
        );
    }
}

//! Request/response correlation
//!
//! The bus is half-duplex with one outstanding transaction, so a single
//! pending-request slot is enough to pair every response with the request
//! that caused it:
//!
//! ```text
//!            request (CRC ok)                 response (any outcome)
//!   Idle ─────────────────────▶ AwaitingResponse ─────────────────────▶ Idle
//!                                  │      ▲
//!                                  └──────┘ newer request overwrites
//! ```
//!
//! Frames failing CRC never touch the state. Every other problem is
//! reported as `Outcome::Dropped` and sniffing continues.

use tracing::{debug, warn};

use crate::classifier::{classify, ClassifierMode};
use crate::constants::{exception_description, CRC_LEN, MIN_FRAME_LEN};
use crate::crc;
use crate::decoder::{self, DecodedRegister};
use crate::error::SniffError;
use crate::frame::{Frame, FrameKind, RawFrame, RequestFrame, ResponseFrame};

/// Correlation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationState {
    Idle,
    AwaitingResponse,
}

/// Result of feeding one frame to the correlator
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Request stored as the pending transaction
    Pending(RequestFrame),
    /// Response decoded and the target register was in range
    Emitted(DecodedRegister),
    /// Response decoded but the target register was not requested
    OutOfRange { start_register: u16, quantity: u16 },
    /// Frame or pair discarded
    Dropped(SniffError),
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnifferStats {
    pub frames: u64,
    pub short_frames: u64,
    pub crc_failures: u64,
    pub requests: u64,
    pub malformed_requests: u64,
    pub responses: u64,
    pub orphan_responses: u64,
    pub exceptions: u64,
    pub mismatched_responses: u64,
    pub decode_failures: u64,
    pub emitted: u64,
}

/// Single-slot request/response correlator
#[derive(Debug)]
pub struct Correlator {
    target_register: u16,
    mode: ClassifierMode,
    pending: Option<RequestFrame>,
    stats: SnifferStats,
}

impl Correlator {
    pub fn new(target_register: u16) -> Self {
        Self {
            target_register,
            mode: ClassifierMode::default(),
            pending: None,
            stats: SnifferStats::default(),
        }
    }

    pub fn with_mode(mut self, mode: ClassifierMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn state(&self) -> CorrelationState {
        if self.pending.is_some() {
            CorrelationState::AwaitingResponse
        } else {
            CorrelationState::Idle
        }
    }

    pub fn pending(&self) -> Option<&RequestFrame> {
        self.pending.as_ref()
    }

    pub fn stats(&self) -> SnifferStats {
        self.stats
    }

    /// Feed one assembled frame
    pub fn process(&mut self, raw: &RawFrame) -> Outcome {
        self.stats.frames += 1;

        // Too short to hold slave id, FC and CRC; two 0xFF bytes would
        // otherwise pass the CRC check
        if raw.len() < MIN_FRAME_LEN {
            self.stats.short_frames += 1;
            let err = SniffError::FrameTooShort {
                len: raw.len(),
                min: MIN_FRAME_LEN,
            };
            debug!("Dropping frame [{}]: {}", raw, err);
            return Outcome::Dropped(err);
        }

        if !crc::validate(raw.as_bytes()) {
            self.stats.crc_failures += 1;
            let body_len = raw.len().saturating_sub(CRC_LEN);
            let err = SniffError::ChecksumMismatch {
                expected: crc::wire_checksum(&raw.as_bytes()[..body_len]),
                actual: crc::received(raw.as_bytes()).unwrap_or(0),
            };
            debug!("Dropping frame [{}]: {}", raw, err);
            return Outcome::Dropped(err);
        }

        let kind = classify(raw, self.mode);
        match Frame::parse(kind, raw) {
            Ok(Frame::Request(request)) => self.on_request(request),
            Ok(Frame::Response(response)) => self.on_response(raw, response),
            Err(e) => self.on_unparsable(kind, raw, e),
        }
    }

    fn on_request(&mut self, request: RequestFrame) -> Outcome {
        self.stats.requests += 1;
        debug!(
            "Request: slave={}, FC={:02X}, start={}, quantity={}, expected response {} bytes",
            request.slave_id,
            request.function_code,
            request.start_register,
            request.quantity,
            request.expected_response_len()
        );

        if let Some(previous) = self.pending.replace(request.clone()) {
            debug!(
                "Unanswered request superseded: slave={}, FC={:02X}, start={}",
                previous.slave_id, previous.function_code, previous.start_register
            );
        }

        Outcome::Pending(request)
    }

    /// A CRC-valid frame that does not parse as its classified kind.
    ///
    /// A bad request leaves the state alone; a bad response still ends the
    /// pending transaction.
    fn on_unparsable(&mut self, kind: FrameKind, raw: &RawFrame, e: SniffError) -> Outcome {
        match kind {
            FrameKind::Request => {
                self.stats.malformed_requests += 1;
                warn!("Frame [{}] classified as request but dropped: {}", raw, e);
                Outcome::Dropped(e)
            },
            FrameKind::Response => {
                self.stats.responses += 1;
                if self.pending.take().is_none() {
                    self.stats.orphan_responses += 1;
                    debug!("Response [{}] without pending request", raw);
                    return Outcome::Dropped(SniffError::NoPendingRequest);
                }
                debug!("Dropping response [{}]: {}", raw, e);
                Outcome::Dropped(e)
            },
        }
    }

    fn on_response(&mut self, raw: &RawFrame, response: ResponseFrame) -> Outcome {
        self.stats.responses += 1;

        let Some(request) = self.pending.take() else {
            self.stats.orphan_responses += 1;
            debug!("Response [{}] without pending request", raw);
            return Outcome::Dropped(SniffError::NoPendingRequest);
        };

        if let Some(exception_code) = response.exception_code() {
            self.stats.exceptions += 1;
            warn!(
                "Exception response from slave {}: FC={:02X}, code={:02X} ({})",
                response.slave_id,
                response.function_code,
                exception_code,
                exception_description(exception_code)
            );
            return Outcome::Dropped(SniffError::ProtocolException {
                function_code: response.function_code,
                exception_code,
            });
        }

        if response.slave_id != request.slave_id || response.function_code != request.function_code
        {
            self.stats.mismatched_responses += 1;
            let err = SniffError::ResponseMismatch {
                expected_slave: request.slave_id,
                expected_fc: request.function_code,
                slave: response.slave_id,
                fc: response.function_code,
            };
            debug!("Dropping response [{}]: {}", raw, err);
            return Outcome::Dropped(err);
        }

        if usize::from(response.byte_count) != response.payload.len() {
            debug!(
                "Byte count mismatch: declared {}, payload {} bytes - decoding payload",
                response.byte_count,
                response.payload.len()
            );
        }

        let registers = match decoder::decode(&response, &request) {
            Ok(registers) => registers,
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!(
                    "Decode failed for slave {} (start={}, quantity={}): {}",
                    request.slave_id, request.start_register, request.quantity, e
                );
                return Outcome::Dropped(e);
            },
        };

        if !request.covers(self.target_register) {
            debug!(
                "Target register {} outside [{}, {})",
                self.target_register,
                request.start_register,
                u32::from(request.start_register) + u32::from(request.quantity)
            );
            return Outcome::OutOfRange {
                start_register: request.start_register,
                quantity: request.quantity,
            };
        }

        let offset = usize::from(self.target_register - request.start_register);
        match registers.get(offset) {
            Some(register) => {
                self.stats.emitted += 1;
                Outcome::Emitted(*register)
            },
            None => Outcome::OutOfRange {
                start_register: request.start_register,
                quantity: request.quantity,
            },
        }
    }
}

//! Passive Modbus RTU sniffing
//!
//! Listens to a half-duplex RS-485 bus without transmitting, cuts the byte
//! stream into frames, pairs each read request with its response and decodes
//! the register values carried in the response.
//!
//! # Pipeline
//!
//! ```text
//! bytes ─▶ assembler ─▶ RawFrame ─▶ correlator ─▶ DecodedRegister
//!                                   (crc, classifier, frame, decoder)
//! ```
//!
//! # Architecture
//!
//! - `assembler` - silence-gap framing over any `AsyncRead`
//! - `crc` - CRC-16/MODBUS
//! - `classifier` - request/response heuristic
//! - `frame` - request and response frame parsing
//! - `decoder` - int16/float32/float64 register decoding
//! - `correlator` - single-slot request/response state machine

pub mod assembler;
pub mod classifier;
pub mod constants;
pub mod correlator;
pub mod crc;
pub mod decoder;
pub mod error;
pub mod frame;

pub use assembler::{silence_threshold, FrameAssembler, FrameReader};
pub use classifier::{classify, ClassifierMode};
pub use correlator::{CorrelationState, Correlator, Outcome, SnifferStats};
pub use decoder::{DecodedRegister, RegisterValue, RegisterWidth};
pub use error::{Result, SniffError};
pub use frame::{Frame, FrameKind, RawFrame, RequestFrame, ResponseFrame};

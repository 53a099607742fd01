//! Register payload decoding
//!
//! The wire does not say what a register holds. The width of one value is
//! inferred as `payload length / requested quantity`:
//! - 2 bytes: `int16`
//! - 4 bytes: `float32`
//! - 8 bytes: `float64`
//!
//! All values are big-endian.

use std::fmt;
use tracing::trace;

use crate::error::{Result, SniffError};
use crate::frame::{RequestFrame, ResponseFrame};

/// Supported register widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterWidth {
    Int16,
    Float32,
    Float64,
}

impl RegisterWidth {
    pub fn from_bytes(width: usize) -> Option<Self> {
        match width {
            2 => Some(RegisterWidth::Int16),
            4 => Some(RegisterWidth::Float32),
            8 => Some(RegisterWidth::Float64),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            RegisterWidth::Int16 => 2,
            RegisterWidth::Float32 => 4,
            RegisterWidth::Float64 => 8,
        }
    }

    fn decode(self, chunk: &[u8]) -> RegisterValue {
        match self {
            RegisterWidth::Int16 => RegisterValue::Int16(i16::from_be_bytes([chunk[0], chunk[1]])),
            RegisterWidth::Float32 => {
                RegisterValue::Float32(f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            },
            RegisterWidth::Float64 => RegisterValue::Float64(f64::from_be_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
            ])),
        }
    }
}

/// One decoded register value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    Int16(i16),
    Float32(f32),
    Float64(f64),
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::Int16(v) => write!(f, "{v}"),
            RegisterValue::Float32(v) => write!(f, "{v}"),
            RegisterValue::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// A value keyed by its register address
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedRegister {
    /// `start_register + index`; may exceed 0xFFFF at the top of the address space
    pub address: u32,
    pub value: RegisterValue,
}

impl fmt::Display for DecodedRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// Decode a response payload against the request that asked for it
pub fn decode(response: &ResponseFrame, request: &RequestFrame) -> Result<Vec<DecodedRegister>> {
    decode_payload(&response.payload, request.start_register, request.quantity)
}

/// Decode `payload` as `quantity` equally sized registers starting at `start`
pub fn decode_payload(payload: &[u8], start: u16, quantity: u16) -> Result<Vec<DecodedRegister>> {
    if quantity == 0 {
        return Err(SniffError::QuantityZero);
    }

    let quantity = usize::from(quantity);
    let width = payload.len() / quantity;
    let register_width = match RegisterWidth::from_bytes(width) {
        Some(w) if payload.len() % quantity == 0 => w,
        _ => {
            return Err(SniffError::DecodeWidthUnsupported {
                width,
                payload: payload.to_vec(),
            })
        },
    };

    let registers: Vec<DecodedRegister> = payload
        .chunks_exact(register_width.bytes())
        .enumerate()
        .map(|(index, chunk)| DecodedRegister {
            address: u32::from(start) + index as u32,
            value: register_width.decode(chunk),
        })
        .collect();

    trace!(
        "Decoded {} registers as {:?} starting at {}",
        registers.len(),
        register_width,
        start
    );

    Ok(registers)
}

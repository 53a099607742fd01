//! Modbus RTU constants used by the sniffer
//!
//! Sizes follow the Modbus over Serial Line specification:
//! - RTU ADU: slave id (1) + PDU (max 253) + CRC (2) = 256 bytes
//! - Read request ADU: slave id + FC + address (2) + quantity (2) + CRC = 8 bytes

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Maximum RTU ADU size (slave id + 253 byte PDU + CRC)
pub const MAX_RTU_FRAME_SIZE: usize = 256;

/// Smallest frame that can carry anything: slave id + FC + CRC
pub const MIN_FRAME_LEN: usize = 4;

/// Length of a read request (FC01-FC04) on the wire
pub const REQUEST_FRAME_LEN: usize = 8;

/// Smallest normal response: slave id + FC + byte count + CRC
pub const MIN_RESPONSE_LEN: usize = 5;

/// Trailing CRC length
pub const CRC_LEN: usize = 2;

/// Function code bit marking an exception response
pub const EXCEPTION_BIT: u8 = 0x80;

// ============================================================================
// Timing Constants
// ============================================================================

/// Bits per character on the wire: start + 8 data + parity + stop
pub const BITS_PER_CHAR: u64 = 11;

/// Fixed inter-frame silence recommended for baud rates above 19200 (µs)
pub const HIGH_SPEED_FRAME_GAP_US: u64 = 1750;

/// Baud rate above which the fixed silence threshold applies
pub const HIGH_SPEED_BAUD_THRESHOLD: u32 = 19200;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Coils (FC01)
pub const FC_READ_COILS: u8 = 0x01;

/// Read Discrete Inputs (FC02)
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Whether `fc` is one of the read function codes (FC01-FC04)
pub fn is_read_function(fc: u8) -> bool {
    (FC_READ_COILS..=FC_READ_INPUT_REGISTERS).contains(&fc)
}

/// Get exception description
pub fn exception_description(exception_code: u8) -> &'static str {
    match exception_code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x07 => "Negative Acknowledge",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}

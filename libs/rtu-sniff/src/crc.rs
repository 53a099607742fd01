//! CRC-16/MODBUS
//!
//! Table-driven variant of the reflected 0xA001 polynomial, seeded with
//! 0xFFFF. The checksum travels low byte first, so a frame is valid when the
//! byte-swapped checksum read big-endian equals its last two bytes.

use crate::constants::CRC_LEN;

const POLY: u16 = 0xA001;
const SEED: u16 = 0xFFFF;

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u16; 256] = build_table();

/// Calculate the CRC register value over `data`
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc = SEED;
    for &byte in data {
        let idx = usize::from((crc ^ u16::from(byte)) & 0xFF);
        crc = (crc >> 8) ^ CRC_TABLE[idx];
    }
    crc
}

/// Checksum byte-swapped into transmission order (big-endian bytes == wire bytes)
pub fn wire_checksum(data: &[u8]) -> u16 {
    checksum(data).swap_bytes()
}

/// Check the trailing CRC of a complete RTU frame
pub fn validate(frame: &[u8]) -> bool {
    if frame.len() < CRC_LEN {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - CRC_LEN);
    wire_checksum(body).to_be_bytes() == tail
}

/// Trailing CRC as transmitted, if the frame is long enough to carry one
pub fn received(frame: &[u8]) -> Option<u16> {
    if frame.len() < CRC_LEN {
        return None;
    }
    let tail = &frame[frame.len() - CRC_LEN..];
    Some(u16::from_be_bytes([tail[0], tail[1]]))
}

/// Append the CRC in transmission order
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = checksum(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    const MODBUS: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_MODBUS);

    #[test]
    fn test_crc16_known_request() {
        let data = [0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(checksum(&data), 0x0A84);
        assert_eq!(wire_checksum(&data), 0x840A);
    }

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(checksum(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_crc16_empty_data() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_table_matches_reference_implementation() {
        let samples: [&[u8]; 5] = [
            &[0x01, 0x03, 0x00, 0x01, 0x00, 0x02],
            &[0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x14],
            &[0x11, 0x83, 0x02],
            &[0xFF; 64],
            &[0x00],
        ];
        for data in samples {
            assert_eq!(checksum(data), MODBUS.checksum(data), "data={data:02X?}");
        }

        let all_bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(checksum(&all_bytes), MODBUS.checksum(&all_bytes));
    }

    #[test]
    fn test_validate_appended_frame() {
        let mut frame = vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
        append_crc(&mut frame);
        assert_eq!(&frame[6..], &[0x84, 0x0A]);
        assert!(validate(&frame));
        assert_eq!(received(&frame), Some(0x840A));
    }

    #[test]
    fn test_single_byte_corruption_invalidates() {
        let mut frame = vec![0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x14];
        append_crc(&mut frame);
        assert!(validate(&frame));

        for pos in 0..frame.len() {
            for flip in [0x01u8, 0x10, 0x80, 0xFF] {
                let mut corrupted = frame.clone();
                corrupted[pos] ^= flip;
                assert!(!validate(&corrupted), "pos={pos} flip={flip:02X}");
            }
        }
    }

    #[test]
    fn test_validate_too_short() {
        assert!(!validate(&[]));
        assert!(!validate(&[0xFF]));
        assert_eq!(received(&[0x01]), None);
    }

    #[test]
    fn test_validate_two_byte_frame() {
        // Empty body: the CRC of nothing is the seed, sent as FF FF
        assert!(validate(&[0xFF, 0xFF]));
        assert!(!validate(&[0xFF, 0xFE]));
    }
}

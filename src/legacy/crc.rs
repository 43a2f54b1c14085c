//! # CRC-16/CCITT Implementation
//!
//! CRC-16/CCITT checksum for the legacy protocol.
//!
//! **Polynomial**: 0x1021 (x^16 + x^12 + x^5 + 1)
//! **Initial Value**: 0xFFFF
//! **Final XOR**: none

use super::protocol::{ByteOrder, ProtocolDescriptor};

/// CRC-16/CCITT polynomial
const CRC16_POLY: u16 = 0x1021;

/// CRC register seed
const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Streaming CRC-16/CCITT state
///
/// Lets the codec fold the descriptor's link-address prefix ahead of the
/// payload without building a joined buffer.
#[derive(Debug, Clone, Copy)]
pub struct Crc16 {
    value: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    pub fn new() -> Self {
        Self { value: CRC16_INIT }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let index = ((self.value >> 8) as u8 ^ byte) as usize;
            self.value = (self.value << 8) ^ CRC16_TABLE[index];
        }
    }

    pub fn finish(self) -> u16 {
        self.value
    }
}

/// Calculate CRC-16/CCITT checksum using lookup table (fast)
///
/// # Examples
///
/// ```
/// use rf_legacy::legacy::crc::checksum;
///
/// assert_eq!(checksum(b"123456789"), 0x29B1);
/// ```
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.finish()
}

/// Check `data` against an expected checksum
pub fn verify(data: &[u8], expected: u16) -> bool {
    checksum(data) == expected
}

/// Checksum of a scrambled payload as sealed on the wire
///
/// The descriptor's CRC prefix is folded in ahead of the payload.
pub fn payload_checksum(desc: &ProtocolDescriptor, payload: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(desc.crc_prefix);
    crc.update(payload);
    crc.finish()
}

/// Serialize a checksum in the descriptor's byte order
pub fn seal(desc: &ProtocolDescriptor, crc: u16) -> [u8; 2] {
    match desc.crc_byte_order {
        ByteOrder::BigEndian => crc.to_be_bytes(),
        ByteOrder::LittleEndian => crc.to_le_bytes(),
    }
}

/// Read a checksum trailer in the descriptor's byte order
pub fn read_trailer(desc: &ProtocolDescriptor, trailer: [u8; 2]) -> u16 {
    match desc.crc_byte_order {
        ByteOrder::BigEndian => u16::from_be_bytes(trailer),
        ByteOrder::LittleEndian => u16::from_le_bytes(trailer),
    }
}

/// Calculate CRC-16/CCITT checksum using direct algorithm (slow, for verification)
#[allow(dead_code)]
fn checksum_slow(data: &[u8]) -> u16 {
    let mut crc: u16 = CRC16_INIT;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

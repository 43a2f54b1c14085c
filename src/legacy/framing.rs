//! # Air Framing
//!
//! What the radio actually puts on the channel around a codec frame:
//! preamble, sync word, then the Manchester-coded payload and CRC.
//!
//! Manchester follows the IEEE convention, MSB first:
//!
//! ```text
//! bit 1 -> 01
//! bit 0 -> 10
//! ```
//!
//! The legacy sync word `99 A5 A9 55 66 65 96` is itself the Manchester form
//! of `5 31 FA B6`; the leading `F` nibble is the `0x55` preamble.

use bytes::{BufMut, Bytes, BytesMut};

use super::protocol::{LineCoding, ProtocolDescriptor};
use crate::error::{RfLegacyError, Result};

/// Manchester symbols of every nibble
const MANCHESTER_NIBBLE: [u8; 16] = generate_nibble_table();

const fn generate_nibble_table() -> [u8; 16] {
    let mut table = [0u8; 16];
    let mut nibble = 0;

    while nibble < 16 {
        let mut symbol = 0u8;
        let mut bit = 0;
        while bit < 4 {
            let set = (nibble >> (3 - bit)) & 1 == 1;
            let pair = if set { 0b01 } else { 0b10 };
            symbol |= pair << (6 - 2 * bit);
            bit += 1;
        }
        table[nibble] = symbol;
        nibble += 1;
    }

    table
}

/// Manchester-encode bytes (output is twice as long)
pub fn manchester_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        out.push(MANCHESTER_NIBBLE[(byte >> 4) as usize]);
        out.push(MANCHESTER_NIBBLE[(byte & 0x0F) as usize]);
    }
    out
}

fn decode_symbol(symbol: u8) -> Result<u8> {
    let mut nibble = 0u8;
    for pair in 0..4 {
        nibble <<= 1;
        match (symbol >> (6 - 2 * pair)) & 0b11 {
            0b01 => nibble |= 1,
            0b10 => {}
            _ => {
                return Err(RfLegacyError::Framing(format!(
                    "Invalid Manchester symbol 0x{:02X}",
                    symbol
                )))
            }
        }
    }
    Ok(nibble)
}

/// Reverse [`manchester_encode`]
///
/// # Errors
///
/// Returns a `Framing` error on an odd input length or an invalid symbol pair
pub fn manchester_decode(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % 2 != 0 {
        return Err(RfLegacyError::Framing(format!(
            "Manchester data has odd length {}",
            data.len()
        )));
    }

    data.chunks_exact(2)
        .map(|pair| Ok((decode_symbol(pair[0])? << 4) | decode_symbol(pair[1])?))
        .collect()
}

/// On-air frame assembly for one descriptor
pub struct AirFrame;

impl AirFrame {
    /// On-air length of a codec frame
    pub fn air_size(desc: &ProtocolDescriptor) -> usize {
        let body = match desc.line_coding {
            LineCoding::Manchester => desc.frame_size() * 2,
            LineCoding::None => desc.frame_size(),
        };
        desc.preamble_size + desc.sync_word.len() + body
    }

    /// Wrap a codec frame with preamble and sync word, line coding the body
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if `frame` is not the descriptor's frame size
    pub fn assemble(desc: &ProtocolDescriptor, frame: &[u8]) -> Result<Bytes> {
        if frame.len() != desc.frame_size() {
            return Err(RfLegacyError::LengthMismatch {
                expected: desc.frame_size(),
                actual: frame.len(),
            });
        }

        let mut air = BytesMut::with_capacity(Self::air_size(desc));
        for _ in 0..desc.preamble_size {
            air.put_u8(desc.preamble_type.byte());
        }
        air.extend_from_slice(desc.sync_word);

        match desc.line_coding {
            LineCoding::Manchester => air.extend_from_slice(&manchester_encode(frame)),
            LineCoding::None => air.extend_from_slice(frame),
        }

        Ok(air.freeze())
    }

    /// Strip preamble and sync word and undo the line coding
    ///
    /// # Errors
    ///
    /// Returns `Framing` on a wrong preamble/sync or an invalid symbol, and
    /// `LengthMismatch` if the body does not hold exactly one frame
    pub fn strip(desc: &ProtocolDescriptor, air: &[u8]) -> Result<Vec<u8>> {
        let header = desc.preamble_size + desc.sync_word.len();
        if air.len() < header {
            return Err(RfLegacyError::Framing(format!(
                "Air frame too short: {} bytes",
                air.len()
            )));
        }

        let (preamble, rest) = air.split_at(desc.preamble_size);
        if preamble.iter().any(|&b| b != desc.preamble_type.byte()) {
            return Err(RfLegacyError::Framing("Invalid preamble".to_string()));
        }

        let (sync, body) = rest.split_at(desc.sync_word.len());
        if sync != desc.sync_word {
            return Err(RfLegacyError::Framing(format!(
                "Sync word mismatch: {:02X?}",
                sync
            )));
        }

        let frame = match desc.line_coding {
            LineCoding::Manchester => manchester_decode(body)?,
            LineCoding::None => body.to_vec(),
        };

        if frame.len() != desc.frame_size() {
            return Err(RfLegacyError::LengthMismatch {
                expected: desc.frame_size(),
                actual: frame.len(),
            });
        }

        Ok(frame)
    }
}

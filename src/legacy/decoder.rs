//! # Legacy Packet Decoder
//!
//! Receive pipeline: length check, CRC, descramble, unpack.

use tracing::trace;

use super::cipher::{adjacent_slot_epoch, descramble, header_address, KeySelector, ScramblingKeySet};
use super::crc::{payload_checksum, read_trailer};
use super::layout::Layout;
use super::protocol::{PackedPacket, ProtocolDescriptor};
use super::record::{AircraftStateRecord, Reference};
use crate::error::{RfLegacyError, Result};

/// Decode a complete legacy frame
///
/// # Arguments
///
/// * `desc` - Protocol descriptor (frame size, CRC prefix and byte order)
/// * `keys` - Scrambling key material
/// * `frame` - Raw frame: scrambled payload followed by the CRC trailer
/// * `reference` - Receiver's own position and clock
///
/// # Returns
///
/// * `Result<AircraftStateRecord>` - Freshly decoded record
///
/// # Errors
///
/// Returns error if:
/// - Frame length differs from the descriptor's frame size (`LengthMismatch`)
/// - CRC check fails (`BadChecksum`)
/// - The plaintext integrity bit disagrees (`BadParity`, version 6)
/// - A fixed field or the version 7 time does not hold (`BadPayload`)
///
/// The CRC covers the scrambled bytes, so it is checked before descrambling.
///
/// Near a key slot edge the sender's clock may already be, or still be, in
/// the neighbouring slot. When the first plaintext is implausible there, the
/// neighbouring slot's key is tried once and the first error is kept if that
/// fails too.
pub fn decode_frame<L: Layout>(
    desc: &ProtocolDescriptor,
    keys: &ScramblingKeySet,
    frame: &[u8],
    reference: &Reference,
) -> Result<AircraftStateRecord> {
    let expected = desc.frame_size();
    if frame.len() != expected {
        return Err(RfLegacyError::LengthMismatch {
            expected,
            actual: frame.len(),
        });
    }

    let (payload, trailer) = frame.split_at(desc.payload_size);
    let received = read_trailer(desc, [trailer[0], trailer[1]]);
    let computed = payload_checksum(desc, payload);

    if computed != received {
        return Err(RfLegacyError::BadChecksum { computed, received });
    }

    let scrambled: PackedPacket = payload
        .try_into()
        .map_err(|_| RfLegacyError::LengthMismatch {
            expected,
            actual: frame.len(),
        })?;
    let address = header_address(&scrambled);

    let attempt = |epoch: u32| {
        let mut packet = scrambled;
        descramble(&mut packet, keys, &KeySelector::new(L::BANK, address, epoch));
        L::unpack(&packet, reference)
    };

    match attempt(reference.epoch) {
        Err(e @ (RfLegacyError::BadParity | RfLegacyError::BadPayload { .. })) => {
            let Some(epoch) = adjacent_slot_epoch(reference.epoch) else {
                return Err(e);
            };
            let record = attempt(epoch).map_err(|_| e)?;
            trace!("Decoded {:06X} with the neighbouring key slot", address);
            Ok(record)
        }
        result => result,
    }
}

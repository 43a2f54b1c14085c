//! # Legacy Packet Encoder
//!
//! Transmit pipeline: scale and pack the own-ship record, scramble, seal.

use super::cipher::{scramble, KeySelector, ScramblingKeySet};
use super::crc::{payload_checksum, seal};
use super::layout::{Layout, Packed};
use super::protocol::{LegacyFrame, ProtocolDescriptor, LEGACY_FRAME_SIZE, LEGACY_PAYLOAD_SIZE};
use super::record::AircraftStateRecord;

/// Encoded frame plus the number of saturated fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    pub frame: LegacyFrame,
    pub clamped: u32,
}

/// Encode a record into a complete legacy frame
///
/// # Arguments
///
/// * `desc` - Protocol descriptor (CRC prefix and byte order)
/// * `keys` - Scrambling key material
/// * `record` - Own-ship state; `timestamp` selects the key time slot
///
/// # Returns
///
/// * `Encoded` - 26-byte frame (24-byte scrambled payload + CRC) and the clamp count
///
/// Encoding never fails: out-of-range values are saturated and counted.
///
/// # Examples
///
/// ```
/// use rf_legacy::legacy::cipher::LEGACY_KEYS;
/// use rf_legacy::legacy::encoder::encode_frame;
/// use rf_legacy::legacy::layout::V7;
/// use rf_legacy::legacy::protocol::LEGACY_PROTO_DESC;
/// use rf_legacy::legacy::record::{AddressType, AircraftStateRecord};
///
/// let record = AircraftStateRecord::new(0xDD1234, AddressType::Flarm);
/// let encoded = encode_frame::<V7>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &record);
/// assert_eq!(encoded.frame.len(), 26);
/// assert_eq!(encoded.clamped, 0);
/// ```
pub fn encode_frame<L: Layout>(
    desc: &ProtocolDescriptor,
    keys: &ScramblingKeySet,
    record: &AircraftStateRecord,
) -> Encoded {
    let Packed { mut packet, clamped } = L::pack(record);

    let selector = KeySelector::new(L::BANK, record.address, record.timestamp);
    scramble(&mut packet, keys, &selector);

    let crc = payload_checksum(desc, &packet);

    let mut frame = [0u8; LEGACY_FRAME_SIZE];
    frame[..LEGACY_PAYLOAD_SIZE].copy_from_slice(&packet);
    frame[LEGACY_PAYLOAD_SIZE..].copy_from_slice(&seal(desc, crc));

    Encoded { frame, clamped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::cipher::LEGACY_KEYS;
    use crate::legacy::crc::{read_trailer, verify};
    use crate::legacy::layout::{V6, V7};
    use crate::legacy::protocol::LEGACY_PROTO_DESC;
    use crate::legacy::record::AddressType;

    fn sample_record() -> AircraftStateRecord {
        let mut record = AircraftStateRecord::new(0x00DD_1234, AddressType::Flarm);
        record.latitude = 47.5;
        record.longitude = 8.25;
        record.altitude = 1500.0;
        record.ground_speed = 30.0;
        record.course = 45.0;
        record.timestamp = 1_700_000_000;
        record
    }

    #[test]
    fn test_encode_frame_length() {
        let encoded = encode_frame::<V6>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &sample_record());
        assert_eq!(encoded.frame.len(), LEGACY_PROTO_DESC.frame_size());
    }

    #[test]
    fn test_encode_frame_header_in_clear() {
        let encoded = encode_frame::<V7>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &sample_record());
        assert_eq!(&encoded.frame[..3], &[0x34, 0x12, 0xDD]);
    }

    #[test]
    fn test_encode_frame_crc_covers_scrambled_payload() {
        let encoded = encode_frame::<V6>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &sample_record());
        let crc = read_trailer(&LEGACY_PROTO_DESC, [encoded.frame[24], encoded.frame[25]]);

        let mut covered = LEGACY_PROTO_DESC.crc_prefix.to_vec();
        covered.extend_from_slice(&encoded.frame[..24]);
        assert!(verify(&covered, crc));
    }

    #[test]
    fn test_versions_produce_different_frames() {
        let v6 = encode_frame::<V6>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &sample_record());
        let v7 = encode_frame::<V7>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &sample_record());
        assert_ne!(v6.frame, v7.frame);
    }

    #[test]
    fn test_encode_frame_different_time_slot_different_payload() {
        let first = sample_record();
        let mut later = first;
        later.timestamp += 64;

        let a = encode_frame::<V6>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &first);
        let b = encode_frame::<V6>(&LEGACY_PROTO_DESC, &LEGACY_KEYS, &later);
        assert_ne!(a.frame[4..24], b.frame[4..24]);
    }
}

//! # Legacy Codec Handles
//!
//! Ties descriptor, key material and one layout version together, and keeps
//! the drop/clamp counters. Handles are `Send + Sync`: the receive path and
//! the transmit path may share one without locking.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, warn};

use super::cipher::{ScramblingKeySet, LEGACY_KEYS};
use super::decoder::decode_frame;
use super::encoder::encode_frame;
use super::layout::{Layout, V6, V7};
use super::protocol::{LegacyFrame, ProtocolDescriptor, LEGACY_PROTO_DESC};
use super::record::{AircraftStateRecord, Reference};
use crate::error::{RfLegacyError, Result};

/// Lock-free codec counters
#[derive(Debug, Default)]
pub struct CodecStats {
    decoded: AtomicU64,
    length_mismatch: AtomicU64,
    bad_checksum: AtomicU64,
    bad_parity: AtomicU64,
    bad_payload: AtomicU64,
    encoded: AtomicU64,
    clamped: AtomicU64,
}

/// Point-in-time copy of [`CodecStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub decoded: u64,
    pub length_mismatch: u64,
    pub bad_checksum: u64,
    pub bad_parity: u64,
    pub bad_payload: u64,
    pub encoded: u64,
    pub clamped: u64,
}

impl StatsSnapshot {
    /// Packets dropped for any reason
    pub fn dropped(&self) -> u64 {
        self.length_mismatch + self.bad_checksum + self.bad_parity + self.bad_payload
    }
}

impl CodecStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_decode(&self, result: &Result<AircraftStateRecord>) {
        let counter = match result {
            Ok(_) => &self.decoded,
            Err(RfLegacyError::LengthMismatch { .. }) => &self.length_mismatch,
            Err(RfLegacyError::BadChecksum { .. }) => &self.bad_checksum,
            Err(RfLegacyError::BadParity) => &self.bad_parity,
            Err(RfLegacyError::BadPayload { .. }) => &self.bad_payload,
            Err(_) => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_encode(&self, clamped: u32) {
        self.encoded.fetch_add(1, Ordering::Relaxed);
        if clamped > 0 {
            self.clamped.fetch_add(clamped as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            decoded: self.decoded.load(Ordering::Relaxed),
            length_mismatch: self.length_mismatch.load(Ordering::Relaxed),
            bad_checksum: self.bad_checksum.load(Ordering::Relaxed),
            bad_parity: self.bad_parity.load(Ordering::Relaxed),
            bad_payload: self.bad_payload.load(Ordering::Relaxed),
            encoded: self.encoded.load(Ordering::Relaxed),
            clamped: self.clamped.load(Ordering::Relaxed),
        }
    }
}

/// Codec for one layout version, statically dispatched
#[derive(Debug)]
pub struct LegacyCodec<L: Layout> {
    descriptor: &'static ProtocolDescriptor,
    keys: &'static ScramblingKeySet,
    stats: CodecStats,
    _layout: PhantomData<L>,
}

impl<L: Layout> Default for LegacyCodec<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Layout> LegacyCodec<L> {
    /// Codec with the published legacy descriptor and keys
    pub fn new() -> Self {
        Self::with_keys(&LEGACY_KEYS)
    }

    /// Codec with custom key material
    pub fn with_keys(keys: &'static ScramblingKeySet) -> Self {
        Self {
            descriptor: &LEGACY_PROTO_DESC,
            keys,
            stats: CodecStats::new(),
            _layout: PhantomData,
        }
    }

    pub fn version(&self) -> u8 {
        L::VERSION
    }

    pub fn descriptor(&self) -> &'static ProtocolDescriptor {
        self.descriptor
    }

    pub fn stats(&self) -> &CodecStats {
        &self.stats
    }

    /// Encode the own-ship record; out-of-range fields are saturated, never rejected
    pub fn encode(&self, record: &AircraftStateRecord) -> LegacyFrame {
        let encoded = encode_frame::<L>(self.descriptor, self.keys, record);
        if encoded.clamped > 0 {
            warn!(
                version = L::VERSION,
                clamped = encoded.clamped,
                "Own-ship record had out-of-range fields"
            );
        }
        self.stats.record_encode(encoded.clamped);
        encoded.frame
    }

    /// Decode a received frame against the receiver's own fix
    ///
    /// # Errors
    ///
    /// `LengthMismatch`, `BadChecksum`, `BadParity` or `BadPayload`; the
    /// packet is dropped and counted.
    pub fn decode(&self, frame: &[u8], reference: &Reference) -> Result<AircraftStateRecord> {
        let result = decode_frame::<L>(self.descriptor, self.keys, frame, reference);
        if let Err(ref e) = result {
            debug!(version = L::VERSION, "Dropped packet: {}", e);
        }
        self.stats.record_decode(&result);
        result
    }
}

/// Codec selected by configuration at start-up
#[derive(Debug)]
pub enum VersionedCodec {
    V6(LegacyCodec<V6>),
    V7(LegacyCodec<V7>),
}

impl VersionedCodec {
    /// Codec for a configured layout version
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVersion` for anything but 6 or 7
    ///
    /// # Examples
    ///
    /// ```
    /// use rf_legacy::legacy::codec::VersionedCodec;
    ///
    /// let codec = VersionedCodec::for_version(7).unwrap();
    /// assert_eq!(codec.version(), 7);
    /// assert!(VersionedCodec::for_version(5).is_err());
    /// ```
    pub fn for_version(version: u8) -> Result<Self> {
        match version {
            v if v == V6::VERSION => Ok(VersionedCodec::V6(LegacyCodec::new())),
            v if v == V7::VERSION => Ok(VersionedCodec::V7(LegacyCodec::new())),
            other => Err(RfLegacyError::UnsupportedVersion(other)),
        }
    }

    pub fn version(&self) -> u8 {
        match self {
            VersionedCodec::V6(codec) => codec.version(),
            VersionedCodec::V7(codec) => codec.version(),
        }
    }

    pub fn descriptor(&self) -> &'static ProtocolDescriptor {
        match self {
            VersionedCodec::V6(codec) => codec.descriptor(),
            VersionedCodec::V7(codec) => codec.descriptor(),
        }
    }

    pub fn encode(&self, record: &AircraftStateRecord) -> LegacyFrame {
        match self {
            VersionedCodec::V6(codec) => codec.encode(record),
            VersionedCodec::V7(codec) => codec.encode(record),
        }
    }

    pub fn decode(&self, frame: &[u8], reference: &Reference) -> Result<AircraftStateRecord> {
        match self {
            VersionedCodec::V6(codec) => codec.decode(frame, reference),
            VersionedCodec::V7(codec) => codec.decode(frame, reference),
        }
    }

    pub fn stats(&self) -> &CodecStats {
        match self {
            VersionedCodec::V6(codec) => codec.stats(),
            VersionedCodec::V7(codec) => codec.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::record::{AddressType, AircraftCategory, MotionState};
    use std::sync::Arc;
    use std::thread;

    const EPOCH: u32 = 1_700_000_000;

    fn own_ship() -> AircraftStateRecord {
        let mut record = AircraftStateRecord::new(0x00AB_CDEF, AddressType::Icao);
        record.category = AircraftCategory::Towplane;
        record.latitude = -33.9;
        record.longitude = 151.2;
        record.altitude = 600.0;
        record.ground_speed = 40.0;
        record.course = 270.0;
        record.motion = MotionState::Moving;
        record.timestamp = EPOCH;
        record
    }

    #[test]
    fn test_for_version() {
        assert_eq!(VersionedCodec::for_version(6).unwrap().version(), 6);
        assert_eq!(VersionedCodec::for_version(7).unwrap().version(), 7);
        assert!(matches!(
            VersionedCodec::for_version(8),
            Err(RfLegacyError::UnsupportedVersion(8))
        ));
    }

    #[test]
    fn test_stats_count_drops_and_decodes() {
        let codec = VersionedCodec::for_version(7).unwrap();
        let reference = Reference::new(-33.8, 151.0, EPOCH);
        let frame = codec.encode(&own_ship());

        assert!(codec.decode(&frame, &reference).is_ok());
        assert!(codec.decode(&frame[..10], &reference).is_err());

        let mut corrupted = frame;
        corrupted[0] ^= 0x01;
        assert!(codec.decode(&corrupted, &reference).is_err());

        let stats = codec.stats().snapshot();
        assert_eq!(stats.encoded, 1);
        assert_eq!(stats.decoded, 1);
        assert_eq!(stats.length_mismatch, 1);
        assert_eq!(stats.bad_checksum, 1);
        assert_eq!(stats.dropped(), 2);
        assert_eq!(stats.clamped, 0);
    }

    #[test]
    fn test_stats_count_implausible_payloads() {
        let codec = VersionedCodec::for_version(7).unwrap();
        let mut sender = own_ship();
        sender.timestamp = EPOCH + 30 - 128;
        let frame = codec.encode(&sender);

        // receiver clock two key slots later, clear of any slot edge
        let mut reference = Reference::from(&own_ship());
        reference.epoch = EPOCH + 30;
        assert_eq!(reference.latitude, -33.9);

        let result = codec.decode(&frame, &reference);
        assert!(matches!(result, Err(RfLegacyError::BadPayload { .. })));

        let stats = codec.stats().snapshot();
        assert_eq!(stats.bad_payload, 1);
        assert_eq!(stats.decoded, 0);
        assert_eq!(stats.dropped(), 1);
    }

    #[test]
    fn test_stats_count_clamped_fields() {
        let codec = LegacyCodec::<V6>::new();
        let mut record = own_ship();
        record.altitude = 20_000.0;
        record.vertical_speed = -300.0;
        let _ = codec.encode(&record);
        assert_eq!(codec.stats().snapshot().clamped, 2);
    }

    #[test]
    fn test_shared_codec_across_threads() {
        let codec = Arc::new(LegacyCodec::<V7>::new());
        let reference = Reference::new(-33.8, 151.0, EPOCH);

        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let codec = Arc::clone(&codec);
                thread::spawn(move || {
                    let mut record = own_ship();
                    record.address = 0x100 + i;
                    for _ in 0..50 {
                        let frame = codec.encode(&record);
                        let decoded = codec.decode(&frame, &reference).unwrap();
                        assert_eq!(decoded.address, record.address);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = codec.stats().snapshot();
        assert_eq!(stats.encoded, 200);
        assert_eq!(stats.decoded, 200);
    }
}

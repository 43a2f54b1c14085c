//! # Legacy Protocol Constants and Descriptor Registry
//!
//! Wire parameters of every protocol variant this crate understands. The
//! table is a compile-time constant; nothing is registered at runtime.

use std::fmt;
use std::str::FromStr;

use crate::error::{RfLegacyError, Result};

/// Legacy payload size in bytes (both layout versions)
pub const LEGACY_PAYLOAD_SIZE: usize = 24;

/// Legacy CRC size in bytes
pub const LEGACY_CRC_SIZE: usize = 2;

/// Legacy frame size as handled by the codec (payload + CRC trailer)
pub const LEGACY_FRAME_SIZE: usize = LEGACY_PAYLOAD_SIZE + LEGACY_CRC_SIZE;

/// IEEE Manchester(F531FAB6) = 55 99 A5 A9 55 66 65 96; the leading 0x55 is the preamble
pub const LEGACY_SYNCWORD: [u8; 7] = [0x99, 0xA5, 0xA9, 0x55, 0x66, 0x65, 0x96];

/// Link address bytes folded into the CRC ahead of the payload
pub const LEGACY_CRC_PREFIX: [u8; 3] = [0x31, 0xFA, 0xB6];

/// Fixed-size legacy frame: scrambled payload followed by the CRC trailer
pub type LegacyFrame = [u8; LEGACY_FRAME_SIZE];

/// Plaintext or scrambled payload buffer
pub type PackedPacket = [u8; LEGACY_PAYLOAD_SIZE];

/// Protocol family numbering shared across the collision-avoidance ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolId {
    Legacy,
    Ogntp,
    P3i,
    Adsb1090,
    AdsbUat,
    Fanet,
}

impl ProtocolId {
    /// Numeric id of the protocol
    pub fn as_u8(self) -> u8 {
        match self {
            ProtocolId::Legacy => 0,
            ProtocolId::Ogntp => 1,
            ProtocolId::P3i => 2,
            ProtocolId::Adsb1090 => 3,
            ProtocolId::AdsbUat => 4,
            ProtocolId::Fanet => 5,
        }
    }

    /// Protocol for a numeric id, if the id is assigned
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ProtocolId::Legacy),
            1 => Some(ProtocolId::Ogntp),
            2 => Some(ProtocolId::P3i),
            3 => Some(ProtocolId::Adsb1090),
            4 => Some(ProtocolId::AdsbUat),
            5 => Some(ProtocolId::Fanet),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolId::Legacy => "legacy",
            ProtocolId::Ogntp => "ogntp",
            ProtocolId::P3i => "p3i",
            ProtocolId::Adsb1090 => "adsb1090",
            ProtocolId::AdsbUat => "uat",
            ProtocolId::Fanet => "fanet",
        };
        f.write_str(name)
    }
}

impl FromStr for ProtocolId {
    type Err = RfLegacyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ProtocolId::Legacy),
            "ogntp" => Ok(ProtocolId::Ogntp),
            "p3i" => Ok(ProtocolId::P3i),
            "adsb1090" | "1090es" => Ok(ProtocolId::Adsb1090),
            "uat" | "adsbuat" => Ok(ProtocolId::AdsbUat),
            "fanet" => Ok(ProtocolId::Fanet),
            other => Err(RfLegacyError::ProtocolNotFound(other.to_string())),
        }
    }
}

/// Preamble pattern sent ahead of the sync word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreambleType {
    Byte55,
    ByteAA,
}

impl PreambleType {
    /// The repeated preamble byte
    pub fn byte(self) -> u8 {
        match self {
            PreambleType::Byte55 => 0x55,
            PreambleType::ByteAA => 0xAA,
        }
    }
}

/// Integrity check applied to the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    /// CRC-16/CCITT, polynomial 0x1021, initial value 0xFFFF
    CcittFfff,
}

/// Byte order of multi-byte trailers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Line coding applied between the sync word and the end of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCoding {
    None,
    Manchester,
}

/// Wire parameters of one protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    pub id: ProtocolId,
    pub name: &'static str,
    pub preamble_type: PreambleType,
    pub preamble_size: usize,
    pub sync_word: &'static [u8],
    pub payload_size: usize,
    pub crc_type: ChecksumType,
    pub crc_size: usize,
    pub crc_byte_order: ByteOrder,
    pub crc_prefix: &'static [u8],
    pub line_coding: LineCoding,
    /// Nominal on-air time in milliseconds
    pub air_time_ms: u32,
    pub tx_interval_min_ms: u32,
    pub tx_interval_max_ms: u32,
}

impl ProtocolDescriptor {
    /// Codec frame size: payload plus CRC trailer
    pub const fn frame_size(&self) -> usize {
        self.payload_size + self.crc_size
    }

    /// Payload size in bits
    pub const fn payload_bits(&self) -> usize {
        self.payload_size * 8
    }
}

/// Descriptor of the legacy protocol (shared by layout versions 6 and 7)
pub const LEGACY_PROTO_DESC: ProtocolDescriptor = ProtocolDescriptor {
    id: ProtocolId::Legacy,
    name: "Legacy",
    preamble_type: PreambleType::Byte55,
    preamble_size: 1,
    sync_word: &LEGACY_SYNCWORD,
    payload_size: LEGACY_PAYLOAD_SIZE,
    crc_type: ChecksumType::CcittFfff,
    crc_size: LEGACY_CRC_SIZE,
    crc_byte_order: ByteOrder::BigEndian,
    crc_prefix: &LEGACY_CRC_PREFIX,
    line_coding: LineCoding::Manchester,
    air_time_ms: 6,
    tx_interval_min_ms: 600,
    tx_interval_max_ms: 1400,
};

static REGISTRY: [ProtocolDescriptor; 1] = [LEGACY_PROTO_DESC];

/// Look up the descriptor of a protocol
///
/// # Errors
///
/// Returns `ProtocolNotFound` if the protocol has no descriptor in this crate
///
/// # Examples
///
/// ```
/// use rf_legacy::legacy::protocol::{lookup, ProtocolId};
///
/// let desc = lookup(ProtocolId::Legacy).unwrap();
/// assert_eq!(desc.payload_size, 24);
/// assert!(lookup(ProtocolId::Fanet).is_err());
/// ```
pub fn lookup(id: ProtocolId) -> Result<&'static ProtocolDescriptor> {
    REGISTRY
        .iter()
        .find(|desc| desc.id == id)
        .ok_or_else(|| RfLegacyError::ProtocolNotFound(id.to_string()))
}

/// All registered descriptors
pub fn all() -> &'static [ProtocolDescriptor] {
    &REGISTRY
}

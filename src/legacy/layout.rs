//! # Packet Layouts
//!
//! Fixed bit layouts of the two legacy payload versions. Version 6 and
//! version 7 are mutually exclusive: nothing in the packet says which one
//! it is, so the active layout comes from configuration.
//!
//! Both layouts start with the same clear header word:
//!
//! ```text
//! bits  0..24  address
//! bits 24..28  message type
//! bits 28..31  address type
//! bit  31      unused
//! ```

use tracing::warn;

use super::bits::{self, Field};
use super::cipher::KeyBank;
use super::protocol::{PackedPacket, LEGACY_PAYLOAD_SIZE};
use super::record::{AddressType, AircraftCategory, AircraftStateRecord, MotionState, Reference};
use super::scaled::{decode_scaled, descale, encode_scaled, enscale, Scaled, Signedness};
use crate::error::{RfLegacyError, Result};

pub const ADDR: Field = Field::new("addr", 0, 24);
pub const MSG_TYPE: Field = Field::new("type", 24, 4);
pub const ADDR_TYPE: Field = Field::new("addr_type", 28, 3);
pub const UNK1: Field = Field::new("_unk1", 31, 1);

/// Version 6 field table
pub mod v6_fields {
    use super::Field;

    pub const VS: Field = Field::new("vs", 32, 10);
    pub const UNK2: Field = Field::new("_unk2", 42, 2);
    pub const AIRBORNE: Field = Field::new("airborne", 44, 1);
    pub const STEALTH: Field = Field::new("stealth", 45, 1);
    pub const NO_TRACK: Field = Field::new("no_track", 46, 1);
    pub const PARITY: Field = Field::new("parity", 47, 1);
    pub const GPS: Field = Field::new("gps", 48, 12);
    pub const AIRCRAFT_TYPE: Field = Field::new("aircraft_type", 60, 4);
    pub const LAT: Field = Field::new("lat", 64, 19);
    pub const ALT: Field = Field::new("alt", 83, 13);
    pub const LON: Field = Field::new("lon", 96, 20);
    pub const UNK3: Field = Field::new("_unk3", 116, 10);
    pub const SMULT: Field = Field::new("smult", 126, 2);
    pub const NS: [Field; 4] = [
        Field::new("ns[0]", 128, 8),
        Field::new("ns[1]", 136, 8),
        Field::new("ns[2]", 144, 8),
        Field::new("ns[3]", 152, 8),
    ];
    pub const EW: [Field; 4] = [
        Field::new("ew[0]", 160, 8),
        Field::new("ew[1]", 168, 8),
        Field::new("ew[2]", 176, 8),
        Field::new("ew[3]", 184, 8),
    ];
}

/// Version 7 field table
pub mod v7_fields {
    use super::Field;

    pub const UNK2: Field = Field::new("_unk2", 32, 22);
    pub const STEALTH: Field = Field::new("stealth", 54, 1);
    pub const NO_TRACK: Field = Field::new("no_track", 55, 1);
    pub const UNK3: Field = Field::new("_unk3", 56, 2);
    pub const UNK4: Field = Field::new("_unk4", 58, 2);
    pub const UNK5: Field = Field::new("_unk5", 60, 2);
    pub const UNK6: Field = Field::new("_unk6", 62, 2);
    pub const UNK9: Field = Field::new("_unk9", 64, 2);
    pub const TS: Field = Field::new("ts", 66, 4);
    pub const AIRCRAFT_TYPE: Field = Field::new("aircraft_type", 70, 4);
    pub const UNK10: Field = Field::new("_unk10", 74, 1);
    pub const ALT: Field = Field::new("alt", 75, 13);
    pub const LAT: Field = Field::new("lat", 88, 20);
    pub const LON: Field = Field::new("lon", 108, 20);
    pub const TURN: Field = Field::new("turn", 128, 9);
    pub const HS: Field = Field::new("hs", 137, 10);
    pub const VS: Field = Field::new("vs", 147, 9);
    pub const COURSE: Field = Field::new("course", 156, 10);
    pub const AIRBORNE: Field = Field::new("airborne", 166, 2);
    pub const HACC: Field = Field::new("hacc", 168, 6);
    pub const VACC: Field = Field::new("vacc", 174, 5);
    pub const UNK11: Field = Field::new("_unk11", 179, 5);
    pub const UNK12: Field = Field::new("_unk12", 184, 8);
}

/// Seconds between the four version 6 velocity samples
pub const V6_PREDICTION_STEP_S: f64 = 3.0;

/// Constant carried in the version 6 `gps` field
const V6_GPS_STATUS: u32 = 323;

/// Largest accepted distance, in seconds, between the version 7 time nibble
/// and the receiver clock
pub const V7_MAX_CLOCK_SKEW_S: i64 = 4;

/// Position residue resolution: degrees times 1e7, divided by 52
const POSITION_DIVISOR: f64 = 52.0;

/// Output of packing one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packed {
    pub packet: PackedPacket,
    /// Number of fields saturated while packing
    pub clamped: u32,
}

/// One fixed payload layout
///
/// Implemented by zero-sized version markers so the codec is monomorphized
/// per version.
pub trait Layout: Send + Sync + 'static {
    /// Layout version number as used in configuration
    const VERSION: u8;
    /// Key table bank used to scramble this layout
    const BANK: KeyBank;
    /// Value of the header's message type nibble
    const MESSAGE_TYPE: u32;
    /// Every field of the layout, in bit order
    const FIELDS: &'static [Field];

    /// Pack a record into a plaintext payload
    fn pack(record: &AircraftStateRecord) -> Packed;

    /// Unpack a descrambled payload
    ///
    /// # Errors
    ///
    /// Returns `BadParity` when the layout's integrity bit disagrees, and
    /// `BadPayload` when a fixed field or the time does not hold, which is
    /// what a payload descrambled with the wrong key looks like
    fn unpack(packet: &PackedPacket, reference: &Reference) -> Result<AircraftStateRecord>;
}

/// Version 6 layout marker
#[derive(Debug, Clone, Copy, Default)]
pub struct V6;

/// Version 7 layout marker
#[derive(Debug, Clone, Copy, Default)]
pub struct V7;

struct Packer {
    packet: PackedPacket,
    clamped: u32,
}

impl Packer {
    fn new() -> Self {
        Self {
            packet: [0u8; LEGACY_PAYLOAD_SIZE],
            clamped: 0,
        }
    }

    fn code(&mut self, field: Field, code: u32) {
        bits::put(&mut self.packet, field, code);
    }

    fn flag(&mut self, field: Field, on: bool) {
        self.code(field, on as u32);
    }

    fn scaled(&mut self, field: Field, scaled: Scaled, value: f64) {
        if scaled.clamped {
            warn!(field = field.name, value, "Clamped out-of-range value");
            self.clamped += 1;
        }
        self.code(field, scaled.code);
    }

    fn linear(&mut self, field: Field, value: f64, scale: f64, signedness: Signedness) {
        let scaled = encode_scaled(value, field.width as u32, scale, signedness);
        self.scaled(field, scaled, value);
    }

    fn enscaled(&mut self, field: Field, value: f64, mbits: u32, ebits: u32, scale: f64, signedness: Signedness) {
        let scaled = enscale(value, mbits, ebits, scale, signedness);
        self.scaled(field, scaled, value);
    }

    /// Position with the most significant bits removed
    fn residue(&mut self, field: Field, degrees: f64) {
        if !degrees.is_finite() {
            warn!(field = field.name, value = degrees, "Clamped out-of-range value");
            self.clamped += 1;
            self.code(field, 0);
            return;
        }
        let units = (degrees * 1e7 / POSITION_DIVISOR).round() as i64;
        self.code(field, units as u32);
    }

    fn header(&mut self, record: &AircraftStateRecord, message_type: u32) {
        self.code(ADDR, record.address);
        self.code(MSG_TYPE, message_type);
        self.code(ADDR_TYPE, record.address_type.code());
        self.code(UNK1, 0);
    }

    fn finish(self) -> Packed {
        Packed {
            packet: self.packet,
            clamped: self.clamped,
        }
    }
}

/// Rebuild a truncated position against the reference coordinate
fn unwrap_residue(code: u32, width: usize, reference: f64) -> f64 {
    let span = 1i64 << width;
    let round_ref = (reference * 1e7 / POSITION_DIVISOR).round() as i64;
    let mut diff = (code as i64 - round_ref).rem_euclid(span);
    if diff >= span / 2 {
        diff -= span;
    }
    (round_ref + diff) as f64 * POSITION_DIVISOR / 1e7
}

fn normalize_course(degrees: f64) -> f64 {
    let course = degrees.rem_euclid(360.0);
    if course >= 360.0 {
        0.0
    } else {
        course
    }
}

/// Signed difference `to - from` in (-180, 180]
fn course_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

fn finite_or_zero(value: f32) -> f64 {
    if value.is_finite() {
        value as f64
    } else {
        0.0
    }
}

fn header_fields(packet: &PackedPacket) -> (u32, AddressType) {
    (
        bits::get(packet, ADDR),
        AddressType::from_code(bits::get(packet, ADDR_TYPE)),
    )
}

fn expect_code(packet: &PackedPacket, field: Field, expected: u32) -> Result<()> {
    if bits::get(packet, field) == expected {
        Ok(())
    } else {
        Err(RfLegacyError::BadPayload { field: field.name })
    }
}

fn even_parity(packet: &PackedPacket) -> bool {
    packet.iter().map(|b| b.count_ones()).sum::<u32>() % 2 == 0
}

impl V6 {
    /// Velocity samples in m/s (north, east) at 0, 3, 6 and 9 seconds
    fn predict_velocity(record: &AircraftStateRecord) -> [(f64, f64); 4] {
        let speed = finite_or_zero(record.ground_speed).max(0.0);
        let course = finite_or_zero(record.course);
        let turn = finite_or_zero(record.turn_rate);

        let mut samples = [(0.0, 0.0); 4];
        for (i, sample) in samples.iter_mut().enumerate() {
            let heading = (course + turn * V6_PREDICTION_STEP_S * i as f64).to_radians();
            *sample = (speed * heading.cos(), speed * heading.sin());
        }
        samples
    }

    /// Smallest speed multiplier that keeps every sample within an i8
    fn speed_multiplier(samples: &[(f64, f64); 4]) -> u32 {
        let peak = samples
            .iter()
            .flat_map(|&(ns, ew)| [ns.abs(), ew.abs()])
            .fold(0.0f64, f64::max);

        (0..3)
            .find(|&smult| (peak * 4.0 / (1u32 << smult) as f64).round() <= 127.0)
            .unwrap_or(3)
    }
}

impl Layout for V6 {
    const VERSION: u8 = 6;
    const BANK: KeyBank = KeyBank::V6;
    const MESSAGE_TYPE: u32 = 0;
    const FIELDS: &'static [Field] = &[
        ADDR,
        MSG_TYPE,
        ADDR_TYPE,
        UNK1,
        v6_fields::VS,
        v6_fields::UNK2,
        v6_fields::AIRBORNE,
        v6_fields::STEALTH,
        v6_fields::NO_TRACK,
        v6_fields::PARITY,
        v6_fields::GPS,
        v6_fields::AIRCRAFT_TYPE,
        v6_fields::LAT,
        v6_fields::ALT,
        v6_fields::LON,
        v6_fields::UNK3,
        v6_fields::SMULT,
        v6_fields::NS[0],
        v6_fields::NS[1],
        v6_fields::NS[2],
        v6_fields::NS[3],
        v6_fields::EW[0],
        v6_fields::EW[1],
        v6_fields::EW[2],
        v6_fields::EW[3],
    ];

    fn pack(record: &AircraftStateRecord) -> Packed {
        use v6_fields::*;

        let mut packer = Packer::new();
        packer.header(record, Self::MESSAGE_TYPE);

        let samples = Self::predict_velocity(record);
        let smult = Self::speed_multiplier(&samples);
        let speed_scale = 4.0 / (1u32 << smult) as f64;

        packer.linear(VS, record.vertical_speed as f64, 10.0 / (1u32 << smult) as f64, Signedness::Signed);
        packer.code(UNK2, 0);
        packer.flag(AIRBORNE, record.motion.is_airborne());
        packer.flag(STEALTH, record.stealth);
        packer.flag(NO_TRACK, record.no_track);
        packer.code(GPS, V6_GPS_STATUS);
        packer.code(AIRCRAFT_TYPE, record.category.code());
        packer.residue(LAT, record.latitude);
        packer.linear(ALT, record.altitude as f64, 1.0, Signedness::Unsigned);
        packer.residue(LON, record.longitude);
        packer.code(UNK3, 0);
        packer.code(SMULT, smult);

        for (i, &(ns, ew)) in samples.iter().enumerate() {
            packer.linear(NS[i], ns, speed_scale, Signedness::Signed);
            packer.linear(EW[i], ew, speed_scale, Signedness::Signed);
        }

        packer.code(PARITY, 0);
        if !even_parity(&packer.packet) {
            packer.code(PARITY, 1);
        }

        packer.finish()
    }

    fn unpack(packet: &PackedPacket, reference: &Reference) -> Result<AircraftStateRecord> {
        use v6_fields::*;

        if !even_parity(packet) {
            return Err(RfLegacyError::BadParity);
        }
        expect_code(packet, UNK2, 0)?;
        expect_code(packet, UNK3, 0)?;

        let (address, address_type) = header_fields(packet);
        let mut record = AircraftStateRecord::new(address, address_type);

        let smult = bits::get(packet, SMULT);
        let speed_scale = 4.0 / (1u32 << smult) as f64;

        let mut samples = [(0.0, 0.0); 4];
        for (i, sample) in samples.iter_mut().enumerate() {
            *sample = (
                decode_scaled(bits::get(packet, NS[i]), 8, speed_scale, Signedness::Signed),
                decode_scaled(bits::get(packet, EW[i]), 8, speed_scale, Signedness::Signed),
            );
        }

        let (ns0, ew0) = samples[0];
        let (ns1, ew1) = samples[1];
        let speed = ns0.hypot(ew0);
        let (course, turn_rate) = if speed > 0.0 {
            let course = normalize_course(ew0.atan2(ns0).to_degrees());
            let turn_rate = if ns1.hypot(ew1) > 0.0 {
                let next = normalize_course(ew1.atan2(ns1).to_degrees());
                course_delta(course, next) / V6_PREDICTION_STEP_S
            } else {
                0.0
            };
            (course, turn_rate)
        } else {
            (0.0, 0.0)
        };

        record.category = AircraftCategory::from_code(bits::get(packet, AIRCRAFT_TYPE));
        record.latitude = unwrap_residue(bits::get(packet, LAT), LAT.width, reference.latitude);
        record.longitude = unwrap_residue(bits::get(packet, LON), LON.width, reference.longitude);
        record.altitude = bits::get(packet, ALT) as f32;
        record.vertical_speed =
            decode_scaled(bits::get(packet, VS), VS.width as u32, 10.0 / (1u32 << smult) as f64, Signedness::Signed) as f32;
        record.ground_speed = speed as f32;
        record.course = course as f32;
        record.turn_rate = turn_rate as f32;
        record.motion = if bits::get(packet, AIRBORNE) == 1 {
            MotionState::Moving
        } else {
            MotionState::Stationary
        };
        record.stealth = bits::get(packet, STEALTH) == 1;
        record.no_track = bits::get(packet, NO_TRACK) == 1;
        record.timestamp = reference.epoch;

        Ok(record)
    }
}

impl V7 {
    /// Signed distance from the reference to the nearest time with the given
    /// low nibble, in -8..=7
    fn timestamp_offset(fragment: u32, reference: u32) -> i64 {
        let diff = (fragment as i64 - reference as i64).rem_euclid(16);
        if diff >= 8 {
            diff - 16
        } else {
            diff
        }
    }

    /// Full UNIX time nearest to the reference with the given low nibble
    fn rebuild_timestamp(fragment: u32, reference: u32) -> u32 {
        let diff = Self::timestamp_offset(fragment, reference);
        (reference as i64 + diff).clamp(0, u32::MAX as i64) as u32
    }
}

impl Layout for V7 {
    const VERSION: u8 = 7;
    const BANK: KeyBank = KeyBank::V7;
    const MESSAGE_TYPE: u32 = 2;
    const FIELDS: &'static [Field] = &[
        ADDR,
        MSG_TYPE,
        ADDR_TYPE,
        UNK1,
        v7_fields::UNK2,
        v7_fields::STEALTH,
        v7_fields::NO_TRACK,
        v7_fields::UNK3,
        v7_fields::UNK4,
        v7_fields::UNK5,
        v7_fields::UNK6,
        v7_fields::UNK9,
        v7_fields::TS,
        v7_fields::AIRCRAFT_TYPE,
        v7_fields::UNK10,
        v7_fields::ALT,
        v7_fields::LAT,
        v7_fields::LON,
        v7_fields::TURN,
        v7_fields::HS,
        v7_fields::VS,
        v7_fields::COURSE,
        v7_fields::AIRBORNE,
        v7_fields::HACC,
        v7_fields::VACC,
        v7_fields::UNK11,
        v7_fields::UNK12,
    ];

    fn pack(record: &AircraftStateRecord) -> Packed {
        use v7_fields::*;

        let mut packer = Packer::new();
        packer.header(record, Self::MESSAGE_TYPE);

        packer.code(UNK2, 0);
        packer.flag(STEALTH, record.stealth);
        packer.flag(NO_TRACK, record.no_track);
        packer.code(UNK3, 1);
        packer.code(UNK4, 0);
        packer.code(UNK5, 1);
        packer.code(UNK6, 0);
        packer.code(UNK9, 0);
        packer.code(TS, record.timestamp_fragment() as u32);
        packer.code(AIRCRAFT_TYPE, record.category.code());
        packer.code(UNK10, 0);
        packer.enscaled(ALT, record.altitude as f64 + 1000.0, 12, 1, 1.0, Signedness::Unsigned);
        packer.residue(LAT, record.latitude);
        packer.residue(LON, record.longitude);
        packer.enscaled(TURN, record.turn_rate as f64, 6, 2, 20.0, Signedness::Signed);
        packer.enscaled(HS, record.ground_speed as f64, 8, 2, 10.0, Signedness::Unsigned);
        packer.enscaled(VS, record.vertical_speed as f64, 6, 2, 10.0, Signedness::Signed);

        let course = finite_or_zero(record.course);
        let course_code = ((course * 2.0).round() as i64).rem_euclid(720);
        packer.code(COURSE, course_code as u32);

        packer.code(AIRBORNE, record.motion.code());
        packer.enscaled(HACC, record.horizontal_accuracy as f64, 3, 3, 10.0, Signedness::Unsigned);
        packer.enscaled(VACC, record.vertical_accuracy as f64, 2, 3, 4.0, Signedness::Unsigned);
        packer.code(UNK11, 0);
        packer.code(UNK12, 0);

        packer.finish()
    }

    fn unpack(packet: &PackedPacket, reference: &Reference) -> Result<AircraftStateRecord> {
        use v7_fields::*;

        expect_code(packet, UNK2, 0)?;
        expect_code(packet, UNK3, 1)?;
        expect_code(packet, UNK5, 1)?;
        expect_code(packet, UNK12, 0)?;
        let fragment = bits::get(packet, TS);
        if Self::timestamp_offset(fragment, reference.epoch).abs() > V7_MAX_CLOCK_SKEW_S {
            return Err(RfLegacyError::BadPayload { field: TS.name });
        }

        let (address, address_type) = header_fields(packet);
        let mut record = AircraftStateRecord::new(address, address_type);

        record.category = AircraftCategory::from_code(bits::get(packet, AIRCRAFT_TYPE));
        record.latitude = unwrap_residue(bits::get(packet, LAT), LAT.width, reference.latitude);
        record.longitude = unwrap_residue(bits::get(packet, LON), LON.width, reference.longitude);
        record.altitude = (descale(bits::get(packet, ALT), 12, 1, 1.0, Signedness::Unsigned) - 1000.0) as f32;
        record.turn_rate = descale(bits::get(packet, TURN), 6, 2, 20.0, Signedness::Signed) as f32;
        record.ground_speed = descale(bits::get(packet, HS), 8, 2, 10.0, Signedness::Unsigned) as f32;
        record.vertical_speed = descale(bits::get(packet, VS), 6, 2, 10.0, Signedness::Signed) as f32;
        record.course = normalize_course(bits::get(packet, COURSE) as f64 / 2.0) as f32;
        record.motion = MotionState::from_code(bits::get(packet, AIRBORNE));
        record.horizontal_accuracy = descale(bits::get(packet, HACC), 3, 3, 10.0, Signedness::Unsigned) as f32;
        record.vertical_accuracy = descale(bits::get(packet, VACC), 2, 3, 4.0, Signedness::Unsigned) as f32;
        record.stealth = bits::get(packet, STEALTH) == 1;
        record.no_track = bits::get(packet, NO_TRACK) == 1;
        record.timestamp = Self::rebuild_timestamp(fragment, reference.epoch);

        Ok(record)
    }
}

//! # Aircraft State Record
//!
//! The unit exchanged with the external traffic tracker, plus the
//! classification tags carried in every packet.

use serde::{Deserialize, Serialize};

/// Station addressing scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Random,
    Icao,
    Flarm,
    /// Stealth / OGN anonymous address
    Anonymous,
    P3i,
    Fanet,
    /// Code outside the assigned table; transmitted as `Random`
    Unknown,
}

impl AddressType {
    /// Tag for a raw 3-bit code, `Unknown` when unassigned
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => AddressType::Random,
            1 => AddressType::Icao,
            2 => AddressType::Flarm,
            3 => AddressType::Anonymous,
            4 => AddressType::P3i,
            5 => AddressType::Fanet,
            _ => AddressType::Unknown,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            AddressType::Random | AddressType::Unknown => 0,
            AddressType::Icao => 1,
            AddressType::Flarm => 2,
            AddressType::Anonymous => 3,
            AddressType::P3i => 4,
            AddressType::Fanet => 5,
        }
    }
}

/// Vehicle class (4-bit code, every value assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftCategory {
    Unknown,
    Glider,
    Towplane,
    Helicopter,
    Parachute,
    DropPlane,
    HangGlider,
    Paraglider,
    Powered,
    Jet,
    Ufo,
    Balloon,
    Zeppelin,
    Uav,
    Reserved,
    Static,
}

const CATEGORIES: [AircraftCategory; 16] = [
    AircraftCategory::Unknown,
    AircraftCategory::Glider,
    AircraftCategory::Towplane,
    AircraftCategory::Helicopter,
    AircraftCategory::Parachute,
    AircraftCategory::DropPlane,
    AircraftCategory::HangGlider,
    AircraftCategory::Paraglider,
    AircraftCategory::Powered,
    AircraftCategory::Jet,
    AircraftCategory::Ufo,
    AircraftCategory::Balloon,
    AircraftCategory::Zeppelin,
    AircraftCategory::Uav,
    AircraftCategory::Reserved,
    AircraftCategory::Static,
];

impl AircraftCategory {
    /// Tag for a raw code, `Reserved` when the code does not fit in 4 bits
    pub fn from_code(code: u32) -> Self {
        CATEGORIES
            .get(code as usize)
            .copied()
            .unwrap_or(AircraftCategory::Reserved)
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Flight state as broadcast by version 7 (version 6 only knows airborne or not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Unknown,
    Stationary,
    Moving,
    Circling,
}

impl MotionState {
    pub fn from_code(code: u32) -> Self {
        match code & 0x3 {
            1 => MotionState::Stationary,
            2 => MotionState::Moving,
            3 => MotionState::Circling,
            _ => MotionState::Unknown,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            MotionState::Unknown => 0,
            MotionState::Stationary => 1,
            MotionState::Moving => 2,
            MotionState::Circling => 3,
        }
    }

    pub fn is_airborne(self) -> bool {
        matches!(self, MotionState::Moving | MotionState::Circling)
    }
}

/// Decoded (or own-ship) aircraft state
///
/// Identity key is `(address, address_type)`. Each decode constructs a
/// fresh record that is handed over to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AircraftStateRecord {
    /// 24-bit station address
    pub address: u32,
    pub address_type: AddressType,
    pub category: AircraftCategory,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: f32,
    /// Vertical speed in m/s, positive up
    pub vertical_speed: f32,
    /// Horizontal speed in m/s
    pub ground_speed: f32,
    /// Course over ground in degrees (0-360)
    pub course: f32,
    /// Turn rate in degrees per second, positive clockwise
    pub turn_rate: f32,
    /// Horizontal accuracy estimate in meters (version 7 only)
    pub horizontal_accuracy: f32,
    /// Vertical accuracy estimate in meters (version 7 only)
    pub vertical_accuracy: f32,
    pub motion: MotionState,
    pub stealth: bool,
    pub no_track: bool,
    /// UNIX time in seconds; version 7 carries its low four bits on the wire
    pub timestamp: u32,
}

impl AircraftStateRecord {
    /// Record with the given identity and every other field zeroed
    pub fn new(address: u32, address_type: AddressType) -> Self {
        Self {
            address: address & 0x00FF_FFFF,
            address_type,
            category: AircraftCategory::Unknown,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            vertical_speed: 0.0,
            ground_speed: 0.0,
            course: 0.0,
            turn_rate: 0.0,
            horizontal_accuracy: 0.0,
            vertical_accuracy: 0.0,
            motion: MotionState::Unknown,
            stealth: false,
            no_track: false,
            timestamp: 0,
        }
    }

    /// Identity key used by trackers
    pub fn key(&self) -> (u32, AddressType) {
        (self.address, self.address_type)
    }

    /// Low four bits of the timestamp as sent by version 7
    pub fn timestamp_fragment(&self) -> u8 {
        (self.timestamp & 0x0F) as u8
    }
}

/// Receiver's own fix, needed to rebuild truncated position and time fields
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reference {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// UNIX time in seconds
    pub epoch: u32,
}

impl Reference {
    pub fn new(latitude: f64, longitude: f64, epoch: u32) -> Self {
        Self { latitude, longitude, epoch }
    }
}

impl From<&AircraftStateRecord> for Reference {
    fn from(record: &AircraftStateRecord) -> Self {
        Self::new(record.latitude, record.longitude, record.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_type_codes() {
        for code in 0..6 {
            assert_eq!(AddressType::from_code(code).code(), code);
        }
        assert_eq!(AddressType::from_code(6), AddressType::Unknown);
        assert_eq!(AddressType::from_code(7), AddressType::Unknown);
        assert_eq!(AddressType::Unknown.code(), 0);
    }

    #[test]
    fn test_category_codes() {
        for code in 0..16 {
            assert_eq!(AircraftCategory::from_code(code).code(), code);
        }
        assert_eq!(AircraftCategory::from_code(1), AircraftCategory::Glider);
        assert_eq!(AircraftCategory::from_code(13), AircraftCategory::Uav);
        assert_eq!(AircraftCategory::from_code(15), AircraftCategory::Static);
        assert_eq!(AircraftCategory::from_code(42), AircraftCategory::Reserved);
    }

    #[test]
    fn test_motion_state() {
        assert_eq!(MotionState::from_code(3), MotionState::Circling);
        assert!(MotionState::Circling.is_airborne());
        assert!(MotionState::Moving.is_airborne());
        assert!(!MotionState::Stationary.is_airborne());
        assert!(!MotionState::Unknown.is_airborne());
    }

    #[test]
    fn test_new_record_masks_address() {
        let record = AircraftStateRecord::new(0x7F12_3456, AddressType::Icao);
        assert_eq!(record.address, 0x12_3456);
        assert_eq!(record.key(), (0x12_3456, AddressType::Icao));
    }

    #[test]
    fn test_timestamp_fragment() {
        let mut record = AircraftStateRecord::new(1, AddressType::Flarm);
        record.timestamp = 1_700_000_013;
        assert_eq!(record.timestamp_fragment(), (1_700_000_013u32 & 0xF) as u8);
    }

    #[test]
    fn test_record_serializes_to_json() {
        let mut record = AircraftStateRecord::new(0xDD1234, AddressType::Flarm);
        record.category = AircraftCategory::HangGlider;
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"address_type\":\"flarm\""));
        assert!(json.contains("\"category\":\"hang_glider\""));
    }
}

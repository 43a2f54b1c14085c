//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{RfLegacyError, Result};
use crate::legacy::protocol::{self, ProtocolDescriptor, ProtocolId};
use crate::legacy::record::{AddressType, AircraftStateRecord, Reference};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub radio: RadioConfig,
    pub own_ship: OwnShipConfig,
    pub receiver: ReceiverConfig,
    pub telemetry: TelemetryConfig,
}

/// Radio protocol configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_version")]
    pub version: u8,
}

/// Own-ship identity and fallback position
#[derive(Debug, Deserialize, Clone)]
pub struct OwnShipConfig {
    #[serde(default)]
    pub address: u32,

    #[serde(default = "default_address_type")]
    pub address_type: AddressType,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,
}

/// Receive path configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    #[serde(default = "default_drop_own_packets")]
    pub drop_own_packets: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_protocol() -> String { "legacy".to_string() }
fn default_version() -> u8 { 7 }

fn default_address_type() -> AddressType { AddressType::Flarm }

fn default_drop_own_packets() -> bool { true }

fn default_telemetry_enabled() -> bool { true }

fn config_error(message: impl std::fmt::Display) -> RfLegacyError {
    RfLegacyError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rf_legacy::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing or validation fails
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Protocol selected in `[radio]`
    ///
    /// # Errors
    ///
    /// Returns error if the name is unknown
    pub fn protocol_id(&self) -> Result<ProtocolId> {
        self.radio.protocol.parse()
    }

    /// Descriptor of the configured protocol
    ///
    /// # Errors
    ///
    /// Returns error if the protocol is unknown or has no descriptor
    pub fn descriptor(&self) -> Result<&'static ProtocolDescriptor> {
        protocol::lookup(self.protocol_id()?)
    }

    /// Own-ship record template at the configured position
    pub fn own_ship_record(&self) -> AircraftStateRecord {
        let mut record = AircraftStateRecord::new(self.own_ship.address, self.own_ship.address_type);
        record.latitude = self.own_ship.latitude;
        record.longitude = self.own_ship.longitude;
        record
    }

    /// Receiver reference at the configured position for the given time
    pub fn reference(&self, epoch: u32) -> Reference {
        Reference::new(self.own_ship.latitude, self.own_ship.longitude, epoch)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate protocol selection
        let id: ProtocolId = self
            .radio
            .protocol
            .parse()
            .map_err(|_| config_error(format!("unknown protocol '{}'", self.radio.protocol)))?;

        if protocol::lookup(id).is_err() {
            return Err(config_error(format!("protocol '{}' is not supported", id)));
        }

        if ![6, 7].contains(&self.radio.version) {
            return Err(config_error("version must be 6 or 7"));
        }

        // Validate own-ship identity
        if self.own_ship.address > 0x00FF_FFFF {
            return Err(config_error("address must fit in 24 bits (0 to 0xFFFFFF)"));
        }

        if self.own_ship.address_type == AddressType::Unknown {
            return Err(config_error("address_type must be an assigned type"));
        }

        // Validate position
        if !(-90.0..=90.0).contains(&self.own_ship.latitude) {
            return Err(config_error("latitude must be between -90 and 90"));
        }

        if !(-180.0..=180.0).contains(&self.own_ship.longitude) {
            return Err(config_error("longitude must be between -180 and 180"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            radio: RadioConfig {
                protocol: default_protocol(),
                version: default_version(),
            },
            own_ship: OwnShipConfig {
                address: 0x00DD_1234,
                address_type: default_address_type(),
                latitude: 47.5,
                longitude: 8.25,
            },
            receiver: ReceiverConfig {
                drop_own_packets: default_drop_own_packets(),
            },
            telemetry: TelemetryConfig {
                enabled: default_telemetry_enabled(),
            },
        }
    }

    #[test]
    fn test_default_config() {
        let config = create_valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.protocol_id().unwrap(), ProtocolId::Legacy);
        assert_eq!(config.descriptor().unwrap().payload_size, 24);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[radio]
version = 6

[own_ship]
address = 0xABCDEF
address_type = "icao"
latitude = -33.9
longitude = 151.2

[receiver]

[telemetry]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.radio.protocol, "legacy");
        assert_eq!(config.radio.version, 6);
        assert_eq!(config.own_ship.address, 0xABCDEF);
        assert_eq!(config.own_ship.address_type, AddressType::Icao);
        assert!(config.receiver.drop_own_packets);
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/rf-legacy.toml");
        assert!(matches!(result, Err(RfLegacyError::Io(_))));
    }

    #[test]
    fn test_missing_section() {
        let result = Config::from_toml("[radio]\n[own_ship]\n[receiver]\n");
        assert!(matches!(result, Err(RfLegacyError::Config(_))));
    }

    #[test]
    fn test_unknown_protocol() {
        let mut config = create_valid_config();
        config.radio.protocol = "morse".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_protocol_without_descriptor() {
        let mut config = create_valid_config();
        config.radio.protocol = "fanet".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_version() {
        let mut config = create_valid_config();
        config.radio.version = 5;
        assert!(config.validate().is_err());

        config.radio.version = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_address_too_wide() {
        let mut config = create_valid_config();
        config.own_ship.address = 0x0100_0000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_address_type() {
        let mut config = create_valid_config();
        config.own_ship.address_type = AddressType::Unknown;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_latitude_out_of_range() {
        let mut config = create_valid_config();
        config.own_ship.latitude = 90.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_longitude_out_of_range() {
        let mut config = create_valid_config();
        config.own_ship.longitude = -180.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nan_position_rejected() {
        let mut config = create_valid_config();
        config.own_ship.latitude = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_own_ship_record_and_reference() {
        let config = create_valid_config();
        let record = config.own_ship_record();
        assert_eq!(record.key(), (0xDD1234, AddressType::Flarm));
        assert_eq!(record.latitude, 47.5);

        let reference = config.reference(1_700_000_000);
        assert_eq!(reference, Reference::new(47.5, 8.25, 1_700_000_000));
    }
}

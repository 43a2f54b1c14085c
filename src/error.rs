//! # Error Types
//!
//! Custom error types for rf-legacy using `thiserror`.

use thiserror::Error;

/// Main error type for rf-legacy
#[derive(Debug, Error)]
pub enum RfLegacyError {
    /// Raw frame does not have the descriptor's frame size
    #[error("Length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// CRC over the scrambled payload does not match the trailer
    #[error("Checksum mismatch: computed 0x{computed:04X}, received 0x{received:04X}")]
    BadChecksum { computed: u16, received: u16 },

    /// Plaintext parity bit disagrees with the payload (version 6 only)
    #[error("Parity check failed after descrambling")]
    BadParity,

    /// Descrambled payload breaks a fixed-field or clock check
    #[error("Implausible payload after descrambling: {field}")]
    BadPayload { field: &'static str },

    /// Protocol id has no descriptor in the registry
    #[error("Protocol not found: {0}")]
    ProtocolNotFound(String),

    /// Protocol version not supported by the codec
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Line coding or air frame errors
    #[error("Framing error: {0}")]
    Framing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RfLegacyError {
    /// Whether this error drops a single received packet (as opposed to a setup failure)
    pub fn is_packet_drop(&self) -> bool {
        matches!(
            self,
            RfLegacyError::LengthMismatch { .. }
                | RfLegacyError::BadChecksum { .. }
                | RfLegacyError::BadParity
                | RfLegacyError::BadPayload { .. }
                | RfLegacyError::Framing(_)
        )
    }
}

/// Result type alias for rf-legacy
pub type Result<T> = std::result::Result<T, RfLegacyError>;

//! # rf-legacy Library
//!
//! Link-layer codec for the legacy sub-GHz aircraft proximity-awareness radio protocol.
//!
//! This library converts between raw radio payloads and decoded aircraft state
//! records: bit-packed version 6 and version 7 layouts, the keyed scrambling
//! transform, the CRC-16/CCITT seal and the scaled fixed-point telemetry fields.

pub mod config;
pub mod error;
pub mod legacy;
pub mod link;
pub mod telemetry;

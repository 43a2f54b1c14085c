//! # Legacy Protocol Module
//!
//! Implementation of the legacy proximity-awareness radio link layer.
//!
//! This module handles:
//! - Protocol descriptor registry (framing, sizing, timing)
//! - Version 6 and version 7 bit layouts (24-byte payload)
//! - Keyed scrambling of the payload behind the clear address header
//! - CRC-16/CCITT sealing and verification
//! - Linear and exponent/mantissa scaled telemetry fields
//! - Manchester line coding and on-air frame assembly

pub mod protocol;
pub mod record;
pub mod crc;
pub mod cipher;
pub mod scaled;
pub mod bits;
pub mod layout;
pub mod encoder;
pub mod decoder;
pub mod codec;
pub mod framing;

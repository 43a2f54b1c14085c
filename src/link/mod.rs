//! # Link Module
//!
//! Receive and transmit plumbing around the legacy codec.
//!
//! This module handles:
//! - Decoding received frames and handing records to the tracker
//! - Suppressing our own transmissions heard back on the receiver
//! - Building the own-ship on-air frame and its transmit interval

pub mod sink;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;
use crate::legacy::codec::VersionedCodec;
use crate::legacy::framing::AirFrame;
use crate::legacy::protocol::LegacyFrame;
use crate::legacy::record::{AircraftStateRecord, Reference};

pub use sink::TrafficSink;

/// What happened to a frame that decoded cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handed to the sink
    Delivered,
    /// Our own packet; discarded
    OwnShip,
}

/// Receiver-side counters (codec drops live in the codec's stats)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverStats {
    pub delivered: u64,
    pub own_ship: u64,
    pub framing: u64,
}

/// Receive pipeline: frame -> codec -> own-ship filter -> sink
pub struct Receiver<S: TrafficSink> {
    codec: Arc<VersionedCodec>,
    own_address: u32,
    drop_own: bool,
    sink: S,
    stats: ReceiverStats,
}

impl<S: TrafficSink> Receiver<S> {
    /// Create a receiver
    ///
    /// # Arguments
    ///
    /// * `codec` - Shared codec handle (also used by the transmitter)
    /// * `own_address` - Our 24-bit address
    /// * `drop_own` - Discard packets carrying our own address
    /// * `sink` - Consumer of decoded records
    pub fn new(codec: Arc<VersionedCodec>, own_address: u32, drop_own: bool, sink: S) -> Self {
        Self {
            codec,
            own_address: own_address & 0x00FF_FFFF,
            drop_own,
            sink,
            stats: ReceiverStats::default(),
        }
    }

    /// Decode one codec frame (payload + CRC)
    ///
    /// # Errors
    ///
    /// Propagates the codec's drop reason; nothing reaches the sink then
    pub fn receive(&mut self, frame: &[u8], reference: &Reference) -> Result<Disposition> {
        let record = self.codec.decode(frame, reference)?;

        if self.drop_own && record.address == self.own_address {
            self.stats.own_ship += 1;
            trace!("Dropped own packet {:06X}", record.address);
            return Ok(Disposition::OwnShip);
        }

        self.sink.deliver(record);
        self.stats.delivered += 1;
        Ok(Disposition::Delivered)
    }

    /// Strip the air framing, then [`Receiver::receive`]
    ///
    /// # Errors
    ///
    /// `Framing` or `LengthMismatch` from the framing layer, or any codec drop
    pub fn receive_air(&mut self, air: &[u8], reference: &Reference) -> Result<Disposition> {
        let frame = match AirFrame::strip(self.codec.descriptor(), air) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.framing += 1;
                debug!("Dropped air frame: {}", e);
                return Err(e);
            }
        };
        self.receive(&frame, reference)
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn codec(&self) -> &VersionedCodec {
        &self.codec
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Give back the sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Transmit side: own-ship record to frame
pub struct Transmitter {
    codec: Arc<VersionedCodec>,
}

impl Transmitter {
    pub fn new(codec: Arc<VersionedCodec>) -> Self {
        Self { codec }
    }

    /// Codec frame for the own-ship record
    pub fn frame(&self, own: &AircraftStateRecord) -> LegacyFrame {
        self.codec.encode(own)
    }

    /// Complete on-air frame: preamble, sync word, line-coded payload and CRC
    ///
    /// # Errors
    ///
    /// Only if the descriptor's frame size disagrees with the codec frame
    pub fn air_frame(&self, own: &AircraftStateRecord) -> Result<Bytes> {
        AirFrame::assemble(self.codec.descriptor(), &self.frame(own))
    }

    /// Delay before the next transmission
    ///
    /// Drawn uniformly from the descriptor's interval window so neighbouring
    /// stations do not stay in lockstep.
    pub fn next_interval<R: Rng>(&self, rng: &mut R) -> Duration {
        let desc = self.codec.descriptor();
        let max = desc.tx_interval_max_ms.max(desc.tx_interval_min_ms);
        Duration::from_millis(u64::from(rng.random_range(desc.tx_interval_min_ms..=max)))
    }
}

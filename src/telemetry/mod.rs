//! # Telemetry Module
//!
//! Writes decoded traffic as JSONL (JSON Lines), one record per line.
//!
//! Each line carries the receive time (RFC 3339, UTC), the address as six hex
//! digits and every field of the decoded record.

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

use crate::legacy::record::AircraftStateRecord;
use crate::link::TrafficSink;

#[derive(Serialize)]
struct TrafficLine<'a> {
    received_at: String,
    hex: String,
    #[serde(flatten)]
    record: &'a AircraftStateRecord,
}

/// Traffic sink writing JSON Lines to any writer
pub struct JsonlSink<W: Write + Send> {
    writer: W,
    written: u64,
    errors: u64,
}

impl<W: Write + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            errors: 0,
        }
    }

    /// Serialize one record as a single line
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the underlying write fails
    pub fn write_record(&mut self, record: &AircraftStateRecord) -> std::io::Result<()> {
        let line = TrafficLine {
            received_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            hex: format!("{:06X}", record.address),
            record,
        };

        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Records written successfully
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Records lost to write errors
    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TrafficSink for JsonlSink<W> {
    fn deliver(&mut self, record: AircraftStateRecord) {
        match self.write_record(&record) {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.errors += 1;
                warn!("Failed to write traffic record: {}", e);
            }
        }
    }
}

//! # rf-legacy
//!
//! Decode legacy proximity-awareness radio frames from a capture stream.
//!
//! Reads one hex-encoded frame per line on stdin, either a bare codec frame
//! (payload + CRC) or a complete on-air frame (preamble, sync word and
//! Manchester-coded body), and writes each accepted aircraft as a JSON line
//! on stdout. Logs go to stderr.
//!
//! A line may start with `@<unix seconds>` to give the time the frame was
//! received. Recorded captures need it: the keys and the version 7 time
//! field only make sense against the clock of the original reception.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use rf_legacy::config::Config;
use rf_legacy::legacy::codec::VersionedCodec;
use rf_legacy::legacy::framing::AirFrame;
use rf_legacy::link::{Receiver, Transmitter};
use rf_legacy::telemetry::JsonlSink;

/// Configuration used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of input lines between status log messages
const LOG_INTERVAL_LINES: u64 = 1000;

/// Parse a hex frame; whitespace and `:` separators are ignored
fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':')
        .collect();

    if digits.is_empty() {
        return None;
    }
    hex::decode(digits).ok()
}

/// Split an input line into its optional `@<epoch>` receive time and frame
fn parse_line(line: &str) -> Option<(Option<u32>, Vec<u8>)> {
    let (epoch, frame) = match line.strip_prefix('@') {
        Some(rest) => {
            let (epoch, frame) = rest.split_once(char::is_whitespace)?;
            (Some(epoch.parse().ok()?), frame)
        }
        None => (None, line),
    };
    Some((epoch, parse_hex(frame)?))
}

/// Receiver clock as UNIX seconds
fn now_epoch() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Main entry point for rf-legacy
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber (stderr)
///    - Load configuration (first argument or `config/default.toml`)
///    - Build the codec for the configured version
///
/// 2. **Main Loop**
///    - Decode each stdin line against the configured own position and
///      the line's receive time, or the current time
///    - Forward accepted records to the JSONL sink
///    - Handle Ctrl+C or end of input for shutdown
///
/// 3. **Shutdown**
///    - Log codec and receiver counters
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or stdin fails
///
/// # Examples
///
/// ```bash
/// cat capture.hex | cargo run --release -- config/default.toml > traffic.jsonl
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("rf-legacy v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    let codec = Arc::new(VersionedCodec::for_version(config.radio.version)?);
    let descriptor = codec.descriptor();
    info!(
        "Protocol {} version {}, own address {:06X}",
        descriptor.name,
        codec.version(),
        config.own_ship.address
    );

    // Own-ship beacon for the current second, for checking against a capture
    let transmitter = Transmitter::new(Arc::clone(&codec));
    let mut own = config.own_ship_record();
    own.timestamp = now_epoch();
    let beacon = transmitter.air_frame(&own)?;
    debug!(
        "Own-ship air frame {} (next in {:?})",
        hex::encode_upper(&beacon),
        transmitter.next_interval(&mut rand::rng())
    );

    let output: Box<dyn Write + Send> = if config.telemetry.enabled {
        Box::new(std::io::stdout())
    } else {
        Box::new(std::io::sink())
    };
    let mut receiver = Receiver::new(
        Arc::clone(&codec),
        config.own_ship.address,
        config.receiver.drop_own_packets,
        JsonlSink::new(output),
    );

    let air_size = AirFrame::air_size(descriptor);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_count: u64 = 0;

    info!("Reading frames from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("End of input");
                    break;
                };

                line_count += 1;
                let text = line.trim();
                if text.is_empty() || text.starts_with('#') {
                    continue;
                }

                let Some((received_at, bytes)) = parse_line(text) else {
                    warn!("Line {}: not a hex frame", line_count);
                    continue;
                };

                let reference = config.reference(received_at.unwrap_or_else(now_epoch));
                let result = if bytes.len() == air_size {
                    receiver.receive_air(&bytes, &reference)
                } else {
                    receiver.receive(&bytes, &reference)
                };

                if let Err(e) = result {
                    debug!("Line {}: {}", line_count, e);
                }

                if line_count % LOG_INTERVAL_LINES == 0 {
                    info!("Processed {} lines, {} delivered",
                        line_count, receiver.stats().delivered);
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let codec_stats = codec.stats().snapshot();
    let receiver_stats = receiver.stats();
    info!(
        "Decoded {} ({} dropped: {} length, {} checksum, {} parity, {} payload)",
        codec_stats.decoded,
        codec_stats.dropped(),
        codec_stats.length_mismatch,
        codec_stats.bad_checksum,
        codec_stats.bad_parity,
        codec_stats.bad_payload
    );
    info!(
        "Delivered {}, own packets {}, framing errors {}, output errors {}",
        receiver_stats.delivered,
        receiver_stats.own_ship,
        receiver_stats.framing,
        receiver.sink().errors()
    );

    Ok(())
}

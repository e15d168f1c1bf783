//! Hardware event source: classifies the device's line protocol into
//! discrete solar/wind condition events and pumps them into the
//! controller's bounded queue.
//!
//! The transport is anything that yields lines. Two lines are understood:
//!
//! ```text
//! raw=512, base=300, state=L        # light sensor: A(mbient)/L(it)/B(locked)
//! [SPINNING] rotor at 4.2 Hz        # wind rotor marker
//! ```
//!
//! Anything else is skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Classified light-sensor condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum SolarCondition {
    Ambient,
    Bright,
    Blocked,
}

/// Classified wind-rotor condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum WindCondition {
    Stopped,
    Spinning,
}

/// One classified hardware observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareEvent {
    Solar(SolarCondition),
    Wind(WindCondition),
}

static SOLAR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)raw\s*=\s*\d+(?:\.\d+)?\s*,\s*base\s*=\s*\d+(?:\.\d+)?\s*,\s*state\s*=\s*([ALB])")
        .expect("solar line pattern")
});

static WIND_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(SPINNING|STOPPED)\]").expect("wind line pattern"));

/// Classify a raw protocol line. Returns `None` for noise.
pub fn classify_line(line: &str) -> Option<HardwareEvent> {
    if let Some(captures) = SOLAR_LINE.captures(line) {
        let condition = match captures[1].to_ascii_uppercase().as_str() {
            "L" => SolarCondition::Bright,
            "B" => SolarCondition::Blocked,
            _ => SolarCondition::Ambient,
        };
        return Some(HardwareEvent::Solar(condition));
    }
    if let Some(captures) = WIND_LINE.captures(line) {
        let condition = if captures[1].eq_ignore_ascii_case("SPINNING") {
            WindCondition::Spinning
        } else {
            WindCondition::Stopped
        };
        return Some(HardwareEvent::Wind(condition));
    }
    None
}

/// Read lines until EOF or cancellation, pushing classified events.
///
/// Runs on its own task so a blocking device never stalls the tick path.
/// A full queue drops the event with a warning; a newer classification
/// supersedes a stale one anyway.
pub async fn pump_lines<R>(
    reader: R,
    events: mpsc::Sender<HardwareEvent>,
    cancel: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                info!("hardware reader stopping");
                return;
            }
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                let Some(event) = classify_line(&line) else {
                    debug!(%line, "unclassified hardware line");
                    continue;
                };
                if events.try_send(event).is_err() {
                    warn!(?event, "hardware event queue full, dropping event");
                }
            }
            Ok(None) => {
                info!("hardware stream closed");
                return;
            }
            Err(e) => {
                warn!(error = %e, "hardware read failed");
                return;
            }
        }
    }
}

/// Open a line-oriented device node (serial port, fifo, or capture file)
/// and pump its events. Failure to open is logged and disables the source;
/// it never takes the controller down.
pub async fn run_device_reader(
    device: String,
    events: mpsc::Sender<HardwareEvent>,
    cancel: CancellationToken,
) {
    match tokio::fs::File::open(&device).await {
        Ok(file) => {
            info!(%device, "hardware device opened");
            pump_lines(BufReader::new(file), events, cancel).await;
        }
        Err(e) => {
            warn!(%device, error = %e, "hardware device unavailable, events disabled");
        }
    }
}

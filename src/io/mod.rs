// src/io/mod.rs
//
// Serial ingestion pipeline: line framing, status-line parsing, and the
// per-source read loop. Two independently-lifecycled sources feed the same
// shared telemetry store.

pub mod framer;
pub mod parser;
pub mod serial;

use std::fmt;

// ============================================================================
// Sources
// ============================================================================

/// The two telemetry sources. Baud rates are fixed per device class and are
/// never negotiated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// Arduino-class board - servo/motor status lines
    Arduino,
    /// RP2350-class board - temperature/humidity/soil lines
    Rp2350,
}

impl SourceId {
    pub const ALL: [SourceId; 2] = [SourceId::Arduino, SourceId::Rp2350];

    pub fn baud(self) -> u32 {
        match self {
            SourceId::Arduino => 9_600,
            SourceId::Rp2350 => 115_200,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceId::Arduino => "arduino",
            SourceId::Rp2350 => "rp2350",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Link status and lifecycle messages
// ============================================================================

/// Connection status of one source link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connected,
    Error,
}

impl LinkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkStatus::Disconnected => "Disconnected",
            LinkStatus::Connected => "Connected",
            LinkStatus::Error => "Error",
        }
    }
}

/// Lifecycle message from a read loop to the dashboard task.
#[derive(Debug)]
pub enum SourceMessage {
    /// Port opened successfully (source, port path)
    Connected(SourceId, String),
    /// Read loop exited (source, reason: "stopped" | "disconnected" | "error")
    Ended(SourceId, String),
    /// Connect or mid-stream failure (source, error)
    Error(SourceId, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_rates_are_fixed_per_source() {
        assert_eq!(SourceId::Arduino.baud(), 9_600);
        assert_eq!(SourceId::Rp2350.baud(), 115_200);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(SourceId::Arduino.to_string(), "arduino");
        assert_eq!(SourceId::Rp2350.to_string(), "rp2350");
    }
}

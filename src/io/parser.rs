// src/io/parser.rs
//
// Status-line field extractor.
//
// Each line is scanned independently for six tokens:
//   Temp: <float>  Humidity: <float>  Pot: <int>  Servo: <int>  Motor: <int>
// plus a trailing ON/OFF pump token. Matching is case-insensitive, a line may
// update several fields at once, and unmatched fields stay untouched. When no
// trailing ON/OFF token is present the pump flag is recomputed as
// (motor PWM > 0) from the post-update motor value - even for lines that
// carried no motor field, and even for lines with no recognized fields.

use crate::io::SourceId;
use crate::telemetry::TelemetryStore;

// ============================================================================
// Line update
// ============================================================================

/// Fields recognised in one status line. `None` means the token was absent
/// (or its value failed to parse) and the stored value must not change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineUpdate {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pot: Option<u32>,
    pub servo: Option<u32>,
    pub motor: Option<u32>,
    /// Explicit trailing ON/OFF token, if present
    pub pump: Option<bool>,
}

impl LineUpdate {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.pot.is_none()
            && self.servo.is_none()
            && self.motor.is_none()
            && self.pump.is_none()
    }
}

/// Scan one complete line for telemetry tokens.
pub fn parse_status_line(line: &str) -> LineUpdate {
    LineUpdate {
        temperature: find_number_after(line, "Temp:", true, true).and_then(|s| s.parse().ok()),
        humidity: find_number_after(line, "Humidity:", false, true).and_then(|s| s.parse().ok()),
        pot: find_number_after(line, "Pot:", false, false).and_then(|s| s.parse().ok()),
        servo: find_number_after(line, "Servo:", false, false).and_then(|s| s.parse().ok()),
        motor: find_number_after(line, "Motor:", false, false).and_then(|s| s.parse().ok()),
        pump: trailing_status(line),
    }
}

/// Parse one line and apply it to the store.
///
/// All field assignments plus the pump derivation happen under a single
/// write, so a sampling read sees either none or all of a line's effects.
/// The source tag is provenance only - it never routes fields.
pub fn apply_line(store: &TelemetryStore, source: SourceId, line: &str) {
    let update = parse_status_line(line);
    if !update.is_empty() {
        tlog!("[{}] {:?}", source, update);
    }

    store.update(|snap| {
        if let Some(v) = update.temperature {
            snap.temperature = v;
        }
        if let Some(v) = update.humidity {
            snap.humidity = v;
        }
        if let Some(v) = update.pot {
            snap.pot = v;
        }
        if let Some(v) = update.servo {
            snap.servo = v;
        }
        if let Some(v) = update.motor {
            snap.motor = v;
        }
        // Explicit token wins; otherwise infer from the (possibly stale)
        // motor value after this line's own update.
        snap.pump_on = match update.pump {
            Some(on) => on,
            None => snap.motor > 0,
        };
    });
}

// ============================================================================
// Token scanning
// ============================================================================

/// Find the first case-insensitive occurrence of `keyword` that is followed
/// (after optional spaces/tabs) by a number, and return the number's text.
/// Occurrences without a parseable number are skipped, so "Temp: n/a Temp: 7"
/// still yields "7".
fn find_number_after<'a>(
    line: &'a str,
    keyword: &str,
    allow_sign: bool,
    allow_fraction: bool,
) -> Option<&'a str> {
    let bytes = line.as_bytes();
    let key = keyword.as_bytes();
    if key.is_empty() || bytes.len() < key.len() {
        return None;
    }

    for start in 0..=bytes.len() - key.len() {
        if bytes[start..start + key.len()].eq_ignore_ascii_case(key) {
            if let Some(num) = scan_number(&line[start + key.len()..], allow_sign, allow_fraction)
            {
                return Some(num);
            }
        }
    }
    None
}

/// Scan a number at the start of `rest`, after optional spaces/tabs:
/// optional minus sign (if allowed), one or more digits, and an optional
/// fractional part (if allowed). Returns the matched slice.
fn scan_number(rest: &str, allow_sign: bool, allow_fraction: bool) -> Option<&str> {
    let bytes = rest.as_bytes();
    let mut i = 0;

    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    let start = i;

    if allow_sign && i < bytes.len() && bytes[i] == b'-' {
        i += 1;
    }

    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }

    if allow_fraction && i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    Some(&rest[start..i])
}

/// Detect a trailing ON/OFF token: whitespace, then ON or OFF
/// (case-insensitive), then nothing but trailing whitespace. A line that is
/// only "ON" does not count - the token must be preceded by whitespace.
fn trailing_status(line: &str) -> Option<bool> {
    let trimmed = line.trim_end();
    let idx = trimmed.rfind(char::is_whitespace)?;
    let token = trimmed[idx..].trim_start();
    if token.eq_ignore_ascii_case("on") {
        Some(true)
    } else if token.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetrySnapshot;

    fn apply(store: &TelemetryStore, line: &str) {
        apply_line(store, SourceId::Arduino, line);
    }

    #[test]
    fn test_combined_line_updates_all_fields() {
        let store = TelemetryStore::new();
        apply(&store, "Temp: 23.5 Humidity: 60 Pot: 512 Servo: 90 Motor: 128 ON");
        assert_eq!(
            store.snapshot(),
            TelemetrySnapshot {
                temperature: 23.5,
                humidity: 60.0,
                pot: 512,
                servo: 90,
                motor: 128,
                pump_on: true,
            }
        );
    }

    #[test]
    fn test_single_token_mutates_exactly_one_field() {
        let store = TelemetryStore::new();
        store.update(|s| {
            s.temperature = 1.0;
            s.humidity = 2.0;
            s.pot = 3;
            s.servo = 4;
        });
        apply(&store, "Servo: 45");
        let snap = store.snapshot();
        assert_eq!(snap.servo, 45);
        assert_eq!(snap.temperature, 1.0);
        assert_eq!(snap.humidity, 2.0);
        assert_eq!(snap.pot, 3);
        assert_eq!(snap.motor, 0);
    }

    #[test]
    fn test_pump_recomputed_from_motor_zero() {
        let store = TelemetryStore::new();
        store.update(|s| s.pump_on = true);
        apply(&store, "Motor: 0");
        let snap = store.snapshot();
        assert_eq!(snap.motor, 0);
        assert!(!snap.pump_on);
    }

    #[test]
    fn test_pump_recomputed_from_motor_positive() {
        let store = TelemetryStore::new();
        apply(&store, "Motor: 50 Servo: 10");
        let snap = store.snapshot();
        assert_eq!(snap.motor, 50);
        assert_eq!(snap.servo, 10);
        assert!(snap.pump_on);
    }

    #[test]
    fn test_unrecognized_line_still_recomputes_pump() {
        let store = TelemetryStore::new();
        store.update(|s| {
            s.motor = 77;
            s.pump_on = false;
        });
        let before = store.snapshot();
        apply(&store, "booting up");
        let snap = store.snapshot();
        // No field changed, but pump was re-derived from the stale motor value
        assert_eq!(snap.motor, before.motor);
        assert_eq!(snap.temperature, before.temperature);
        assert!(snap.pump_on);
    }

    #[test]
    fn test_explicit_off_overrides_positive_motor() {
        let store = TelemetryStore::new();
        apply(&store, "Motor: 200 OFF");
        let snap = store.snapshot();
        assert_eq!(snap.motor, 200);
        assert!(!snap.pump_on);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let update = parse_status_line("TEMP: -3.5 humidity: 41.2 pot: 7 servo: 12 MOTOR: 9 off");
        assert_eq!(update.temperature, Some(-3.5));
        assert_eq!(update.humidity, Some(41.2));
        assert_eq!(update.pot, Some(7));
        assert_eq!(update.servo, Some(12));
        assert_eq!(update.motor, Some(9));
        assert_eq!(update.pump, Some(false));
    }

    #[test]
    fn test_bare_status_token_does_not_match() {
        // The ON/OFF token must be preceded by whitespace
        assert_eq!(parse_status_line("ON").pump, None);
        assert_eq!(parse_status_line("OFF").pump, None);
        assert_eq!(parse_status_line("Pump ON").pump, Some(true));
        assert_eq!(parse_status_line("Pump ON  ").pump, Some(true));
    }

    #[test]
    fn test_integer_field_stops_at_decimal_point() {
        // "Pot: 51.2" reads the integer prefix, like the original parser
        assert_eq!(parse_status_line("Pot: 51.2").pot, Some(51));
    }

    #[test]
    fn test_keyword_without_number_is_skipped() {
        let update = parse_status_line("Temp: n/a Temp: 7.25");
        assert_eq!(update.temperature, Some(7.25));
        assert!(parse_status_line("Temp:").temperature.is_none());
    }

    #[test]
    fn test_negative_only_allowed_for_temperature() {
        assert_eq!(parse_status_line("Temp: -10.5").temperature, Some(-10.5));
        assert_eq!(parse_status_line("Humidity: -5").humidity, None);
        assert_eq!(parse_status_line("Motor: -5").motor, None);
    }

    #[test]
    fn test_longer_word_does_not_shadow_keyword() {
        // "Temperature:" does not contain the literal "Temp:" token
        assert!(parse_status_line("Temperature: 23.5").temperature.is_none());
    }

    #[test]
    fn test_empty_update_detection() {
        assert!(parse_status_line("no telemetry here").is_empty());
        assert!(!parse_status_line("Pot: 1").is_empty());
    }
}

// src/telemetry.rs
//
// Shared latest-value telemetry snapshot.
// Both serial read loops write fields here through the store handle; the
// render loop samples it on a fixed timer. Last write wins per field, with
// no per-source partitioning - history lives only in the chart series.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// Snapshot
// ============================================================================

/// Most recent value for each telemetry channel plus the derived pump flag.
/// Created once at startup with all-zero defaults and mutated in place for
/// the process lifetime.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Temperature in °C (signed, fractional)
    pub temperature: f64,
    /// Relative humidity in % (fractional)
    pub humidity: f64,
    /// Soil moisture potentiometer/ADC reading (device-native range)
    pub pot: u32,
    /// Servo angle in degrees
    pub servo: u32,
    /// Motor/pump PWM duty (device-native range)
    pub motor: u32,
    /// Pump state: explicit trailing ON/OFF token, or inferred as motor > 0
    pub pump_on: bool,
}

// ============================================================================
// Store
// ============================================================================

/// Cloneable handle to the shared snapshot.
///
/// The lock serialises field writes from the two read loops against each
/// other and against the sampling read, so the dashboard never observes a
/// torn update. Writers hold the lock only for the duration of one line's
/// field assignments.
#[derive(Clone, Default)]
pub struct TelemetryStore {
    inner: Arc<RwLock<TelemetrySnapshot>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot. Never blocks writers longer than the clone.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.read_guard().clone()
    }

    /// Apply a mutation under the write lock.
    pub fn update<F: FnOnce(&mut TelemetrySnapshot)>(&self, f: F) {
        f(&mut self.write_guard());
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, TelemetrySnapshot> {
        match self.inner.read() {
            Ok(guard) => guard,
            // A writer can only panic inside `update`'s closure; the snapshot
            // itself is plain data, so keep serving it.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, TelemetrySnapshot> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ============================================================================
// Channels
// ============================================================================

/// The five charted telemetry channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Humidity,
    SoilMoisture,
    ServoAngle,
    MotorPwm,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Temperature,
        Channel::Humidity,
        Channel::SoilMoisture,
        Channel::ServoAngle,
        Channel::MotorPwm,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature",
            Channel::Humidity => "Humidity",
            Channel::SoilMoisture => "Soil Moisture",
            Channel::ServoAngle => "Servo",
            Channel::MotorPwm => "Motor",
        }
    }

    /// Fixed display range for axis scaling. Not a validity clamp - values
    /// outside the range are stored and plotted as-is.
    pub fn display_range(self) -> (f64, f64) {
        match self {
            Channel::Temperature => (-10.0, 50.0),
            Channel::Humidity => (0.0, 100.0),
            Channel::SoilMoisture => (0.0, 4095.0),
            Channel::ServoAngle => (0.0, 180.0),
            Channel::MotorPwm => (0.0, 255.0),
        }
    }

    /// Current value of this channel in the given snapshot.
    pub fn sample(self, snap: &TelemetrySnapshot) -> f64 {
        match self {
            Channel::Temperature => snap.temperature,
            Channel::Humidity => snap.humidity,
            Channel::SoilMoisture => snap.pot as f64,
            Channel::ServoAngle => snap.servo as f64,
            Channel::MotorPwm => snap.motor as f64,
        }
    }

    /// Human-readable readout string for the current value.
    pub fn readout(self, snap: &TelemetrySnapshot) -> String {
        match self {
            Channel::Temperature => format!("Temperature: {:.1} °C", snap.temperature),
            Channel::Humidity => format!("Humidity: {:.0} %", snap.humidity),
            Channel::SoilMoisture => format!("Soil Moisture (ADC): {} ADC", snap.pot),
            Channel::ServoAngle => format!("Servo Angle: {}°", snap.servo),
            Channel::MotorPwm => format!(
                "Motor / Pump PWM: {} PWM {}",
                snap.motor,
                if snap.pump_on { "(ON)" } else { "(OFF)" }
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_are_zero() {
        let snap = TelemetryStore::new().snapshot();
        assert_eq!(snap.temperature, 0.0);
        assert_eq!(snap.humidity, 0.0);
        assert_eq!(snap.pot, 0);
        assert_eq!(snap.servo, 0);
        assert_eq!(snap.motor, 0);
        assert!(!snap.pump_on);
    }

    #[test]
    fn test_update_is_visible_to_snapshot() {
        let store = TelemetryStore::new();
        store.update(|s| {
            s.temperature = 23.5;
            s.motor = 128;
            s.pump_on = true;
        });
        let snap = store.snapshot();
        assert_eq!(snap.temperature, 23.5);
        assert_eq!(snap.motor, 128);
        assert!(snap.pump_on);
    }

    #[test]
    fn test_concurrent_disjoint_writers_never_tear_a_read() {
        // Two writers hammer disjoint fields with paired values; a sampling
        // reader must always see each pair consistent.
        let store = TelemetryStore::new();
        let w1 = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2_000u32 {
                    store.update(|s| {
                        s.servo = i;
                        s.motor = i;
                    });
                }
            })
        };
        let w2 = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2_000u32 {
                    store.update(|s| {
                        s.pot = i;
                        s.humidity = i as f64;
                    });
                }
            })
        };
        for _ in 0..2_000 {
            let snap = store.snapshot();
            assert_eq!(snap.servo, snap.motor, "torn write from source one");
            assert_eq!(snap.pot as f64, snap.humidity, "torn write from source two");
        }
        w1.join().unwrap();
        w2.join().unwrap();
    }

    #[test]
    fn test_readout_formats() {
        let snap = TelemetrySnapshot {
            temperature: 23.56,
            humidity: 60.4,
            pot: 512,
            servo: 90,
            motor: 128,
            pump_on: true,
        };
        assert_eq!(
            Channel::Temperature.readout(&snap),
            "Temperature: 23.6 °C"
        );
        assert_eq!(Channel::Humidity.readout(&snap), "Humidity: 60 %");
        assert_eq!(
            Channel::SoilMoisture.readout(&snap),
            "Soil Moisture (ADC): 512 ADC"
        );
        assert_eq!(Channel::ServoAngle.readout(&snap), "Servo Angle: 90°");
        assert_eq!(
            Channel::MotorPwm.readout(&snap),
            "Motor / Pump PWM: 128 PWM (ON)"
        );
    }

    #[test]
    fn test_readout_pump_off() {
        let snap = TelemetrySnapshot::default();
        assert_eq!(
            Channel::MotorPwm.readout(&snap),
            "Motor / Pump PWM: 0 PWM (OFF)"
        );
    }

    #[test]
    fn test_display_ranges_match_device_scales() {
        assert_eq!(Channel::SoilMoisture.display_range(), (0.0, 4095.0));
        assert_eq!(Channel::MotorPwm.display_range(), (0.0, 255.0));
        assert_eq!(Channel::Temperature.display_range(), (-10.0, 50.0));
    }
}

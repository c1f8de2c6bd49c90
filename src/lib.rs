// src/lib.rs
//
// greendeck - live terminal dashboard for a two-microcontroller greenhouse rig.
//
// An Arduino-class board (9600 baud) and an RP2350-class board (115200 baud)
// each emit free-form ASCII status lines. Both streams are framed into lines,
// scanned for telemetry tokens, and merged into one shared latest-value
// snapshot that the dashboard samples on a fixed timer.

#[macro_use]
pub mod logging;

pub mod io;
pub mod link;
pub mod settings;
pub mod telemetry;
pub mod ui;

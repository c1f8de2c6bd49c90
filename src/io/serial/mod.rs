// src/io/serial/mod.rs
//
// Serial port reader for one telemetry source.

mod reader;

pub use reader::{list_serial_ports, run_source, SerialPortInfo};

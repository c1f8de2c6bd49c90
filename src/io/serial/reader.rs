// src/io/serial/reader.rs
//
// Blocking serial read loop for one telemetry source.
// Feeds raw bytes through the line framer into the status-line parser and
// reports lifecycle events back to the dashboard task. On a mid-stream
// fault the port is reopened with capped backoff instead of spinning, so a
// dead device ends the link with an explicit terminal status.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::io::framer::LineFramer;
use crate::io::parser;
use crate::io::{SourceId, SourceMessage};
use crate::telemetry::TelemetryStore;

/// Poll timeout per blocking read. Short enough that a raised stop flag is
/// observed promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Reopen attempts after a mid-stream fault before the link is declared dead.
const MAX_REOPEN_ATTEMPTS: u32 = 3;

/// Base backoff between reopen attempts; scaled by the attempt number.
const REOPEN_BACKOFF: Duration = Duration::from_millis(250);

/// Run one source's read loop until the stop flag is raised or the port is
/// lost for good. Blocking serial I/O runs on a dedicated thread.
pub async fn run_source(
    source: SourceId,
    port_path: String,
    stop_flag: Arc<AtomicBool>,
    store: TelemetryStore,
    tx: mpsc::Sender<SourceMessage>,
) {
    let result = tokio::task::spawn_blocking(move || {
        run_source_blocking(source, port_path, stop_flag, store, tx)
    })
    .await;

    if let Err(e) = result {
        tlog!("[{}] Read task panicked: {:?}", source, e);
    }
}

fn open_port(port_path: &str, baud: u32) -> Result<Box<dyn serialport::SerialPort>, String> {
    serialport::new(port_path, baud)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| format!("Failed to open {}: {}", port_path, e))
}

fn run_source_blocking(
    source: SourceId,
    port_path: String,
    stop_flag: Arc<AtomicBool>,
    store: TelemetryStore,
    tx: mpsc::Sender<SourceMessage>,
) {
    let mut port = match open_port(&port_path, source.baud()) {
        Ok(p) => p,
        Err(e) => {
            tlog!("[{}] {}", source, e);
            let _ = tx.blocking_send(SourceMessage::Error(source, e));
            return;
        }
    };

    tlog!(
        "[{}] Opened {} at {} baud",
        source,
        port_path,
        source.baud()
    );
    let _ = tx.blocking_send(SourceMessage::Connected(source, port_path.clone()));

    let mut framer = LineFramer::new();
    let mut buf = [0u8; 256];
    let mut reopens = 0u32;

    let reason = 'outer: loop {
        // Inner read pass: runs until the stop flag, a fault, or EOF.
        let fault = loop {
            if stop_flag.load(Ordering::SeqCst) {
                break 'outer "stopped";
            }

            match port.read(&mut buf) {
                Ok(n) if n > 0 => {
                    // Live data resets the reopen budget
                    reopens = 0;
                    for line in framer.feed(&buf[..n]) {
                        if line.is_empty() {
                            continue;
                        }
                        tlog!("[{}] {}", source, line);
                        parser::apply_line(&store, source, &line);
                    }
                }
                Ok(_) => break "port reported EOF".to_string(),
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    // Timeout is expected for serial reads
                }
                Err(e) => break format!("read error: {}", e),
            }
        };

        // A faulted pass invalidates any partial line it buffered
        if let Some(tail) = framer.flush() {
            tlog!(
                "[{}] Discarding {} unterminated bytes after fault",
                source,
                tail.len()
            );
        }

        // Capped reconnect with backoff
        loop {
            reopens += 1;
            if reopens > MAX_REOPEN_ATTEMPTS {
                tlog!(
                    "[{}] {} - giving up after {} reopen attempts",
                    source,
                    fault,
                    MAX_REOPEN_ATTEMPTS
                );
                let _ = tx.blocking_send(SourceMessage::Error(
                    source,
                    format!("{} ({} reopen attempts failed)", fault, MAX_REOPEN_ATTEMPTS),
                ));
                break 'outer "error";
            }

            tlog!(
                "[{}] {} - reopening {} (attempt {}/{})",
                source,
                fault,
                port_path,
                reopens,
                MAX_REOPEN_ATTEMPTS
            );
            std::thread::sleep(REOPEN_BACKOFF * reopens);

            if stop_flag.load(Ordering::SeqCst) {
                break 'outer "stopped";
            }

            match open_port(&port_path, source.baud()) {
                Ok(p) => {
                    port = p;
                    tlog!("[{}] Reopened {}", source, port_path);
                    break;
                }
                Err(e) => tlog!("[{}] {}", source, e),
            }
        }
    };

    // Trailing unterminated line at stream end is dropped by design
    if let Some(tail) = framer.flush() {
        tlog!(
            "[{}] Dropping unterminated tail ({} bytes)",
            source,
            tail.len()
        );
    }

    tlog!("[{}] Read loop ended: {}", source, reason);
    let _ = tx.blocking_send(SourceMessage::Ended(source, reason.to_string()));
}

// ============================================================================
// Port enumeration
// ============================================================================

/// Information about an available serial port.
#[derive(Clone, Debug)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// List available serial ports.
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The cu (calling unit) devices are non-blocking and preferred for outgoing
/// connections; the tty devices block on open waiting for carrier detect.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports =
        serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    Ok(ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, manufacturer, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    ("USB".to_string(), info.manufacturer, info.product)
                }
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None)
                }
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None),
                serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None),
            };
            SerialPortInfo {
                port_name: p.port_name,
                port_type,
                manufacturer,
                product,
            }
        })
        .collect())
}

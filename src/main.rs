// src/main.rs
//
// greendeck - terminal telemetry dashboard for a two-board greenhouse rig.
// An Arduino (9600 baud) and an RP2350 (115200 baud) both emit plain-text
// status lines; every recognised field lands in one shared snapshot that the
// dashboard samples on a fixed cadence.

use std::collections::HashMap;
use std::time::Duration;

use clap::Parser;

use greendeck::io::serial::list_serial_ports;
use greendeck::io::SourceId;
use greendeck::link::LinkManager;
use greendeck::settings::{load_settings, AppSettings};
use greendeck::telemetry::TelemetryStore;
use greendeck::{tlog, ui};

#[derive(Parser, Debug)]
#[command(name = "greendeck", about = "Terminal dashboard for serial greenhouse telemetry")]
struct Args {
    /// Serial device for the Arduino source (overrides settings)
    #[arg(long)]
    arduino_port: Option<String>,

    /// Serial device for the RP2350 source (overrides settings)
    #[arg(long)]
    rp2350_port: Option<String>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Log snapshots to stderr instead of drawing the dashboard
    #[arg(long)]
    headless: bool,

    /// Connect all configured sources on startup
    #[arg(long)]
    connect: bool,

    /// Write the log to a timestamped file in the configured log directory
    #[arg(long)]
    log_file: bool,
}

fn print_ports() -> Result<(), String> {
    let ports = list_serial_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }
    for port in ports {
        let detail = match (port.manufacturer, port.product) {
            (Some(m), Some(p)) => format!(" ({} {})", m, p),
            (Some(m), None) => format!(" ({})", m),
            (None, Some(p)) => format!(" ({})", p),
            (None, None) => String::new(),
        };
        println!("{}  [{}]{}", port.port_name, port.port_type, detail);
    }
    Ok(())
}

/// Build the source-to-port map from settings plus CLI overrides.
/// Overrides apply for this run only; the settings file is not rewritten.
fn resolve_ports(settings: &AppSettings, args: &Args) -> HashMap<SourceId, String> {
    let mut ports = HashMap::new();
    if let Some(port) = args.arduino_port.clone().or_else(|| settings.arduino_port.clone()) {
        ports.insert(SourceId::Arduino, port);
    }
    if let Some(port) = args.rp2350_port.clone().or_else(|| settings.rp2350_port.clone()) {
        ports.insert(SourceId::Rp2350, port);
    }
    ports
}

/// Snapshot logger for terminals that cannot host the dashboard.
async fn run_headless(
    store: TelemetryStore,
    mut manager: LinkManager,
    mut rx: tokio::sync::mpsc::Receiver<greendeck::io::SourceMessage>,
    sample_interval: Duration,
) -> Result<(), String> {
    let mut ticker = tokio::time::interval(sample_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snap = store.snapshot();
                tlog!(
                    "temp={:.1} humidity={:.0} pot={} servo={} motor={} pump={}",
                    snap.temperature,
                    snap.humidity,
                    snap.pot,
                    snap.servo,
                    snap.motor,
                    if snap.pump_on { "ON" } else { "OFF" }
                );
            }
            msg = rx.recv() => {
                if let Some(msg) = msg {
                    manager.handle_message(msg);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tlog!("Interrupted, shutting down");
                break;
            }
        }
    }

    manager.disconnect_all().await;
    Ok(())
}

async fn run(args: Args) -> Result<(), String> {
    if args.list_ports {
        return print_ports();
    }

    let settings = load_settings()?;

    if args.log_file || settings.log_to_file {
        greendeck::logging::init_file_logging(std::path::Path::new(&settings.log_dir))?;
    }

    let ports = resolve_ports(&settings, &args);
    let store = TelemetryStore::new();
    let (mut manager, rx) = LinkManager::new(store.clone(), ports);

    if args.connect {
        for source in SourceId::ALL {
            if manager.port_for(source).is_some() {
                manager.connect(source)?;
            }
        }
    }

    let sample_interval = Duration::from_millis(settings.sample_interval_ms.max(1));

    let result = if args.headless {
        run_headless(store, manager, rx, sample_interval).await
    } else {
        ui::run_dashboard(store, manager, rx, sample_interval, settings.series_window).await
    };

    greendeck::logging::stop_file_logging();
    result
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("greendeck: {}", e);
        std::process::exit(1);
    }
}

// src/link.rs
//
// Connection lifecycle for the two serial telemetry sources.
// Each link is connected independently, runs its own read loop with its own
// stop flag, and reports status changes over a shared channel. Disconnect is
// one unconditional action covering both links.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::io::serial::run_source;
use crate::io::{LinkStatus, SourceId, SourceMessage};
use crate::telemetry::TelemetryStore;

/// One source link: status plus the handles of its active read loop.
struct Link {
    status: LinkStatus,
    stop_flag: Option<Arc<AtomicBool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl Link {
    fn new() -> Self {
        Link {
            status: LinkStatus::Disconnected,
            stop_flag: None,
            task: None,
        }
    }
}

/// Owns the lifecycle of both serial links and the shared telemetry store
/// they feed.
pub struct LinkManager {
    store: TelemetryStore,
    ports: HashMap<SourceId, String>,
    links: HashMap<SourceId, Link>,
    tx: mpsc::Sender<SourceMessage>,
}

impl LinkManager {
    /// Build the manager and the event channel its read loops report on.
    /// `ports` maps each source to its configured device path; a source with
    /// no entry cannot be connected.
    pub fn new(
        store: TelemetryStore,
        ports: HashMap<SourceId, String>,
    ) -> (Self, mpsc::Receiver<SourceMessage>) {
        let (tx, rx) = mpsc::channel(64);
        let links = SourceId::ALL
            .into_iter()
            .map(|source| (source, Link::new()))
            .collect();
        (
            LinkManager {
                store,
                ports,
                links,
                tx,
            },
            rx,
        )
    }

    pub fn status(&self, source: SourceId) -> LinkStatus {
        self.links
            .get(&source)
            .map(|l| l.status)
            .unwrap_or(LinkStatus::Disconnected)
    }

    pub fn port_for(&self, source: SourceId) -> Option<&str> {
        self.ports.get(&source).map(String::as_str)
    }

    /// Start the read loop for one source.
    ///
    /// A missing port configuration fails immediately with no state change;
    /// open failures are reported asynchronously by the read loop and land
    /// the link in Error, leaving connect available for retry.
    pub fn connect(&mut self, source: SourceId) -> Result<(), String> {
        let port_path = self
            .ports
            .get(&source)
            .cloned()
            .ok_or_else(|| format!("No serial port configured for {}", source))?;

        let link = self
            .links
            .get_mut(&source)
            .ok_or_else(|| format!("Unknown source {}", source))?;
        if link.task.is_some() {
            return Err(format!("{} is already connected", source));
        }

        tlog!("[link] Connecting {} on {}", source, port_path);

        let stop_flag = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_source(
            source,
            port_path,
            stop_flag.clone(),
            self.store.clone(),
            self.tx.clone(),
        ));

        link.stop_flag = Some(stop_flag);
        link.task = Some(task);
        Ok(())
    }

    /// Stop both read loops and reset both statuses to Disconnected,
    /// regardless of prior state (including Error). Idempotent - safe to
    /// call with no active connections.
    pub async fn disconnect_all(&mut self) {
        for source in SourceId::ALL {
            let (stop_flag, task) = match self.links.get_mut(&source) {
                Some(link) => (link.stop_flag.take(), link.task.take()),
                None => continue,
            };

            if let Some(flag) = stop_flag {
                flag.store(true, Ordering::SeqCst);
            }
            if let Some(task) = task {
                let _ = task.await;
            }

            if let Some(link) = self.links.get_mut(&source) {
                link.status = LinkStatus::Disconnected;
            }
        }
        tlog!("[link] All sources disconnected");
    }

    /// Apply a lifecycle event from a read loop.
    pub fn handle_message(&mut self, msg: SourceMessage) {
        match msg {
            SourceMessage::Connected(source, port_path) => {
                tlog!("[link] {} connected on {}", source, port_path);
                if let Some(link) = self.links.get_mut(&source) {
                    link.status = LinkStatus::Connected;
                }
            }
            SourceMessage::Ended(source, reason) => {
                tlog!("[link] {} ended: {}", source, reason);
                if let Some(link) = self.links.get_mut(&source) {
                    // An end the user did not request leaves the link in
                    // Error so the UI cannot show a stale Connected; a clean
                    // stop goes back to Disconnected.
                    link.status = if reason == "stopped" {
                        LinkStatus::Disconnected
                    } else {
                        LinkStatus::Error
                    };
                    link.stop_flag = None;
                    link.task = None;
                }
            }
            SourceMessage::Error(source, error) => {
                tlog!("[link] {} error: {}", source, error);
                if let Some(link) = self.links.get_mut(&source) {
                    link.status = LinkStatus::Error;
                    link.stop_flag = None;
                    link.task = None;
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager_with_ports(ports: &[(SourceId, &str)]) -> (LinkManager, mpsc::Receiver<SourceMessage>) {
        let map = ports
            .iter()
            .map(|(s, p)| (*s, p.to_string()))
            .collect::<HashMap<_, _>>();
        LinkManager::new(TelemetryStore::new(), map)
    }

    #[tokio::test]
    async fn test_disconnect_all_with_no_connections() {
        let (mut manager, _rx) = manager_with_ports(&[]);
        manager.disconnect_all().await;
        manager.disconnect_all().await;
        assert_eq!(manager.status(SourceId::Arduino), LinkStatus::Disconnected);
        assert_eq!(manager.status(SourceId::Rp2350), LinkStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_without_configured_port() {
        let (mut manager, _rx) = manager_with_ports(&[]);
        let err = manager.connect(SourceId::Arduino).unwrap_err();
        assert!(err.contains("No serial port configured"));
        // Capability failure attempts no state change
        assert_eq!(manager.status(SourceId::Arduino), LinkStatus::Disconnected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connect_to_missing_device_reports_error() {
        let (mut manager, mut rx) =
            manager_with_ports(&[(SourceId::Arduino, "/dev/greendeck-no-such-port")]);
        manager.connect(SourceId::Arduino).unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event from read loop")
            .expect("channel closed");
        match msg {
            SourceMessage::Error(source, err) => {
                assert_eq!(source, SourceId::Arduino);
                assert!(err.contains("Failed to open"));
                manager.handle_message(SourceMessage::Error(source, err));
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert_eq!(manager.status(SourceId::Arduino), LinkStatus::Error);

        // Error state clears the handles, so connect stays available
        assert!(manager.connect(SourceId::Arduino).is_ok());
        manager.disconnect_all().await;
        assert_eq!(manager.status(SourceId::Arduino), LinkStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_double_connect_is_rejected() {
        let (mut manager, _rx) =
            manager_with_ports(&[(SourceId::Rp2350, "/dev/greendeck-no-such-port")]);
        manager.connect(SourceId::Rp2350).unwrap();
        let err = manager.connect(SourceId::Rp2350).unwrap_err();
        assert!(err.contains("already connected"));
        manager.disconnect_all().await;
    }

    #[tokio::test]
    async fn test_status_transitions_from_messages() {
        let (mut manager, _rx) = manager_with_ports(&[]);

        manager.handle_message(SourceMessage::Connected(
            SourceId::Rp2350,
            "/dev/ttyACM0".to_string(),
        ));
        assert_eq!(manager.status(SourceId::Rp2350), LinkStatus::Connected);

        // A stop the user requested goes back to Disconnected
        manager.handle_message(SourceMessage::Ended(SourceId::Rp2350, "stopped".to_string()));
        assert_eq!(manager.status(SourceId::Rp2350), LinkStatus::Disconnected);

        // An end the user did not request is surfaced as Error
        manager.handle_message(SourceMessage::Connected(
            SourceId::Rp2350,
            "/dev/ttyACM0".to_string(),
        ));
        manager.handle_message(SourceMessage::Ended(SourceId::Rp2350, "error".to_string()));
        assert_eq!(manager.status(SourceId::Rp2350), LinkStatus::Error);
    }
}

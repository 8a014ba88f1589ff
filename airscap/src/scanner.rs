//! Session supervisor
//!
//! One [`Scanner`] supervises one physical device. It owns the session
//! token, the heartbeat task, and the cached identity written during
//! connect. Invariants:
//!
//! - at most one heartbeat task is alive at any time
//! - `connected` is true only after discovery, pairing, and the
//!   initial data-channel probe have all succeeded
//! - cached fields are written only under the supervisor's lock and
//!   read via snapshot; the lock is never held across I/O

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use airscap_core::consts::ports;
use airscap_core::SessionToken;
use airscap_transport::{
    find_scanner, local_ip, ControlChannel, DataChannel, DiscoveryOptions, Heartbeat, ScanSession,
};
use airscap_types::{AdfStatus, ScanConfig, ScanError, ScanParams};

use crate::error::{Error, Result};

/// Interval between reconnect supervisor ticks.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Settle time between heartbeat start and the pairing request.
const HEARTBEAT_SETTLE: Duration = Duration::from_millis(300);

struct ReconnectLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    connected: bool,
    data_port: u16,
    control_port: u16,
    name: String,
    serial: String,
    device_name: String,
    firmware_revision: String,
    scan_params: Option<ScanParams>,
    heartbeat: Option<Heartbeat>,
    reconnect: Option<ReconnectLoop>,
}

/// Supervisor for one scanner session.
pub struct Scanner {
    host: Ipv4Addr,
    token: SessionToken,
    identity: String,
    state: Mutex<State>,
}

impl Scanner {
    /// Create a supervisor targeting the given host with a
    /// pre-computed pairing identity, using the default ports.
    pub fn new(host: Ipv4Addr, identity: String) -> Self {
        Self::with_ports(host, ports::DEFAULT_DATA, ports::DEFAULT_CONTROL, identity)
    }

    /// Create a supervisor with explicit data/control ports.
    pub fn with_ports(host: Ipv4Addr, data_port: u16, control_port: u16, identity: String) -> Self {
        let token = SessionToken::generate();
        debug!(%host, data_port, control_port, token = %token, "scanner created");
        Self {
            host,
            token,
            identity,
            state: Mutex::new(State {
                data_port,
                control_port,
                ..State::default()
            }),
        }
    }

    /// Whether the scanner session is active.
    pub fn online(&self) -> bool {
        self.state.lock().connected
    }

    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    fn control(&self) -> ControlChannel {
        let port = self.state.lock().control_port;
        ControlChannel::new(self.host, port, self.token)
    }

    fn data(&self) -> DataChannel {
        let port = self.state.lock().data_port;
        DataChannel::new(self.host, port, self.token)
    }

    /// Establish a session: discovery, heartbeat, pairing, and the
    /// initial data-channel probes. Idempotent: an existing heartbeat
    /// is torn down first, so calling this while connected performs a
    /// clean reconnect.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<()> {
        let previous = {
            let mut state = self.state.lock();
            state.connected = false;
            state.heartbeat.take()
        };
        if let Some(hb) = previous {
            hb.stop().await;
        }

        // Step 1: UDP discovery lets the scanner learn our token
        debug!(host = %self.host, "discovery");
        let mut opts = DiscoveryOptions::new(self.token);
        opts.scanner_ip = Some(self.host);
        let info = find_scanner(cancel, &opts).await?;

        // Ports from the discovery response override the defaults
        {
            let mut state = self.state.lock();
            if info.data_port != 0 {
                state.data_port = info.data_port;
            }
            if info.control_port != 0 {
                state.control_port = info.control_port;
            }
        }

        // Step 2: heartbeat keeps the pairing alive from here on
        debug!("starting heartbeat");
        let heartbeat = Heartbeat::start(cancel, self.host, &self.token, Duration::ZERO).await?;
        tokio::time::sleep(HEARTBEAT_SETTLE).await;

        // Step 3: pairing
        debug!("configuring session");
        let control = self.control();
        let client_ip = local_ip(Some(self.host));
        let accepted = match control
            .configure(client_ip, ports::CLIENT_NOTIFY, &self.identity)
            .await
        {
            Ok(accepted) => accepted,
            Err(e) => {
                heartbeat.stop().await;
                return Err(e.into());
            }
        };
        if !accepted {
            heartbeat.stop().await;
            return Err(Error::PairingRejected);
        }

        // Step 4: data channel probe, with one retry; the scanner is
        // sometimes still settling right after pairing
        debug!("data channel setup");
        let data = self.data();
        let dev_info = match data.get_device_info().await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "get device info failed, retrying in 2s");
                tokio::time::sleep(Duration::from_secs(2)).await;
                match data.get_device_info().await {
                    Ok(info) => info,
                    Err(e) => {
                        heartbeat.stop().await;
                        return Err(e.into());
                    }
                }
            }
        };

        // Step 5: status check interleaved between data operations,
        // matching the order the official client uses
        if let Err(e) = control.check_status().await {
            warn!(error = %e, "status check failed");
        }

        let scan_params = match data.get_scan_params().await {
            Ok(params) => Some(params),
            Err(e) => {
                warn!(error = %e, "get scan params failed");
                None
            }
        };

        if let Err(e) = data.set_config().await {
            warn!(error = %e, "set config failed");
        }

        {
            let mut state = self.state.lock();
            state.connected = true;
            state.name = info.name.clone();
            state.serial = info.serial.clone();
            state.device_name = dev_info.device_name;
            state.firmware_revision = dev_info.firmware_revision;
            if scan_params.is_some() {
                state.scan_params = scan_params;
            }
            state.heartbeat = Some(heartbeat);
        }
        info!(
            host = %self.host,
            name = %info.name.trim(),
            serial = %info.serial,
            "connected to scanner"
        );
        Ok(())
    }

    /// Deregister from the scanner and stop the heartbeat. Always safe.
    pub async fn disconnect(&self) {
        debug!("disconnecting from scanner");
        if let Err(e) = self.control().deregister().await {
            warn!(error = %e, "deregister failed");
        }
        let heartbeat = {
            let mut state = self.state.lock();
            state.connected = false;
            state.heartbeat.take()
        };
        if let Some(hb) = heartbeat {
            hb.stop().await;
        }
        info!("disconnected from scanner");
    }

    /// Stop the heartbeat and mark the session down.
    async fn mark_offline(&self) {
        let heartbeat = {
            let mut state = self.state.lock();
            if !state.connected {
                return;
            }
            warn!(host = %self.host, "scanner went offline");
            state.connected = false;
            state.heartbeat.take()
        };
        if let Some(hb) = heartbeat {
            hb.stop().await;
        }
    }

    /// Start the background supervisor that health-checks the session
    /// every 5 seconds and reconnects automatically when it drops.
    pub fn start_reconnect_loop(self: &Arc<Self>, parent: &CancellationToken) {
        let cancel = parent.child_token();
        let task_cancel = cancel.clone();
        let scanner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RECONNECT_INTERVAL);
            // The immediate first tick would race the initial connect
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                if scanner.online() {
                    scanner.health_check().await;
                } else {
                    info!(host = %scanner.host, "attempting reconnection");
                    if let Err(e) = scanner.connect(&task_cancel).await {
                        debug!(host = %scanner.host, error = %e, "reconnect failed");
                    }
                }
            }
        });
        let previous = self
            .state
            .lock()
            .reconnect
            .replace(ReconnectLoop { cancel, handle });
        if let Some(prev) = previous {
            prev.cancel.cancel();
        }
    }

    /// Stop the reconnect supervisor and wait for it to exit.
    pub async fn stop_reconnect_loop(&self) {
        let reconnect = self.state.lock().reconnect.take();
        if let Some(rl) = reconnect {
            rl.cancel.cancel();
            let _ = rl.handle.await;
        }
    }

    async fn health_check(&self) {
        if let Err(e) = self.control().check_status().await {
            warn!(error = %e, "health check failed");
            self.mark_offline().await;
        }
    }

    /// Open a lazy scan session. Pages are pulled one at a time via
    /// [`ScanSession::next_page`], so the client can stop after any
    /// page.
    pub async fn start_scan(&self, cfg: &ScanConfig) -> Result<ScanSession> {
        if !self.online() {
            return Err(Error::NotConnected);
        }
        info!(
            color_mode = ?cfg.color_mode,
            quality = ?cfg.quality,
            duplex = cfg.duplex,
            paper_size = ?cfg.paper_size,
            "starting scan session"
        );
        Ok(self.data().start_scan(cfg).await?)
    }

    /// Query the scanner's ADF condition. Must not be called while a
    /// scan session is active; the scanner accepts one data-channel
    /// connection at a time; the adapter enforces this with its
    /// scanning guard.
    pub async fn check_adf_status(&self) -> Result<AdfStatus> {
        if !self.online() {
            return Err(Error::NotConnected);
        }
        Ok(self.data().check_adf_status().await?)
    }

    /// Probe for error conditions via REQUEST SENSE. Subject to the
    /// same single-connection restriction as [`check_adf_status`](Self::check_adf_status).
    pub async fn check_sense_status(&self) -> Result<Option<ScanError>> {
        if !self.online() {
            return Err(Error::NotConnected);
        }
        Ok(self.data().check_sense_status().await?)
    }

    /// Device name from discovery, trimmed.
    pub fn name(&self) -> String {
        self.state.lock().name.trim().to_string()
    }

    /// Serial number from discovery.
    pub fn serial(&self) -> String {
        self.state.lock().serial.clone()
    }

    /// Full device name from the data channel INQUIRY, including the
    /// manufacturer and firmware revision suffix.
    pub fn device_name(&self) -> String {
        self.state.lock().device_name.clone()
    }

    /// Firmware revision from the device name suffix, e.g. "0M00".
    pub fn firmware_revision(&self) -> String {
        self.state.lock().firmware_revision.clone()
    }

    /// Manufacturer: the first token of the device name.
    pub fn manufacturer(&self) -> String {
        let device_name = self.state.lock().device_name.clone();
        device_name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Make and model: the device name without the firmware revision
    /// suffix, falling back to the discovery name.
    pub fn make_and_model(&self) -> String {
        let (device_name, revision, name) = {
            let state = self.state.lock();
            (
                state.device_name.clone(),
                state.firmware_revision.clone(),
                state.name.clone(),
            )
        };
        if device_name.is_empty() {
            return name.trim().to_string();
        }
        let mut model = device_name.trim_end_matches(' ');
        if !revision.is_empty() {
            model = model.strip_suffix(revision.as_str()).unwrap_or(model);
        }
        model.trim_end_matches(' ').to_string()
    }

    /// Cached capabilities from the connect-time probe.
    pub fn scan_params(&self) -> Option<ScanParams> {
        self.state.lock().scan_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn offline_scanner() -> Scanner {
        Scanner::new(Ipv4Addr::new(192, 168, 5, 3), "171136176174".into())
    }

    #[test]
    fn test_new_starts_offline() {
        let scanner = offline_scanner();
        assert!(!scanner.online());
        assert_eq!(scanner.host(), Ipv4Addr::new(192, 168, 5, 3));
        assert_eq!(scanner.scan_params(), None);
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let scanner = offline_scanner();
        assert!(matches!(
            scanner.start_scan(&ScanConfig::default()).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            scanner.check_adf_status().await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            scanner.check_sense_status().await,
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_identity_accessors() {
        let scanner = offline_scanner();
        {
            let mut state = scanner.state.lock();
            state.name = "ScanSnap iX500  ".into();
            state.serial = "iX500-XX0YY00000".into();
            state.device_name = "FUJITSU ScanSnap iX500  0M00".into();
            state.firmware_revision = "0M00".into();
        }
        assert_eq!(scanner.name(), "ScanSnap iX500");
        assert_eq!(scanner.serial(), "iX500-XX0YY00000");
        assert_eq!(scanner.manufacturer(), "FUJITSU");
        assert_eq!(scanner.make_and_model(), "FUJITSU ScanSnap iX500");
        assert_eq!(scanner.firmware_revision(), "0M00");
    }

    #[test]
    fn test_make_and_model_falls_back_to_discovery_name() {
        let scanner = offline_scanner();
        scanner.state.lock().name = "ScanSnap iX500 ".into();
        assert_eq!(scanner.make_and_model(), "ScanSnap iX500");
    }

    #[tokio::test]
    async fn test_stop_reconnect_loop_joins() {
        let scanner = Arc::new(offline_scanner());
        let cancel = CancellationToken::new();
        scanner.start_reconnect_loop(&cancel);
        tokio::time::timeout(Duration::from_secs(1), scanner.stop_reconnect_loop())
            .await
            .expect("reconnect loop did not stop");
    }
}

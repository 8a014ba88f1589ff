//! Session heartbeat
//!
//! The scanner drops the pairing when heartbeats stop arriving, so a
//! background task sends the 32-byte VENS packet with the heartbeat
//! flag every 500ms for as long as the session lives.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use airscap_core::consts::ports;
use airscap_core::packets::discovery_packet;
use airscap_core::SessionToken;

use crate::discovery::local_ip;
use crate::error::Result;

/// Default interval between heartbeat packets.
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// A running heartbeat task. Stopping it cancels the task and waits
/// for the socket to be released.
pub struct Heartbeat {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Start sending heartbeat packets to the scanner every `interval`
    /// (zero selects the 500ms default). The task stops when the
    /// parent token is cancelled or the heartbeat is stopped.
    pub async fn start(
        parent: &CancellationToken,
        scanner_ip: Ipv4Addr,
        token: &SessionToken,
        interval: Duration,
    ) -> Result<Heartbeat> {
        let interval = if interval.is_zero() { HEARTBEAT_INTERVAL } else { interval };

        let local = local_ip(Some(scanner_ip));
        let packet = discovery_packet(local, token, ports::CLIENT_DISCOVERY, true);
        let addr = (scanner_ip, ports::DISCOVERY);

        let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        let cancel = parent.child_token();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            info!(scanner = %scanner_ip, ?interval, "heartbeat started");
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        info!("heartbeat stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = sock.send_to(&packet, addr).await {
                            debug!(error = %e, "heartbeat send failed");
                        }
                    }
                }
            }
        });

        Ok(Heartbeat { cancel, handle })
    }

    /// Stop the heartbeat and wait for the task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

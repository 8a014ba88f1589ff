//! Scan button listener
//!
//! The scanner announces a physical button press by sending event
//! notifications to UDP:55265, repeating roughly every half second
//! while the button state holds. The listener invokes a caller
//! supplied callback per notification; debouncing (typically refusing
//! to start a scan while one runs) is the caller's concern.

use std::net::Ipv4Addr;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use airscap_core::consts::{ports, EVENT_SCAN_BUTTON};
use airscap_core::packets::parse_event_notification;

use crate::error::{Error, Result};

/// A running button listener.
pub struct ButtonListener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ButtonListener {
    /// Bind the notification port and start listening. The callback
    /// runs on the listener task for every scan-button notification.
    pub async fn start<F>(parent: &CancellationToken, callback: F) -> Result<ButtonListener>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, ports::CLIENT_NOTIFY))
            .await
            .map_err(|e| Error::Transport(e.into()))?;
        info!(port = ports::CLIENT_NOTIFY, "button listener started");

        let cancel = parent.child_token();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            loop {
                let recv = tokio::select! {
                    _ = task_cancel.cancelled() => {
                        info!("button listener stopped");
                        return;
                    }
                    r = sock.recv_from(&mut buf) => r,
                };
                let (n, remote) = match recv {
                    Ok(r) => r,
                    Err(e) => {
                        debug!(error = %e, "button listener read error");
                        continue;
                    }
                };
                match parse_event_notification(&buf[..n]) {
                    Ok((event_type, event_data)) => {
                        info!(event_type, event_data, %remote, "scanner event received");
                        if event_type == EVENT_SCAN_BUTTON {
                            callback();
                        }
                    }
                    Err(e) => {
                        debug!(%remote, error = %e, "ignoring non-VENS packet");
                    }
                }
            }
        });

        Ok(ButtonListener { cancel, handle })
    }

    /// Stop listening and wait for the task to release the socket.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

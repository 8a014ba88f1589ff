//! UDP scanner discovery
//!
//! Discovery binds the client discovery port and sends a paired
//! VENS + ssNR burst to the scanner's discovery port, resending every
//! 500ms until a 132-byte device info response parses cleanly or the
//! overall timeout elapses. Short packets are heartbeat ACKs and are
//! skipped.

use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use airscap_core::consts::ports;
use airscap_core::packets::{discovery_packet, discovery_ssnr_packet, parse_device_info};
use airscap_core::SessionToken;
use airscap_types::DeviceInfo;

use crate::error::{Error, Result};

/// Interval between discovery resends.
const RESEND_INTERVAL: Duration = Duration::from_millis(500);

/// Default overall discovery timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Discovery configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Scanner address; `None` broadcasts on the local subnet
    pub scanner_ip: Option<Ipv4Addr>,

    pub token: SessionToken,

    /// Overall timeout; zero selects the 10s default
    pub timeout: Duration,
}

impl DiscoveryOptions {
    pub fn new(token: SessionToken) -> Self {
        Self { scanner_ip: None, token, timeout: DEFAULT_TIMEOUT }
    }
}

/// Return the local IP used to reach the given target.
///
/// Connects a UDP socket toward the target so the kernel routing table
/// picks the outbound interface, then reads the assigned local
/// address. With no target, the link-local all-hosts address is used
/// to select the default LAN interface without enumerating interfaces.
pub fn local_ip(target: Option<Ipv4Addr>) -> Ipv4Addr {
    let target = target.unwrap_or(Ipv4Addr::new(224, 0, 0, 1));
    let probe = || -> std::io::Result<Ipv4Addr> {
        let sock = std::net::UdpSocket::bind("0.0.0.0:0")?;
        sock.connect((target, 80))?;
        match sock.local_addr()? {
            std::net::SocketAddr::V4(addr) => Ok(*addr.ip()),
            std::net::SocketAddr::V6(_) => Ok(Ipv4Addr::UNSPECIFIED),
        }
    };
    probe().unwrap_or(Ipv4Addr::UNSPECIFIED)
}

/// Discover a scanner on the local network.
pub async fn find_scanner(
    cancel: &CancellationToken,
    opts: &DiscoveryOptions,
) -> Result<DeviceInfo> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let overall = if opts.timeout.is_zero() { DEFAULT_TIMEOUT } else { opts.timeout };
    let deadline = Instant::now() + overall;

    let local = local_ip(opts.scanner_ip);

    let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, ports::CLIENT_DISCOVERY)).await?;
    sock.set_broadcast(true)?;

    let target = opts.scanner_ip.unwrap_or(Ipv4Addr::BROADCAST);
    let scanner_addr = (target, ports::DISCOVERY);

    let vens = discovery_packet(local, &opts.token, ports::CLIENT_DISCOVERY, false);
    let ssnr = discovery_ssnr_packet(local, &opts.token, ports::CLIENT_DISCOVERY);

    sock.send_to(&vens, scanner_addr).await?;
    sock.send_to(&ssnr, scanner_addr).await?;
    debug!(?target, local = %local, "sent discovery burst");

    // Broadcast discovery also targets the derived subnet broadcast of
    // the outbound interface.
    if opts.scanner_ip.is_none() && !local.is_unspecified() {
        let o = local.octets();
        let subnet = Ipv4Addr::new(o[0], o[1], o[2], 255);
        let _ = sock.send_to(&vens, (subnet, ports::DISCOVERY)).await;
        let _ = sock.send_to(&ssnr, (subnet, ports::DISCOVERY)).await;
        debug!(broadcast = %subnet, "sent subnet broadcast discovery");
    }

    let mut buf = [0u8; 256];
    loop {
        if Instant::now() >= deadline {
            return Err(Error::DiscoveryTimeout);
        }

        let recv = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            r = timeout(RESEND_INTERVAL, sock.recv_from(&mut buf)) => r,
        };

        let (n, remote) = match recv {
            Err(_) => {
                // No response yet; resend the burst
                debug!("discovery timeout, resending");
                sock.send_to(&vens, scanner_addr).await?;
                sock.send_to(&ssnr, scanner_addr).await?;
                continue;
            }
            Ok(r) => r?,
        };

        // Short packets are heartbeat ACKs
        if n < 132 {
            debug!(bytes = n, %remote, "skipping short packet");
            continue;
        }

        match parse_device_info(&buf[..n]) {
            Ok(info) => {
                info!(
                    name = %info.name.trim(),
                    serial = %info.serial,
                    ip = %info.device_ip,
                    data_port = info.data_port,
                    control_port = info.control_port,
                    "found scanner"
                );
                return Ok(info);
            }
            Err(e) => {
                debug!(error = %e, bytes = n, "ignored non-device-info packet");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airscap_core::MAGIC;
    use pretty_assertions::assert_eq;

    fn device_info_fixture() -> Vec<u8> {
        let mut data = vec![0u8; 132];
        data[0..4].copy_from_slice(&MAGIC);
        data[16..20].copy_from_slice(&[127, 0, 0, 1]);
        data[22..24].copy_from_slice(&ports::DEFAULT_DATA.to_be_bytes());
        data[26..28].copy_from_slice(&ports::DEFAULT_CONTROL.to_be_bytes());
        data[28..34].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        data[36..40].copy_from_slice(&1u32.to_be_bytes());
        data[40..56].copy_from_slice(b"iX500-XX0YY00000");
        data[104..118].copy_from_slice(b"ScanSnap iX500");
        data
    }

    #[test]
    fn test_local_ip_loopback_target() {
        let ip = local_ip(Some(Ipv4Addr::LOCALHOST));
        assert_eq!(ip, Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    async fn test_find_scanner_against_mock() {
        // Mock scanner on the loopback discovery port. It answers the
        // first VENS packet with a short heartbeat ACK followed by a
        // full device info response; discovery must skip the ACK.
        let scanner = UdpSocket::bind((Ipv4Addr::LOCALHOST, ports::DISCOVERY))
            .await
            .expect("bind mock scanner");
        let server = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let (n, client) = scanner.recv_from(&mut buf).await.unwrap();
            assert_eq!(n, 32);
            assert_eq!(&buf[0..4], &MAGIC);
            scanner.send_to(&[0u8; 8], client).await.unwrap();
            scanner.send_to(&device_info_fixture(), client).await.unwrap();
        });

        let opts = DiscoveryOptions {
            scanner_ip: Some(Ipv4Addr::LOCALHOST),
            token: SessionToken::from_bytes([1, 2, 3, 4, 5, 6, 0, 0]),
            timeout: Duration::from_secs(5),
        };
        let cancel = CancellationToken::new();
        let info = find_scanner(&cancel, &opts).await.expect("discovery");
        assert_eq!(info.device_ip, Ipv4Addr::LOCALHOST);
        assert_eq!(info.data_port, ports::DEFAULT_DATA);
        assert_eq!(info.serial, "iX500-XX0YY00000");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_find_scanner_cancelled() {
        let opts = DiscoveryOptions {
            // Unroutable loopback target so nothing answers
            scanner_ip: Some(Ipv4Addr::new(127, 0, 0, 99)),
            token: SessionToken::from_bytes([9, 9, 9, 9, 9, 9, 0, 0]),
            timeout: Duration::from_secs(30),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = find_scanner(&cancel, &opts).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}

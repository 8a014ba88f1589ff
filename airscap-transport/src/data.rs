//! TCP data channel (port 53218)
//!
//! Request-style operations open a fresh connection per exchange, like
//! the control channel. Scan sessions instead hold one connection for
//! the whole scan sequence; see [`crate::session`]. The scanner
//! accepts a single TCP client on this port, so request-style probes
//! must not run while a scan session is active.

use std::net::Ipv4Addr;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use airscap_core::packets;
use airscap_core::sense::parse_sense_error;
use airscap_core::SessionToken;
use airscap_types::{AdfStatus, DataDeviceInfo, ScanConfig, ScanError, ScanParams};

use crate::error::{Error, Result};
use crate::io::{read_response, read_welcome, write_packet};
use crate::session::ScanSession;
use crate::{CONNECT_TIMEOUT, EXCHANGE_TIMEOUT};

/// Client for the scanner's data channel.
#[derive(Debug, Clone)]
pub struct DataChannel {
    host: Ipv4Addr,
    port: u16,
    token: SessionToken,
}

impl DataChannel {
    pub fn new(host: Ipv4Addr, port: u16, token: SessionToken) -> Self {
        Self { host, port, token }
    }

    /// Open a connection and consume the welcome packet.
    pub(crate) async fn connect(&self) -> Result<TcpStream> {
        debug!(host = %self.host, port = self.port, "data channel connecting");
        let mut stream = timeout(CONNECT_TIMEOUT, TcpStream::connect((self.host, self.port)))
            .await
            .map_err(|_| Error::ConnectTimeout)??;
        read_welcome(&mut stream, EXCHANGE_TIMEOUT).await?;
        Ok(stream)
    }

    /// One request/response exchange on a fresh connection.
    async fn request(&self, data: &[u8], op: &'static str) -> Result<Vec<u8>> {
        let mut stream = self.connect().await?;
        write_packet(&mut stream, data, EXCHANGE_TIMEOUT, op).await?;
        read_response(&mut stream, EXCHANGE_TIMEOUT, op).await
    }

    /// Query device identity via INQUIRY.
    pub async fn get_device_info(&self) -> Result<DataDeviceInfo> {
        debug!("getting device info");
        let resp = self.request(&packets::get_device_info(&self.token), "device info").await?;
        let info = packets::parse_data_device_info(&resp)?;
        debug!(
            device_name = %info.device_name,
            firmware = %info.firmware_revision,
            "device info OK"
        );
        Ok(info)
    }

    /// Query scanner capabilities via INQUIRY VPD 0xF0.
    pub async fn get_scan_params(&self) -> Result<ScanParams> {
        debug!("getting scan params");
        let resp = self.request(&packets::get_scan_params(&self.token), "scan params").await?;
        let params = packets::parse_scan_params(&resp)?;
        debug!(?params, "scan params OK");
        Ok(params)
    }

    /// Read the scanner's stored settings. The response is
    /// informational and returned raw.
    pub async fn get_scan_settings(&self) -> Result<Vec<u8>> {
        debug!("getting scan settings");
        self.request(&packets::get_scan_settings(&self.token), "scan settings").await
    }

    /// Send the initial session configuration (0xEB).
    pub async fn set_config(&self) -> Result<Vec<u8>> {
        debug!("setting config");
        self.request(&packets::set_config(&self.token), "set config").await
    }

    /// Query the ADF paper/cover/jam condition.
    pub async fn check_adf_status(&self) -> Result<AdfStatus> {
        debug!("checking ADF status");
        let resp = self.request(&packets::get_status(&self.token), "ADF status").await?;
        let status = packets::parse_adf_status(&resp)?;
        debug!(?status, "ADF status check");
        Ok(status)
    }

    /// Probe the scanner for error conditions via REQUEST SENSE.
    pub async fn check_sense_status(&self) -> Result<Option<ScanError>> {
        debug!("checking sense status");
        let resp = self.request(&packets::get_page_metadata(&self.token), "sense status").await?;
        Ok(parse_sense_error(&resp))
    }

    /// Open a scan session. The returned session owns its connection
    /// and has already armed the scanner and seen the scan start.
    pub async fn start_scan(&self, cfg: &ScanConfig) -> Result<ScanSession> {
        debug!(
            color_mode = ?cfg.color_mode,
            quality = ?cfg.quality,
            duplex = cfg.duplex,
            paper_size = ?cfg.paper_size,
            "starting scan session"
        );
        let stream = self.connect().await?;
        let mut session = ScanSession::new(stream, self.token, cfg.duplex);
        match session.begin(cfg).await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.finish().await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airscap_core::MAGIC;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_token() -> SessionToken {
        SessionToken::from_bytes([1, 2, 3, 4, 5, 6, 0, 0])
    }

    fn welcome() -> [u8; 16] {
        let mut w = [0u8; 16];
        w[3] = 0x10;
        w[4..8].copy_from_slice(&MAGIC);
        w
    }

    async fn mock_one_exchange(request_len: usize, response: Vec<u8>) -> u16 {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(&welcome()).await.unwrap();
            let mut req = vec![0u8; request_len];
            sock.read_exact(&mut req).await.unwrap();
            assert_eq!(&req[4..8], &MAGIC);
            sock.write_all(&response).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn test_get_device_info() {
        let mut resp = vec![0u8; 136];
        resp[0..4].copy_from_slice(&136u32.to_be_bytes());
        resp[4..8].copy_from_slice(&MAGIC);
        resp[48..77].copy_from_slice(b"FUJITSU ScanSnap iX500  0M00\x00");
        let port = mock_one_exchange(64, resp).await;

        let data = DataChannel::new(Ipv4Addr::LOCALHOST, port, test_token());
        let info = data.get_device_info().await.unwrap();
        assert_eq!(info.device_name, "FUJITSU ScanSnap iX500  0M00");
        assert_eq!(info.firmware_revision, "0M00");
    }

    #[tokio::test]
    async fn test_check_adf_status_no_paper() {
        let mut resp = vec![0u8; 72];
        resp[0..4].copy_from_slice(&72u32.to_be_bytes());
        resp[4..8].copy_from_slice(&MAGIC);
        resp[40..44].copy_from_slice(&0x0000_0080u32.to_be_bytes());
        let port = mock_one_exchange(64, resp).await;

        let data = DataChannel::new(Ipv4Addr::LOCALHOST, port, test_token());
        let status = data.check_adf_status().await.unwrap();
        assert!(!status.has_paper);
        assert!(!status.jam);
    }

    #[tokio::test]
    async fn test_check_sense_status_clear() {
        let mut resp = vec![0u8; 58];
        resp[0..4].copy_from_slice(&58u32.to_be_bytes());
        resp[4..8].copy_from_slice(&MAGIC);
        // sense key 0 = NO SENSE
        let port = mock_one_exchange(64, resp).await;

        let data = DataChannel::new(Ipv4Addr::LOCALHOST, port, test_token());
        assert_eq!(data.check_sense_status().await.unwrap(), None);
    }
}

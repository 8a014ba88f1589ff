//! TCP control channel (port 53219)
//!
//! Each operation opens a fresh TCP connection, reads and validates
//! the 16-byte welcome, exchanges exactly one request/response pair,
//! and closes. The scanner accepts only short-lived connections on
//! this port.

use std::net::Ipv4Addr;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use airscap_core::consts::control::{
    CMD_RESERVE, RELEASE_DEREGISTER, RELEASE_REGISTER, RESERVE_REJECTED,
};
use airscap_core::packets::{
    parse_reserve_response, parse_wifi_status_response, release_request, reserve_request,
    wifi_status_request,
};
use airscap_core::SessionToken;

use crate::error::{Error, Result};
use crate::io::{read_exact, read_response, read_welcome, write_packet};
use crate::{CONNECT_TIMEOUT, EXCHANGE_TIMEOUT};

/// Client for the scanner's control channel.
#[derive(Debug, Clone)]
pub struct ControlChannel {
    host: Ipv4Addr,
    port: u16,
    token: SessionToken,
}

impl ControlChannel {
    pub fn new(host: Ipv4Addr, port: u16, token: SessionToken) -> Self {
        Self { host, port, token }
    }

    /// Open a connection and consume the welcome packet.
    async fn connect(&self) -> Result<TcpStream> {
        debug!(host = %self.host, port = self.port, "control channel connecting");
        let mut stream = timeout(CONNECT_TIMEOUT, TcpStream::connect((self.host, self.port)))
            .await
            .map_err(|_| Error::ConnectTimeout)??;
        read_welcome(&mut stream, EXCHANGE_TIMEOUT).await?;
        Ok(stream)
    }

    /// One request/response exchange on a fresh connection.
    async fn send_recv(&self, data: &[u8], op: &'static str) -> Result<Vec<u8>> {
        let mut stream = self.connect().await?;
        write_packet(&mut stream, data, EXCHANGE_TIMEOUT, op).await?;
        read_response(&mut stream, EXCHANGE_TIMEOUT, op).await
    }

    /// Send the release request with the given action and read the
    /// fixed 16-byte acknowledgement.
    async fn release(&self, action: u32, op: &'static str) -> Result<()> {
        let mut stream = self.connect().await?;
        let req = release_request(&self.token, action);
        write_packet(&mut stream, &req, EXCHANGE_TIMEOUT, op).await?;
        let mut ack = [0u8; 16];
        read_exact(&mut stream, &mut ack, EXCHANGE_TIMEOUT, op).await?;
        debug!(op, ack = ?ack, "release acknowledged");
        Ok(())
    }

    /// Register this client with the scanner.
    pub async fn register(&self) -> Result<()> {
        debug!("registering with scanner");
        self.release(RELEASE_REGISTER, "register").await
    }

    /// Remove this client's pairing from the scanner.
    pub async fn deregister(&self) -> Result<()> {
        debug!("deregistering");
        self.release(RELEASE_DEREGISTER, "deregister").await
    }

    /// Send the client configuration (identity, notify port) to the
    /// scanner. Returns `Ok(true)` when the pairing is accepted and
    /// `Ok(false)` when the identity is rejected; any other non-zero
    /// status is a protocol error.
    pub async fn configure(
        &self,
        client_ip: Ipv4Addr,
        notify_port: u16,
        identity: &str,
    ) -> Result<bool> {
        debug!(
            ip = %client_ip,
            port = notify_port,
            identity_len = identity.len(),
            command = CMD_RESERVE,
            "configuring session"
        );
        let req =
            reserve_request(&self.token, client_ip, notify_port, identity, chrono::Local::now());
        let resp = self.send_recv(&req, "configure").await?;
        match parse_reserve_response(&resp)? {
            0 => {
                info!("pairing accepted");
                Ok(true)
            }
            RESERVE_REJECTED => {
                info!("pairing rejected");
                Ok(false)
            }
            status => Err(Error::ControlStatus(status)),
        }
    }

    /// Query the scanner's connection status; returns the state word.
    pub async fn check_status(&self) -> Result<u32> {
        debug!("checking scanner status");
        let req = wifi_status_request(&self.token);
        let resp = self.send_recv(&req, "check status").await?;
        let state = parse_wifi_status_response(&resp)?;
        debug!(state, "status check");
        Ok(state)
    }
}

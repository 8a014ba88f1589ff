//! Low-level socket I/O with per-step deadlines

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use airscap_core::consts::WELCOME_SIZE;
use airscap_core::packets::validate_welcome;

use crate::error::{Error, Result};

/// Safety cap on response sizes; the largest legitimate response is a
/// page chunk of 256 KiB + 42-byte header.
const MAX_RESPONSE_SIZE: u32 = 1 << 20;

/// Write a full packet within the deadline.
pub(crate) async fn write_packet(
    stream: &mut TcpStream,
    data: &[u8],
    deadline: Duration,
    op: &'static str,
) -> Result<()> {
    trace!(bytes = data.len(), op, "send");
    timeout(deadline, stream.write_all(data))
        .await
        .map_err(|_| Error::Timeout { op })??;
    Ok(())
}

/// Read exactly `buf.len()` bytes within the deadline.
pub(crate) async fn read_exact(
    stream: &mut TcpStream,
    buf: &mut [u8],
    deadline: Duration,
    op: &'static str,
) -> Result<()> {
    timeout(deadline, stream.read_exact(buf))
        .await
        .map_err(|_| Error::Timeout { op })??;
    Ok(())
}

/// Read and validate the 16-byte welcome packet the scanner sends on
/// every new TCP connection.
pub(crate) async fn read_welcome(stream: &mut TcpStream, deadline: Duration) -> Result<()> {
    let mut welcome = [0u8; WELCOME_SIZE];
    read_exact(stream, &mut welcome, deadline, "welcome").await?;
    validate_welcome(&welcome)?;
    trace!(welcome = ?welcome, "welcome validated");
    Ok(())
}

/// Read a length-prefixed VENS response: 4-byte total length (which
/// includes itself) followed by the body.
pub(crate) async fn read_response(
    stream: &mut TcpStream,
    deadline: Duration,
    op: &'static str,
) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    read_exact(stream, &mut len_buf, deadline, op).await?;
    let total = u32::from_be_bytes(len_buf);
    if total < 4 {
        return Err(Error::InvalidLength(total));
    }
    if total > MAX_RESPONSE_SIZE {
        return Err(Error::InvalidLength(total));
    }
    let mut resp = vec![0u8; total as usize];
    resp[..4].copy_from_slice(&len_buf);
    read_exact(stream, &mut resp[4..], deadline, op).await?;
    trace!(bytes = resp.len(), op, "recv");
    Ok(resp)
}

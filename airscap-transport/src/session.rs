//! Scan session state machine
//!
//! A scan session owns one TCP connection to the data port for its
//! whole lifetime; closing the connection mid-transfer aborts whatever
//! page the scanner is sending. The sequence on that connection is:
//!
//! 1. Read current settings (informational)
//! 2. Write the scan config (0xD4)
//! 3. Write the tone curve (0xDB) when bleed-through reduction is on
//! 4. Prepare scan (0xD5)
//! 5. Get status (0xC2), failing fast on an empty ADF
//! 6. Wait for scan (0xE0) with a long deadline for the button press
//! 7. Per sheet, per side: chunked page transfer (0x28) + REQUEST
//!    SENSE metadata read
//! 8. Get status + wait for scan with a short deadline; a non-zero
//!    status ends the loop
//! 9. End scan (0xD6), always, including on error paths
//!
//! Pages are pulled lazily through [`ScanSession::next_page`]; the
//! transfer-sheet counter in the READ(10) CDB advances once per side,
//! the physical sheet counter once per sheet.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use airscap_core::consts::PAGE_HEADER_SIZE;
use airscap_core::packets;
use airscap_core::scan_config::{write_scan_config, write_tone_curve};
use airscap_core::sense::parse_sense_error;
use airscap_core::SessionToken;
use airscap_types::{Page, ScanConfig, ScanError};

use crate::error::Result;
use crate::io::{read_exact, read_response, write_packet};
use crate::{CHUNK_TIMEOUT, END_SCAN_TIMEOUT, EXCHANGE_TIMEOUT, NEXT_SHEET_TIMEOUT, WAIT_FOR_SCAN_TIMEOUT};

/// Outcome of the wait at a sheet boundary.
enum SheetWait {
    /// The next sheet is feeding
    Ready,
    /// The scanner reported scan complete
    Complete,
}

/// A running scan session with lazy page iteration.
///
/// [`close`](Self::close) must be called (or the session driven to
/// completion) so the end-scan command resets the scanner; a session
/// dropped without it leaves the scanner armed.
pub struct ScanSession {
    stream: TcpStream,
    token: SessionToken,
    duplex: bool,
    physical_sheet: u32,
    transfer_sheet: u8,
    side: u8,
    done: bool,
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("duplex", &self.duplex)
            .field("physical_sheet", &self.physical_sheet)
            .field("transfer_sheet", &self.transfer_sheet)
            .field("side", &self.side)
            .field("done", &self.done)
            .finish()
    }
}

impl ScanSession {
    pub(crate) fn new(stream: TcpStream, token: SessionToken, duplex: bool) -> Self {
        Self {
            stream,
            token,
            duplex,
            physical_sheet: 0,
            transfer_sheet: 0,
            side: 0,
            done: false,
        }
    }

    async fn exchange(
        &mut self,
        req: &[u8],
        deadline: Duration,
        op: &'static str,
    ) -> Result<Vec<u8>> {
        write_packet(&mut self.stream, req, deadline, op).await?;
        read_response(&mut self.stream, deadline, op).await
    }

    /// Run the configuration prologue through the first wait-for-scan.
    pub(crate) async fn begin(&mut self, cfg: &ScanConfig) -> Result<()> {
        debug!("scan step 1: reading current settings");
        let resp = self
            .exchange(&packets::get_scan_settings(&self.token), EXCHANGE_TIMEOUT, "get settings")
            .await?;
        debug!(bytes = resp.len(), "settings response");

        debug!("scan step 2: writing scan config");
        self.exchange(&write_scan_config(&self.token, cfg), EXCHANGE_TIMEOUT, "write config")
            .await?;

        if cfg.bleed_through {
            debug!("scan step 2.5: writing bleed-through tone curve");
            self.exchange(&write_tone_curve(&self.token), EXCHANGE_TIMEOUT, "tone curve")
                .await?;
        }

        debug!("scan step 3: preparing scan");
        self.exchange(&packets::prepare_scan(&self.token), EXCHANGE_TIMEOUT, "prepare scan")
            .await?;

        debug!("scan step 4: checking ADF status");
        let resp = self
            .exchange(&packets::get_status(&self.token), EXCHANGE_TIMEOUT, "get status")
            .await?;
        if let Ok(adf) = packets::parse_adf_status(&resp) {
            if !adf.has_paper {
                return Err(ScanError::no_paper().into());
            }
        }

        debug!("scan step 5: waiting for scan to start");
        let resp = self
            .exchange(&packets::wait_for_scan(&self.token), WAIT_FOR_SCAN_TIMEOUT, "wait for scan")
            .await?;
        if let Ok(status) = packets::parse_wait_status(&resp) {
            if status != 0 {
                return Err(self.classify_wait_error(status).await.into());
            }
            info!("scan started");
        }
        Ok(())
    }

    /// Pull the next side. Returns `None` once the scanner reports the
    /// scan complete. Pages emptied by blank-page removal are returned
    /// as-is; skipping them is the caller's concern.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.done {
            return Ok(None);
        }

        let sides_per_sheet = if self.duplex { 2 } else { 1 };
        if self.side >= sides_per_sheet {
            match self.wait_next_sheet().await {
                Ok(SheetWait::Ready) => {
                    self.physical_sheet += 1;
                    self.side = 0;
                }
                Ok(SheetWait::Complete) => {
                    self.finish().await;
                    return Ok(None);
                }
                Err(e) => {
                    self.finish().await;
                    return Err(e);
                }
            }
        }

        let back_side = self.side == 1;
        let image = match self.transfer_side(back_side).await {
            Ok(image) => image,
            Err(e) => {
                self.finish().await;
                return Err(e);
            }
        };

        // Page metadata after each transfer; informational
        if let Err(e) = self
            .exchange(&packets::get_page_metadata(&self.token), EXCHANGE_TIMEOUT, "page metadata")
            .await
        {
            self.finish().await;
            return Err(e);
        }

        let page = Page { sheet: self.physical_sheet, side: self.side, image };
        info!(
            sheet = page.sheet,
            side = page.side,
            bytes = page.image.len(),
            "page received"
        );
        self.side += 1;
        self.transfer_sheet = self.transfer_sheet.wrapping_add(1);
        Ok(Some(page))
    }

    /// Read all chunks of one side. The scanner sends up to 256 KiB
    /// per chunk; page type 2 marks the final chunk. A response
    /// shorter than the 42-byte page header is an error response.
    async fn transfer_side(&mut self, back_side: bool) -> Result<Bytes> {
        let mut image = BytesMut::new();
        let mut chunk: u8 = 0;
        loop {
            let req = packets::page_transfer(&self.token, self.transfer_sheet, chunk, back_side);
            write_packet(&mut self.stream, &req, CHUNK_TIMEOUT, "page transfer").await?;

            let mut len_buf = [0u8; 4];
            read_exact(&mut self.stream, &mut len_buf, CHUNK_TIMEOUT, "page transfer").await?;
            let total = u32::from_be_bytes(len_buf) as usize;
            if total < PAGE_HEADER_SIZE {
                // Short error response, not a page header; drain it
                if total > 4 {
                    let mut discard = vec![0u8; total - 4];
                    let _ = read_exact(
                        &mut self.stream,
                        &mut discard,
                        CHUNK_TIMEOUT,
                        "page transfer",
                    )
                    .await;
                }
                return Err(ScanError::generic(format!(
                    "page transfer error: expected page header, got {total} bytes"
                ))
                .into());
            }

            let mut header_buf = [0u8; PAGE_HEADER_SIZE];
            header_buf[..4].copy_from_slice(&len_buf);
            read_exact(&mut self.stream, &mut header_buf[4..], CHUNK_TIMEOUT, "page transfer")
                .await?;
            let header = packets::parse_page_header(&header_buf)?;

            let size = header.image_size();
            if size > 0 {
                let start = image.len();
                image.resize(start + size, 0);
                read_exact(&mut self.stream, &mut image[start..], CHUNK_TIMEOUT, "page chunk")
                    .await?;
            }

            debug!(
                sheet = self.transfer_sheet,
                chunk,
                page_type = header.page_type,
                chunk_bytes = size,
                total_bytes = image.len(),
                "chunk received"
            );

            if header.is_final() {
                return Ok(image.freeze());
            }
            chunk = chunk.wrapping_add(1);
        }
    }

    /// Status probe plus the short wait between sheets.
    async fn wait_next_sheet(&mut self) -> Result<SheetWait> {
        debug!("checking status before next sheet");
        let resp = self
            .exchange(&packets::get_status(&self.token), EXCHANGE_TIMEOUT, "get status")
            .await?;
        if let Ok(adf) = packets::parse_adf_status(&resp) {
            debug!(?adf, "inter-sheet status");
        }

        debug!("waiting for next sheet");
        let resp = self
            .exchange(&packets::wait_for_scan(&self.token), NEXT_SHEET_TIMEOUT, "wait next sheet")
            .await?;
        let status = packets::parse_wait_status(&resp).unwrap_or(0);
        if status == 0 {
            return Ok(SheetWait::Ready);
        }

        // Non-zero status ends the loop; sense data tells apart a
        // clean completion from a feeder error.
        match self.request_sense().await {
            Some(err) => Err(err.into()),
            None => {
                info!(status, "scan complete");
                Ok(SheetWait::Complete)
            }
        }
    }

    /// Classify a non-zero wait status through REQUEST SENSE on the
    /// same connection.
    async fn classify_wait_error(&mut self, status: u32) -> ScanError {
        match self.request_sense().await {
            Some(err) => err,
            None => ScanError::generic(format!("wait for scan returned status {status}")),
        }
    }

    async fn request_sense(&mut self) -> Option<ScanError> {
        let resp = self
            .exchange(&packets::get_page_metadata(&self.token), EXCHANGE_TIMEOUT, "request sense")
            .await;
        match resp {
            Ok(resp) => parse_sense_error(&resp),
            Err(e) => Some(ScanError::generic(format!("request sense failed: {e}"))),
        }
    }

    /// Send the end-scan command and mark the session finished. Safe
    /// to call more than once; failures are logged, never surfaced.
    pub(crate) async fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let req = packets::end_scan(&self.token);
        if let Err(e) = write_packet(&mut self.stream, &req, END_SCAN_TIMEOUT, "end scan").await {
            debug!(error = %e, "end scan send failed");
            return;
        }
        match read_response(&mut self.stream, END_SCAN_TIMEOUT, "end scan").await {
            Ok(_) => debug!("end scan session OK"),
            Err(e) => debug!(error = %e, "end scan response failed"),
        }
    }

    /// End the session, resetting scanner state.
    pub async fn close(&mut self) -> Result<()> {
        self.finish().await;
        Ok(())
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if !self.done {
            warn!("scan session dropped without close; scanner state not reset");
        }
    }
}

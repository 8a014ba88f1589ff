//! Scan adapter
//!
//! Translates abstract scan requests from the eSCL front-end into
//! scanner configuration, wraps the scan session in a lazy page
//! iterator, and tracks the ADF / error state the front-end reports to
//! AirScan clients.
//!
//! The adapter also guards the data port: the scanner accepts a single
//! TCP connection there, so while a scan session is active, ADF
//! queries answer from cached state instead of opening a probe.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use airscap_core::consts::status::ERROR_CODE_MULTI_FEED;
use airscap_transport::ScanSession;
use airscap_types::capabilities::{MAX_SCAN_HEIGHT, MAX_SCAN_WIDTH};
use airscap_types::{
    AdfMode, ColorMode, Dimension, Page, Quality, ScanConfig, ScanError, ScanErrorKind,
    ScanRequest, ScannerCapabilities, ScannerStatus,
};

use crate::error::{Error, Result};
use crate::scanner::Scanner;

/// Mutable adapter state shared with running scan jobs.
struct AdapterState {
    adf_empty: bool,
    blank_page_removal: bool,
    scanning: bool,
    force_paper_auto: bool,
    last_error: Option<ScanError>,
}

/// The polymorphic scanner surface consumed by the eSCL front-end.
#[async_trait]
pub trait ScanDevice: Send + Sync {
    fn capabilities(&self) -> ScannerCapabilities;

    async fn scan(&self, req: ScanRequest) -> Result<ScanJob>;

    async fn close(&self);
}

/// Adapter between abstract scan requests and the VENS protocol.
pub struct ScanAdapter {
    scanner: Arc<Scanner>,
    state: Arc<Mutex<AdapterState>>,
}

impl ScanAdapter {
    pub fn new(scanner: Arc<Scanner>) -> Self {
        Self {
            scanner,
            state: Arc::new(Mutex::new(AdapterState {
                adf_empty: false,
                blank_page_removal: true,
                scanning: false,
                force_paper_auto: false,
                last_error: None,
            })),
        }
    }

    /// Whether blank page removal is active for the next scan.
    pub fn set_blank_page_removal(&self, enabled: bool) {
        self.state.lock().blank_page_removal = enabled;
    }

    /// When set, paper-size overrides from the request region are
    /// suppressed and the scanner always auto-detects.
    pub fn set_force_paper_auto(&self, enabled: bool) {
        self.state.lock().force_paper_auto = enabled;
    }

    /// Capabilities advertised to AirScan clients, derived from the
    /// scanner's cached INQUIRY VPD data with hardware fallbacks.
    pub fn capabilities(&self) -> ScannerCapabilities {
        let params = self.scanner.scan_params();

        let max_res = params.map(|p| p.max_resolution_x).filter(|&r| r > 0).unwrap_or(300);
        let min_res = params.map(|p| p.min_resolution_x).filter(|&r| r > 0).unwrap_or(150);
        let mut resolutions: Vec<u16> = [150u16, 200, 300]
            .into_iter()
            .filter(|&dpi| dpi >= min_res && dpi <= max_res)
            .collect();
        if resolutions.is_empty() {
            resolutions.push(300);
        }

        let max_width = params
            .map(|p| p.max_width)
            .filter(|&w| w > 0)
            .map(Dimension::from_inch1200)
            .unwrap_or(MAX_SCAN_WIDTH);
        let max_height = params
            .map(|p| p.max_height)
            .filter(|&h| h > 0)
            .map(Dimension::from_inch1200)
            .unwrap_or(MAX_SCAN_HEIGHT);

        let mut make_and_model = self.scanner.make_and_model();
        if make_and_model.is_empty() {
            make_and_model = "Unknown".into();
        }
        let mut serial_number = self.scanner.serial();
        if serial_number.is_empty() {
            serial_number = self.scanner.host().to_string();
        }

        ScannerCapabilities {
            make_and_model,
            serial_number,
            resolutions,
            min_width: Dimension::from_mm(50),
            max_width,
            min_height: Dimension::from_mm(50),
            max_height,
            document_formats: vec![
                "image/jpeg".into(),
                "image/tiff".into(),
                "application/pdf".into(),
            ],
            threshold_min: -5,
            threshold_max: 5,
            adf_capacity: 50,
            duplex: true,
        }
    }

    /// Status snapshot for eSCL state reporting.
    pub fn status(&self) -> ScannerStatus {
        let state = self.state.lock();
        ScannerStatus {
            online: self.scanner.online(),
            scanning: state.scanning,
            adf_empty: state.adf_empty,
            last_error: state.last_error.as_ref().map(|e| e.kind),
        }
    }

    /// Start a scan. Returns a [`ScanJob`] pulling pages lazily.
    pub async fn scan(&self, req: ScanRequest) -> Result<ScanJob> {
        validate_request(&req)?;

        let (blank_page_removal, force_paper_auto) = {
            let state = self.state.lock();
            (state.blank_page_removal, state.force_paper_auto)
        };
        let cfg = map_scan_config(&req, blank_page_removal, force_paper_auto);

        info!(
            color_mode = ?req.color_mode,
            resolution = req.resolution_dpi,
            adf_mode = ?req.adf_mode,
            duplex = cfg.duplex,
            blank_page_removal = cfg.blank_page_removal,
            bw_density = cfg.bw_density,
            paper_width = cfg.paper_width,
            paper_height = cfg.paper_height,
            "scan requested"
        );

        {
            let mut state = self.state.lock();
            state.last_error = None;
            state.scanning = true;
        }

        let session = match self.scanner.start_scan(&cfg).await {
            Ok(session) => session,
            Err(e) => {
                let mut state = self.state.lock();
                state.scanning = false;
                state.adf_empty = true;
                if let Some(scan_err) = e.scan_error() {
                    state.last_error = Some(scan_err.clone());
                }
                return Err(e);
            }
        };

        Ok(ScanJob {
            session,
            native_format: native_format(cfg.color_mode),
            requested_format: req.document_format,
            state: Arc::clone(&self.state),
        })
    }

    /// Query paper presence. During an active scan the cached state is
    /// returned; the scanner only handles one data connection at a
    /// time. Idle probes refresh the cached error from the cover/jam
    /// bits and the status error code.
    pub async fn check_adf_status(&self) -> Result<bool> {
        {
            let state = self.state.lock();
            if state.scanning {
                return Ok(!state.adf_empty);
            }
        }

        let status = match self.scanner.check_adf_status().await {
            Ok(status) => status,
            Err(e) => {
                let empty = self.state.lock().adf_empty;
                if empty {
                    warn!(error = %e, "ADF status check failed, using cached state (empty)");
                    return Ok(false);
                }
                return Err(e);
            }
        };

        let mut state = self.state.lock();
        if status.cover_open {
            if state.last_error.as_ref().map(|e| e.kind) != Some(ScanErrorKind::CoverOpen) {
                warn!("ADF cover open detected");
            }
            state.last_error = Some(ScanError::cover_open());
        } else if status.jam {
            if state.last_error.as_ref().map(|e| e.kind) != Some(ScanErrorKind::PaperJam) {
                warn!("paper jam detected");
            }
            state.last_error = Some(ScanError::paper_jam());
        } else if status.error_code != 0 {
            let kind = error_code_to_kind(status.error_code);
            if state.last_error.as_ref().map(|e| e.kind) != Some(kind) {
                warn!(code = status.error_code, ?kind, "scanner error detected");
            }
            state.last_error = Some(ScanError::new(
                kind,
                format!("scanner error 0x{:04X}", status.error_code),
            ));
        } else if let Some(prev) = state.last_error.take() {
            info!(previous = %prev, "scanner error cleared");
        }
        state.adf_empty = !status.has_paper;
        Ok(status.has_paper)
    }
}

#[async_trait]
impl ScanDevice for ScanAdapter {
    fn capabilities(&self) -> ScannerCapabilities {
        ScanAdapter::capabilities(self)
    }

    async fn scan(&self, req: ScanRequest) -> Result<ScanJob> {
        ScanAdapter::scan(self, req).await
    }

    async fn close(&self) {
        self.scanner.disconnect().await;
    }
}

/// A running scan exposed as a lazy page iterator.
///
/// The job reports the scanner's native wire format; when the request
/// asked for a different document format, transcoding is the caller's
/// concern (see [`needs_conversion`](Self::needs_conversion)).
pub struct ScanJob {
    session: ScanSession,
    native_format: &'static str,
    requested_format: Option<String>,
    state: Arc<Mutex<AdapterState>>,
}

impl std::fmt::Debug for ScanJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanJob")
            .field("native_format", &self.native_format)
            .field("requested_format", &self.requested_format)
            .finish()
    }
}

impl ScanJob {
    /// The scanner's native output format for this job:
    /// `image/tiff` for B&W, `image/jpeg` otherwise.
    pub fn format(&self) -> &'static str {
        self.native_format
    }

    /// The document format the request asked for, if any.
    pub fn requested_format(&self) -> Option<&str> {
        self.requested_format.as_deref()
    }

    /// Whether an external format conversion is needed to satisfy the
    /// request.
    pub fn needs_conversion(&self) -> bool {
        self.requested_format
            .as_deref()
            .map_or(false, |fmt| fmt != self.native_format)
    }

    /// Pull the next page, transparently skipping sides emptied by
    /// blank-page removal. Returns `None` at end of scan.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        loop {
            match self.session.next_page().await {
                Ok(Some(page)) if page.is_empty() => {
                    debug!(sheet = page.sheet, side = page.side, "skipping blank page");
                }
                Ok(Some(page)) => return Ok(Some(page)),
                Ok(None) => {
                    self.mark_finished(None);
                    return Ok(None);
                }
                Err(e) => {
                    self.mark_finished(e.scan_error().cloned());
                    return Err(e.into());
                }
            }
        }
    }

    /// End the scan session, resetting scanner state.
    pub async fn close(&mut self) {
        let _ = self.session.close().await;
        self.mark_finished(None);
    }

    fn mark_finished(&self, err: Option<ScanError>) {
        let mut state = self.state.lock();
        state.scanning = false;
        state.adf_empty = true;
        if let Some(e) = err {
            state.last_error = Some(e);
        }
    }
}

/// Map a status error code to the scan error kind.
fn error_code_to_kind(code: u16) -> ScanErrorKind {
    match code {
        ERROR_CODE_MULTI_FEED => ScanErrorKind::MultiFeed,
        _ => ScanErrorKind::Generic,
    }
}

/// The scanner's on-wire image format for a color mode.
fn native_format(color_mode: ColorMode) -> &'static str {
    if color_mode == ColorMode::Bw {
        "image/tiff"
    } else {
        "image/jpeg"
    }
}

fn validate_request(req: &ScanRequest) -> Result<()> {
    if let Some(threshold) = req.threshold {
        if !(-5..=5).contains(&threshold) {
            return Err(Error::InvalidRequest(format!(
                "threshold {threshold} outside [-5, 5]"
            )));
        }
    }
    if req.region.width < Dimension(0) || req.region.height < Dimension(0) {
        return Err(Error::InvalidRequest("negative scan region".into()));
    }
    Ok(())
}

/// Convert an abstract scan request into scanner configuration.
fn map_scan_config(req: &ScanRequest, blank_page_removal: bool, force_paper_auto: bool) -> ScanConfig {
    let mut cfg = ScanConfig {
        blank_page_removal,
        ..ScanConfig::default()
    };

    cfg.color_mode = req.color_mode.unwrap_or(ColorMode::Auto);

    cfg.quality = match req.resolution_dpi {
        0 => Quality::Auto,
        dpi if dpi <= 150 => Quality::Normal,
        dpi if dpi <= 200 => Quality::Fine,
        _ => Quality::SuperFine,
    };

    cfg.duplex = req.adf_mode == AdfMode::Duplex;

    if let Some(threshold) = req.threshold {
        cfg.bw_density = threshold;
    }

    // Region → explicit paper override (1/100 mm → 1/1200 inch),
    // except when it is zero, covers the whole scan area, or overrides
    // are suppressed.
    if !force_paper_auto && !req.region.is_zero() && !req.region.covers_max_area() {
        cfg.paper_width = req.region.width.to_inch1200();
        cfg.paper_height = req.region.height.to_inch1200();
    }

    cfg
}

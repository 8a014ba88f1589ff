//! Capability and status values consumed by the eSCL front-end

/// Scanner capabilities from the INQUIRY VPD 0xF0 response.
///
/// Resolutions are in DPI; dimensions are in 1/1200 inch units
/// (converted from the 1/600 inch wire format at decode time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    pub max_resolution_x: u16,
    pub max_resolution_y: u16,
    pub min_resolution_x: u16,
    pub min_resolution_y: u16,

    /// Color mode bitmask as reported by the scanner
    pub color_modes: u8,

    pub max_width: u16,
    pub max_height: u16,
}

/// Decoded ADF / scanner condition from a GET STATUS response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdfStatus {
    /// Paper present in the feeder
    pub has_paper: bool,

    /// ADF cover open
    pub cover_open: bool,

    /// Paper jam
    pub jam: bool,

    /// Scanner error code (0x0155 = multi-feed), 0 when clear
    pub error_code: u16,
}

/// Scanner-level error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    Generic,
    NoPaper,
    PaperJam,
    MultiFeed,
    CoverOpen,
}

/// A scanner-level error (no paper, jam, hardware failure, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ScanErrorKind::Generic, message)
    }

    pub fn no_paper() -> Self {
        Self::new(ScanErrorKind::NoPaper, "no paper in ADF")
    }

    pub fn paper_jam() -> Self {
        Self::new(ScanErrorKind::PaperJam, "paper jam")
    }

    pub fn multi_feed() -> Self {
        Self::new(ScanErrorKind::MultiFeed, "multi-feed detected")
    }

    pub fn cover_open() -> Self {
        Self::new(ScanErrorKind::CoverOpen, "ADF cover open")
    }
}

/// Snapshot of the scanner session for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScannerStatus {
    /// Supervisor session is up
    pub online: bool,

    /// A scan session is currently active
    pub scanning: bool,

    /// Last known ADF-empty state
    pub adf_empty: bool,

    /// Last observed scan error, if any
    pub last_error: Option<ScanErrorKind>,
}

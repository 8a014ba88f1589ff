//! Abstract scan requests and advertised capabilities
//!
//! Dimensions follow the eSCL convention of 1/100 millimeter units;
//! the scanner itself speaks 1/1200 inch. Conversions live here so the
//! adapter and the front-end agree on a single unit.

use crate::scan::ColorMode;

/// A physical dimension in 1/100 millimeter units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Dimension(pub i32);

impl Dimension {
    /// One millimeter.
    pub const MM: Dimension = Dimension(100);

    pub const fn from_mm(mm: i32) -> Self {
        Self(mm * 100)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Convert to 1/1200 inch units (1 inch = 2540 in 1/100 mm).
    pub fn to_inch1200(self) -> u16 {
        (self.0 * 1200 / 2540) as u16
    }

    /// Convert from 1/1200 inch units.
    pub fn from_inch1200(v: u16) -> Self {
        Self(i32::from(v) * 2540 / 1200)
    }
}

/// Maximum scan area of the iX500: 216mm x 360mm.
pub const MAX_SCAN_WIDTH: Dimension = Dimension::from_mm(216);
pub const MAX_SCAN_HEIGHT: Dimension = Dimension::from_mm(360);

/// Requested scan region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanRegion {
    pub width: Dimension,
    pub height: Dimension,
}

impl ScanRegion {
    pub fn is_zero(self) -> bool {
        self.width.is_zero() && self.height.is_zero()
    }

    /// Whether the region covers the full scan area (no paper override needed).
    pub fn covers_max_area(self) -> bool {
        self.width >= MAX_SCAN_WIDTH && self.height >= MAX_SCAN_HEIGHT
    }
}

/// ADF feed mode of an abstract scan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdfMode {
    #[default]
    Simplex,
    Duplex,
}

/// An abstract scan request as produced by the eSCL front-end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanRequest {
    /// Requested color mode; `None` lets the scanner decide
    pub color_mode: Option<ColorMode>,

    /// Requested X resolution in DPI (0 = auto)
    pub resolution_dpi: u16,

    pub adf_mode: AdfMode,

    pub region: ScanRegion,

    /// B&W threshold, -5 to +5
    pub threshold: Option<i8>,

    /// Desired output format, e.g. "application/pdf"; `None` keeps the
    /// scanner's native format
    pub document_format: Option<String>,
}

/// Capabilities advertised to AirScan clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerCapabilities {
    pub make_and_model: String,
    pub serial_number: String,

    /// Supported resolutions in DPI
    pub resolutions: Vec<u16>,

    pub min_width: Dimension,
    pub max_width: Dimension,
    pub min_height: Dimension,
    pub max_height: Dimension,

    /// Supported document MIME types
    pub document_formats: Vec<String>,

    pub threshold_min: i8,
    pub threshold_max: i8,

    pub adf_capacity: u32,
    pub duplex: bool,
}

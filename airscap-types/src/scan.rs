//! Scan configuration types

use bytes::Bytes;

/// Scan color modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Let the scanner pick per page
    #[default]
    Auto,
    /// 24-bit color (JPEG output)
    Color,
    /// 8-bit grayscale (JPEG output)
    Gray,
    /// 1-bit black & white (TIFF-G4 output)
    Bw,
}

/// Scan quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Let the scanner pick
    #[default]
    Auto,
    /// 150 DPI
    Normal,
    /// 200 DPI
    Fine,
    /// 300 DPI
    SuperFine,
}

impl Quality {
    /// Wire DPI value for this preset (0 = auto).
    pub fn dpi(self) -> u16 {
        match self {
            Quality::Auto => 0,
            Quality::Normal => 150,
            Quality::Fine => 200,
            Quality::SuperFine => 300,
        }
    }
}

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperSize {
    #[default]
    Auto,
    A4,
    A5,
    BusinessCard,
    Postcard,
}

/// Paper width and height in 1/1200 inch units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperDimension {
    pub width: u16,
    pub height: u16,
}

impl PaperSize {
    /// Scan area for this paper size in 1/1200 inch units.
    pub fn dimensions(self) -> PaperDimension {
        match self {
            // Max scan area
            PaperSize::Auto => PaperDimension { width: 0x28D0, height: 0x45A4 },
            // 210mm x 297mm
            PaperSize::A4 => PaperDimension { width: 0x26D0, height: 0x36D0 },
            // 148mm x 210mm
            PaperSize::A5 => PaperDimension { width: 0x1B50, height: 0x26C0 },
            // auto-width x 100mm
            PaperSize::BusinessCard => PaperDimension { width: 0x28D0, height: 0x1274 },
            // 100mm x 148mm
            PaperSize::Postcard => PaperDimension { width: 0x1280, height: 0x1B50 },
        }
    }
}

/// Scan parameters sent to the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub color_mode: ColorMode,
    pub quality: Quality,
    pub duplex: bool,
    pub bleed_through: bool,
    pub paper_size: PaperSize,
    /// Explicit paper width in 1/1200 inch (0 = use `paper_size`)
    pub paper_width: u16,
    /// Explicit paper height in 1/1200 inch (0 = use `paper_size`)
    pub paper_height: u16,
    /// B&W density, -5 to +5 (B&W mode only)
    pub bw_density: i8,
    pub multi_feed: bool,
    pub blank_page_removal: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Auto,
            quality: Quality::Auto,
            duplex: true,
            bleed_through: false,
            paper_size: PaperSize::Auto,
            paper_width: 0,
            paper_height: 0,
            bw_density: 0,
            multi_feed: true,
            blank_page_removal: true,
        }
    }
}

/// A single scanned page image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Physical sheet index (0-based)
    pub sheet: u32,
    /// 0 = front, 1 = back
    pub side: u8,
    /// Raw image data (JPEG for color/gray, TIFF-G4 for B&W)
    pub image: Bytes,
}

impl Page {
    /// Whether the scanner emitted no image data for this side
    /// (blank page removal filtered it out).
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quality_dpi() {
        assert_eq!(Quality::Auto.dpi(), 0);
        assert_eq!(Quality::Normal.dpi(), 150);
        assert_eq!(Quality::Fine.dpi(), 200);
        assert_eq!(Quality::SuperFine.dpi(), 300);
    }

    #[test]
    fn test_a4_dimensions_in_millimeters() {
        let dim = PaperSize::A4.dimensions();
        // 1/1200 inch → mm via v * 25.4 / 1200, within 1mm of ISO A4
        let width_mm = f64::from(dim.width) * 25.4 / 1200.0;
        let height_mm = f64::from(dim.height) * 25.4 / 1200.0;
        assert!((width_mm - 210.0).abs() < 1.0, "width = {width_mm}mm");
        assert!((height_mm - 297.0).abs() < 1.0, "height = {height_mm}mm");
    }

    #[test]
    fn test_auto_matches_max_scan_area() {
        let dim = PaperSize::Auto.dimensions();
        assert_eq!(dim.width, 0x28D0);
        assert_eq!(dim.height, 0x45A4);
    }

    #[test]
    fn test_default_config() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.color_mode, ColorMode::Auto);
        assert_eq!(cfg.quality, Quality::Auto);
        assert!(cfg.duplex);
        assert!(cfg.multi_feed);
        assert!(cfg.blank_page_removal);
        assert!(!cfg.bleed_through);
        assert_eq!(cfg.paper_width, 0);
    }

    #[test]
    fn test_page_is_empty() {
        let page = Page { sheet: 0, side: 0, image: Bytes::new() };
        assert!(page.is_empty());
        let page = Page { sheet: 0, side: 0, image: Bytes::from_static(b"\xff\xd8") };
        assert!(!page.is_empty());
    }
}

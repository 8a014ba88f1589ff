//! # airscap-types
//!
//! Shared data types for the AirScap ScanSnap bridge:
//! - Scan configuration (color mode, quality, paper size)
//! - Device identity from discovery and the data channel
//! - Capability and status values consumed by the eSCL front-end
//! - Scanner-level errors

pub mod capabilities;
pub mod device;
pub mod scan;
pub mod status;

pub use capabilities::{AdfMode, Dimension, ScanRegion, ScanRequest, ScannerCapabilities};
pub use device::{DataDeviceInfo, DeviceInfo};
pub use scan::{ColorMode, Page, PaperDimension, PaperSize, Quality, ScanConfig};
pub use status::{AdfStatus, ScanError, ScanErrorKind, ScanParams, ScannerStatus};

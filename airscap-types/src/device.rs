//! Device identity structures

use std::fmt;
use std::net::Ipv4Addr;

/// Scanner identity from the 132-byte UDP discovery response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Scanner IP address
    pub device_ip: Ipv4Addr,

    /// TCP data channel port (usually 53218)
    pub data_port: u16,

    /// TCP control channel port (usually 53219)
    pub control_port: u16,

    /// MAC address, formatted `aa:bb:cc:dd:ee:ff`
    pub mac: String,

    /// Serial number (e.g. "iX500-AK6ABB0700")
    pub serial: String,

    /// Device name (e.g. "ScanSnap iX500")
    pub name: String,

    /// Scanner state word
    pub state: u32,

    /// Whether the scanner considers itself paired
    pub paired: bool,

    /// IP of the client the scanner is paired to, if any.
    /// A non-zero value means another host holds the pairing.
    pub client_ip: Option<Ipv4Addr>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] at {} (data:{}, control:{})",
            self.name.trim(),
            self.serial,
            self.device_ip,
            self.data_port,
            self.control_port
        )
    }
}

/// Device identity from the data channel INQUIRY response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDeviceInfo {
    /// Full device name with manufacturer, e.g. "FUJITSU ScanSnap iX500  0M00"
    pub device_name: String,

    /// Firmware revision from the device name suffix, e.g. "0M00"
    pub firmware_revision: String,
}

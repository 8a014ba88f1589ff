//! # airscap
//!
//! Bridge a ScanSnap iX500 speaking the proprietary "VENS" WiFi
//! protocol to standard eSCL/AirScan clients.
//!
//! This crate is the facade over the protocol engine:
//! - [`Scanner`] supervises one scanner session: discovery, pairing,
//!   heartbeat, health checking, and automatic reconnection
//! - [`ScanAdapter`] translates abstract scan requests into scanner
//!   configuration and exposes lazy page iteration through
//!   [`ScanJob`]
//! - [`ButtonListener`] surfaces physical scan-button presses
//!
//! ## Quick start
//!
//! ```no_run
//! use std::net::Ipv4Addr;
//! use std::sync::Arc;
//!
//! use airscap::{ScanAdapter, Scanner};
//! use airscap_types::ScanRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let identity = airscap_core::identity::compute_identity("0700")?;
//!     let scanner = Arc::new(Scanner::new(Ipv4Addr::new(192, 168, 5, 3), identity));
//!
//!     let cancel = CancellationToken::new();
//!     scanner.connect(&cancel).await?;
//!
//!     let adapter = ScanAdapter::new(scanner.clone());
//!     let mut job = adapter.scan(ScanRequest::default()).await?;
//!     while let Some(page) = job.next_page().await? {
//!         println!("sheet {} side {}: {} bytes", page.sheet, page.side, page.image.len());
//!     }
//!     job.close().await;
//!
//!     scanner.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod button;
pub mod error;
pub mod scanner;

pub use adapter::{ScanAdapter, ScanDevice, ScanJob};
pub use button::ButtonListener;
pub use error::{Error, Result};
pub use scanner::Scanner;

// Re-export the types an embedding server needs
pub use airscap_core::identity::{compute_identity, password_from_serial};
pub use airscap_core::SessionToken;
pub use airscap_types as types;

//! Scan every sheet in the ADF and write the pages to disk.
//!
//! Usage: scan_to_files <scanner-ip> <password>

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use airscap::{compute_identity, ScanAdapter, Scanner};
use airscap_types::{AdfMode, ScanRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host: Ipv4Addr = args.next().expect("scanner IP argument").parse()?;
    let password = args.next().expect("password argument");

    let identity = compute_identity(&password)?;
    let scanner = Arc::new(Scanner::new(host, identity));

    let cancel = CancellationToken::new();
    scanner.connect(&cancel).await?;
    println!("connected to {} ({})", scanner.name(), scanner.serial());

    let adapter = ScanAdapter::new(scanner.clone());
    let mut job = adapter
        .scan(ScanRequest {
            adf_mode: AdfMode::Duplex,
            ..ScanRequest::default()
        })
        .await?;

    let ext = if job.format() == "image/tiff" { "tif" } else { "jpg" };
    while let Some(page) = job.next_page().await? {
        let path = format!("page-{}-{}.{}", page.sheet, page.side, ext);
        std::fs::write(&path, &page.image)?;
        println!("{} ({} bytes)", path, page.image.len());
    }
    job.close().await;

    scanner.disconnect().await;
    Ok(())
}

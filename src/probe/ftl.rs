//! FTL probe implementation.
//!
//! FTL has no handshake implemented here; a server counts as alive when its
//! hostname resolves.

use std::time::Duration;
use super::{with_timeout, ProbeError};

pub const FTL_PORT: u16 = 8084;

/// Resolve the FTL ingest hostname.
pub async fn run_ftl_probe(hostname: &str, timeout: Duration) -> Result<(), ProbeError> {
    let mut addrs = with_timeout(timeout, tokio::net::lookup_host((hostname, FTL_PORT)))
        .await?
        .map_err(|e| ProbeError::Network(format!("DNS resolution failed: {}", e)))?;

    match addrs.next() {
        Some(_) => Ok(()),
        None => Err(ProbeError::Network(format!("No addresses found for {}", hostname))),
    }
}

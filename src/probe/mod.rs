//! Probe module for ingest server liveness.
//!
//! Supports RTMP/RTMPS, HLS, and FTL probes.

mod ftl;
mod hls;
mod rtmp;

pub use ftl::*;
pub use hls::*;
pub use rtmp::*;

use crate::catalog::OutputKind;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_rustls::TlsConnector;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Handshake(String),
    #[error("Server responded with {0}")]
    Status(u16),
}

/// Bound a single I/O step by the probe timeout.
pub(crate) async fn with_timeout<F, T>(timeout: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ProbeError::Timeout(timeout))
}

/// Answers whether a server is currently reachable.
pub trait Liveness {
    async fn is_alive(&self, kind: &OutputKind, url: &str) -> bool;
}

/// Probes servers over the network, one attempt per call.
pub struct NetworkProber {
    http: reqwest::Client,
    tls: TlsConnector,
    timeout: Duration,
}

impl NetworkProber {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;
        Self::with_client(http, timeout)
    }

    /// Create a prober around an existing HTTP client.
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Result<Self, ProbeError> {
        Ok(Self {
            http,
            tls: tls_connector()?,
            timeout,
        })
    }

    /// Run the probe matching `kind` against `url`.
    pub async fn run_probe(&self, kind: &OutputKind, url: &str) -> Result<(), ProbeError> {
        match kind {
            OutputKind::Rtmp => run_rtmp_probe(url, &self.tls, self.timeout).await,
            OutputKind::Hls => run_hls_probe(&self.http, url, self.timeout).await,
            OutputKind::Ftl => run_ftl_probe(url, self.timeout).await,
            OutputKind::Unknown(other) => {
                Err(ProbeError::Config(format!("unknown probe type: {}", other)))
            }
        }
    }
}

impl Liveness for NetworkProber {
    async fn is_alive(&self, kind: &OutputKind, url: &str) -> bool {
        match self.run_probe(kind, url).await {
            Ok(()) => true,
            Err(e) => {
                match kind {
                    OutputKind::Ftl => {
                        tracing::warn!("⚠️ Could not resolve hostname for server: {} ({})", url, e)
                    }
                    OutputKind::Hls => {
                        tracing::warn!("⚠️ Could not connect to HLS server: {} ({})", url, e)
                    }
                    _ => tracing::warn!("⚠️ Connection to server failed: {} ({})", url, e),
                }
                false
            }
        }
    }
}

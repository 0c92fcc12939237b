//! RTMP/RTMPS probe implementation.
//!
//! Opens a connection, sends the client's C0+C1 handshake and expects the
//! server's S0+S1 in return.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::{Host, Url};

use super::{with_timeout, ProbeError};

pub const DEFAULT_RTMP_PORT: u16 = 1935;

const RTMP_VERSION: u8 = 3;
/// C0 (1 byte) + time (4 bytes) + zero (4 bytes) + random (1528 bytes).
const HANDSHAKE_LEN: usize = 1537;
const HANDSHAKE_RANDOM_OFFSET: usize = 9;
/// Minimum reply: S0 (1 byte) + S1 up to its random block.
const REPLY_LEN: usize = 1536;
const READ_CHUNK: usize = 4096;

/// Connection target parsed from an `rtmp://` or `rtmps://` url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpTarget {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl RtmpTarget {
    pub fn parse(address: &str) -> Result<Self, ProbeError> {
        let url = Url::parse(address)
            .map_err(|e| ProbeError::Config(format!("invalid url {}: {}", address, e)))?;

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err(ProbeError::Config(format!("no host in url {}", address))),
        };

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_RTMP_PORT),
            secure: url.scheme() == "rtmps",
        })
    }
}

/// Build the TLS client configuration used for RTMPS probes.
pub fn tls_connector() -> Result<TlsConnector, ProbeError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| ProbeError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Run an RTMP probe against the given url.
///
/// Every step (connect, TLS handshake, write, each read) gets the full
/// timeout.
pub async fn run_rtmp_probe(
    address: &str,
    tls: &TlsConnector,
    timeout: Duration,
) -> Result<(), ProbeError> {
    let target = RtmpTarget::parse(address)?;

    let stream = with_timeout(timeout, TcpStream::connect((target.host.as_str(), target.port)))
        .await?
        .map_err(|e| ProbeError::Network(format!("failed to connect: {}", e)))?;

    let handshake = build_handshake();

    let reply = if target.secure {
        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|e| ProbeError::Tls(format!("invalid server name {}: {}", target.host, e)))?;
        let mut stream = with_timeout(timeout, tls.connect(server_name, stream))
            .await?
            .map_err(|e| ProbeError::Tls(e.to_string()))?;
        exchange_handshake(&mut stream, &handshake, timeout).await?
    } else {
        let mut stream = stream;
        exchange_handshake(&mut stream, &handshake, timeout).await?
    };

    validate_handshake_reply(&reply)
}

/// Build C0+C1: version byte, 8 zero bytes, 1528 random bytes.
fn build_handshake() -> Vec<u8> {
    let mut packet = vec![0u8; HANDSHAKE_LEN];
    packet[0] = RTMP_VERSION;
    rand::thread_rng().fill(&mut packet[HANDSHAKE_RANDOM_OFFSET..]);
    packet
}

/// Send the handshake and collect the reply until it is long enough or the
/// peer closes the connection.
async fn exchange_handshake<S>(
    stream: &mut S,
    handshake: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    with_timeout(timeout, stream.write_all(handshake))
        .await?
        .map_err(|e| ProbeError::Network(format!("failed to send: {}", e)))?;
    with_timeout(timeout, stream.flush())
        .await?
        .map_err(|e| ProbeError::Network(format!("failed to send: {}", e)))?;

    let mut reply = Vec::with_capacity(REPLY_LEN);
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = with_timeout(timeout, stream.read(&mut buf))
            .await?
            .map_err(|e| ProbeError::Network(format!("failed to recv: {}", e)))?;
        reply.extend_from_slice(&buf[..n]);
        if reply.len() >= REPLY_LEN || n == 0 {
            break;
        }
    }

    Ok(reply)
}

fn validate_handshake_reply(reply: &[u8]) -> Result<(), ProbeError> {
    if reply.len() < REPLY_LEN || reply[0] != RTMP_VERSION {
        return Err(ProbeError::Handshake(
            "Invalid RTMP handshake received from server".to_string(),
        ));
    }
    Ok(())
}

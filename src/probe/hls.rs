//! HLS probe implementation.

use std::time::Duration;
use super::ProbeError;

/// Run an HLS probe: POST to the ingest url and check that *something*
/// answers there.
pub async fn run_hls_probe(
    client: &reqwest::Client,
    address: &str,
    timeout: Duration,
) -> Result<(), ProbeError> {
    let response = client
        .post(address)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(timeout)
            } else {
                ProbeError::Network(e.to_string())
            }
        })?;

    let status = response.status().as_u16();
    if is_live_status(status) {
        Ok(())
    } else {
        Err(ProbeError::Status(status))
    }
}

/// Anything below 500 except 404 counts as a live endpoint.
pub fn is_live_status(status: u16) -> bool {
    status < 500 && status != 404
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single response with the given status to every connection.
    async fn fake_http_server(status: u16) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {} Status\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}/live/ingest", addr)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn test_is_live_status() {
        assert!(is_live_status(200));
        assert!(is_live_status(401));
        assert!(is_live_status(405));
        assert!(!is_live_status(404));
        assert!(!is_live_status(500));
        assert!(!is_live_status(503));
    }

    #[tokio::test]
    async fn test_hls_probe_ok() {
        let url = fake_http_server(200).await;
        assert!(run_hls_probe(&client(), &url, Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_hls_probe_client_error_is_alive() {
        let url = fake_http_server(400).await;
        assert!(run_hls_probe(&client(), &url, Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_hls_probe_not_found() {
        let url = fake_http_server(404).await;
        let result = run_hls_probe(&client(), &url, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Status(404))));
    }

    #[tokio::test]
    async fn test_hls_probe_server_error() {
        let url = fake_http_server(502).await;
        let result = run_hls_probe(&client(), &url, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Status(502))));
    }

    #[tokio::test]
    async fn test_hls_probe_invalid_url() {
        let result = run_hls_probe(&client(), "http://256.256.256.256", Duration::from_millis(100)).await;
        assert!(result.is_err());
    }
}

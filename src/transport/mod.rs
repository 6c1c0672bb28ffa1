//! HTTP transport seam
//!
//! The download engine never talks to `reqwest` directly; it goes through
//! the [`HttpTransport`] trait so the byte-moving logic can be exercised
//! against an in-memory transport in tests.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// A streaming response body.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Failure classes a transport must distinguish.
///
/// `NotFound` is load-bearing: the chunked strategy reads it as "chunk
/// sequence exhausted" while the default strategy reads it as "source gone".
#[derive(Debug)]
pub enum FetchError {
    /// The server reported a not-found class response (404/410).
    NotFound(String),
    /// Any other transport failure.
    Io(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::NotFound(url) => write!(f, "not found: {}", url),
            FetchError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Core trait for opening remote content as a byte stream
///
/// Range requests for resumed downloads are expressed through `headers`;
/// implementations must pass them through untouched.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Open a GET request to `url` and return the response body stream.
    async fn open(&self, url: &str, headers: &[(String, String)]) -> Result<ByteStream, FetchError>;
}

/// Production transport backed by a shared `reqwest::Client`
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("vidfetch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Io(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn open(&self, url: &str, headers: &[(String, String)]) -> Result<ByteStream, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let stream = response
                    .bytes_stream()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
                Ok(Box::new(StreamReader::new(Box::pin(stream))) as ByteStream)
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(FetchError::NotFound(url.to_string())),
            status => Err(FetchError::Io(format!("HTTP error {} for {}", status, url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::NotFound("https://example.com/frag(4)".to_string());
        assert!(err.to_string().contains("frag(4)"));

        let err = FetchError::Io("connection reset".to_string());
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}

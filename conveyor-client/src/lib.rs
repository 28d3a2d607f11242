//! Conveyor HTTP Client
//!
//! Puts serialized pipes on the wire. A pipe is started by sending its whole
//! definition, with the payload attached to the entry segment, to the entry
//! segment's endpoint in a single request.
//!
//! # Example
//!
//! ```no_run
//! use conveyor_client::SegmentClient;
//! use conveyor_core::Endpoint;
//!
//! #[tokio::main]
//! async fn main() -> conveyor_client::Result<()> {
//!     let client = SegmentClient::new();
//!     let endpoint = Endpoint::new("http://localhost:8098/pipe");
//!
//!     client.send_document(&endpoint, br#"{"header":{"name":"test1"}}"#.to_vec()).await?;
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::{ClientError, Result};

use conveyor_core::Endpoint;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client for segment endpoints
#[derive(Debug, Clone)]
pub struct SegmentClient {
    /// HTTP client instance
    client: Client,
}

impl SegmentClient {
    /// Create a new segment client
    ///
    /// Redirects are never followed: a 3xx answer is a rejection.
    pub fn new() -> Self {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Create a segment client whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Create a segment client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    /// The client should be built with `redirect(Policy::none())`, otherwise a
    /// redirected dispatch is re-sent to the new location.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Send a JSON document to an endpoint
    ///
    /// Issues exactly one request using the endpoint's method (POST when unset)
    /// with `Content-Type: application/json`.
    ///
    /// # Errors
    /// - `InvalidAddress` / `InvalidMethod` before anything is sent
    /// - `RequestFailed` when the endpoint cannot be reached
    /// - `Rejected` when the endpoint answers with anything but 200 or 202
    pub async fn send_document(&self, endpoint: &Endpoint, document: Vec<u8>) -> Result<()> {
        let url = parse_address(&endpoint.address)?;
        let method = parse_method(endpoint.method_or_default())?;

        debug!("Sending {} bytes via {} to {}", document.len(), method, url);

        let response = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .body(document)
            .send()
            .await?;

        self.handle_dispatch_response(response)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Interpret the endpoint's answer
    ///
    /// Only 200 and 202 count as accepted; the response body is ignored.
    fn handle_dispatch_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        match status {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
            other => Err(ClientError::rejected(
                other.as_u16(),
                other.canonical_reason().unwrap_or("Unknown Status"),
            )),
        }
    }
}

impl Default for SegmentClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_address(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(|e| ClientError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ClientError::InvalidAddress {
            address: address.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| ClientError::InvalidMethod(method.to_string()))
}

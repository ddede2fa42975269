use std::time::Duration;

use reqwest::blocking::{Client, Response};
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for HTTP client operations
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    NetworkError(String),
}

impl From<reqwest::Error> for HttpClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpClientError::Timeout
        } else if err.is_connect() {
            HttpClientError::NetworkError(err.to_string())
        } else {
            HttpClientError::RequestFailed(err.to_string())
        }
    }
}

/// The classified response of one delivery attempt.
///
/// The client reports every HTTP response, success or not; deciding what
/// counts as delivered is the caller's job.
#[derive(Debug, Clone)]
pub struct LrsResponse {
    pub status: u16,

    /// Canonical reason phrase for the status, e.g. `"Not Found"`.
    pub message: String,

    pub body: String,
}

impl LrsResponse {
    /// Whether the status falls in the success range `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP client for statement delivery.
///
/// Owns a pooled `reqwest` transport that is safe to share across threads;
/// every call is exactly one POST attempt with no retry or backoff.
pub struct DeliveryClient {
    client: Client,
    timeout: Duration,
}

impl DeliveryClient {
    /// Create a client with the given request timeout.
    /// A zero timeout leaves the transport default in place.
    pub fn new(timeout: Duration) -> Result<Self, HttpClientError> {
        let mut builder = Client::builder()
            .user_agent(format!("TincanProvider/{}", env!("CARGO_PKG_VERSION")));

        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| HttpClientError::RequestFailed(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Execute one POST and classify the response.
    ///
    /// Transport problems (connect failure, timeout, TLS failure) are errors;
    /// any HTTP response, including non-2xx, is an `Ok` result carrying the
    /// status for the caller to judge.
    pub fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<LrsResponse, HttpClientError> {
        debug!(url = %url, "Sending statement POST");

        let mut request = self.client.post(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(body.to_string()).send().map_err(|e| {
            warn!(url = %url, error = %e, "Statement POST failed");
            HttpClientError::from(e)
        })?;

        let status = response.status();
        let message = status
            .canonical_reason()
            .unwrap_or_default()
            .to_string();
        let body = read_response_body(response)?;

        debug!(url = %url, status = %status.as_u16(), "Statement response received");

        Ok(LrsResponse {
            status: status.as_u16(),
            message,
            body,
        })
    }

    /// Get configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Read response body with size limit
fn read_response_body(response: Response) -> Result<String, HttpClientError> {
    // Limit response body size to 1MB
    const MAX_BODY_SIZE: usize = 1024 * 1024;

    let bytes = response
        .bytes()
        .map_err(|e| HttpClientError::RequestFailed(format!("Failed to read response body: {e}")))?;

    if bytes.len() > MAX_BODY_SIZE {
        warn!(
            size = bytes.len(),
            max_size = MAX_BODY_SIZE,
            "Response body too large, truncating"
        );
    }

    Ok(String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_BODY_SIZE)]).to_string())
}

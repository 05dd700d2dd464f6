//! HTTP transport helpers: client construction, request dispatch and
//! status classification.

pub mod headers;
pub mod status;

pub use headers::*;
pub use status::classify_http_error;

use bytes::Bytes;
use reqwest::header::HeaderMap;

use crate::error::LlmError;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::types::HttpConfig;

/// Build a `reqwest::Client` honouring timeouts, proxy and user agent.
///
/// `read_timeout` bounds silence on the connection, so a stream that keeps
/// producing tokens is never cut off by it.
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(read_timeout) = config.read_timeout {
        builder = builder.read_timeout(read_timeout);
    }
    if let Some(connect_timeout) = config.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }
    if let Some(proxy) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| LlmError::ConfigurationError(format!("Invalid proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    builder
        .build()
        .map_err(|e| LlmError::ConfigurationError(format!("Failed to build HTTP client: {e}")))
}

/// Map a failure to send a request into the transport error taxonomy.
pub fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        return LlmError::TimeoutError(format!("Request timed out: {e}"));
    }
    if e.is_connect() {
        return LlmError::ConnectionError(format!("Connection error: {e}"));
    }
    LlmError::HttpError(format!("Failed to send request: {e}"))
}

/// A fully prepared POST whose body can be replayed on retry.
#[derive(Debug, Clone)]
pub struct StreamingRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl StreamingRequest {
    pub fn json<T: serde::Serialize>(
        url: impl Into<String>,
        headers: HeaderMap,
        body: &T,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            url: url.into(),
            headers,
            body: Bytes::from(serde_json::to_vec(body)?),
        })
    }
}

/// Send the request and return the response once a success status arrived.
///
/// Non-success statuses are read in full and classified. With a retry policy
/// the handshake is repeated for retryable failures; the body stream itself
/// is never retried.
pub async fn send_streaming_request(
    client: &reqwest::Client,
    request: &StreamingRequest,
    retry: Option<&RetryPolicy>,
) -> Result<reqwest::Response, LlmError> {
    let send_once = |_attempt: u32| async move {
        let response = client
            .post(&request.url)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify_http_error(status.as_u16(), &text))
    };

    match retry {
        Some(policy) => RetryExecutor::new(policy.clone()).execute(send_once).await,
        None => send_once(0).await,
    }
}

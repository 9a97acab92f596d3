//! HTTP JSON-RPC client backed by `reqwest`.
//!
//! One request per call. Retrying, pacing and rate-limit back-off belong to
//! the poll loop, so this client only classifies failures:
//! - HTTP 429 becomes [`TransportError::RateLimited`] with any `Retry-After` hint
//! - other non-2xx statuses become [`TransportError::Http`]
//! - client-side timeouts become [`TransportError::Timeout`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use tipstream_core::error::TransportError;
use tipstream_core::policy::rate_limit;
use tipstream_core::request::{JsonRpcRequest, JsonRpcResponse};
use tipstream_core::transport::RpcTransport;

/// Configuration for `HttpRpcClient`.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP JSON-RPC client for a single endpoint.
pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpRpcClient {
    /// Create a new client for the given JSON-RPC endpoint URL.
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            http,
            request_timeout: config.request_timeout,
        })
    }

    /// Create with default configuration.
    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// Map a non-2xx response to a transport error.
pub(crate) fn status_error(
    provider: &str,
    status: StatusCode,
    retry_after: Option<&str>,
    body: &str,
) -> TransportError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after
            .and_then(parse_retry_after)
            .or_else(|| rate_limit::detect(body).and_then(|hint| hint.retry_after));
        return TransportError::RateLimited {
            provider: provider.to_string(),
            retry_after,
        };
    }
    TransportError::Http(format!("HTTP {}: {body}", status.as_u16()))
}

/// `Retry-After` in its delay-seconds form. HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(method = %req.method, url = %self.url, "rpc request");

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.text().await.unwrap_or_default();
            let err = status_error(&self.url, status, retry_after.as_deref(), &body);
            tracing::debug!(status = status.as_u16(), error = %err, url = %self.url, "rpc request failed");
            return Err(err);
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

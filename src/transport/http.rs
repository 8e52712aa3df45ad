//! HTTP transport over a chunked response body.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use tracing::debug;

use super::{ByteStream, RequestMethod, RunRequest, Transport};
use crate::config::StreamConfig;
use crate::error::{Result, RunStreamError};

/// Starts runs against the configured service and streams the response body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: StreamConfig,
}

impl HttpTransport {
    /// Build a transport with its own client.
    ///
    /// Only the connect phase has a timeout; an open stream may idle for as
    /// long as the run takes.
    pub fn new(config: StreamConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    /// Use a caller-provided client.
    pub fn with_client(client: reqwest::Client, config: StreamConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Full URL for a request path.
    pub fn url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    fn build_headers(&self, request: &RunRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                RunStreamError::Configuration("API key is not a valid header value".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in self.config.headers.iter().chain(request.headers.iter()) {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                RunStreamError::Configuration(format!("invalid header name: {name}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                RunStreamError::Configuration(format!("invalid value for header {name}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &RunRequest) -> Result<ByteStream> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, "opening run stream");

        let mut builder = match request.method {
            RequestMethod::Get => self.client.get(&url),
            RequestMethod::Post => self.client.post(&url),
        };
        builder = builder.headers(self.build_headers(request)?);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers());
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text, retry_after));
        }

        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(RunStreamError::from))
            .boxed())
    }
}

/// Map a non-success response to an error.
pub fn status_to_error(
    status: StatusCode,
    body: &str,
    retry_after_ms: Option<u64>,
) -> RunStreamError {
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.trim().to_string()
    };
    match status.as_u16() {
        401 | 403 => RunStreamError::Authentication(message),
        429 => RunStreamError::RateLimited { retry_after_ms },
        code => RunStreamError::api(code, message),
    }
}

/// `Retry-After` in delay-seconds form, as milliseconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

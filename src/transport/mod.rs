//! Transports: where the bytes of a run stream come from.
//!
//! The consumer only needs "an ordered sequence of byte chunks, terminated by
//! a close or an error". [`HttpTransport`] gets that from a chunked HTTP
//! response; [`ReplayTransport`] plays back scripted chunks.

pub mod http;
pub mod replay;

pub use http::HttpTransport;
pub use replay::ReplayTransport;

use std::collections::HashMap;

use async_trait::async_trait;
use bon::Builder;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Result;

/// Stream of raw body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// HTTP method used to start a run.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RequestMethod {
    Get,
    #[default]
    Post,
}

/// Describes the request that starts a run.
///
/// ```
/// use runstream::transport::RunRequest;
///
/// let request = RunRequest::builder()
///     .path("/api/skills/summarize/run")
///     .body(serde_json::json!({"input": "hello"}))
///     .build();
/// assert_eq!(request.path, "/api/skills/summarize/run");
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct RunRequest {
    /// Path joined onto the configured base URL.
    #[builder(into)]
    pub path: String,
    #[builder(default)]
    #[serde(default)]
    pub method: RequestMethod,
    /// JSON request body.
    pub body: Option<serde_json::Value>,
    /// Extra headers for this request only.
    #[builder(default)]
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Publish a final `failed` state when the run is canceled.
    #[builder(default)]
    #[serde(default)]
    pub cancel_as_failure: bool,
}

impl RunRequest {
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::builder().path(path).body(body).build()
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::builder().path(path).method(RequestMethod::Get).build()
    }
}

/// Opens the byte stream for a run.
///
/// An `Err` from `open` means the run never started streaming (connection
/// refused, non-success status). An `Err` item inside the stream means it
/// broke mid-way. Both end the run as `failed`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: &RunRequest) -> Result<ByteStream>;
}

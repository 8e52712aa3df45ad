//! In-memory transport that plays back scripted chunks.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ByteStream, RunRequest, Transport};
use crate::error::{Result, RunStreamError};

/// Plays back a fixed list of chunks for every request.
///
/// Used for tests, demos and offline replay of captured streams. The script
/// can end with a clean close, a mid-stream error, or never end at all.
#[derive(Debug, Clone, Default)]
pub struct ReplayTransport {
    chunks: Vec<Bytes>,
    refuse: Option<(u16, String)>,
    trailing_error: Option<String>,
    delay: Option<Duration>,
    hold_open: bool,
}

impl ReplayTransport {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Split `data` into chunks of `chunk_size` bytes (at least one).
    ///
    /// Splits ignore character boundaries on purpose.
    pub fn chunked(data: impl AsRef<[u8]>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self::new(
            data.as_ref()
                .chunks(chunk_size)
                .map(Bytes::copy_from_slice)
                .collect::<Vec<_>>(),
        )
    }

    /// Load a captured stream from disk.
    pub fn from_file(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::chunked(data, chunk_size))
    }

    /// Fail `open` as if the server answered with `status`.
    pub fn refuse(status: u16, message: impl Into<String>) -> Self {
        Self {
            refuse: Some((status, message.into())),
            ..Default::default()
        }
    }

    /// Break the stream with an error after the last chunk.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.trailing_error = Some(message.into());
        self
    }

    /// Sleep before each chunk.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Never close the stream after the last chunk.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn open(&self, request: &RunRequest) -> Result<ByteStream> {
        if let Some((status, message)) = &self.refuse {
            return Err(RunStreamError::api(*status, message.clone()));
        }
        tracing::debug!(path = %request.path, chunks = self.chunks.len(), "replaying run stream");

        let chunks = self.chunks.clone();
        let delay = self.delay;
        let trailing_error = self.trailing_error.clone();
        let hold_open = self.hold_open;

        let stream = async_stream::stream! {
            for chunk in chunks {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(chunk);
            }
            if let Some(message) = trailing_error {
                yield Err(RunStreamError::Stream(message));
            } else if hold_open {
                futures::future::pending::<()>().await;
            }
        };
        Ok(Box::pin(stream))
    }
}

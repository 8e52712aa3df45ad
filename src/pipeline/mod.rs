//! Synchronous decode-and-reduce pipeline for one run.
//!
//! [`RunPipeline`] owns every buffer a run needs (decoder remainder, partial
//! line, pending frame fields) plus the [`RunState`]. It has no I/O and no
//! locking; the consumer feeds it one chunk at a time.

use crate::codec::{ByteDecoder, EventFrame, EventFrameParser, LineAccumulator};
use crate::reducer::reduce;
use crate::types::{RunEvent, RunState};

/// Error recorded when the stream closes before any terminal event.
pub const STREAM_ENDED: &str = "Stream ended unexpectedly";

/// Bytes in, [`RunState`] out.
#[derive(Debug, Default)]
pub struct RunPipeline {
    decoder: ByteDecoder,
    lines: LineAccumulator,
    frames: EventFrameParser,
    state: RunState,
    finished: bool,
}

impl RunPipeline {
    /// Pipeline for a run in the `idle` phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline starting from an existing state (usually `RunState::connecting()`).
    pub fn with_state(state: RunState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    /// Frames dropped so far because their payload was not JSON.
    pub fn dropped_frames(&self) -> usize {
        self.frames.dropped()
    }

    /// Apply one event. Every applied event changes the state.
    pub fn apply(&mut self, event: RunEvent) {
        self.state = reduce(std::mem::take(&mut self.state), event);
    }

    /// Push one chunk from the transport. Returns whether the state changed.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        if self.finished {
            tracing::debug!(len = chunk.len(), "ignoring chunk after end of stream");
            return false;
        }
        let text = self.decoder.decode(chunk, false);
        if text.is_empty() {
            return false;
        }
        let mut applied = 0;
        for line in self.lines.feed(&text) {
            if let Some(frame) = self.frames.feed_line(&line) {
                applied += usize::from(self.apply_frame(&frame));
            }
        }
        applied > 0
    }

    /// Clean end of stream.
    ///
    /// Flushes the decoder, then the line buffer, then the frame parser, since
    /// a trailing partial line may complete a trailing frame. A run that is
    /// still not terminal afterwards fails with [`STREAM_ENDED`].
    pub fn finish(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;

        let mut applied = 0;
        let text = self.decoder.finish();
        let mut lines = self.lines.feed(&text);
        lines.extend(self.lines.flush());
        for line in lines {
            if let Some(frame) = self.frames.feed_line(&line) {
                applied += usize::from(self.apply_frame(&frame));
            }
        }
        if let Some(frame) = self.frames.flush() {
            applied += usize::from(self.apply_frame(&frame));
        }

        if !self.state.is_terminal() {
            tracing::debug!(phase = %self.state.phase, "stream closed before a terminal event");
            self.apply(RunEvent::error(STREAM_ENDED));
            applied += 1;
        }
        applied > 0
    }

    /// Abandon the stream with a transport failure.
    ///
    /// Buffered partial input is discarded. Returns whether the state changed;
    /// a run that already finished keeps its outcome.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        self.finished = true;
        self.apply(RunEvent::error(message));
        true
    }

    /// Feed a whole captured stream and return the final state.
    pub fn run_to_end<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> RunState {
        let mut pipeline = Self::new();
        for chunk in chunks {
            pipeline.push(chunk);
        }
        pipeline.finish();
        pipeline.into_state()
    }

    fn apply_frame(&mut self, frame: &EventFrame) -> bool {
        match RunEvent::from_frame(frame) {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }
}

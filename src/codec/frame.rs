//! Frame assembly: `event:` and `data:` header lines closed by a blank line.

use serde_json::Value;

/// One event-kind-plus-payload unit from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub event: String,
    pub data: Value,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Render the frame in wire form, blank-line terminator included.
    pub fn encode(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }
}

/// Groups lines into frames.
///
/// Header order inside a frame is free and the last `event:` or `data:`
/// wins. A frame whose payload is not valid JSON is dropped and parsing
/// carries on with the next one.
#[derive(Debug, Default)]
pub struct EventFrameParser {
    event: Option<String>,
    data: Option<String>,
    dropped: usize,
}

impl EventFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line (without its terminator).
    pub fn feed_line(&mut self, line: &str) -> Option<EventFrame> {
        if line.is_empty() {
            return self.take_frame();
        }
        if let Some(kind) = line.strip_prefix("event:") {
            self.event = Some(kind.trim().to_string());
        } else if let Some(payload) = line.strip_prefix("data:") {
            let payload = payload.strip_prefix(' ').unwrap_or(payload);
            self.data = Some(payload.to_string());
        }
        None
    }

    /// End of stream: emit a complete frame that never saw its blank line.
    pub fn flush(&mut self) -> Option<EventFrame> {
        self.take_frame()
    }

    /// Frames dropped so far because their payload was not JSON.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn take_frame(&mut self) -> Option<EventFrame> {
        let (Some(event), Some(data)) = (self.event.take(), self.data.take()) else {
            return None;
        };
        match serde_json::from_str::<Value>(&data) {
            Ok(data) => Some(EventFrame { event, data }),
            Err(err) => {
                self.dropped += 1;
                tracing::debug!(
                    event = %event,
                    error = %err,
                    "dropping frame with malformed payload"
                );
                None
            }
        }
    }
}

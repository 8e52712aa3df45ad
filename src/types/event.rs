//! Run events as they arrive on the wire.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::codec::EventFrame;

/// Error message used when an `error` frame carries no `message`.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Kind of a run event, as named on the `event:` line of a frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunEventKind {
    Progress,
    Done,
    Error,
}

/// Intermediate progress reported by the backend while a run executes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub message: String,
    /// Milliseconds since the run started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Tool currently executing, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Outcome reported by the backend for a finished run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// One invocation of an external capability during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_name: String,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub output: serde_json::Value,
    /// Milliseconds.
    #[serde(default)]
    pub duration: f64,
}

/// Final result of a run, carried by a `done` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    /// Milliseconds; the backend may report fractions.
    #[serde(default)]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// A decoded run event.
///
/// Serializes to the payload the backend puts on the `data:` line, tagged
/// with `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RunEvent {
    Progress(ProgressEvent),
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<RunResult>,
    },
    Error {
        message: String,
    },
}

impl RunEvent {
    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress(ProgressEvent::new(message))
    }

    pub fn done(result: RunResult) -> Self {
        Self::Done {
            result: Some(result),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> RunEventKind {
        match self {
            Self::Progress(_) => RunEventKind::Progress,
            Self::Done { .. } => RunEventKind::Done,
            Self::Error { .. } => RunEventKind::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }

    /// Interpret a parsed frame as a run event.
    ///
    /// The `event:` line decides the kind; a `"type"` field in the payload is
    /// ignored. Returns `None` for kinds outside the closed set and for
    /// progress payloads of the wrong shape. A `done` frame always yields an
    /// event, with `result: None` when the result is missing or unreadable.
    pub fn from_frame(frame: &EventFrame) -> Option<Self> {
        let Ok(kind) = frame.event.parse::<RunEventKind>() else {
            tracing::trace!(event = %frame.event, "ignoring frame of unknown kind");
            return None;
        };

        match kind {
            RunEventKind::Progress => {
                match serde_json::from_value::<ProgressEvent>(frame.data.clone()) {
                    Ok(progress) => Some(Self::Progress(progress)),
                    Err(err) => {
                        tracing::debug!(error = %err, "dropping malformed progress frame");
                        None
                    }
                }
            }
            RunEventKind::Done => {
                let result = frame
                    .data
                    .get("result")
                    .filter(|value| !value.is_null())
                    .and_then(|value| {
                        serde_json::from_value::<RunResult>(value.clone())
                            .map_err(|err| {
                                tracing::debug!(error = %err, "unreadable result in done frame");
                            })
                            .ok()
                    });
                Some(Self::Done { result })
            }
            RunEventKind::Error => {
                let message = frame
                    .data
                    .get("message")
                    .and_then(|value| value.as_str())
                    .unwrap_or(UNKNOWN_ERROR);
                Some(Self::error(message))
            }
        }
    }

    /// Build the wire frame for this event.
    pub fn to_frame(&self) -> EventFrame {
        EventFrame {
            event: self.kind().to_string(),
            // An enum of plain data fields always serializes.
            data: serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
        }
    }
}

//! Accumulated state of a single run.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::event::{ProgressEvent, RunEvent, RunResult};

/// Lifecycle phase of a run.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Connecting,
    Running,
    Completed,
    Failed,
}

impl RunPhase {
    /// `Completed` and `Failed` are terminal; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Snapshot of everything known about one run.
///
/// Published to subscribers after every change. A new run always starts
/// from a fresh `RunState`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub phase: RunPhase,
    /// Append-only, in arrival order.
    pub progress: Vec<ProgressEvent>,
    pub result: Option<RunResult>,
    pub error: Option<String>,
    /// Terminal events received after the run was already terminal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<RunEvent>,
}

impl RunState {
    /// State of a run whose transport is being opened.
    pub fn connecting() -> Self {
        Self {
            phase: RunPhase::Connecting,
            ..Default::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.phase == RunPhase::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.phase == RunPhase::Failed
    }

    /// Output of a completed run.
    pub fn output(&self) -> Option<&str> {
        self.result.as_ref().map(|result| result.output.as_str())
    }

    pub fn last_progress(&self) -> Option<&ProgressEvent> {
        self.progress.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_names_are_lowercase() {
        assert_eq!(RunPhase::Connecting.to_string(), "connecting");
        assert_eq!("failed".parse::<RunPhase>().unwrap(), RunPhase::Failed);
        assert_eq!(
            serde_json::to_string(&RunPhase::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!RunPhase::Idle.is_terminal());
        assert!(!RunPhase::Connecting.is_terminal());
        assert!(!RunPhase::Running.is_terminal());
        assert!(RunPhase::Completed.is_terminal());
        assert!(RunPhase::Failed.is_terminal());
    }
}

//! Core types for run events and run state.

pub mod event;
pub mod state;

pub use event::{ProgressEvent, RunEvent, RunEventKind, RunResult, RunStatus, ToolCallRecord};
pub use state::{RunPhase, RunState};

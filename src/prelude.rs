//! Convenience re-exports for common use.

pub use crate::config::StreamConfig;
pub use crate::consumer::{RunSubscription, StreamConsumer};
pub use crate::error::{Result, RunStreamError};
pub use crate::pipeline::RunPipeline;
pub use crate::reducer::reduce;
pub use crate::transport::{HttpTransport, ReplayTransport, RunRequest, Transport};
pub use crate::types::{
    ProgressEvent, RunEvent, RunEventKind, RunPhase, RunResult, RunState, RunStatus,
    ToolCallRecord,
};

//! runstream: client for streamed run events.
//!
//! A backend run (an AI skill or agent execution) streams its progress and
//! final result as `event:`/`data:` frames over a chunked response. This
//! crate decodes that stream across arbitrary chunk boundaries and folds it
//! into one idempotent [`RunState`](types::RunState) that always ends in a
//! terminal phase.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use runstream::prelude::*;
//!
//! # async fn example() -> runstream::error::Result<()> {
//! let transport = Arc::new(HttpTransport::new(StreamConfig::load()?)?);
//! let request = RunRequest::post("/api/agents/support/run", serde_json::json!({"message": "hi"}));
//! let state = StreamConsumer::run_to_completion(transport, request).await?;
//! println!("{}: {:?}", state.phase, state.output());
//! # Ok(())
//! # }
//! ```
//!
//! Without a network, [`RunPipeline`](pipeline::RunPipeline) turns captured
//! bytes into the same state:
//!
//! ```
//! use runstream::pipeline::RunPipeline;
//! use runstream::types::RunPhase;
//!
//! let wire = b"event: progress\ndata: {\"message\":\"Searching\"}\n\n";
//! let state = RunPipeline::run_to_end([&wire[..]]);
//! assert_eq!(state.progress[0].message, "Searching");
//! assert_eq!(state.phase, RunPhase::Failed); // no terminal event before close
//! ```

pub mod codec;
pub mod config;
pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod reducer;
pub mod transport;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

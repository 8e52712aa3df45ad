//! CLI for runstream.

pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Watch or replay streamed runs
#[derive(Parser, Debug)]
#[command(name = "runstream", version, about = "Watch streamed skill and agent runs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a run against the service and follow it
    Watch(WatchArgs),
    /// Feed a captured stream file through the decoder
    Replay(ReplayArgs),
}

/// Arguments for `runstream watch`.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Run endpoint path, joined onto the base URL (e.g. /api/skills/abc/run)
    pub path: String,

    /// Service base URL (overrides config file and RUNSTREAM_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// JSON request body
    #[arg(long)]
    pub body: Option<String>,

    /// Use GET instead of POST
    #[arg(long)]
    pub get: bool,

    /// Give up and cancel after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print every snapshot as a JSON line
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `runstream replay`.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// File holding a captured event stream
    pub file: PathBuf,

    /// Feed the file in chunks of this many bytes
    #[arg(long, default_value = "4096")]
    pub chunk_size: usize,

    /// Print the final state as JSON
    #[arg(long)]
    pub json: bool,
}

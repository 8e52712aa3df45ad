//! runstream CLI binary entry point.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use runstream::cli::render::SnapshotPrinter;
use runstream::cli::{Cli, Commands, ReplayArgs, WatchArgs};
use runstream::config::StreamConfig;
use runstream::consumer::StreamConsumer;
use runstream::pipeline::RunPipeline;
use runstream::transport::{HttpTransport, ReplayTransport, RequestMethod, RunRequest, Transport};
use runstream::types::RunState;
use runstream::util::timeout::with_deadline;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch(args) => handle_watch(args).await,
        Commands::Replay(args) => handle_replay(args).await,
    };

    match result {
        Ok(state) if state.is_completed() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn handle_watch(args: WatchArgs) -> Result<RunState, Box<dyn std::error::Error>> {
    let mut config = StreamConfig::load()?;
    if let Some(url) = args.base_url {
        config = config.with_base_url(url);
    }
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);

    let body = args
        .body
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .map_err(|e| format!("--body is not valid JSON: {e}"))?;
    let method = if args.get {
        RequestMethod::Get
    } else {
        RequestMethod::Post
    };
    let request = RunRequest::builder()
        .path(args.path)
        .method(method)
        .maybe_body(body)
        .cancel_as_failure(true)
        .build();

    let mut consumer = StreamConsumer::new(transport);
    let mut run = consumer.start(request)?;
    let mut printer = SnapshotPrinter::new();
    let json = args.json;

    let follow = async {
        emit(&mut printer, &run.current(), json);
        while let Some(state) = run.changed().await {
            emit(&mut printer, &state, json);
        }
        run.current()
    };

    let state = match args.timeout_secs {
        Some(secs) => match with_deadline(Duration::from_secs(secs), follow).await {
            Ok(state) => state,
            Err(err) => {
                eprintln!("{err}; canceling run");
                consumer.cancel();
                let state = consumer.state().unwrap_or_default();
                emit(&mut printer, &state, json);
                state
            }
        },
        None => follow.await,
    };
    Ok(state)
}

async fn handle_replay(args: ReplayArgs) -> Result<RunState, Box<dyn std::error::Error>> {
    let transport = ReplayTransport::from_file(&args.file, args.chunk_size)?;
    let mut stream = transport
        .open(&RunRequest::get(args.file.display().to_string()))
        .await?;

    let mut pipeline = RunPipeline::new();
    while let Some(chunk) = futures::StreamExt::next(&mut stream).await {
        pipeline.push(&chunk?);
    }
    pipeline.finish();
    if pipeline.dropped_frames() > 0 {
        eprintln!("dropped {} malformed frame(s)", pipeline.dropped_frames());
    }

    let state = pipeline.into_state();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        for line in SnapshotPrinter::new().render(&state) {
            println!("{line}");
        }
    }
    Ok(state)
}

fn emit(printer: &mut SnapshotPrinter, state: &RunState, json: bool) {
    if json {
        match serde_json::to_string(state) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("failed to serialize snapshot: {e}"),
        }
    } else {
        for line in printer.render(state) {
            println!("{line}");
        }
    }
}

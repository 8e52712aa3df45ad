//! End-to-end decoding tests: bytes in, run state out.

mod common;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use runstream::codec::{EventFrame, EventFrameParser, LineAccumulator};
use runstream::pipeline::{RunPipeline, STREAM_ENDED};
use runstream::reducer::NO_RESULT;
use runstream::types::{ProgressEvent, RunEvent, RunPhase, RunState};
use serde_json::json;

fn run_whole(wire: &str) -> RunState {
    RunPipeline::run_to_end([wire.as_bytes()])
}

fn run_split_at(wire: &[u8], cuts: &[usize]) -> RunState {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (wire.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();
    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(&wire[start..cut]);
        start = cut;
    }
    chunks.push(&wire[start..]);
    RunPipeline::run_to_end(chunks)
}

#[test]
fn scenario_a_progress_frame_starts_running() {
    let mut pipeline = RunPipeline::with_state(RunState::connecting());
    pipeline.push(
        b"event: progress\ndata: {\"type\":\"progress\",\"message\":\"Searching\"}\n\n",
    );
    assert_eq!(pipeline.state().progress, vec![ProgressEvent::new("Searching")]);
    assert_eq!(pipeline.state().phase, RunPhase::Running);
}

#[test]
fn scenario_b_successful_done_completes() {
    let state = run_whole(&common::done(common::success_result("The answer is 42")));
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(state.output(), Some("The answer is 42"));
    let result = state.result.unwrap();
    assert_eq!(result.logs, vec!["started", "finished"]);
    assert_eq!(result.tool_calls[0].output, json!({"hits": 3}));
}

#[test]
fn scenario_c_done_without_result_fails() {
    let state = run_whole(&common::frame("done", &json!({"type": "done"})));
    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(state.error.as_deref(), Some(NO_RESULT));
    assert_eq!(state.result, None);
}

#[test]
fn scenario_d_close_without_terminal_event_fails() {
    let wire = [common::progress("one"), common::progress("two")].concat();
    let state = run_whole(&wire);
    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(state.error.as_deref(), Some(STREAM_ENDED));
    assert_eq!(state.progress.len(), 2);
}

#[test]
fn scenario_e_malformed_frame_is_skipped() {
    let wire = [
        common::progress("before"),
        "event: progress\ndata: {\"message\": \"broken\"\n\n".to_string(),
        common::progress("after"),
        common::done(common::success_result("ok")),
    ]
    .concat();
    let state = run_whole(&wire);
    assert_eq!(
        state.progress,
        vec![ProgressEvent::new("before"), ProgressEvent::new("after")]
    );
    assert_eq!(state.phase, RunPhase::Completed);
}

#[test]
fn byte_at_a_time_progress_line() {
    let wire = "event: progress\ndata: {\"type\":\"progress\",\"message\":\"x\"}\n\n";
    let mut pipeline = RunPipeline::new();
    let mut changes = 0;
    for byte in wire.as_bytes() {
        changes += usize::from(pipeline.push(std::slice::from_ref(byte)));
    }
    assert_eq!(changes, 1);
    assert_eq!(pipeline.state().progress, vec![ProgressEvent::new("x")]);
}

#[test]
fn multibyte_message_survives_single_byte_chunks() {
    let wire = common::progress("Recherche terminée ✓ 検索");
    let whole = run_whole(&wire);
    let split = RunPipeline::run_to_end(wire.as_bytes().chunks(1));
    assert_eq!(split, whole);
    assert_eq!(split.progress[0].message, "Recherche terminée ✓ 検索");
}

#[test]
fn crlf_line_endings_are_accepted() {
    let wire = common::successful_run().replace('\n', "\r\n");
    let state = run_whole(&wire);
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(state.progress.len(), 2);
}

#[test]
fn trailing_frame_without_blank_line_is_applied() {
    let wire = common::done(common::success_result("tail"));
    let state = run_whole(wire.trim_end());
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(state.output(), Some("tail"));
}

#[test]
fn events_after_terminal_do_not_change_outcome() {
    let wire = [
        common::done(common::success_result("first")),
        common::error("late failure"),
        common::done(common::success_result("second")),
        common::progress("late progress"),
    ]
    .concat();
    let state = run_whole(&wire);
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(state.output(), Some("first"));
    assert_eq!(state.error, None);
    assert_eq!(state.ignored.len(), 2);
    assert_eq!(state.ignored[0], RunEvent::error("late failure"));
    assert_eq!(state.progress, vec![ProgressEvent::new("late progress")]);
}

#[test]
fn fractional_timings_keep_the_run_successful() {
    let mut result = common::success_result("precise");
    result["duration"] = json!(4300.5);
    let wire = [
        common::frame("progress", &json!({"message": "Searching", "elapsed": 1200.25})),
        common::done(result),
    ]
    .concat();

    let state = run_whole(&wire);
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(state.error, None);
    assert_eq!(state.progress.len(), 1);
    assert_eq!(state.progress[0].elapsed, Some(1200.25));
    assert_eq!(state.result.map(|r| r.duration), Some(4300.5));
}

#[test]
fn progress_without_message_is_not_recorded() {
    let wire = [
        common::frame("progress", &json!({"type": "progress", "elapsed": 10})),
        common::progress("real"),
    ]
    .concat();
    let state = run_whole(&wire);
    assert_eq!(state.progress, vec![ProgressEvent::new("real")]);
}

#[test]
fn error_frame_fails_run() {
    let wire = [common::progress("working"), common::error("Execution failed")].concat();
    let state = run_whole(&wire);
    assert_eq!(state.phase, RunPhase::Failed);
    assert_eq!(state.error.as_deref(), Some("Execution failed"));
}

#[test]
fn encoded_event_round_trips_through_codec() {
    let event = RunEvent::Progress(ProgressEvent {
        message: "Calling tool".to_string(),
        elapsed: Some(250.0),
        phase: Some("act".to_string()),
        tool: Some("web-search".to_string()),
    });
    let encoded = event.to_frame().encode();

    let mut lines = LineAccumulator::new();
    let mut parser = EventFrameParser::new();
    let frames: Vec<EventFrame> = lines
        .feed(&encoded)
        .iter()
        .filter_map(|line| parser.feed_line(line))
        .collect();

    assert_eq!(frames, vec![event.to_frame()]);
    assert_eq!(RunEvent::from_frame(&frames[0]), Some(event));
}

proptest! {
    #[test]
    fn chunking_does_not_change_final_state(
        cuts in proptest::collection::vec(any::<usize>(), 0..24),
    ) {
        let wire = [
            common::progress("Searching the web ✓"),
            "event: progress\ndata: {oops\n\n".to_string(),
            common::successful_run(),
            common::error("after the fact"),
        ]
        .concat();
        let whole = run_whole(&wire);
        prop_assert_eq!(run_split_at(wire.as_bytes(), &cuts), whole);
    }

    #[test]
    fn frame_round_trip(kind in "[a-z][a-z-]{0,11}", message in ".*", n in any::<i64>()) {
        let frame = EventFrame::new(kind.clone(), json!({"message": message, "n": n}));
        let mut parser = EventFrameParser::new();
        let mut parsed = Vec::new();
        for line in LineAccumulator::new().feed(&frame.encode()) {
            parsed.extend(parser.feed_line(&line));
        }
        prop_assert_eq!(parsed, vec![frame]);
    }

    #[test]
    fn decoding_arbitrary_bytes_never_panics(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        cut in any::<usize>(),
    ) {
        let cut = cut % (bytes.len() + 1);
        let state = RunPipeline::run_to_end([&bytes[..cut], &bytes[cut..]]);
        prop_assert!(state.is_terminal());
    }
}

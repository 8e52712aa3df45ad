//! Folding run events into run state.

use crate::types::{RunEvent, RunPhase, RunResult, RunState};

/// Error recorded when a `done` frame carries no usable result.
pub const NO_RESULT: &str = "No result returned";

/// Error recorded when a failed result carries no message of its own.
pub const RUN_FAILED: &str = "Run failed";

/// Apply one event to a run state.
///
/// Pure: the same state and event always give the same new state. The first
/// terminal event decides the outcome; later `done`/`error` events are kept
/// in [`RunState::ignored`] and change nothing else. Progress is recorded in
/// every phase.
pub fn reduce(mut state: RunState, event: RunEvent) -> RunState {
    if state.is_terminal() && event.is_terminal() {
        tracing::debug!(
            phase = %state.phase,
            kind = %event.kind(),
            "ignoring terminal event for finished run"
        );
        state.ignored.push(event);
        return state;
    }

    match event {
        RunEvent::Progress(progress) => {
            state.progress.push(progress);
            if matches!(state.phase, RunPhase::Idle | RunPhase::Connecting) {
                state.phase = RunPhase::Running;
            }
        }
        RunEvent::Done {
            result: Some(result),
        } => apply_result(&mut state, result),
        RunEvent::Done { result: None } => {
            state.phase = RunPhase::Failed;
            state.error = Some(NO_RESULT.to_string());
        }
        RunEvent::Error { message } => {
            state.phase = RunPhase::Failed;
            state.error = Some(message);
        }
    }
    state
}

fn apply_result(state: &mut RunState, result: RunResult) {
    if result.is_success() {
        state.phase = RunPhase::Completed;
    } else {
        state.phase = RunPhase::Failed;
        state.error = Some(result.error.clone().unwrap_or_else(|| RUN_FAILED.to_string()));
    }
    state.result = Some(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProgressEvent, RunStatus};
    use pretty_assertions::assert_eq;

    fn result(status: RunStatus) -> RunResult {
        RunResult {
            id: "r1".to_string(),
            status,
            output: "done".to_string(),
            logs: vec![],
            tool_calls: vec![],
            duration: 10.0,
            error: None,
        }
    }

    #[test]
    fn progress_moves_connecting_to_running() {
        let state = reduce(RunState::connecting(), RunEvent::progress("Searching"));
        assert_eq!(state.phase, RunPhase::Running);
        assert_eq!(state.progress, vec![ProgressEvent::new("Searching")]);
    }

    #[test]
    fn progress_moves_idle_to_running() {
        let state = reduce(RunState::default(), RunEvent::progress("x"));
        assert_eq!(state.phase, RunPhase::Running);
    }

    #[test]
    fn successful_done_completes() {
        let state = reduce(RunState::connecting(), RunEvent::done(result(RunStatus::Success)));
        assert_eq!(state.phase, RunPhase::Completed);
        assert_eq!(state.output(), Some("done"));
        assert_eq!(state.error, None);
    }

    #[test]
    fn failed_result_fails_with_result_attached() {
        let mut failed = result(RunStatus::Error);
        failed.error = Some("tool crashed".to_string());
        let state = reduce(RunState::connecting(), RunEvent::done(failed.clone()));
        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.result, Some(failed));
        assert_eq!(state.error.as_deref(), Some("tool crashed"));
    }

    #[test]
    fn failed_result_without_message_uses_fallback() {
        let state = reduce(RunState::connecting(), RunEvent::done(result(RunStatus::Error)));
        assert_eq!(state.error.as_deref(), Some(RUN_FAILED));
    }

    #[test]
    fn done_without_result_fails() {
        let state = reduce(RunState::connecting(), RunEvent::Done { result: None });
        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.result, None);
        assert_eq!(state.error.as_deref(), Some(NO_RESULT));
    }

    #[test]
    fn error_event_fails() {
        let state = reduce(RunState::connecting(), RunEvent::error("Execution failed"));
        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.error.as_deref(), Some("Execution failed"));
    }

    #[test]
    fn first_terminal_event_wins() {
        let completed = reduce(RunState::connecting(), RunEvent::done(result(RunStatus::Success)));
        let after = reduce(completed.clone(), RunEvent::error("late"));
        let after = reduce(after, RunEvent::Done { result: None });

        assert_eq!(after.phase, completed.phase);
        assert_eq!(after.result, completed.result);
        assert_eq!(after.error, completed.error);
        assert_eq!(
            after.ignored,
            vec![RunEvent::error("late"), RunEvent::Done { result: None }]
        );
    }

    #[test]
    fn progress_after_terminal_is_recorded_without_phase_change() {
        let failed = reduce(RunState::connecting(), RunEvent::error("boom"));
        let state = reduce(failed, RunEvent::progress("cleanup"));
        assert_eq!(state.phase, RunPhase::Failed);
        assert_eq!(state.progress.len(), 1);
        assert!(state.ignored.is_empty());
    }
}

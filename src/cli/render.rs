//! Plain-text rendering of run snapshots for the terminal.

use crate::types::{ProgressEvent, RunPhase, RunState};

/// Turns successive snapshots into new output lines.
///
/// Snapshots can be coalesced, so the printer tracks how much progress it
/// has already shown rather than assuming one new entry per snapshot.
#[derive(Debug, Default)]
pub struct SnapshotPrinter {
    shown_progress: usize,
    shown_terminal: bool,
}

impl SnapshotPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, state: &RunState) -> Vec<String> {
        let mut lines: Vec<String> = state
            .progress
            .iter()
            .skip(self.shown_progress)
            .map(progress_line)
            .collect();
        self.shown_progress = state.progress.len();

        if state.is_terminal() && !self.shown_terminal {
            self.shown_terminal = true;
            lines.extend(terminal_lines(state));
        }
        lines
    }
}

fn progress_line(progress: &ProgressEvent) -> String {
    let mut line = String::new();
    if let Some(ms) = progress.elapsed {
        line.push_str(&format!("[{}] ", format_ms(ms)));
    }
    line.push_str(&progress.message);
    match (&progress.phase, &progress.tool) {
        (Some(phase), Some(tool)) => line.push_str(&format!(" ({phase}, {tool})")),
        (Some(phase), None) => line.push_str(&format!(" ({phase})")),
        (None, Some(tool)) => line.push_str(&format!(" ({tool})")),
        (None, None) => {}
    }
    line
}

fn terminal_lines(state: &RunState) -> Vec<String> {
    let mut lines = Vec::new();
    match (state.phase, &state.result) {
        (RunPhase::Completed, Some(result)) => {
            lines.push(format!(
                "completed in {} ({} tool calls)",
                format_ms(result.duration),
                result.tool_calls.len()
            ));
            if !result.output.is_empty() {
                lines.push(result.output.clone());
            }
        }
        _ => {
            let error = state.error.as_deref().unwrap_or("unknown error");
            lines.push(format!("failed: {error}"));
        }
    }
    lines
}

fn format_ms(ms: f64) -> String {
    format!("{:.1}s", ms / 1000.0)
}

//! Line splitting over a text stream.

/// Splits streamed text into lines, carrying a partial line between calls.
///
/// Accepts `\n` and `\r\n` terminators; the `\r` is stripped even when the
/// two halves of a `\r\n` arrive in different chunks.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    partial: String,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed text and return every line it completes.
    pub fn feed(&mut self, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = text;
        while let Some(end) = rest.find('\n') {
            let (head, tail) = rest.split_at(end);
            let mut line = std::mem::take(&mut self.partial);
            line.push_str(head);
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
            rest = &tail[1..];
        }
        self.partial.push_str(rest);
        lines
    }

    /// Drain the pending partial line at end of stream.
    pub fn flush(&mut self) -> Option<String> {
        let mut line = std::mem::take(&mut self.partial);
        if line.ends_with('\r') {
            line.pop();
        }
        (!line.is_empty()).then_some(line)
    }

    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }
}

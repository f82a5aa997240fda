/// Result of the instrumentation pass: the new lines plus a mapping back to
/// the original source.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentedSource {
    pub lines: Vec<String>,
    /// For each instrumented line, the 1-based original line it came from.
    /// Injected lines map to the line that triggered them.
    pub origin: Vec<usize>,
    /// 0-based indices (into `lines`) of injected logging calls.
    pub injected: Vec<usize>,
}

impl InstrumentedSource {
    /// Instrumented lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Map a 1-based instrumented line number to its 1-based original line.
    pub fn original_line(&self, instrumented_line: usize) -> Option<usize> {
        instrumented_line
            .checked_sub(1)
            .and_then(|idx| self.origin.get(idx))
            .copied()
    }

    pub fn injected_count(&self) -> usize {
        self.injected.len()
    }

    pub fn is_injected(&self, instrumented_line: usize) -> bool {
        instrumented_line
            .checked_sub(1)
            .is_some_and(|idx| self.injected.binary_search(&idx).is_ok())
    }
}

use super::types::InstrumentedSource;
use tracing::{debug, trace};

/// Name of the logging routine the injected lines call.
pub const LOG_ROUTINE: &str = "log_state";

/// Lines containing this substring are never instrumented.
pub const EXCLUDE_MARKER: &str = "temp";

const BLOCK_INDENT: &str = "    ";

/// Does `line` look like it writes an element of `var`?
///
/// Purely textual: `var[` present, `=` present, `temp` absent. Matches inside
/// comments and string literals count too.
pub fn is_mutation_line(line: &str, var: &str) -> bool {
    let subscript = format!("{}[", var);
    line.contains(&subscript) && line.contains('=') && !line.contains(EXCLUDE_MARKER)
}

/// Build the logging call injected after `line`.
///
/// Reuses the line's leading whitespace; a line ending in `:` opens a block,
/// so the call is indented one level further to become its first statement.
/// A fixed four-space `    log_state(arr)` would not parse after a top-level
/// mutation, which is why the indentation follows the matched line instead.
pub fn log_call_line(line: &str, var: &str) -> String {
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    let mut out = String::with_capacity(indent_len + LOG_ROUTINE.len() + var.len() + 6);
    out.push_str(&line[..indent_len]);
    if line.trim_end().ends_with(':') {
        out.push_str(BLOCK_INDENT);
    }
    out.push_str(LOG_ROUTINE);
    out.push('(');
    out.push_str(var);
    out.push(')');
    out
}

/// Interleave a logging call after every mutation line.
pub fn instrument_lines(physical: &[&str], var: &str) -> InstrumentedSource {
    let mut lines = Vec::with_capacity(physical.len());
    let mut origin = Vec::with_capacity(physical.len());
    let mut injected = Vec::new();

    for (i, line) in physical.iter().enumerate() {
        lines.push((*line).to_string());
        origin.push(i + 1);

        if is_mutation_line(line, var) {
            trace!(line = i + 1, text = %line, "instrumenting mutation");
            injected.push(lines.len());
            lines.push(log_call_line(line, var));
            origin.push(i + 1);
        }
    }

    debug!(
        original = physical.len(),
        injected = injected.len(),
        "instrumentation pass finished"
    );

    InstrumentedSource {
        lines,
        origin,
        injected,
    }
}

/// Split on `\n` (keeping a trailing empty line) and instrument.
pub fn instrument_source(source: &str, var: &str) -> InstrumentedSource {
    let physical: Vec<&str> = source.split('\n').collect();
    instrument_lines(&physical, var)
}

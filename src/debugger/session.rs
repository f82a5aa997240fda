use super::Breakpoints;
use crate::config::OutputMode;
use crate::error::{ScriptError, ScriptResult};
use crate::executor::Value;
use crate::report::{to_script_json, StateStep};
use std::io::{self, Write};
use tracing::trace;

pub const STATE_PREFIX: &str = "STATE:";
pub const ERROR_PREFIX: &str = "Error: ";

/// The single channel between a running script and the outside world.
///
/// In stream mode program output and marker lines go straight to the writer,
/// in order. In report mode output is captured and states are recorded as
/// steps; nothing is written.
pub struct TraceSession<W: Write> {
    out: W,
    mode: OutputMode,
    breakpoints: Breakpoints,
    steps: Vec<StateStep>,
    captured: String,
    state_count: usize,
}

/// What a finished session hands back to the driver.
pub struct SessionOutput<W> {
    pub out: W,
    pub steps: Vec<StateStep>,
    pub captured: String,
    pub state_count: usize,
}

impl<W: Write> TraceSession<W> {
    pub fn new(out: W, mode: OutputMode, breakpoints: Breakpoints) -> Self {
        Self {
            out,
            mode,
            breakpoints,
            steps: Vec::new(),
            captured: String::new(),
            state_count: 0,
        }
    }

    /// The logging routine: `STATE:` followed by the value as a JSON array.
    pub fn log_state(&mut self, state: &Value, line: usize) -> ScriptResult<()> {
        let json = state.to_json()?;
        self.state_count += 1;
        trace!(step = self.state_count, line, "state logged");

        match self.mode {
            OutputMode::Stream => {
                writeln!(self.out, "{}{}", STATE_PREFIX, to_script_json(&json)?)?;
            }
            OutputMode::Report => {
                let breakpoint = self.breakpoints.contains(line);
                self.steps.push(StateStep {
                    step: self.state_count,
                    line,
                    state: json,
                    breakpoint,
                });
            }
        }
        Ok(())
    }

    /// Text produced by the script's own `print` calls.
    pub fn write_output(&mut self, text: &str) -> ScriptResult<()> {
        match self.mode {
            OutputMode::Stream => self.out.write_all(text.as_bytes())?,
            OutputMode::Report => self.captured.push_str(text),
        }
        Ok(())
    }

    pub fn report_error(&mut self, err: &ScriptError) -> io::Result<()> {
        if self.mode == OutputMode::Stream {
            writeln!(self.out, "{}{}", ERROR_PREFIX, err)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<SessionOutput<W>> {
        self.out.flush()?;
        Ok(SessionOutput {
            out: self.out,
            steps: self.steps,
            captured: self.captured,
            state_count: self.state_count,
        })
    }
}

mod builtins;
mod runner;
mod value;

pub use builtins::Builtin;
pub use runner::Interpreter;
pub use value::{format_float, Function, Value};

use crate::config::RunConfig;
use crate::debugger::{Breakpoints, SessionOutput, TraceSession};
use crate::parser::{instrument_source, parse_program_mapped};
use crate::report::{RunStatus, StateStep};
use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutcome<W> {
    /// The writer handed to [`run_source`], flushed.
    pub out: W,
    pub status: RunStatus,
    /// Description printed after `Error: `, when the run failed.
    pub error: Option<String>,
    /// Kind name of the failure (`IndexError`, `SyntaxError`, ...).
    pub error_kind: Option<&'static str>,
    /// Recorded states (report mode only).
    pub steps: Vec<StateStep>,
    /// Program output (report mode only).
    pub captured: String,
    pub state_count: usize,
    pub elapsed: Duration,
}

struct Failure {
    description: String,
    kind: &'static str,
}

/// Instrument `source`, execute it, and deliver output according to
/// `config.output`.
///
/// Script failures are part of a normal outcome. Only writing to `out`, an
/// invalid `config`, or failing to start the interpreter thread is an `Err`.
pub fn run_source<W: Write + Send>(
    source: &str,
    config: &RunConfig,
    out: W,
) -> io::Result<RunOutcome<W>> {
    config
        .validate()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let started = Instant::now();
    // values are reference counted, so the interpreter lives entirely on the
    // worker thread; only the writer and plain data cross over
    let (output, failure) = thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("sortscript".to_string())
            .stack_size(config.stack_size)
            .spawn_scoped(scope, move || execute(source, config, out))?;
        worker
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "interpreter thread panicked"))?
    })?;
    let elapsed = started.elapsed();

    info!(
        states = output.state_count,
        failed = failure.is_some(),
        elapsed_ms = elapsed.as_millis() as u64,
        "run finished"
    );

    let (status, error, error_kind) = match failure {
        Some(f) => (RunStatus::Error, Some(f.description), Some(f.kind)),
        None => (RunStatus::Success, None, None),
    };
    Ok(RunOutcome {
        out: output.out,
        status,
        error,
        error_kind,
        steps: output.steps,
        captured: output.captured,
        state_count: output.state_count,
        elapsed,
    })
}

fn execute<W: Write>(
    source: &str,
    config: &RunConfig,
    out: W,
) -> io::Result<(SessionOutput<W>, Option<Failure>)> {
    let instrumented = instrument_source(source, &config.var_name);
    debug!(
        lines = instrumented.lines.len(),
        injected = instrumented.injected_count(),
        "source instrumented"
    );

    let breakpoints: Breakpoints = config.breakpoints.iter().copied().collect();
    let session = TraceSession::new(out, config.output, breakpoints);
    let mut interp = Interpreter::new(session)
        .with_recursion_limit(config.recursion_limit)
        .with_timeout(config.timeout);

    let result = parse_program_mapped(&instrumented.text(), &instrumented.origin)
        .and_then(|program| interp.run(&program));

    let failure = match result {
        Ok(()) => None,
        Err(err) => {
            debug!(kind = err.kind(), line = interp.current_line, "script failed: {}", err);
            interp.context().log_call_stack();
            interp.session_mut().report_error(&err)?;
            Some(Failure {
                description: err.to_string(),
                kind: err.kind(),
            })
        }
    };
    interp.context().log_variables();

    let output = interp.into_session().finish()?;
    Ok((output, failure))
}

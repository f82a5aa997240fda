use anyhow::{Context, Result};
use clap::Parser;
use codeflow_debugger::config::DEFAULT_VAR;
use codeflow_debugger::parser::instrument_source;
use codeflow_debugger::{run_source, OutputMode, RunConfig, RunReport};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Run a sorting snippet, printing the watched list after every element
/// assignment.
#[derive(Parser, Debug)]
#[command(name = "codeflow-debugger", version)]
struct Cli {
    /// Source code to run
    #[arg(
        value_name = "CODE",
        allow_hyphen_values = true,
        required_unless_present = "file",
        conflicts_with = "file"
    )]
    code: Option<String>,

    /// Read the source from a file instead
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Name of the list whose element assignments are logged
    #[arg(long = "var", value_name = "NAME", default_value = DEFAULT_VAR)]
    var_name: String,

    /// Print one JSON report instead of marker lines
    #[arg(long)]
    json: bool,

    /// Print the instrumented source and exit
    #[arg(long, conflicts_with = "json")]
    instrumented: bool,

    /// Abort execution after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Flag states logged at this source line in the report (repeatable)
    #[arg(short, long = "breakpoint", value_name = "LINE")]
    breakpoints: Vec<usize>,

    /// Maximum call depth
    #[arg(long, value_name = "N", default_value_t = 1000)]
    recursion_limit: usize,

    /// More diagnostics on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            var_name: self.var_name.clone(),
            output: if self.json {
                OutputMode::Report
            } else {
                OutputMode::Stream
            },
            timeout: self.timeout.map(Duration::from_secs),
            recursion_limit: self.recursion_limit,
            breakpoints: self.breakpoints.clone(),
            ..RunConfig::default()
        }
    }

    fn source(&self) -> Result<String> {
        match (&self.code, &self.file) {
            (_, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            (Some(code), None) => Ok(code.clone()),
            (None, None) => anyhow::bail!("no source given"),
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("CODEFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let source = cli.source()?;
    let config = cli.run_config();
    config.validate().context("invalid options")?;
    debug!(?config, "starting");

    if cli.instrumented {
        let instrumented = instrument_source(&source, &config.var_name);
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", instrumented.text())?;
        info!(injected = instrumented.injected_count(), "instrumented source printed");
        return Ok(());
    }

    let outcome = run_source(&source, &config, io::stdout()).context("execution failed")?;

    if config.output == OutputMode::Report {
        let report = RunReport::from_outcome(&source, &outcome);
        info!(algorithm = report.algorithm.label(), steps = report.steps.len(), "report built");
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", report.to_json_pretty()?)?;
    }

    // script errors were already reported on stdout; exit status stays 0
    Ok(())
}

//! Instrument sorting snippets with state logging and run them in an
//! embedded interpreter.
//!
//! Every line that assigns into an element of the watched list (`arr` by
//! default) is followed by a call to `log_state(arr)`. Running the result
//! prints one `STATE:[..]` line per mutation, in execution order.

pub mod config;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod parser;
pub mod report;

pub use config::{OutputMode, RunConfig};
pub use error::{ConfigError, ScriptError};
pub use executor::{run_source, RunOutcome};
pub use report::RunReport;

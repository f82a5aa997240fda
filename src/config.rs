use crate::error::ConfigError;
use std::time::Duration;

/// Default name of the watched array.
pub const DEFAULT_VAR: &str = "arr";

/// How the driver delivers results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Write `STATE:` / `Error:` marker lines interleaved with program output.
    Stream,
    /// Capture program output and steps for a single JSON report.
    Report,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub var_name: String,
    pub output: OutputMode,
    pub timeout: Option<Duration>,
    pub recursion_limit: usize,
    /// Stack size of the interpreter thread, in bytes.
    pub stack_size: usize,
    /// Original (1-based) source lines whose states are flagged in reports.
    pub breakpoints: Vec<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            var_name: DEFAULT_VAR.to_string(),
            output: OutputMode::Stream,
            timeout: None,
            recursion_limit: 1000,
            stack_size: 256 * 1024 * 1024,
            breakpoints: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.var_name) {
            return Err(ConfigError::InvalidVariable(self.var_name.clone()));
        }
        if self.recursion_limit == 0 {
            return Err(ConfigError::ZeroRecursionLimit);
        }
        Ok(())
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

mod breakpoints;
mod context;
mod session;

pub use breakpoints::Breakpoints;
pub use context::ExecContext;
pub use session::{SessionOutput, TraceSession, ERROR_PREFIX, STATE_PREFIX};

use crate::executor::Value;
use std::collections::{HashMap, HashSet};

/// One active function call.
#[derive(Debug)]
pub struct Frame {
    pub function: String,
    /// Source line of the call site.
    pub call_line: usize,
    pub locals: HashMap<String, Value>,
    /// Names declared `global` inside this call.
    pub globals: HashSet<String>,
}

impl Frame {
    pub fn new(function: impl Into<String>, call_line: usize) -> Self {
        Self {
            function: function.into(),
            call_line,
            locals: HashMap::new(),
            globals: HashSet::new(),
        }
    }

    pub fn declared_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }
}

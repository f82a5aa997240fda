use super::Frame;
use crate::executor::Value;
use std::collections::HashMap;
use tracing::debug;

/// Variable scopes of a running script: one global scope plus a stack of
/// function frames. Builtins are resolved by the interpreter, not here.
#[derive(Debug, Default)]
pub struct ExecContext {
    pub globals: HashMap<String, Value>,
    pub call_stack: Vec<Frame>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.call_stack.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.call_stack.pop()
    }

    /// Local, then global lookup.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.call_stack.last() {
            if !frame.declared_global(name) {
                if let Some(v) = frame.locals.get(name) {
                    return Some(v.clone());
                }
            }
        }
        self.globals.get(name).cloned()
    }

    /// Bind in the innermost scope, honoring `global` declarations.
    pub fn assign(&mut self, name: &str, value: Value) {
        match self.call_stack.last_mut() {
            Some(frame) if !frame.declared_global(name) => {
                frame.locals.insert(name.to_string(), value);
            }
            _ => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    pub fn declare_global(&mut self, names: &[String]) {
        if let Some(frame) = self.call_stack.last_mut() {
            for name in names {
                frame.locals.remove(name);
                frame.globals.insert(name.clone());
            }
        }
    }

    pub fn log_call_stack(&self) {
        if self.call_stack.is_empty() {
            debug!("call stack: <empty - top level>");
            return;
        }
        debug!(frames = self.call_stack.len(), "call stack");
        for (i, frame) in self.call_stack.iter().enumerate().rev() {
            debug!("  #{}: {}() called from line {}", i, frame.function, frame.call_line);
        }
    }

    pub fn log_variables(&self) {
        if self.globals.is_empty() {
            return;
        }
        let mut vars: Vec<_> = self
            .globals
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Function(_)))
            .collect();
        vars.sort_by_key(|(k, _)| *k);
        for (key, val) in vars {
            debug!("  {}={}", key, val.repr());
        }
    }
}

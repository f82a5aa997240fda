use crate::parser::Algorithm;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call of the logging routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateStep {
    /// 1-based position among all logged states.
    pub step: usize,
    /// Original source line the logging call is attributed to.
    pub line: usize,
    pub state: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub breakpoint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

/// Document printed by `--json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub status: RunStatus,
    pub algorithm: Algorithm,
    pub functions: Vec<String>,
    pub output: String,
    pub steps: Vec<StateStep>,
    /// Milliseconds.
    pub execution_time: u64,
    pub error: Option<String>,
}

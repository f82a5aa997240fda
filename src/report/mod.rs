mod json;
mod protocol;

pub use json::{to_script_json, ScriptFormatter};
pub use protocol::{RunReport, RunStatus, StateStep};

use crate::executor::RunOutcome;
use crate::parser::{build_def_map, detect_algorithm};

impl RunReport {
    /// Assemble the report for a run of `source`.
    pub fn from_outcome<W>(source: &str, outcome: &RunOutcome<W>) -> Self {
        let physical: Vec<&str> = source.split('\n').collect();
        let functions = build_def_map(&physical).into_keys().collect();
        RunReport {
            status: outcome.status,
            algorithm: detect_algorithm(source),
            functions,
            output: outcome.captured.clone(),
            steps: outcome.steps.clone(),
            execution_time: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
            error: outcome.error.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

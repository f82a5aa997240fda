pub mod ast;
pub mod grammar;
mod instrument;
mod labels;
pub mod lexer;
mod types;

pub use grammar::{parse_program, parse_program_mapped};
pub use instrument::{
    instrument_lines, instrument_source, is_mutation_line, log_call_line, EXCLUDE_MARKER,
    LOG_ROUTINE,
};
pub use labels::{build_def_map, detect_algorithm, Algorithm};
pub use types::InstrumentedSource;

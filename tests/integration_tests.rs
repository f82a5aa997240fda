use codeflow_debugger::parser::{
    instrument_source, is_mutation_line, log_call_line, InstrumentedSource,
};
use codeflow_debugger::{run_source, RunConfig};
use std::fs;

// Helper to run a snippet with default settings and collect stdout
fn run(code: &str) -> String {
    run_with(code, &RunConfig::default())
}

fn run_with(code: &str, config: &RunConfig) -> String {
    let outcome = run_source(code, config, Vec::new()).expect("writing to a Vec cannot fail");
    String::from_utf8(outcome.out).expect("output should be UTF-8")
}

// Helper to create a snippet file for the file-based tests
fn create_test_snippet(content: &str, name: &str) -> String {
    let path = std::env::temp_dir().join(format!("codeflow_test_{}_{}.py", name, std::process::id()));
    fs::write(&path, content).expect("Failed to write test file");
    path.to_string_lossy().into_owned()
}

fn cleanup_test_snippet(path: &str) {
    let _ = fs::remove_file(path);
}

#[cfg(test)]
mod instrumentation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mutation_rule() {
        assert!(is_mutation_line("arr[0] = 1", "arr"));
        assert!(is_mutation_line("    arr[i], arr[j] = arr[j], arr[i]", "arr"));
        assert!(is_mutation_line("arr[i] += 1", "arr"));
        // comparisons contain '=' too
        assert!(is_mutation_line("if arr[0] == 1:", "arr"));

        assert!(!is_mutation_line("print(arr[0])", "arr"), "no '=' on the line");
        assert!(!is_mutation_line("arr = [3, 1, 2]", "arr"), "no subscript");
        assert!(!is_mutation_line("temp = arr[0]", "arr"), "temp lines are skipped");
        assert!(!is_mutation_line("arr[j] = temp", "arr"), "temp lines are skipped");
        assert!(!is_mutation_line("nums[0] = 1", "arr"));
        assert!(is_mutation_line("nums[0] = 1", "nums"));
    }

    #[test]
    fn test_log_call_indentation() {
        assert_eq!(log_call_line("arr[0] = 1", "arr"), "log_state(arr)");
        assert_eq!(log_call_line("        arr[j] = key", "arr"), "        log_state(arr)");
        assert_eq!(log_call_line("\tarr[0] = 2", "arr"), "\tlog_state(arr)");
        assert_eq!(log_call_line("if arr[0] == 1:", "arr"), "    log_state(arr)");
        assert_eq!(
            log_call_line("    while arr[j] >= key:  ", "arr"),
            "        log_state(arr)"
        );
        assert_eq!(log_call_line("nums[0] = 1", "nums"), "log_state(nums)");
    }

    #[test]
    fn test_swap_is_followed_by_log_call() {
        let source = "arr = [3, 1, 2]\narr[0], arr[1] = arr[1], arr[0]";
        let result = instrument_source(source, "arr");

        assert_eq!(
            result.text(),
            "arr = [3, 1, 2]\narr[0], arr[1] = arr[1], arr[0]\nlog_state(arr)"
        );
        assert_eq!(result.injected_count(), 1);
        assert!(result.is_injected(3));
        assert!(!result.is_injected(2));
    }

    #[test]
    fn test_block_header_gets_log_in_body() {
        let source = "arr = [1, 2]\nif arr[0] == 1:\n    arr[1] = 0\n";
        let result = instrument_source(source, "arr");

        assert_eq!(
            result.text(),
            "arr = [1, 2]\nif arr[0] == 1:\n    log_state(arr)\n    arr[1] = 0\n    log_state(arr)\n"
        );
    }

    #[test]
    fn test_origin_mapping() {
        let result = instrument_source("a = 1\narr[0] = 2\nb = 3", "arr");

        assert_eq!(result.lines.len(), 4);
        assert_eq!(result.original_line(1), Some(1));
        assert_eq!(result.original_line(2), Some(2));
        assert_eq!(result.original_line(3), Some(2), "injected line maps to its trigger");
        assert_eq!(result.original_line(4), Some(3));
        assert_eq!(result.original_line(0), None);
        assert_eq!(result.original_line(5), None);
    }

    #[test]
    fn test_untouched_source_is_identical() {
        let source = "x = 1\nfor i in range(3):\n    print(i)\n";
        let result: InstrumentedSource = instrument_source(source, "arr");
        assert_eq!(result.text(), source);
        assert_eq!(result.injected_count(), 0);
    }
}

#[cfg(test)]
mod instrumentation_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn no_subscript_means_no_change(source in "[a-z0-9 =+:\n]{0,80}") {
            let result = instrument_source(&source, "arr");
            prop_assert_eq!(result.text(), source);
            prop_assert_eq!(result.injected_count(), 0);
        }

        #[test]
        fn instrumentation_is_deterministic(source in "(arr|temp|x)?[a-z\\[\\]0-9 =:\n]{0,80}") {
            let first = instrument_source(&source, "arr");
            let second = instrument_source(&source, "arr");
            prop_assert_eq!(first, second);
        }

        #[test]
        fn every_mutation_line_is_followed_by_a_log_call(
            lines in proptest::collection::vec("( {0,4})(arr\\[[0-9]\\] = [0-9]|temp = arr\\[0\\]|x = [0-9]|pass)", 1..12)
        ) {
            let source = lines.join("\n");
            let result = instrument_source(&source, "arr");

            let matching = lines.iter().filter(|l| is_mutation_line(l, "arr")).count();
            prop_assert_eq!(result.injected_count(), matching);
            prop_assert_eq!(result.lines.len(), lines.len() + matching);
            prop_assert_eq!(result.origin.len(), result.lines.len());

            for &idx in &result.injected {
                prop_assert!(idx > 0);
                prop_assert!(is_mutation_line(&result.lines[idx - 1], "arr"));
                prop_assert_eq!(&result.lines[idx], &log_call_line(&result.lines[idx - 1], "arr"));
            }
        }
    }
}

#[cfg(test)]
mod driver_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_swap_logs_one_state() {
        let out = run("arr = [3, 1, 2]\narr[0], arr[1] = arr[1], arr[0]");
        assert_eq!(out, "STATE:[1, 3, 2]\n");
    }

    #[test]
    fn test_index_error_is_reported() {
        let out = run("arr = [1, 2, 3]\nprint(arr[10])");
        assert_eq!(out, "Error: list index out of range\n");
    }

    #[test]
    fn test_states_before_error_are_kept() {
        let out = run("arr = [1, 2]\narr[0] = 5\narr[7] = 1\n");
        assert_eq!(
            out,
            "STATE:[5, 2]\nError: list assignment index out of range\n"
        );
    }

    #[test]
    fn test_temp_line_is_not_logged() {
        let out = run("arr = [4, 5]\ntemp = arr[0]\nprint(temp)");
        assert_eq!(out, "4\n");
    }

    #[test]
    fn test_output_is_interleaved() {
        let out = run("arr = [2, 1]\nprint(\"before\")\narr[0] = 5\nprint(\"after\")\n");
        assert_eq!(out, "before\nSTATE:[5, 1]\nafter\n");
    }

    #[test]
    fn test_logging_before_definition() {
        let out = run("arr[0] = 1");
        assert_eq!(out, "Error: name 'arr' is not defined\n");
    }

    #[test]
    fn test_syntax_error_uses_source_line() {
        let out = run("arr = [2, 1]\nx = 1\narr[0] = \n");
        assert_eq!(out, "Error: invalid syntax (<string>, line 3)\n");
    }

    #[test]
    fn test_bad_indentation_after_injection() {
        let out = run("arr = [1]\nif True:\n    arr[0] = 2\n  x = 1\n");
        assert_eq!(
            out,
            "Error: unindent does not match any outer indentation level (<string>, line 4)\n"
        );
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(run(""), "");
    }

    #[test]
    fn test_nested_and_float_states() {
        assert_eq!(run("arr = [[1], [2]]\narr[0][0] = 5"), "STATE:[[5], [2]]\n");
        assert_eq!(run("arr = [1.5, 2]\narr[0] = 2.0"), "STATE:[2.0, 2]\n");
        assert_eq!(
            run("arr = [(1, 2)]\narr[0] = (3, \"x\")"),
            "STATE:[[3, \"x\"]]\n"
        );
    }

    #[test]
    fn test_unserializable_state() {
        let out = run("arr = [1]\narr[0] = len");
        assert_eq!(
            out,
            "Error: Object of type builtin_function_or_method is not JSON serializable\n"
        );
    }

    #[test]
    fn test_custom_variable_name() {
        let config = RunConfig {
            var_name: "nums".to_string(),
            ..RunConfig::default()
        };
        let out = run_with("nums = [2, 1]\nnums[0], nums[1] = nums[1], nums[0]\narr = [0]\narr[0] = 1", &config);
        assert_eq!(out, "STATE:[1, 2]\n");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RunConfig {
            var_name: "not a name".to_string(),
            ..RunConfig::default()
        };
        let err = run_source("x = 1", &config, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let code = "arr = [3, 2, 1]\nfor i in range(2):\n    arr[i], arr[i + 1] = arr[i + 1], arr[i]\n";
        assert_eq!(run(code), run(code));
        assert_eq!(run(code), "STATE:[2, 3, 1]\nSTATE:[2, 1, 3]\n");
    }

    #[test]
    fn test_source_from_file() {
        let path = create_test_snippet("arr = [2, 1]\narr[1] = 3\n", "file_source");
        let contents = fs::read_to_string(&path).expect("Could not read test file");

        assert_eq!(run(&contents), "STATE:[2, 3]\n");

        cleanup_test_snippet(&path);
    }
}

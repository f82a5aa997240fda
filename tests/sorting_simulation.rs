// tests/sorting_simulation.rs
// Runs textbook sorting algorithms end to end, in stream and report mode

use codeflow_debugger::parser::{build_def_map, detect_algorithm, Algorithm};
use codeflow_debugger::report::RunStatus;
use codeflow_debugger::{run_source, OutputMode, RunConfig, RunReport};

const BUBBLE: &str = r#"arr = [3, 1, 2]
n = len(arr)
for i in range(n):
    for j in range(0, n - i - 1):
        if arr[j] > arr[j + 1]:
            arr[j], arr[j + 1] = arr[j + 1], arr[j]
print(arr)
"#;

const INSERTION: &str = r#"def insertion_sort(arr):
    for i in range(1, len(arr)):
        key = arr[i]
        j = i - 1
        while j >= 0 and arr[j] > key:
            arr[j + 1] = arr[j]
            j -= 1
        arr[j + 1] = key
    return arr

data = [5, 2, 4, 6, 1, 3]
insertion_sort(data)
print(data)
"#;

const SELECTION: &str = r#"arr = [64, 25, 12, 22, 11]
for i in range(len(arr)):
    min_idx = i
    for j in range(i + 1, len(arr)):
        if arr[j] < arr[min_idx]:
            min_idx = j
    arr[i], arr[min_idx] = arr[min_idx], arr[i]
print(arr)
"#;

const QUICK: &str = r#"def partition(arr, low, high):
    pivot = arr[high]
    i = low - 1
    for j in range(low, high):
        if arr[j] <= pivot:
            i += 1
            arr[i], arr[j] = arr[j], arr[i]
    arr[i + 1], arr[high] = arr[high], arr[i + 1]
    return i + 1

def quick_sort(arr, low, high):
    if low < high:
        pi = partition(arr, low, high)
        quick_sort(arr, low, pi - 1)
        quick_sort(arr, pi + 1, high)

arr = [10, 7, 8, 9, 1, 5]
quick_sort(arr, 0, len(arr) - 1)
print(arr)
"#;

const MERGE: &str = r#"def merge_sort(arr):
    if len(arr) > 1:
        mid = len(arr) // 2
        left = arr[:mid]
        right = arr[mid:]
        merge_sort(left)
        merge_sort(right)
        i = j = k = 0
        while i < len(left) and j < len(right):
            if left[i] <= right[j]:
                arr[k] = left[i]
                i += 1
            else:
                arr[k] = right[j]
                j += 1
            k += 1
        while i < len(left):
            arr[k] = left[i]
            i += 1
            k += 1
        while j < len(right):
            arr[k] = right[j]
            j += 1
            k += 1

arr = [38, 27, 43, 3, 9, 82, 10]
merge_sort(arr)
print(arr)
"#;

const HEAP: &str = r#"def heapify(arr, n, i):
    largest = i
    l = 2 * i + 1
    r = 2 * i + 2
    if l < n and arr[l] > arr[largest]:
        largest = l
    if r < n and arr[r] > arr[largest]:
        largest = r
    if largest != i:
        arr[i], arr[largest] = arr[largest], arr[i]
        heapify(arr, n, largest)

def heap_sort(arr):
    n = len(arr)
    for i in range(n // 2 - 1, -1, -1):
        heapify(arr, n, i)
    for i in range(n - 1, 0, -1):
        arr[i], arr[0] = arr[0], arr[i]
        heapify(arr, i, 0)

arr = [12, 11, 13, 5, 6, 7]
heap_sort(arr)
print(arr)
"#;

#[cfg(test)]
mod sorting_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Helper: run in stream mode, return (state lines, other lines)
    fn run_stream(code: &str) -> (Vec<String>, Vec<String>) {
        let outcome =
            run_source(code, &RunConfig::default(), Vec::new()).expect("run should not fail");
        assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);

        let text = String::from_utf8(outcome.out).expect("output should be UTF-8");
        let (states, other): (Vec<&str>, Vec<&str>) =
            text.lines().partition(|l| l.starts_with("STATE:"));
        (
            states.into_iter().map(str::to_string).collect(),
            other.into_iter().map(str::to_string).collect(),
        )
    }

    fn assert_sorted_run(code: &str, expected: &str) -> Vec<String> {
        let (states, other) = run_stream(code);
        assert!(!states.is_empty(), "every algorithm mutates the list");
        assert_eq!(
            states.last().map(String::as_str),
            Some(format!("STATE:{}", expected).as_str()),
            "last state should be the sorted list"
        );
        assert_eq!(other, vec![expected.to_string()]);
        states
    }

    #[test]
    fn test_bubble_sort() {
        let states = assert_sorted_run(BUBBLE, "[1, 2, 3]");
        assert_eq!(states, vec!["STATE:[1, 3, 2]", "STATE:[1, 2, 3]"]);
    }

    #[test]
    fn test_insertion_sort() {
        assert_sorted_run(INSERTION, "[1, 2, 3, 4, 5, 6]");
    }

    #[test]
    fn test_selection_sort() {
        let states = assert_sorted_run(SELECTION, "[11, 12, 22, 25, 64]");
        // one swap per outer iteration
        assert_eq!(states.len(), 5);
        assert_eq!(states[0], "STATE:[11, 25, 12, 22, 64]");
    }

    #[test]
    fn test_quick_sort() {
        assert_sorted_run(QUICK, "[1, 5, 7, 8, 9, 10]");
    }

    #[test]
    fn test_merge_sort() {
        let states = assert_sorted_run(MERGE, "[3, 9, 10, 27, 38, 43, 82]");
        // recursive calls log their own sub-lists
        assert!(states.iter().any(|s| s == "STATE:[27, 38, 43]"));
    }

    #[test]
    fn test_heap_sort() {
        assert_sorted_run(HEAP, "[5, 6, 7, 11, 12, 13]");
    }

    #[test]
    fn test_algorithm_detection() {
        assert_eq!(detect_algorithm(BUBBLE), Algorithm::BubbleSort);
        assert_eq!(detect_algorithm(INSERTION), Algorithm::InsertionSort);
        assert_eq!(detect_algorithm(SELECTION), Algorithm::SelectionSort);
        assert_eq!(detect_algorithm(QUICK), Algorithm::QuickSort);
        assert_eq!(detect_algorithm(MERGE), Algorithm::MergeSort);
        assert_eq!(detect_algorithm(HEAP), Algorithm::HeapSort);
        assert_eq!(detect_algorithm("print(1)"), Algorithm::Unknown);
    }

    #[test]
    fn test_function_listing() {
        let lines: Vec<&str> = QUICK.lines().collect();
        let defs = build_def_map(&lines);
        assert_eq!(defs.len(), 2);
        assert_eq!(defs.get("partition"), Some(&1));
        assert_eq!(defs.get("quick_sort"), Some(&11));
    }

    #[test]
    fn test_recursion_limit() {
        let outcome = run_source(
            "def f(n):\n    return f(n + 1)\nf(0)\n",
            &RunConfig::default(),
            Vec::new(),
        )
        .expect("run should not fail");
        let text = String::from_utf8(outcome.out).expect("output should be UTF-8");
        assert_eq!(text, "Error: maximum recursion depth exceeded\n");
        assert_eq!(outcome.error_kind, Some("RecursionError"));
    }

    #[test]
    fn test_lower_recursion_limit() {
        let config = RunConfig {
            recursion_limit: 3,
            ..RunConfig::default()
        };
        let code = "def depth(n):\n    if n == 0:\n        return 0\n    return 1 + depth(n - 1)\nprint(depth(2))\nprint(depth(3))\n";
        let outcome = run_source(code, &config, Vec::new()).expect("run should not fail");
        let text = String::from_utf8(outcome.out).expect("output should be UTF-8");
        assert_eq!(text, "2\nError: maximum recursion depth exceeded\n");
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report_config(breakpoints: Vec<usize>) -> RunConfig {
        RunConfig {
            output: OutputMode::Report,
            breakpoints,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_report_captures_instead_of_streaming() {
        let code = "arr = [2, 1]\nprint(\"start\")\narr[0], arr[1] = arr[1], arr[0]\n";
        let outcome = run_source(code, &report_config(vec![3]), Vec::new())
            .expect("run should not fail");

        assert!(outcome.out.is_empty(), "report mode writes nothing itself");
        assert_eq!(outcome.captured, "start\n");
        assert_eq!(outcome.steps.len(), 1);
        assert_eq!(outcome.steps[0].step, 1);
        assert_eq!(outcome.steps[0].line, 3);
        assert_eq!(outcome.steps[0].state, serde_json::json!([1, 2]));
        assert!(outcome.steps[0].breakpoint);

        let report = RunReport::from_outcome(code, &outcome);
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.algorithm, Algorithm::Unknown);
        assert!(report.functions.is_empty());
        assert_eq!(report.error, None);
    }

    #[test]
    fn test_report_json_layout() {
        let outcome = run_source(BUBBLE, &report_config(vec![6]), Vec::new())
            .expect("run should not fail");
        let report = RunReport::from_outcome(BUBBLE, &outcome);
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().expect("report serializes"))
                .expect("report is valid JSON");

        assert_eq!(json["status"], "success");
        assert_eq!(json["algorithm"], "bubbleSort");
        assert_eq!(json["output"], "[1, 2, 3]\n");
        assert!(json["executionTime"].is_u64());
        assert!(json["error"].is_null());

        let steps = json["steps"].as_array().expect("steps is an array");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1]["state"], serde_json::json!([1, 2, 3]));
        assert_eq!(steps[1]["line"], 6);
        assert_eq!(steps[1]["breakpoint"], true);
    }

    #[test]
    fn test_unflagged_steps_omit_breakpoint() {
        let outcome = run_source(BUBBLE, &report_config(Vec::new()), Vec::new())
            .expect("run should not fail");
        let report = RunReport::from_outcome(BUBBLE, &outcome);
        let json = serde_json::to_value(&report).expect("report serializes");
        assert!(json["steps"][0].get("breakpoint").is_none());
    }

    #[test]
    fn test_report_error() {
        let code = "arr = [1]\narr[5] = 0\n";
        let outcome =
            run_source(code, &report_config(Vec::new()), Vec::new()).expect("run should not fail");

        assert!(outcome.out.is_empty(), "no Error: line in report mode");
        let report = RunReport::from_outcome(code, &outcome);
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(
            report.error.as_deref(),
            Some("list assignment index out of range")
        );
        assert!(report.steps.is_empty());
    }

    #[test]
    fn test_report_lists_functions_in_order() {
        let outcome = run_source(HEAP, &report_config(Vec::new()), Vec::new())
            .expect("run should not fail");
        let report = RunReport::from_outcome(HEAP, &outcome);
        assert_eq!(report.functions, vec!["heap_sort", "heapify"]);
        assert_eq!(report.algorithm, Algorithm::HeapSort);
        assert_eq!(report.output, "[5, 6, 7, 11, 12, 13]\n");
    }
}

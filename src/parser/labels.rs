use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scan `def name(` lines; maps function name to its 1-based line.
pub fn build_def_map(lines: &[&str]) -> BTreeMap<String, usize> {
    let mut map = BTreeMap::new();
    for (i, line) in lines.iter().enumerate() {
        let t = line.trim_start();
        if let Some(rest) = t.strip_prefix("def ") {
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if !name.is_empty() {
                map.entry(name).or_insert(i + 1);
            }
        }
    }
    map
}

/// Best-effort guess at which textbook sort a snippet implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Algorithm {
    QuickSort,
    InsertionSort,
    MergeSort,
    HeapSort,
    BubbleSort,
    SelectionSort,
    Unknown,
}

impl Algorithm {
    pub fn label(self) -> &'static str {
        match self {
            Algorithm::QuickSort => "Quick Sort",
            Algorithm::InsertionSort => "Insertion Sort",
            Algorithm::MergeSort => "Merge Sort",
            Algorithm::HeapSort => "Heap Sort",
            Algorithm::BubbleSort => "Bubble Sort",
            Algorithm::SelectionSort => "Selection Sort",
            Algorithm::Unknown => "Unknown",
        }
    }
}

/// Keyword heuristics, checked in a fixed order.
pub fn detect_algorithm(source: &str) -> Algorithm {
    let lower = source.to_lowercase();
    let physical: Vec<&str> = lower.split('\n').collect();
    let defs = build_def_map(&physical);
    let has = |needle: &str| lower.contains(needle);
    let quick_def = defs
        .keys()
        .any(|name| name.contains("quick") || name == "qsort");

    if has("partition") && quick_def {
        Algorithm::QuickSort
    } else if has("while") && has("key") && !has("partition") {
        Algorithm::InsertionSort
    } else if has("merge") && !has("partition") && !has("heapify") {
        Algorithm::MergeSort
    } else if has("heapify") && !has("partition") {
        Algorithm::HeapSort
    } else if has("- i - 1") {
        Algorithm::BubbleSort
    } else if has("min_idx") || has("min_index") || has("minidx") {
        Algorithm::SelectionSort
    } else {
        Algorithm::Unknown
    }
}

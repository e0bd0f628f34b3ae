// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Comparison sorts over small integer arrays.
//!
//! Every comparison, swap and write records one snapshot. Highlight flags
//! are recomputed for each snapshot from the algorithm's current positions,
//! so no flag outlives the step that set it. Positions known to be final are
//! flagged [`Mark::Sorted`]; the closing snapshot flags every element sorted.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Largest array the sort executors accept.
pub const MAX_ARRAY_LEN: usize = 50;

/// Per-element highlight in a [`SortState`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    /// Not involved in the current step.
    #[default]
    Idle,
    /// Being compared.
    Comparing,
    /// Being swapped or overwritten.
    Swapping,
    /// Current quick-sort pivot.
    Pivot,
    /// In its final position.
    Sorted,
}

/// Snapshot payload for sorting traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Array contents after the step.
    pub values: Vec<i64>,
    /// One highlight per element.
    pub marks: Vec<Mark>,
}

/// Which sorting algorithm to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortAlgorithm {
    /// Adjacent swaps, early exit after a pass without swaps.
    Bubble,
    /// Repeatedly select the minimum of the unsorted suffix.
    Selection,
    /// Sink each element into the sorted prefix.
    Insertion,
    /// Insertion sort over halving gaps (`n/2, n/4, …, 1`).
    Shell,
    /// Top-down merge sort with an auxiliary buffer.
    Merge,
    /// Lomuto partition with the last element as pivot.
    Quick,
    /// In-place max-heap sort.
    Heap,
}

impl SortAlgorithm {
    /// Every algorithm, in display order.
    pub const ALL: [Self; 7] = [
        Self::Bubble,
        Self::Selection,
        Self::Insertion,
        Self::Shell,
        Self::Merge,
        Self::Quick,
        Self::Heap,
    ];

    /// Stable identifier used by executors and the CLI.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bubble => "bubble-sort",
            Self::Selection => "selection-sort",
            Self::Insertion => "insertion-sort",
            Self::Shell => "shell-sort",
            Self::Merge => "merge-sort",
            Self::Quick => "quick-sort",
            Self::Heap => "heap-sort",
        }
    }
}

impl fmt::Display for SortAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortAlgorithm {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.name() == key || a.name().trim_end_matches("-sort") == key)
            .ok_or_else(|| InputError::Invalid(format!("Unknown sorting algorithm `{s}`")))
    }
}

/// Executor for one [`SortAlgorithm`] over `Vec<i64>` input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortExecutor {
    algorithm: SortAlgorithm,
}

impl SortExecutor {
    /// Executor for `algorithm`.
    #[must_use]
    pub fn new(algorithm: SortAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this executor runs.
    #[must_use]
    pub fn algorithm(&self) -> SortAlgorithm {
        self.algorithm
    }
}

impl Executor for SortExecutor {
    type Input = Vec<i64>;
    type State = SortState;

    fn name(&self) -> &'static str {
        self.algorithm.name()
    }

    fn run(&self, input: &Vec<i64>) -> Trace<SortState> {
        if let Err(e) = InputError::check_len("array", input.len(), MAX_ARRAY_LEN) {
            return reject(&e, SortState::default());
        }
        let mut run = SortRun::new(input.clone());
        match self.algorithm {
            SortAlgorithm::Bubble => run.bubble(),
            SortAlgorithm::Selection => run.selection(),
            SortAlgorithm::Insertion => run.insertion(),
            SortAlgorithm::Shell => run.shell(),
            SortAlgorithm::Merge => {
                let n = run.values.len();
                run.merge_sort(0, n);
            }
            SortAlgorithm::Quick => {
                let n = run.values.len();
                run.quick_sort(0, n);
            }
            SortAlgorithm::Heap => run.heap(),
        }
        run.finish()
    }
}

struct SortRun {
    values: Vec<i64>,
    sorted: Vec<bool>,
    rec: TraceRecorder<SortState>,
}

impl SortRun {
    fn new(values: Vec<i64>) -> Self {
        let n = values.len();
        let initial = SortState {
            values: values.clone(),
            marks: vec![Mark::Idle; n],
        };
        Self {
            rec: TraceRecorder::with_counters(
                format!("Initial array of {n} elements"),
                initial,
                &["comparisons", "swaps", "writes"],
            ),
            sorted: vec![false; n],
            values,
        }
    }

    fn snap(&mut self, description: String, highlight: &[(usize, Mark)]) {
        let mut marks: Vec<Mark> = self
            .sorted
            .iter()
            .map(|&done| if done { Mark::Sorted } else { Mark::Idle })
            .collect();
        for &(i, mark) in highlight {
            marks[i] = mark;
        }
        let state = SortState {
            values: self.values.clone(),
            marks,
        };
        self.rec.record(description, state);
    }

    fn compare(&mut self, i: usize, j: usize) -> Ordering {
        self.compare_with_pivot(i, j, None)
    }

    fn compare_with_pivot(&mut self, i: usize, j: usize, pivot: Option<usize>) -> Ordering {
        self.rec.count("comparisons");
        let (a, b) = (self.values[i], self.values[j]);
        let mut highlight = vec![(i, Mark::Comparing), (j, Mark::Comparing)];
        if let Some(p) = pivot {
            highlight.push((p, Mark::Pivot));
        }
        self.snap(format!("Compare {a} (index {i}) with {b} (index {j})"), &highlight);
        a.cmp(&b)
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.rec.count("swaps");
        self.values.swap(i, j);
        let (a, b) = (self.values[i], self.values[j]);
        self.snap(
            format!("Swap: index {i} now holds {a}, index {j} now holds {b}"),
            &[(i, Mark::Swapping), (j, Mark::Swapping)],
        );
    }

    fn write(&mut self, i: usize, value: i64) {
        self.rec.count("writes");
        self.values[i] = value;
        self.snap(format!("Write {value} to index {i}"), &[(i, Mark::Swapping)]);
    }

    fn settle(&mut self, i: usize) {
        self.sorted[i] = true;
        let v = self.values[i];
        self.snap(format!("{v} is in its final position at index {i}"), &[]);
    }

    fn finish(mut self) -> Trace<SortState> {
        self.sorted.iter_mut().for_each(|s| *s = true);
        self.snap("Array is sorted".to_owned(), &[]);
        self.rec.finish()
    }

    fn bubble(&mut self) {
        let n = self.values.len();
        for pass in 0..n.saturating_sub(1) {
            let mut swapped = false;
            for j in 0..n - 1 - pass {
                if self.compare(j, j + 1) == Ordering::Greater {
                    self.swap(j, j + 1);
                    swapped = true;
                }
            }
            self.settle(n - 1 - pass);
            if !swapped {
                self.snap(format!("No swaps in pass {}; stopping early", pass + 1), &[]);
                break;
            }
        }
    }

    fn selection(&mut self) {
        let n = self.values.len();
        for i in 0..n.saturating_sub(1) {
            let mut min = i;
            for j in i + 1..n {
                if self.compare(j, min) == Ordering::Less {
                    min = j;
                }
            }
            if min != i {
                self.swap(i, min);
            }
            self.settle(i);
        }
    }

    fn insertion(&mut self) {
        for i in 1..self.values.len() {
            let mut j = i;
            while j > 0 && self.compare(j - 1, j) == Ordering::Greater {
                self.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    fn shell(&mut self) {
        let n = self.values.len();
        let mut gap = n / 2;
        while gap > 0 {
            self.snap(format!("Gap is now {gap}"), &[]);
            for i in gap..n {
                let mut j = i;
                while j >= gap && self.compare(j - gap, j) == Ordering::Greater {
                    self.swap(j - gap, j);
                    j -= gap;
                }
            }
            gap /= 2;
        }
    }

    /// Sorts `values[lo..hi]`.
    fn merge_sort(&mut self, lo: usize, hi: usize) {
        if hi - lo < 2 {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        self.merge_sort(lo, mid);
        self.merge_sort(mid, hi);
        self.snap(
            format!("Merge [{lo}..{mid}) with [{mid}..{hi})"),
            &(lo..hi).map(|k| (k, Mark::Comparing)).collect::<Vec<_>>(),
        );
        let left = self.values[lo..mid].to_vec();
        let right = self.values[mid..hi].to_vec();
        let (mut i, mut j) = (0, 0);
        for k in lo..hi {
            let take_left = if i < left.len() && j < right.len() {
                self.rec.count("comparisons");
                let (a, b) = (left[i], right[j]);
                self.snap(format!("Compare {a} (left) with {b} (right)"), &[(k, Mark::Comparing)]);
                a <= b
            } else {
                i < left.len()
            };
            let value = if take_left {
                i += 1;
                left[i - 1]
            } else {
                j += 1;
                right[j - 1]
            };
            self.write(k, value);
        }
    }

    /// Sorts `values[lo..hi]` with Lomuto partitioning.
    fn quick_sort(&mut self, lo: usize, hi: usize) {
        if hi <= lo {
            return;
        }
        if hi - lo == 1 {
            self.settle(lo);
            return;
        }
        let pivot = hi - 1;
        let pv = self.values[pivot];
        self.snap(format!("Pivot is {pv} at index {pivot}"), &[(pivot, Mark::Pivot)]);
        let mut store = lo;
        for j in lo..pivot {
            if self.compare_with_pivot(j, pivot, Some(pivot)) == Ordering::Less {
                if store != j {
                    self.swap(store, j);
                }
                store += 1;
            }
        }
        if store != pivot {
            self.swap(store, pivot);
        }
        self.settle(store);
        self.quick_sort(lo, store);
        self.quick_sort(store + 1, hi);
    }

    fn heap(&mut self) {
        let n = self.values.len();
        for root in (0..n / 2).rev() {
            self.sift_down(root, n);
        }
        for end in (1..n).rev() {
            self.swap(0, end);
            self.settle(end);
            self.sift_down(0, end);
        }
        self.settle(0);
    }

    fn sift_down(&mut self, mut root: usize, len: usize) {
        loop {
            let mut child = 2 * root + 1;
            if child >= len {
                return;
            }
            if child + 1 < len && self.compare(child, child + 1) == Ordering::Less {
                child += 1;
            }
            if self.compare(root, child) == Ordering::Less {
                self.swap(root, child);
                root = child;
            } else {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn every_algorithm_sorts_five_three_one() {
        for alg in SortAlgorithm::ALL {
            let trace = SortExecutor::new(alg).run(&vec![5, 3, 1]);
            assert!(trace.len() > 1, "{alg}");
            let last = trace.final_state();
            assert_eq!(last.values, vec![1, 3, 5], "{alg}");
            assert!(last.marks.iter().all(|m| *m == Mark::Sorted), "{alg}");
        }
    }

    #[test]
    fn empty_and_oversized_arrays_are_rejected() {
        let exec = SortExecutor::new(SortAlgorithm::Bubble);
        let empty = exec.run(&Vec::new());
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].description, "array must not be empty");

        let big = exec.run(&(0..51).collect());
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].state, SortState::default());
    }

    #[test]
    fn bubble_sort_counts_match_textbook() {
        let trace = SortExecutor::new(SortAlgorithm::Bubble).run(&vec![5, 3, 1]);
        let m = &trace.last().metrics;
        assert_eq!(m.get("comparisons"), 3);
        assert_eq!(m.get("swaps"), 3);
    }

    #[test]
    fn bubble_sort_exits_early_on_sorted_input() {
        let trace = SortExecutor::new(SortAlgorithm::Bubble).run(&vec![1, 2, 3, 4]);
        assert_eq!(trace.last().metrics.get("comparisons"), 3);
        assert_eq!(trace.last().metrics.get("swaps"), 0);
    }

    #[test]
    fn quick_sort_highlights_pivot_during_partition() {
        let trace = SortExecutor::new(SortAlgorithm::Quick).run(&vec![4, 9, 2, 6]);
        let compare = trace
            .iter()
            .find(|s| s.description.starts_with("Compare"))
            .unwrap();
        assert_eq!(compare.state.marks[3], Mark::Pivot);
    }

    #[test]
    fn merge_sort_records_writes() {
        let trace = SortExecutor::new(SortAlgorithm::Merge).run(&vec![2, 1]);
        assert_eq!(trace.last().metrics.get("writes"), 2);
        assert_eq!(trace.final_state().values, vec![1, 2]);
    }

    #[test]
    fn single_element_is_trivially_sorted() {
        for alg in SortAlgorithm::ALL {
            let trace = SortExecutor::new(alg).run(&vec![7]);
            assert_eq!(trace.final_state().marks, vec![Mark::Sorted], "{alg}");
        }
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!("quick".parse::<SortAlgorithm>().unwrap(), SortAlgorithm::Quick);
        assert_eq!("Heap-Sort".parse::<SortAlgorithm>().unwrap(), SortAlgorithm::Heap);
        assert!("bogo".parse::<SortAlgorithm>().is_err());
    }
}

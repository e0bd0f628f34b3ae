// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! N-Queens by row-wise backtracking.
//!
//! Columns are tried left to right in each row. Every safety check, placement
//! and removal records one snapshot, in recursion order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::wide;

/// Largest board when stopping at the first solution.
pub const MAX_BOARD: usize = 10;
/// Largest board when enumerating every solution.
pub const MAX_BOARD_ALL: usize = 8;

const COUNTERS: &[&str] = &["checks", "placements", "backtracks", "solutions"];

/// How far the search goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueensMode {
    /// Stop at the first complete placement.
    #[default]
    First,
    /// Enumerate every solution.
    All,
}

impl FromStr for QueensMode {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            _ => Err(InputError::Invalid(format!(
                "Unknown search mode `{s}`; expected `first` or `all`"
            ))),
        }
    }
}

impl fmt::Display for QueensMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::All => "all",
        })
    }
}

/// Input for [`NQueensExecutor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueensInput {
    /// Board side length.
    pub size: usize,
    /// Search extent.
    pub mode: QueensMode,
}

/// What a board snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueensStep {
    /// Empty board.
    #[default]
    Init,
    /// Tested a square.
    Check,
    /// Put a queen down.
    Place,
    /// Took a queen back.
    Backtrack,
    /// All rows filled.
    Solution,
    /// Search exhausted.
    Done,
}

/// Snapshot payload for N-Queens traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueensState {
    /// Board side length.
    pub size: usize,
    /// Column of the queen in each filled row, top row first.
    pub queens: Vec<usize>,
    /// Square `(row, col)` under consideration.
    pub cursor: Option<(usize, usize)>,
    /// Queens attacking the cursor square.
    pub conflicts: Vec<(usize, usize)>,
    /// Solutions found so far, as column lists.
    pub solutions: Vec<Vec<usize>>,
    /// Kind of step.
    pub step: QueensStep,
}

impl QueensState {
    /// Whether a queen stands on `(row, col)`.
    pub fn has_queen(&self, row: usize, col: usize) -> bool {
        self.queens.get(row) == Some(&col)
    }
}

/// Solves N-Queens, first solution or all of them.
#[derive(Clone, Copy, Debug, Default)]
pub struct NQueensExecutor;

impl Executor for NQueensExecutor {
    type Input = QueensInput;
    type State = QueensState;

    fn name(&self) -> &'static str {
        "n-queens"
    }

    fn run(&self, input: &QueensInput) -> Trace<QueensState> {
        let max = match input.mode {
            QueensMode::First => MAX_BOARD,
            QueensMode::All => MAX_BOARD_ALL,
        };
        if let Err(e) = InputError::check_range("board size", wide(input.size), 1, wide(max)) {
            return reject(&e, QueensState::default());
        }
        let n = input.size;
        let state = QueensState {
            size: n,
            ..QueensState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!("Starting N-Queens problem with {n}x{n} board"),
            state.clone(),
            COUNTERS,
        );
        let mut search = Search {
            mode: input.mode,
            state,
            rec,
        };
        search.place_row(0);
        search.state.cursor = None;
        let found = search.state.solutions.len();
        let summary = if found == 0 {
            format!("No solution exists for {n}x{n} N-Queens problem.")
        } else if input.mode == QueensMode::All {
            format!("Search complete: {found} solution(s) for {n}x{n}")
        } else {
            format!("Search complete: first solution for {n}x{n} found")
        };
        search.snap(summary, QueensStep::Done);
        search.rec.finish()
    }
}

struct Search {
    mode: QueensMode,
    state: QueensState,
    rec: TraceRecorder<QueensState>,
}

impl Search {
    fn snap(&mut self, description: String, step: QueensStep) {
        self.state.step = step;
        self.rec.record(description, self.state.clone());
    }

    fn conflicts(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        self.state
            .queens
            .iter()
            .enumerate()
            .filter(|&(r, &c)| c == col || row - r == col.abs_diff(c))
            .map(|(r, &c)| (r, c))
            .collect()
    }

    /// Returns `true` once the search should stop.
    fn place_row(&mut self, row: usize) -> bool {
        let n = self.state.size;
        if row == n {
            self.rec.count("solutions");
            self.state.solutions.push(self.state.queens.clone());
            let k = self.state.solutions.len();
            self.snap(
                format!("Solution {k} found! All {n} queens placed safely."),
                QueensStep::Solution,
            );
            return self.mode == QueensMode::First;
        }
        for col in 0..n {
            self.rec.count("checks");
            self.state.cursor = Some((row, col));
            self.state.conflicts = self.conflicts(row, col);
            let safe = self.state.conflicts.is_empty();
            let verdict = if safe { "Safe" } else { "Conflicts detected" };
            self.snap(format!("Checking position ({row}, {col}) - {verdict}"), QueensStep::Check);
            if !safe {
                continue;
            }
            self.state.conflicts.clear();
            self.state.queens.push(col);
            self.rec.count("placements");
            self.snap(
                format!("Placed queen at ({row}, {col}). Moving to next row."),
                QueensStep::Place,
            );
            if self.place_row(row + 1) {
                return true;
            }
            self.state.queens.pop();
            self.state.cursor = Some((row, col));
            self.rec.count("backtracks");
            self.snap(
                format!("Backtracking: Removed queen from ({row}, {col}). Trying next position."),
                QueensStep::Backtrack,
            );
        }
        false
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn run(size: usize, mode: QueensMode) -> Trace<QueensState> {
        NQueensExecutor.run(&QueensInput { size, mode })
    }

    #[test]
    fn four_queens_first_solution() {
        let t = run(4, QueensMode::First);
        assert_eq!(t.final_state().solutions, vec![vec![1, 3, 0, 2]]);
        assert_eq!(t.final_state().queens, vec![1, 3, 0, 2]);
        assert!(t.last().metrics.get("backtracks") > 0);
    }

    #[test]
    fn solution_counts_match_known_values() {
        for (n, count) in [(1, 1), (4, 2), (5, 10), (6, 4), (8, 92)] {
            let t = run(n, QueensMode::All);
            assert_eq!(t.final_state().solutions.len(), count, "n = {n}");
            assert_eq!(t.last().metrics.get("solutions"), count as u64);
        }
    }

    #[test]
    fn unsolvable_boards_say_so() {
        let t = run(3, QueensMode::First);
        assert!(t.final_state().solutions.is_empty());
        assert_eq!(t.last().description, "No solution exists for 3x3 N-Queens problem.");
    }

    #[test]
    fn conflicting_check_lists_attackers() {
        let t = run(4, QueensMode::First);
        let check = t
            .iter()
            .find(|s| s.description == "Checking position (1, 1) - Conflicts detected")
            .unwrap();
        assert_eq!(check.state.conflicts, vec![(0, 0)]);
    }

    #[test]
    fn oversized_boards_are_rejected() {
        assert_eq!(run(11, QueensMode::First).len(), 1);
        let t = run(9, QueensMode::All);
        assert_eq!(t[0].description, "board size 9 is out of range [1, 8]");
        assert_eq!(run(0, QueensMode::First).len(), 1);
    }
}

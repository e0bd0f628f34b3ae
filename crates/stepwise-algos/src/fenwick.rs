// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fenwick (binary indexed) tree over a 0-based array.
//!
//! The tree itself is 1-based: `tree[k]` covers `array[k - lowbit(k) .. k]`.
//! Updates climb with `k += k & k.wrapping_neg()`; prefix queries descend with
//! `k -= k & k.wrapping_neg()`. Every node touched records one snapshot.

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::range_sum::{validate_values, RangeSumOp, RangeSumScript};

const COUNTERS: &[&str] = &["operations", "node_visits"];

/// Demo array shown when no input is given.
pub const FENWICK_DEMO: [i64; 8] = [3, 2, -1, 6, 5, 4, -3, 3];

/// Operation a Fenwick snapshot belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FenwickPhase {
    /// Initial construction.
    #[default]
    Build,
    /// Point assignment.
    Update,
    /// Prefix or range query.
    Query,
}

/// Snapshot payload for Fenwick traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FenwickState {
    /// Current array contents.
    pub array: Vec<i64>,
    /// Tree cells; index 0 is unused and always 0.
    pub tree: Vec<i64>,
    /// Tree indices visited by the current operation, in visit order.
    pub visited: Vec<usize>,
    /// Operation in progress.
    pub phase: FenwickPhase,
    /// Query bounds `(left, right)`, inclusive, when querying.
    pub query: Option<(usize, usize)>,
    /// Partial or final sum of the current query.
    pub result: Option<i64>,
}

fn lowbit(k: usize) -> usize {
    k & k.wrapping_neg()
}

/// Live Fenwick tree that records a snapshot per node visit.
#[derive(Debug, Clone)]
pub struct FenwickSession {
    array: Vec<i64>,
    tree: Vec<i64>,
    rec: TraceRecorder<FenwickState>,
}

impl FenwickSession {
    /// Builds the tree by adding each element in turn.
    ///
    /// # Errors
    /// Empty, oversized or out-of-range arrays.
    pub fn new(values: &[i64]) -> Result<Self, InputError> {
        validate_values(values)?;
        let n = values.len();
        let initial = FenwickState {
            array: values.to_vec(),
            tree: vec![0; n + 1],
            ..FenwickState::default()
        };
        let mut session = Self {
            array: values.to_vec(),
            tree: vec![0; n + 1],
            rec: TraceRecorder::with_counters(
                format!("Building Fenwick tree from {n} elements"),
                initial,
                COUNTERS,
            ),
        };
        session.rec.count("operations");
        for (i, &v) in values.iter().enumerate() {
            session.add(i, v, FenwickPhase::Build);
            session.record(
                format!("Added array[{i}] = {v} to the tree"),
                Vec::new(),
                FenwickPhase::Build,
                None,
                None,
            );
        }
        Ok(session)
    }

    /// Assigns `array[index] = value` by adding the delta up the tree.
    ///
    /// # Errors
    /// Out-of-range index or value.
    pub fn set(&mut self, index: usize, value: i64) -> Result<(), InputError> {
        RangeSumOp::Set { index, value }.validate(self.array.len())?;
        self.rec.count("operations");
        let old = self.array[index];
        let delta = value - old;
        self.array[index] = value;
        let visited = self.add(index, delta, FenwickPhase::Update);
        self.record(
            format!("Updated index {index} from {old} to {value} (delta {delta})"),
            visited,
            FenwickPhase::Update,
            None,
            None,
        );
        Ok(())
    }

    /// Sum of `array[0..=index]`.
    ///
    /// # Errors
    /// Out-of-range index.
    pub fn prefix_sum(&mut self, index: usize) -> Result<i64, InputError> {
        RangeSumOp::Prefix { index }.validate(self.array.len())?;
        self.rec.count("operations");
        let sum = self.prefix(index, (0, index));
        Ok(sum)
    }

    /// Sum of `array[left..=right]` as `prefix(right) - prefix(left - 1)`.
    ///
    /// # Errors
    /// Out-of-range or inverted bounds.
    pub fn range_sum(&mut self, left: usize, right: usize) -> Result<i64, InputError> {
        RangeSumOp::Range { left, right }.validate(self.array.len())?;
        self.rec.count("operations");
        let hi = self.prefix(right, (left, right));
        if left == 0 {
            return Ok(hi);
        }
        let lo = self.prefix(left - 1, (left, right));
        let result = hi - lo;
        self.record(
            format!("Range sum [{left}, {right}] = {hi} - {lo} = {result}"),
            Vec::new(),
            FenwickPhase::Query,
            Some((left, right)),
            Some(result),
        );
        Ok(result)
    }

    /// Applies one scripted operation, discarding query results.
    ///
    /// # Errors
    /// As the underlying operation.
    pub fn apply(&mut self, op: RangeSumOp) -> Result<(), InputError> {
        match op {
            RangeSumOp::Set { index, value } => self.set(index, value),
            RangeSumOp::Prefix { index } => self.prefix_sum(index).map(|_| ()),
            RangeSumOp::Range { left, right } => self.range_sum(left, right).map(|_| ()),
        }
    }

    /// Current array contents.
    pub fn values(&self) -> &[i64] {
        &self.array
    }

    /// Publishes the steps recorded so far.
    pub fn trace(&self) -> Trace<FenwickState> {
        self.rec.snapshot_trace()
    }

    /// Ends the session and returns its full trace.
    pub fn into_trace(self) -> Trace<FenwickState> {
        self.rec.finish()
    }

    /// Adds `delta` at 0-based `index`, recording each node touched.
    fn add(&mut self, index: usize, delta: i64, phase: FenwickPhase) -> Vec<usize> {
        let n = self.array.len();
        let mut visited = Vec::new();
        let mut k = index + 1;
        while k <= n {
            self.tree[k] += delta;
            visited.push(k);
            self.rec.count("node_visits");
            self.record(
                format!("tree[{k}] += {delta} -> {}", self.tree[k]),
                visited.clone(),
                phase,
                None,
                None,
            );
            k += lowbit(k);
        }
        visited
    }

    fn prefix(&mut self, index: usize, bounds: (usize, usize)) -> i64 {
        let mut visited = Vec::new();
        let mut sum = 0;
        let mut k = index + 1;
        while k > 0 {
            sum += self.tree[k];
            visited.push(k);
            self.rec.count("node_visits");
            self.record(
                format!("Add tree[{k}] = {}; running sum {sum}", self.tree[k]),
                visited.clone(),
                FenwickPhase::Query,
                Some(bounds),
                Some(sum),
            );
            k -= lowbit(k);
        }
        self.record(
            format!("Prefix sum up to index {index} = {sum}"),
            visited,
            FenwickPhase::Query,
            Some(bounds),
            Some(sum),
        );
        sum
    }

    fn record(
        &mut self,
        description: String,
        visited: Vec<usize>,
        phase: FenwickPhase,
        query: Option<(usize, usize)>,
        result: Option<i64>,
    ) {
        let state = FenwickState {
            array: self.array.clone(),
            tree: self.tree.clone(),
            visited,
            phase,
            query,
            result,
        };
        self.rec.record(description, state);
    }
}

/// Runs a [`RangeSumScript`] through a fresh [`FenwickSession`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FenwickExecutor;

impl Executor for FenwickExecutor {
    type Input = RangeSumScript;
    type State = FenwickState;

    fn name(&self) -> &'static str {
        "fenwick-tree"
    }

    fn run(&self, input: &RangeSumScript) -> Trace<FenwickState> {
        if let Err(e) = input.validate() {
            return reject(&e, FenwickState::default());
        }
        let mut session = match FenwickSession::new(&input.values) {
            Ok(s) => s,
            Err(e) => return reject(&e, FenwickState::default()),
        };
        for op in &input.ops {
            if let Err(e) = session.apply(*op) {
                return reject(&e, FenwickState::default());
            }
        }
        session.into_trace()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn demo_tree_matches_textbook_layout() {
        let s = FenwickSession::new(&FENWICK_DEMO).unwrap();
        let t = s.trace();
        assert_eq!(t.final_state().tree, vec![0, 3, 5, -1, 10, 5, 9, -3, 19]);
    }

    #[test]
    fn range_sum_uses_two_prefixes() {
        let mut s = FenwickSession::new(&FENWICK_DEMO).unwrap();
        assert_eq!(s.range_sum(2, 5).unwrap(), -1 + 6 + 5 + 4);
        assert_eq!(s.prefix_sum(7).unwrap(), 19);
        assert_eq!(s.range_sum(0, 0).unwrap(), 3);
    }

    #[test]
    fn update_changes_later_sums() {
        let mut s = FenwickSession::new(&FENWICK_DEMO).unwrap();
        s.set(3, 0).unwrap();
        assert_eq!(s.prefix_sum(7).unwrap(), 13);
        assert_eq!(s.values()[3], 0);
        let last = s.trace();
        assert_eq!(last.final_state().visited, vec![8]);
    }

    #[test]
    fn update_visits_follow_lowbit_chain() {
        let mut s = FenwickSession::new(&FENWICK_DEMO).unwrap();
        s.set(0, 4).unwrap();
        let t = s.trace();
        let update = t
            .iter()
            .rev()
            .find(|snap| snap.state.phase == FenwickPhase::Update)
            .unwrap();
        assert_eq!(update.state.visited, vec![1, 2, 4, 8]);
    }

    #[test]
    fn bad_query_is_rejected_by_executor() {
        let trace = FenwickExecutor.run(&RangeSumScript {
            values: FENWICK_DEMO.to_vec(),
            ops: vec![RangeSumOp::Prefix { index: 8 }],
        });
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].description, "index 8 is out of range [0, 7]");
    }

    #[test]
    fn session_errors_leave_trace_untouched() {
        let mut s = FenwickSession::new(&[1, 2]).unwrap();
        let before = s.trace().len();
        assert!(s.set(5, 1).is_err());
        assert_eq!(s.trace().len(), before);
    }
}

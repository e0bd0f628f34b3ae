// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recursive sum segment tree.
//!
//! Node `1` is the root; node `k` has children `2k` and `2k + 1`. The build
//! records one snapshot per finished node (post-order). Queries and updates
//! record one snapshot per node visited, in recursion order.

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::range_sum::{validate_values, RangeSumOp, RangeSumScript};

const COUNTERS: &[&str] = &["operations", "node_visits"];

/// One built node, flattened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentNode {
    /// Heap-style node id (root is `1`).
    pub id: usize,
    /// First array index covered.
    pub lo: usize,
    /// Last array index covered.
    pub hi: usize,
    /// Sum of `array[lo..=hi]`.
    pub sum: i64,
}

/// Operation a segment tree snapshot belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentPhase {
    /// Initial construction.
    #[default]
    Build,
    /// Point assignment.
    Update,
    /// Range query.
    Query,
}

/// Snapshot payload for segment tree traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentState {
    /// Current array contents.
    pub array: Vec<i64>,
    /// Built nodes ordered by id.
    pub nodes: Vec<SegmentNode>,
    /// Node ids visited by the current operation, in visit order.
    pub visited: Vec<usize>,
    /// Operation in progress.
    pub phase: SegmentPhase,
    /// Query bounds `(left, right)`, inclusive.
    pub query: Option<(usize, usize)>,
    /// Final sum of the current query.
    pub result: Option<i64>,
}

/// Live segment tree that records a snapshot per node visit.
#[derive(Debug, Clone)]
pub struct SegmentTreeSession {
    array: Vec<i64>,
    sums: Vec<i64>,
    ranges: Vec<Option<(usize, usize)>>,
    visited: Vec<usize>,
    rec: TraceRecorder<SegmentState>,
}

impl SegmentTreeSession {
    /// Builds the tree recursively.
    ///
    /// # Errors
    /// Empty, oversized or out-of-range arrays.
    pub fn new(values: &[i64]) -> Result<Self, InputError> {
        validate_values(values)?;
        let n = values.len();
        let initial = SegmentState {
            array: values.to_vec(),
            ..SegmentState::default()
        };
        let mut session = Self {
            array: values.to_vec(),
            sums: vec![0; 4 * n],
            ranges: vec![None; 4 * n],
            visited: Vec::new(),
            rec: TraceRecorder::with_counters(
                format!("Building segment tree over {n} elements"),
                initial,
                COUNTERS,
            ),
        };
        session.rec.count("operations");
        session.build(1, 0, n - 1);
        Ok(session)
    }

    /// Assigns `array[index] = value` and refreshes sums on the root path.
    ///
    /// # Errors
    /// Out-of-range index or value.
    pub fn set(&mut self, index: usize, value: i64) -> Result<(), InputError> {
        RangeSumOp::Set { index, value }.validate(self.array.len())?;
        self.rec.count("operations");
        self.visited.clear();
        self.array[index] = value;
        let last = self.array.len() - 1;
        self.update(1, 0, last, index, value);
        self.record(
            format!("Updated index {index} to {value}"),
            SegmentPhase::Update,
            None,
            None,
        );
        Ok(())
    }

    /// Sum of `array[left..=right]`.
    ///
    /// # Errors
    /// Out-of-range or inverted bounds.
    pub fn range_sum(&mut self, left: usize, right: usize) -> Result<i64, InputError> {
        RangeSumOp::Range { left, right }.validate(self.array.len())?;
        self.rec.count("operations");
        self.visited.clear();
        let last = self.array.len() - 1;
        let result = self.query(1, 0, last, (left, right));
        self.record(
            format!("Range sum [{left}, {right}] = {result}"),
            SegmentPhase::Query,
            Some((left, right)),
            Some(result),
        );
        Ok(result)
    }

    /// Applies one scripted operation; `prefix i` is `range 0 i`.
    ///
    /// # Errors
    /// As the underlying operation.
    pub fn apply(&mut self, op: RangeSumOp) -> Result<(), InputError> {
        match op {
            RangeSumOp::Set { index, value } => self.set(index, value),
            RangeSumOp::Prefix { index } => self.range_sum(0, index).map(|_| ()),
            RangeSumOp::Range { left, right } => self.range_sum(left, right).map(|_| ()),
        }
    }

    /// Publishes the steps recorded so far.
    pub fn trace(&self) -> Trace<SegmentState> {
        self.rec.snapshot_trace()
    }

    /// Ends the session and returns its full trace.
    pub fn into_trace(self) -> Trace<SegmentState> {
        self.rec.finish()
    }

    fn build(&mut self, node: usize, lo: usize, hi: usize) {
        if lo == hi {
            self.sums[node] = self.array[lo];
        } else {
            let mid = lo + (hi - lo) / 2;
            self.build(2 * node, lo, mid);
            self.build(2 * node + 1, mid + 1, hi);
            self.sums[node] = self.sums[2 * node] + self.sums[2 * node + 1];
        }
        self.ranges[node] = Some((lo, hi));
        self.rec.count("node_visits");
        self.visited.push(node);
        self.record(
            format!(
                "Built node {node} for range [{lo}, {hi}] with sum {}",
                self.sums[node]
            ),
            SegmentPhase::Build,
            None,
            None,
        );
    }

    fn update(&mut self, node: usize, lo: usize, hi: usize, index: usize, value: i64) {
        self.visit(node, SegmentPhase::Update, None, "on the path to the update");
        if lo == hi {
            self.sums[node] = value;
        } else {
            let mid = lo + (hi - lo) / 2;
            if index <= mid {
                self.update(2 * node, lo, mid, index, value);
            } else {
                self.update(2 * node + 1, mid + 1, hi, index, value);
            }
            self.sums[node] = self.sums[2 * node] + self.sums[2 * node + 1];
        }
    }

    fn query(&mut self, node: usize, lo: usize, hi: usize, bounds: (usize, usize)) -> i64 {
        let (left, right) = bounds;
        if right < lo || hi < left {
            self.visit(node, SegmentPhase::Query, Some(bounds), "outside the range, contributes 0");
            return 0;
        }
        if left <= lo && hi <= right {
            self.visit(node, SegmentPhase::Query, Some(bounds), "fully inside the range");
            return self.sums[node];
        }
        self.visit(node, SegmentPhase::Query, Some(bounds), "partially overlaps, split");
        let mid = lo + (hi - lo) / 2;
        self.query(2 * node, lo, mid, bounds) + self.query(2 * node + 1, mid + 1, hi, bounds)
    }

    fn visit(
        &mut self,
        node: usize,
        phase: SegmentPhase,
        query: Option<(usize, usize)>,
        why: &str,
    ) {
        self.rec.count("node_visits");
        self.visited.push(node);
        let (lo, hi) = self.ranges[node].unwrap_or_default();
        self.record(
            format!("Visit node {node} [{lo}, {hi}]: {why}"),
            phase,
            query,
            None,
        );
    }

    fn record(
        &mut self,
        description: String,
        phase: SegmentPhase,
        query: Option<(usize, usize)>,
        result: Option<i64>,
    ) {
        let nodes = self
            .ranges
            .iter()
            .enumerate()
            .filter_map(|(id, r)| {
                r.map(|(lo, hi)| SegmentNode {
                    id,
                    lo,
                    hi,
                    sum: self.sums[id],
                })
            })
            .collect();
        let state = SegmentState {
            array: self.array.clone(),
            nodes,
            visited: self.visited.clone(),
            phase,
            query,
            result,
        };
        self.rec.record(description, state);
    }
}

/// Runs a [`RangeSumScript`] through a fresh [`SegmentTreeSession`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SegmentTreeExecutor;

impl Executor for SegmentTreeExecutor {
    type Input = RangeSumScript;
    type State = SegmentState;

    fn name(&self) -> &'static str {
        "segment-tree"
    }

    fn run(&self, input: &RangeSumScript) -> Trace<SegmentState> {
        if let Err(e) = input.validate() {
            return reject(&e, SegmentState::default());
        }
        let mut session = match SegmentTreeSession::new(&input.values) {
            Ok(s) => s,
            Err(e) => return reject(&e, SegmentState::default()),
        };
        for op in &input.ops {
            if let Err(e) = session.apply(*op) {
                return reject(&e, SegmentState::default());
            }
        }
        session.into_trace()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const DEMO: [i64; 6] = [1, 3, 5, 7, 9, 11];

    #[test]
    fn build_records_one_snapshot_per_node() {
        let s = SegmentTreeSession::new(&DEMO).unwrap();
        let t = s.trace();
        // 2n - 1 nodes for n leaves, plus the initial snapshot.
        assert_eq!(t.len(), 1 + 2 * DEMO.len() - 1);
        let root = t.final_state().nodes.iter().find(|n| n.id == 1).unwrap();
        assert_eq!((root.lo, root.hi, root.sum), (0, 5, 36));
        assert!(t[1].description.starts_with("Built node"));
    }

    #[test]
    fn range_queries_match_naive_sums() {
        let mut s = SegmentTreeSession::new(&DEMO).unwrap();
        for l in 0..DEMO.len() {
            for r in l..DEMO.len() {
                assert_eq!(s.range_sum(l, r).unwrap(), DEMO[l..=r].iter().sum::<i64>());
            }
        }
    }

    #[test]
    fn update_walks_root_to_leaf() {
        let mut s = SegmentTreeSession::new(&DEMO).unwrap();
        s.set(4, 0).unwrap();
        let t = s.trace();
        assert_eq!(t.final_state().visited, vec![1, 3, 6, 13]);
        assert_eq!(s.range_sum(0, 5).unwrap(), 27);
    }

    #[test]
    fn executor_treats_prefix_as_range_from_zero() {
        let trace = SegmentTreeExecutor.run(&RangeSumScript {
            values: DEMO.to_vec(),
            ops: vec![RangeSumOp::Prefix { index: 2 }],
        });
        assert_eq!(trace.final_state().result, Some(9));
        assert_eq!(trace.final_state().query, Some((0, 2)));
    }

    #[test]
    fn empty_array_is_rejected() {
        let trace = SegmentTreeExecutor.run(&RangeSumScript {
            values: Vec::new(),
            ops: Vec::new(),
        });
        assert_eq!(trace.len(), 1);
    }
}

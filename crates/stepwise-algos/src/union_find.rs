// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Disjoint-set forest with union by rank and path compression.
//!
//! Tie rule: when both roots have equal rank, the root of the first operand
//! becomes the parent and its rank grows by one.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::wide;

/// Largest element count accepted.
pub const MAX_ELEMENTS: usize = 20;
/// Longest operation script accepted.
pub const MAX_UNION_FIND_OPS: usize = 60;

const COUNTERS: &[&str] = &["operations", "finds", "unions", "compressions"];

/// What a union-find snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnionFindStep {
    /// Fresh singletons.
    #[default]
    Init,
    /// Followed one parent pointer.
    Follow,
    /// Reached the root.
    Root,
    /// Re-pointed a path at its root.
    Compress,
    /// Linked two roots.
    Union,
    /// Both operands already shared a root.
    SameSet,
}

/// Snapshot payload for union-find traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionFindState {
    /// `parents[i]` is the parent of element `i`; roots point at themselves.
    pub parents: Vec<usize>,
    /// Rank (upper bound on height) of each element.
    pub ranks: Vec<u32>,
    /// Elements highlighted by this step.
    pub highlighted: Vec<usize>,
    /// Current partition; each set sorted, sets ordered by smallest member.
    pub sets: Vec<Vec<usize>>,
    /// Kind of step.
    pub step: UnionFindStep,
}

/// A union-find operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnionFindOp {
    /// Merge the sets holding both elements.
    Union(usize, usize),
    /// Locate the root of an element.
    Find(usize),
    /// Check whether two elements share a set.
    Connected(usize, usize),
}

impl fmt::Display for UnionFindOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Union(a, b) => write!(f, "union {a} {b}"),
            Self::Find(a) => write!(f, "find {a}"),
            Self::Connected(a, b) => write!(f, "connected {a} {b}"),
        }
    }
}

impl FromStr for UnionFindOp {
    type Err = InputError;

    /// Accepts `union A B`, `find A` and `connected A B`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || InputError::Parse {
            input: s.to_owned(),
            reason: "expected `union A B`, `find A` or `connected A B`".to_owned(),
        };
        let parts: Vec<&str> = s.split_whitespace().collect();
        let num = |t: &str| t.parse::<usize>().map_err(|_| parse_err());
        match parts.as_slice() {
            ["union", a, b] => Ok(Self::Union(num(*a)?, num(*b)?)),
            ["find", a] => Ok(Self::Find(num(*a)?)),
            ["connected", a, b] => Ok(Self::Connected(num(*a)?, num(*b)?)),
            _ => Err(parse_err()),
        }
    }
}

impl UnionFindOp {
    fn operands(&self) -> Vec<usize> {
        match *self {
            Self::Union(a, b) | Self::Connected(a, b) => vec![a, b],
            Self::Find(a) => vec![a],
        }
    }
}

/// Live disjoint-set forest that records a snapshot per pointer move.
#[derive(Debug, Clone)]
pub struct UnionFindSession {
    parents: Vec<usize>,
    ranks: Vec<u32>,
    rec: TraceRecorder<UnionFindState>,
}

impl UnionFindSession {
    /// Creates `n` singleton sets `{0} … {n-1}`.
    ///
    /// # Errors
    /// [`InputError::OutOfRange`] unless `1 <= n <= MAX_ELEMENTS`.
    pub fn new(n: usize) -> Result<Self, InputError> {
        InputError::check_range(
            "element count",
            wide(n),
            1,
            wide(MAX_ELEMENTS),
        )?;
        let parents: Vec<usize> = (0..n).collect();
        let ranks = vec![0; n];
        let initial = UnionFindState {
            sets: partition(&parents),
            parents: parents.clone(),
            ranks: ranks.clone(),
            ..UnionFindState::default()
        };
        Ok(Self {
            parents,
            ranks,
            rec: TraceRecorder::with_counters(
                format!("Initialized {n} disjoint sets; each element is its own parent"),
                initial,
                COUNTERS,
            ),
        })
    }

    /// Returns the root of `x`, compressing the path behind it.
    ///
    /// # Errors
    /// [`InputError::OutOfRange`] for unknown elements.
    pub fn find(&mut self, x: usize) -> Result<usize, InputError> {
        self.check(x)?;
        self.rec.count("operations");
        Ok(self.find_root(x))
    }

    /// Merges the sets of `x` and `y`; returns `false` if already merged.
    ///
    /// # Errors
    /// [`InputError::OutOfRange`] for unknown elements.
    pub fn union(&mut self, x: usize, y: usize) -> Result<bool, InputError> {
        self.check(x)?;
        self.check(y)?;
        self.rec.count("operations");
        let rx = self.find_root(x);
        let ry = self.find_root(y);
        if rx == ry {
            self.record(
                format!("Elements {x} and {y} are already in the same set (root {rx})"),
                vec![x, y],
                UnionFindStep::SameSet,
            );
            return Ok(false);
        }
        let (parent, child) = if self.ranks[rx] < self.ranks[ry] {
            (ry, rx)
        } else {
            if self.ranks[rx] == self.ranks[ry] {
                self.ranks[rx] += 1;
            }
            (rx, ry)
        };
        self.parents[child] = parent;
        self.rec.count("unions");
        self.record(
            format!(
                "Union by rank: {parent} becomes parent of {child}; rank of {parent} is {}",
                self.ranks[parent]
            ),
            vec![x, y, parent, child],
            UnionFindStep::Union,
        );
        Ok(true)
    }

    /// Returns whether `x` and `y` share a root.
    ///
    /// # Errors
    /// [`InputError::OutOfRange`] for unknown elements.
    pub fn connected(&mut self, x: usize, y: usize) -> Result<bool, InputError> {
        self.check(x)?;
        self.check(y)?;
        self.rec.count("operations");
        let same = self.find_root(x) == self.find_root(y);
        let verdict = if same { "are" } else { "are not" };
        self.record(
            format!("{x} and {y} {verdict} in the same set"),
            vec![x, y],
            if same {
                UnionFindStep::SameSet
            } else {
                UnionFindStep::Root
            },
        );
        Ok(same)
    }

    /// Applies one scripted operation.
    ///
    /// # Errors
    /// As the underlying operation.
    pub fn apply(&mut self, op: UnionFindOp) -> Result<(), InputError> {
        match op {
            UnionFindOp::Union(a, b) => self.union(a, b).map(|_| ()),
            UnionFindOp::Find(a) => self.find(a).map(|_| ()),
            UnionFindOp::Connected(a, b) => self.connected(a, b).map(|_| ()),
        }
    }

    /// Current partition, canonical order.
    pub fn sets(&self) -> Vec<Vec<usize>> {
        partition(&self.parents)
    }

    /// Publishes the steps recorded so far.
    pub fn trace(&self) -> Trace<UnionFindState> {
        self.rec.snapshot_trace()
    }

    /// Ends the session and returns its full trace.
    pub fn into_trace(self) -> Trace<UnionFindState> {
        self.rec.finish()
    }

    fn check(&self, x: usize) -> Result<(), InputError> {
        InputError::check_range("element", wide(x), 0, wide(self.parents.len()) - 1)
    }

    fn find_root(&mut self, x: usize) -> usize {
        self.rec.count("finds");
        let mut path = vec![x];
        let mut cur = x;
        while self.parents[cur] != cur {
            let next = self.parents[cur];
            self.record(
                format!("Following parent pointer from {cur} to {next}"),
                vec![next],
                UnionFindStep::Follow,
            );
            cur = next;
            path.push(cur);
        }
        let root = cur;
        self.record(format!("Root of {x} is {root}"), vec![root], UnionFindStep::Root);
        let moved: Vec<usize> = path
            .iter()
            .copied()
            .filter(|&n| n != root && self.parents[n] != root)
            .collect();
        if !moved.is_empty() {
            for &n in &moved {
                self.parents[n] = root;
            }
            self.rec.count_by("compressions", u64::try_from(moved.len()).unwrap_or(u64::MAX));
            self.record(
                format!("Path compression: {moved:?} now point directly to root {root}"),
                moved,
                UnionFindStep::Compress,
            );
        }
        root
    }

    fn record(&mut self, description: String, highlighted: Vec<usize>, step: UnionFindStep) {
        let state = UnionFindState {
            parents: self.parents.clone(),
            ranks: self.ranks.clone(),
            highlighted,
            sets: partition(&self.parents),
            step,
        };
        self.rec.record(description, state);
    }
}

/// Groups elements by root without mutating the forest.
fn partition(parents: &[usize]) -> Vec<Vec<usize>> {
    let root_of = |mut x: usize| {
        while parents[x] != x {
            x = parents[x];
        }
        x
    };
    let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for x in 0..parents.len() {
        by_root.entry(root_of(x)).or_default().push(x);
    }
    let mut sets: Vec<Vec<usize>> = by_root.into_values().collect();
    sets.sort_by_key(|s| s.first().copied());
    sets
}

/// Batch input for [`UnionFindExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionFindScript {
    /// Number of elements, labelled `0..size`.
    pub size: usize,
    /// Operations to apply in order.
    pub ops: Vec<UnionFindOp>,
}

/// Runs a [`UnionFindScript`] through a fresh [`UnionFindSession`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UnionFindExecutor;

impl Executor for UnionFindExecutor {
    type Input = UnionFindScript;
    type State = UnionFindState;

    fn name(&self) -> &'static str {
        "union-find"
    }

    fn run(&self, input: &UnionFindScript) -> Trace<UnionFindState> {
        if input.ops.len() > MAX_UNION_FIND_OPS {
            return reject(
                &InputError::TooMany {
                    what: "operation script",
                    max: MAX_UNION_FIND_OPS,
                    actual: input.ops.len(),
                },
                UnionFindState::default(),
            );
        }
        let mut session = match UnionFindSession::new(input.size) {
            Ok(s) => s,
            Err(e) => return reject(&e, UnionFindState::default()),
        };
        let bad = input
            .ops
            .iter()
            .flat_map(UnionFindOp::operands)
            .find_map(|x| session.check(x).err());
        if let Some(e) = bad {
            return reject(&e, UnionFindState::default());
        }
        for op in &input.ops {
            if let Err(e) = session.apply(*op) {
                return reject(&e, UnionFindState::default());
            }
        }
        session.into_trace()
    }
}

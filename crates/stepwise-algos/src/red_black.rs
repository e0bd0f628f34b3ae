// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Red-black tree insert and search on an index arena.
//!
//! Nodes live in a `Vec` and refer to each other by index; snapshots copy
//! the arena into [`RbNodeView`]s so no snapshot shares a node with another.
//! Insert follows the textbook fixup: red uncle recolors and moves up, black
//! uncle rotates (inner case first straightens with one extra rotation).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Most keys a tree may hold.
pub const MAX_RB_NODES: usize = 31;
/// Longest operation script accepted.
pub const MAX_RB_OPS: usize = 50;
/// Keys are limited to `-MAX_RB_KEY..=MAX_RB_KEY`.
pub const MAX_RB_KEY: i64 = 999;

const COUNTERS: &[&str] = &["operations", "comparisons", "rotations", "recolors"];

/// Node color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// Red.
    Red,
    /// Black.
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "RED",
            Self::Black => "BLACK",
        })
    }
}

/// One tree node, flattened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbNodeView {
    /// Arena id (insertion order).
    pub id: usize,
    /// Key.
    pub key: i64,
    /// Color.
    pub color: Color,
    /// Left child id.
    pub left: Option<usize>,
    /// Right child id.
    pub right: Option<usize>,
    /// Parent id; `None` for the root.
    pub parent: Option<usize>,
}

/// What a red-black snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RbStep {
    /// Empty tree.
    #[default]
    Init,
    /// Placed a key or refused a duplicate.
    Insert,
    /// Compared against a node while searching.
    Search,
    /// Rotation.
    Rotate,
    /// Color change.
    Recolor,
    /// Search finished.
    Result,
}

/// Snapshot payload for red-black traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbState {
    /// All nodes ordered by id.
    pub nodes: Vec<RbNodeView>,
    /// Root id.
    pub root: Option<usize>,
    /// Node ids highlighted by this step.
    pub highlighted: Vec<usize>,
    /// Key the current operation is about.
    pub target: Option<i64>,
    /// Kind of step.
    pub step: RbStep,
    /// Answer of a finished search.
    pub found: Option<bool>,
    /// Whether the red-black properties hold in this snapshot.
    pub valid: bool,
}

impl RbState {
    /// Keys in sorted (in-order) order.
    pub fn in_order(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut cur = self.root;
        while cur.is_some() || !stack.is_empty() {
            while let Some(id) = cur {
                stack.push(id);
                cur = self.nodes[id].left;
            }
            if let Some(id) = stack.pop() {
                out.push(self.nodes[id].key);
                cur = self.nodes[id].right;
            }
        }
        out
    }
}

/// A red-black tree operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RbOp {
    /// Insert a key (duplicates are reported and ignored).
    Insert(i64),
    /// Look a key up.
    Search(i64),
}

impl RbOp {
    fn key(&self) -> i64 {
        match *self {
            Self::Insert(k) | Self::Search(k) => k,
        }
    }
}

impl fmt::Display for RbOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert(k) => write!(f, "insert {k}"),
            Self::Search(k) => write!(f, "search {k}"),
        }
    }
}

impl FromStr for RbOp {
    type Err = InputError;

    /// Accepts `insert K` and `search K`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = || InputError::Parse {
            input: s.to_owned(),
            reason: "expected `insert K` or `search K` with an integer key".to_owned(),
        };
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            ["insert", k] => k.parse().map(Self::Insert).map_err(|_| parse_err()),
            ["search", k] => k.parse().map(Self::Search).map_err(|_| parse_err()),
            _ => Err(parse_err()),
        }
    }
}

fn check_key(key: i64) -> Result<(), InputError> {
    InputError::check_range("key", key, -MAX_RB_KEY, MAX_RB_KEY)
}

#[derive(Clone, Copy, Debug)]
struct Node {
    key: i64,
    color: Color,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Live red-black tree that records a snapshot per comparison, rotation and
/// recolor.
#[derive(Debug, Clone)]
pub struct RedBlackSession {
    nodes: Vec<Node>,
    root: Option<usize>,
    target: Option<i64>,
    rec: TraceRecorder<RbState>,
}

impl Default for RedBlackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RedBlackSession {
    /// Starts with an empty tree.
    pub fn new() -> Self {
        let initial = RbState {
            valid: true,
            ..RbState::default()
        };
        Self {
            nodes: Vec::new(),
            root: None,
            target: None,
            rec: TraceRecorder::with_counters("Empty red-black tree", initial, COUNTERS),
        }
    }

    /// Inserts `key`; returns `false` if it was already present.
    ///
    /// # Errors
    /// Out-of-range keys, or a full tree.
    pub fn insert(&mut self, key: i64) -> Result<bool, InputError> {
        check_key(key)?;
        if self.nodes.len() >= MAX_RB_NODES {
            return Err(InputError::TooMany {
                what: "red-black tree",
                max: MAX_RB_NODES,
                actual: self.nodes.len() + 1,
            });
        }
        self.rec.count("operations");
        self.target = Some(key);

        let mut parent = None;
        let mut cur = self.root;
        while let Some(id) = cur {
            self.rec.count("comparisons");
            parent = Some(id);
            let here = self.nodes[id].key;
            if key == here {
                self.record(format!("Value {key} already exists"), vec![id], RbStep::Insert, None);
                return Ok(false);
            }
            cur = if key < here {
                self.nodes[id].left
            } else {
                self.nodes[id].right
            };
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            key,
            color: Color::Red,
            left: None,
            right: None,
            parent,
        });
        match parent {
            None => {
                self.root = Some(id);
                self.nodes[id].color = Color::Black;
                self.record(
                    format!("Inserted {key} as root (colored BLACK)"),
                    vec![id],
                    RbStep::Insert,
                    None,
                );
                return Ok(true);
            }
            Some(p) if key < self.nodes[p].key => self.nodes[p].left = Some(id),
            Some(p) => self.nodes[p].right = Some(id),
        }
        self.record(format!("Inserted {key} as RED node"), vec![id], RbStep::Insert, None);
        self.insert_fixup(id);
        Ok(true)
    }

    /// Searches for `key`, recording each node compared.
    ///
    /// # Errors
    /// Out-of-range keys.
    pub fn search(&mut self, key: i64) -> Result<bool, InputError> {
        check_key(key)?;
        self.rec.count("operations");
        self.target = Some(key);
        let mut path = Vec::new();
        let mut cur = self.root;
        while let Some(id) = cur {
            self.rec.count("comparisons");
            path.push(id);
            let here = self.nodes[id].key;
            if key == here {
                self.record(format!("Found {key} in the tree"), path, RbStep::Result, Some(true));
                return Ok(true);
            }
            let (side, next) = if key < here {
                ("left", self.nodes[id].left)
            } else {
                ("right", self.nodes[id].right)
            };
            self.record(
                format!("Searching {side} subtree from {here}"),
                path.clone(),
                RbStep::Search,
                None,
            );
            cur = next;
        }
        self.record(
            format!("Value {key} not found in tree"),
            path,
            RbStep::Result,
            Some(false),
        );
        Ok(false)
    }

    /// Applies one scripted operation.
    ///
    /// # Errors
    /// As the underlying operation.
    pub fn apply(&mut self, op: RbOp) -> Result<(), InputError> {
        match op {
            RbOp::Insert(k) => self.insert(k).map(|_| ()),
            RbOp::Search(k) => self.search(k).map(|_| ()),
        }
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Publishes the steps recorded so far.
    pub fn trace(&self) -> Trace<RbState> {
        self.rec.snapshot_trace()
    }

    /// Ends the session and returns its full trace.
    pub fn into_trace(self) -> Trace<RbState> {
        self.rec.finish()
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while let Some(p) = self.nodes[z].parent.filter(|&p| self.is_red(Some(p))) {
            // A red parent is never the root, so the grandparent exists.
            let Some(g) = self.nodes[p].parent else { break };
            let parent_side = if self.nodes[g].left == Some(p) {
                Side::Left
            } else {
                Side::Right
            };
            let uncle = match parent_side {
                Side::Left => self.nodes[g].right,
                Side::Right => self.nodes[g].left,
            };
            if let Some(u) = uncle.filter(|&u| self.is_red(Some(u))) {
                self.paint(p, Color::Black);
                self.paint(u, Color::Black);
                self.paint(g, Color::Red);
                self.record(
                    "Recolored parent and uncle BLACK, grandparent RED".to_owned(),
                    vec![p, u, g],
                    RbStep::Recolor,
                    None,
                );
                z = g;
                continue;
            }
            let inner = match parent_side {
                Side::Left => self.nodes[p].right == Some(z),
                Side::Right => self.nodes[p].left == Some(z),
            };
            let mut parent = p;
            if inner {
                z = p;
                match parent_side {
                    Side::Left => self.rotate_left(z),
                    Side::Right => self.rotate_right(z),
                }
                parent = self.nodes[z].parent.unwrap_or(z);
            }
            self.paint(parent, Color::Black);
            self.paint(g, Color::Red);
            self.record(
                "Recolored parent BLACK, grandparent RED".to_owned(),
                vec![parent, g],
                RbStep::Recolor,
                None,
            );
            match parent_side {
                Side::Left => self.rotate_right(g),
                Side::Right => self.rotate_left(g),
            }
        }
        if let Some(r) = self.root {
            if self.nodes[r].color == Color::Red {
                self.paint(r, Color::Black);
                self.record("Ensured root is BLACK".to_owned(), vec![r], RbStep::Recolor, None);
            }
        }
    }

    fn is_red(&self, id: Option<usize>) -> bool {
        id.is_some_and(|i| self.nodes[i].color == Color::Red)
    }

    fn paint(&mut self, id: usize, color: Color) {
        if self.nodes[id].color != color {
            self.nodes[id].color = color;
            self.rec.count("recolors");
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let Some(y) = self.nodes[x].right else { return };
        let beta = self.nodes[y].left;
        self.nodes[x].right = beta;
        if let Some(b) = beta {
            self.nodes[b].parent = Some(x);
        }
        self.replace_child(x, y);
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
        self.rec.count("rotations");
        let key = self.nodes[x].key;
        self.record(format!("Left rotation around node {key}"), vec![x, y], RbStep::Rotate, None);
    }

    fn rotate_right(&mut self, x: usize) {
        let Some(y) = self.nodes[x].left else { return };
        let beta = self.nodes[y].right;
        self.nodes[x].left = beta;
        if let Some(b) = beta {
            self.nodes[b].parent = Some(x);
        }
        self.replace_child(x, y);
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
        self.rec.count("rotations");
        let key = self.nodes[x].key;
        self.record(format!("Right rotation around node {key}"), vec![x, y], RbStep::Rotate, None);
    }

    /// Puts `new` where `old` hangs from its parent (or at the root).
    fn replace_child(&mut self, old: usize, new: usize) {
        let parent = self.nodes[old].parent;
        self.nodes[new].parent = parent;
        match parent {
            None => self.root = Some(new),
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = Some(new),
            Some(p) => self.nodes[p].right = Some(new),
        }
    }

    fn is_valid(&self) -> bool {
        if self.is_red(self.root) {
            return false;
        }
        self.black_height(self.root).is_some()
    }

    /// Black height of a subtree, or `None` on a red-red edge or an
    /// unbalanced black count.
    fn black_height(&self, id: Option<usize>) -> Option<usize> {
        let Some(i) = id else { return Some(1) };
        let node = self.nodes[i];
        if node.color == Color::Red && (self.is_red(node.left) || self.is_red(node.right)) {
            return None;
        }
        let l = self.black_height(node.left)?;
        let r = self.black_height(node.right)?;
        (l == r).then_some(l + usize::from(node.color == Color::Black))
    }

    fn record(&mut self, description: String, highlighted: Vec<usize>, step: RbStep, found: Option<bool>) {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(id, n)| RbNodeView {
                id,
                key: n.key,
                color: n.color,
                left: n.left,
                right: n.right,
                parent: n.parent,
            })
            .collect();
        let state = RbState {
            nodes,
            root: self.root,
            highlighted,
            target: self.target,
            step,
            found,
            valid: self.is_valid(),
        };
        self.rec.record(description, state);
    }
}

/// Batch input for [`RedBlackExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedBlackScript {
    /// Operations to apply in order.
    pub ops: Vec<RbOp>,
}

impl RedBlackScript {
    /// Inserts every key in order.
    pub fn inserts(keys: &[i64]) -> Self {
        Self {
            ops: keys.iter().copied().map(RbOp::Insert).collect(),
        }
    }
}

/// Runs a [`RedBlackScript`] through a fresh [`RedBlackSession`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RedBlackExecutor;

impl Executor for RedBlackExecutor {
    type Input = RedBlackScript;
    type State = RbState;

    fn name(&self) -> &'static str {
        "red-black-tree"
    }

    fn run(&self, input: &RedBlackScript) -> Trace<RbState> {
        let inserts = input.ops.iter().filter(|op| matches!(op, RbOp::Insert(_))).count();
        let checked = InputError::check_len("operation script", input.ops.len(), MAX_RB_OPS)
            .and_then(|()| input.ops.iter().try_for_each(|op| check_key(op.key())))
            .and_then(|()| {
                if inserts > MAX_RB_NODES {
                    Err(InputError::TooMany {
                        what: "red-black tree",
                        max: MAX_RB_NODES,
                        actual: inserts,
                    })
                } else {
                    Ok(())
                }
            });
        if let Err(e) = checked {
            return reject(&e, RbState::default());
        }
        let mut session = RedBlackSession::new();
        for op in &input.ops {
            if let Err(e) = session.apply(*op) {
                return reject(&e, RbState::default());
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
    fn ascending_inserts_stay_balanced() {
        let mut t = RedBlackSession::new();
        for k in 1..=10 {
            assert!(t.insert(k).unwrap());
        }
        let trace = t.trace();
        let state = trace.final_state();
        assert!(state.valid);
        assert_eq!(state.in_order(), (1..=10).collect::<Vec<_>>());
        assert!(trace.last().metrics.get("rotations") > 0);
    }

    #[test]
    fn third_ascending_insert_rotates_left_at_root() {
        let mut t = RedBlackSession::new();
        for k in [10, 20, 30] {
            t.insert(k).unwrap();
        }
        let trace = t.trace();
        let state = trace.final_state();
        let root = state.root.unwrap();
        assert_eq!(state.nodes[root].key, 20);
        assert_eq!(state.nodes[root].color, Color::Black);
        assert!(trace.descriptions().any(|d| d == "Left rotation around node 10"));
    }

    #[test]
    fn inner_case_uses_two_rotations() {
        let mut t = RedBlackSession::new();
        for k in [30, 10, 20] {
            t.insert(k).unwrap();
        }
        let trace = t.trace();
        assert_eq!(trace.last().metrics.get("rotations"), 2);
        let state = trace.final_state();
        assert_eq!(state.nodes[state.root.unwrap()].key, 20);
    }

    #[test]
    fn red_uncle_recolors_without_rotation() {
        let mut t = RedBlackSession::new();
        for k in [20, 10, 30, 5] {
            t.insert(k).unwrap();
        }
        let trace = t.trace();
        assert_eq!(trace.last().metrics.get("rotations"), 0);
        assert!(trace
            .descriptions()
            .any(|d| d == "Recolored parent and uncle BLACK, grandparent RED"));
        assert!(trace.final_state().valid);
    }

    #[test]
    fn duplicates_and_search() {
        let mut t = RedBlackSession::new();
        t.insert(4).unwrap();
        assert!(!t.insert(4).unwrap());
        assert_eq!(t.len(), 1);
        assert!(t.search(4).unwrap());
        assert!(!t.search(7).unwrap());
        assert_eq!(t.trace().final_state().found, Some(false));
    }

    #[test]
    fn executor_rejects_out_of_range_keys() {
        let trace = RedBlackExecutor.run(&RedBlackScript::inserts(&[1, 5000]));
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].description, "key 5000 is out of range [-999, 999]");
    }
}

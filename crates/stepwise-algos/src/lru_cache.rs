// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Least-recently-used cache over a sentinel-bounded doubly linked list.
//!
//! The list lives in an index arena (slots 0 and 1 are the head and tail
//! sentinels) and a hash map points keys at their slots, giving O(1) `get`
//! and `put`. Snapshots carry the flattened list, most recent first.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::wide;

/// Largest capacity accepted.
pub const MAX_CAPACITY: usize = 16;
/// Longest operation script accepted by [`LruCacheExecutor`].
pub const MAX_OPS: usize = 100;

const COUNTERS: &[&str] = &["operations", "hits", "misses", "evictions"];

/// One cached key/value pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LruEntry {
    /// Cache key.
    pub key: String,
    /// Stored value.
    pub value: i64,
}

/// What the step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LruOutcome {
    /// `get` found the key.
    Hit,
    /// `get` did not find the key.
    Miss,
    /// `put` added a new key.
    Inserted,
    /// `put` overwrote an existing key.
    Updated,
    /// The least recently used entry was dropped to make room.
    Evicted,
}

/// Snapshot payload for LRU traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LruState {
    /// Maximum number of entries.
    pub capacity: usize,
    /// Entries ordered from most to least recently used.
    pub entries: Vec<LruEntry>,
    /// Key touched by this step.
    pub touched: Option<String>,
    /// Entry dropped by the operation in progress, if any.
    pub evicted: Option<LruEntry>,
    /// Kind of step.
    pub outcome: Option<LruOutcome>,
}

impl LruState {
    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.key.as_str())
    }
}

/// A cache operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LruOp {
    /// Look up a key.
    Get(String),
    /// Insert or overwrite a key.
    Put(String, i64),
}

impl fmt::Display for LruOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get(k) => write!(f, "get({k})"),
            Self::Put(k, v) => write!(f, "put({k},{v})"),
        }
    }
}

impl FromStr for LruOp {
    type Err = InputError;

    /// Accepts `get A`, `put A 1`, `get(A)` and `put(A,1)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace(['(', ')', ','], " ");
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        let parse_err = |reason: &str| InputError::Parse {
            input: s.to_owned(),
            reason: reason.to_owned(),
        };
        match parts.as_slice() {
            [op, key] if op.eq_ignore_ascii_case("get") => Ok(Self::Get((*key).to_owned())),
            [op, key, value] if op.eq_ignore_ascii_case("put") => {
                let value = value
                    .parse()
                    .map_err(|_| parse_err("value is not an integer"))?;
                Ok(Self::Put((*key).to_owned(), value))
            }
            _ => Err(parse_err("expected `get KEY` or `put KEY VALUE`")),
        }
    }
}

const HEAD: usize = 0;
const TAIL: usize = 1;

#[derive(Debug, Clone)]
struct Node {
    key: String,
    value: i64,
    prev: usize,
    next: usize,
}

#[derive(Debug, Clone)]
struct LruList {
    nodes: Vec<Node>,
    free: Vec<usize>,
    slots: FxHashMap<String, usize>,
}

impl LruList {
    fn new() -> Self {
        let sentinel = |prev, next| Node {
            key: String::new(),
            value: 0,
            prev,
            next,
        };
        Self {
            nodes: vec![sentinel(HEAD, TAIL), sentinel(HEAD, TAIL)],
            free: Vec::new(),
            slots: FxHashMap::default(),
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn unlink(&mut self, i: usize) {
        let (prev, next) = (self.nodes[i].prev, self.nodes[i].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn push_front(&mut self, i: usize) {
        let first = self.nodes[HEAD].next;
        self.nodes[i].prev = HEAD;
        self.nodes[i].next = first;
        self.nodes[first].prev = i;
        self.nodes[HEAD].next = i;
    }

    fn touch(&mut self, key: &str) -> Option<usize> {
        let i = *self.slots.get(key)?;
        self.unlink(i);
        self.push_front(i);
        Some(i)
    }

    fn insert_front(&mut self, key: String, value: i64) {
        let node = Node {
            key: key.clone(),
            value,
            prev: HEAD,
            next: TAIL,
        };
        let i = if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        };
        self.push_front(i);
        self.slots.insert(key, i);
    }

    fn pop_back(&mut self) -> Option<LruEntry> {
        let i = self.nodes[TAIL].prev;
        if i == HEAD {
            return None;
        }
        self.unlink(i);
        self.free.push(i);
        let node = &mut self.nodes[i];
        self.slots.remove(&node.key);
        Some(LruEntry {
            key: std::mem::take(&mut node.key),
            value: node.value,
        })
    }

    fn entries(&self) -> Vec<LruEntry> {
        let mut out = Vec::with_capacity(self.len());
        let mut i = self.nodes[HEAD].next;
        while i != TAIL {
            let node = &self.nodes[i];
            out.push(LruEntry {
                key: node.key.clone(),
                value: node.value,
            });
            i = node.next;
        }
        out
    }
}

/// Long-lived LRU cache that records a snapshot per step.
///
/// Each call appends to the session's recording; [`trace`](Self::trace)
/// publishes everything recorded so far without replaying earlier calls.
#[derive(Debug, Clone)]
pub struct LruSession {
    capacity: usize,
    list: LruList,
    rec: TraceRecorder<LruState>,
}

impl LruSession {
    /// Opens an empty cache.
    ///
    /// # Errors
    /// [`InputError::OutOfRange`] unless `1 <= capacity <= MAX_CAPACITY`.
    pub fn new(capacity: usize) -> Result<Self, InputError> {
        InputError::check_range(
            "capacity",
            wide(capacity),
            1,
            wide(MAX_CAPACITY),
        )?;
        let initial = LruState {
            capacity,
            ..LruState::default()
        };
        Ok(Self {
            capacity,
            list: LruList::new(),
            rec: TraceRecorder::with_counters(
                format!("Empty cache with capacity {capacity}"),
                initial,
                COUNTERS,
            ),
        })
    }

    /// Looks up `key`, promoting it to most recently used on a hit.
    pub fn get(&mut self, key: &str) -> Option<i64> {
        self.rec.count("operations");
        if let Some(i) = self.list.touch(key) {
            let value = self.list.nodes[i].value;
            self.rec.count("hits");
            self.record(
                format!("Cache hit: {key} = {value}, moved to front"),
                key,
                None,
                LruOutcome::Hit,
            );
            Some(value)
        } else {
            self.rec.count("misses");
            self.record(
                format!("Cache miss: {key} not found"),
                key,
                None,
                LruOutcome::Miss,
            );
            None
        }
    }

    /// Inserts or overwrites `key`; evicts the least recently used entry
    /// first when a new key arrives at a full cache.
    pub fn put(&mut self, key: &str, value: i64) {
        self.rec.count("operations");
        if let Some(i) = self.list.touch(key) {
            self.list.nodes[i].value = value;
            self.record(
                format!("Updated {key} = {value}, moved to front"),
                key,
                None,
                LruOutcome::Updated,
            );
            return;
        }
        let mut evicted = None;
        if self.list.len() >= self.capacity {
            if let Some(old) = self.list.pop_back() {
                self.rec.count("evictions");
                self.record(
                    format!("Cache full: evicted least recently used {}", old.key),
                    &old.key,
                    Some(old.clone()),
                    LruOutcome::Evicted,
                );
                evicted = Some(old);
            }
        }
        self.list.insert_front(key.to_owned(), value);
        self.record(
            format!("Added {key} = {value} at front"),
            key,
            evicted,
            LruOutcome::Inserted,
        );
    }

    /// Applies one scripted operation.
    pub fn apply(&mut self, op: &LruOp) {
        match op {
            LruOp::Get(k) => {
                let _ = self.get(k);
            }
            LruOp::Put(k, v) => self.put(k, *v),
        }
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.list.entries().into_iter().map(|e| e.key).collect()
    }

    /// Publishes the steps recorded so far.
    pub fn trace(&self) -> Trace<LruState> {
        self.rec.snapshot_trace()
    }

    /// Ends the session and returns its full trace.
    pub fn into_trace(self) -> Trace<LruState> {
        self.rec.finish()
    }

    fn record(
        &mut self,
        description: String,
        touched: &str,
        evicted: Option<LruEntry>,
        outcome: LruOutcome,
    ) {
        let state = LruState {
            capacity: self.capacity,
            entries: self.list.entries(),
            touched: Some(touched.to_owned()),
            evicted,
            outcome: Some(outcome),
        };
        self.rec.record(description, state);
    }
}

/// Batch input for [`LruCacheExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LruScript {
    /// Cache capacity.
    pub capacity: usize,
    /// Operations to apply in order.
    pub ops: Vec<LruOp>,
}

/// Runs an [`LruScript`] through a fresh [`LruSession`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LruCacheExecutor;

impl Executor for LruCacheExecutor {
    type Input = LruScript;
    type State = LruState;

    fn name(&self) -> &'static str {
        "lru-cache"
    }

    fn run(&self, input: &LruScript) -> Trace<LruState> {
        let neutral = LruState {
            capacity: input.capacity,
            ..LruState::default()
        };
        if input.ops.len() > MAX_OPS {
            return reject(
                &InputError::TooMany {
                    what: "operation script",
                    max: MAX_OPS,
                    actual: input.ops.len(),
                },
                neutral,
            );
        }
        let empty_key = input.ops.iter().any(|op| match op {
            LruOp::Get(k) | LruOp::Put(k, _) => k.is_empty(),
        });
        if empty_key {
            return reject(&InputError::Empty { what: "key" }, neutral);
        }
        let mut session = match LruSession::new(input.capacity) {
            Ok(s) => s,
            Err(e) => return reject(&e, neutral),
        };
        for op in &input.ops {
            session.apply(op);
        }
        session.into_trace()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn put(k: &str, v: i64) -> LruOp {
        LruOp::Put(k.to_owned(), v)
    }

    #[test]
    fn third_put_evicts_first_key() {
        let script = LruScript {
            capacity: 2,
            ops: vec![put("A", 1), put("B", 2), put("C", 3)],
        };
        let trace = LruCacheExecutor.run(&script);
        let snap = trace
            .iter()
            .find(|s| {
                s.state.evicted.as_ref().is_some_and(|e| e.key == "A")
                    && s.state.keys().collect::<Vec<_>>() == ["C", "B"]
            })
            .expect("snapshot with A evicted and {B, C} cached");
        assert_eq!(snap.metrics.get("evictions"), 1);
        assert_eq!(trace.last().metrics.get("operations"), 3);
    }

    #[test]
    fn hit_promotes_key_so_other_is_evicted() {
        let mut s = LruSession::new(2).unwrap();
        s.put("A", 1);
        s.put("B", 2);
        assert_eq!(s.get("A"), Some(1));
        s.put("C", 3);
        assert_eq!(s.keys(), vec!["C", "A"]);
        assert_eq!(s.get("B"), None);
        let t = s.trace();
        assert_eq!(t.last().state.outcome, Some(LruOutcome::Miss));
        assert_eq!(t.last().metrics.get("hits"), 1);
        assert_eq!(t.last().metrics.get("misses"), 1);
    }

    #[test]
    fn update_does_not_evict() {
        let mut s = LruSession::new(1).unwrap();
        s.put("A", 1);
        s.put("A", 9);
        assert_eq!(s.get("A"), Some(9));
        assert_eq!(s.trace().last().metrics.get("evictions"), 0);
    }

    #[test]
    fn session_trace_grows_without_replay() {
        let mut s = LruSession::new(2).unwrap();
        s.put("A", 1);
        let first = s.trace();
        s.put("B", 2);
        let second = s.trace();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
        assert_eq!(first[1], second[1]);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let trace = LruCacheExecutor.run(&LruScript {
            capacity: 0,
            ops: vec![put("A", 1)],
        });
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].description, "capacity 0 is out of range [1, 16]");
    }

    #[test]
    fn ops_parse_in_both_spellings() {
        assert_eq!("put(A,1)".parse::<LruOp>().unwrap(), put("A", 1));
        assert_eq!("get B".parse::<LruOp>().unwrap(), LruOp::Get("B".into()));
        assert!("put A x".parse::<LruOp>().is_err());
        assert!("peek A".parse::<LruOp>().is_err());
    }
}

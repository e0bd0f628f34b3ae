// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Prefix tree over lowercase ASCII words.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Longest word accepted.
pub const MAX_WORD_LEN: usize = 20;
/// Longest operation script accepted.
pub const MAX_TRIE_OPS: usize = 50;

const COUNTERS: &[&str] = &["operations", "node_visits", "nodes_created"];
const ROOT: usize = 0;

/// One trie node, flattened. Node `0` is the root and has no character.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieNodeView {
    /// Arena id (creation order).
    pub id: usize,
    /// Parent id; `None` for the root.
    pub parent: Option<usize>,
    /// Edge label from the parent.
    pub ch: Option<char>,
    /// Whether a word ends here.
    pub is_end: bool,
    /// Distance from the root.
    pub depth: usize,
}

/// What a trie snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrieStepKind {
    /// Start of an operation.
    #[default]
    Begin,
    /// Followed an existing edge.
    Visit,
    /// Created a node.
    Create,
    /// Marked a word end.
    MarkEnd,
    /// A character had no edge.
    Missing,
    /// Operation result.
    Result,
}

/// Snapshot payload for trie traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieState {
    /// All nodes ordered by id.
    pub nodes: Vec<TrieNodeView>,
    /// Node ids on the current path, root first.
    pub path: Vec<usize>,
    /// Word or prefix being processed.
    pub word: String,
    /// Kind of step.
    pub kind: TrieStepKind,
    /// Answer of a finished search.
    pub found: Option<bool>,
}

/// A trie operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrieOp {
    /// Add a word.
    Insert(String),
    /// Exact-word lookup.
    Search(String),
    /// Prefix lookup.
    StartsWith(String),
}

impl fmt::Display for TrieOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert(w) => write!(f, "insert {w}"),
            Self::Search(w) => write!(f, "search {w}"),
            Self::StartsWith(w) => write!(f, "prefix {w}"),
        }
    }
}

impl FromStr for TrieOp {
    type Err = InputError;

    /// Accepts `insert W`, `search W` and `prefix P`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let op = parts.next().unwrap_or_default();
        let arg = parts.next().unwrap_or_default().to_owned();
        if arg.is_empty() || parts.next().is_some() {
            return Err(InputError::Parse {
                input: s.to_owned(),
                reason: "expected `insert W`, `search W` or `prefix P`".to_owned(),
            });
        }
        match op {
            "insert" => Ok(Self::Insert(arg)),
            "search" => Ok(Self::Search(arg)),
            "prefix" | "starts-with" => Ok(Self::StartsWith(arg)),
            _ => Err(InputError::Parse {
                input: s.to_owned(),
                reason: format!("unknown trie operation `{op}`"),
            }),
        }
    }
}

impl TrieOp {
    fn word(&self) -> &str {
        match self {
            Self::Insert(w) | Self::Search(w) | Self::StartsWith(w) => w,
        }
    }
}

fn validate_word(word: &str) -> Result<(), InputError> {
    InputError::check_len("word", word.len(), MAX_WORD_LEN)?;
    if !word.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(InputError::Invalid(format!(
            "\"{word}\" must contain only lowercase letters a-z"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    ch: Option<char>,
    children: BTreeMap<char, usize>,
    is_end: bool,
    depth: usize,
}

/// Live trie that records a snapshot per character processed.
#[derive(Debug, Clone)]
pub struct TrieSession {
    nodes: Vec<Node>,
    rec: TraceRecorder<TrieState>,
}

impl Default for TrieSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieSession {
    /// Opens a trie holding only the root.
    pub fn new() -> Self {
        let nodes = vec![Node {
            parent: None,
            ch: None,
            children: BTreeMap::new(),
            is_end: false,
            depth: 0,
        }];
        let initial = TrieState {
            nodes: flatten(&nodes),
            path: vec![ROOT],
            ..TrieState::default()
        };
        Self {
            nodes,
            rec: TraceRecorder::with_counters("Empty trie (root only)", initial, COUNTERS),
        }
    }

    /// Inserts `word`, creating nodes for missing characters.
    ///
    /// # Errors
    /// Empty, overlong or non-lowercase words.
    pub fn insert(&mut self, word: &str) -> Result<(), InputError> {
        validate_word(word)?;
        self.rec.count("operations");
        let mut path = vec![ROOT];
        self.record(format!("Inserting word \"{word}\""), &path, word, TrieStepKind::Begin, None);
        let mut cur = ROOT;
        for (level, ch) in word.chars().enumerate() {
            self.rec.count("node_visits");
            if let Some(&next) = self.nodes[cur].children.get(&ch) {
                cur = next;
                path.push(cur);
                self.record(
                    format!("Found existing node for '{ch}' at level {}", level + 1),
                    &path,
                    word,
                    TrieStepKind::Visit,
                    None,
                );
            } else {
                let id = self.nodes.len();
                self.nodes.push(Node {
                    parent: Some(cur),
                    ch: Some(ch),
                    children: BTreeMap::new(),
                    is_end: false,
                    depth: level + 1,
                });
                self.nodes[cur].children.insert(ch, id);
                self.rec.count("nodes_created");
                cur = id;
                path.push(cur);
                self.record(
                    format!("Created new node for '{ch}' at level {}", level + 1),
                    &path,
                    word,
                    TrieStepKind::Create,
                    None,
                );
            }
        }
        self.nodes[cur].is_end = true;
        self.record(
            format!("Marked end of word for \"{word}\""),
            &path,
            word,
            TrieStepKind::MarkEnd,
            None,
        );
        Ok(())
    }

    /// Returns whether `word` was inserted as a whole word.
    ///
    /// # Errors
    /// Empty, overlong or non-lowercase words.
    pub fn search(&mut self, word: &str) -> Result<bool, InputError> {
        self.lookup(word, true)
    }

    /// Returns whether any inserted word starts with `prefix`.
    ///
    /// # Errors
    /// Empty, overlong or non-lowercase prefixes.
    pub fn starts_with(&mut self, prefix: &str) -> Result<bool, InputError> {
        self.lookup(prefix, false)
    }

    /// Applies one scripted operation.
    ///
    /// # Errors
    /// As the underlying operation.
    pub fn apply(&mut self, op: &TrieOp) -> Result<(), InputError> {
        match op {
            TrieOp::Insert(w) => self.insert(w),
            TrieOp::Search(w) => self.search(w).map(|_| ()),
            TrieOp::StartsWith(p) => self.starts_with(p).map(|_| ()),
        }
    }

    /// Every stored word in lexicographic order.
    pub fn words(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![(ROOT, String::new())];
        while let Some((id, prefix)) = stack.pop() {
            if self.nodes[id].is_end {
                out.push(prefix.clone());
            }
            for (&ch, &child) in self.nodes[id].children.iter().rev() {
                let mut next = prefix.clone();
                next.push(ch);
                stack.push((child, next));
            }
        }
        out
    }

    /// Publishes the steps recorded so far.
    pub fn trace(&self) -> Trace<TrieState> {
        self.rec.snapshot_trace()
    }

    /// Ends the session and returns its full trace.
    pub fn into_trace(self) -> Trace<TrieState> {
        self.rec.finish()
    }

    fn lookup(&mut self, word: &str, whole_word: bool) -> Result<bool, InputError> {
        validate_word(word)?;
        self.rec.count("operations");
        let what = if whole_word { "word" } else { "prefix" };
        let mut path = vec![ROOT];
        self.record(
            format!("Searching for {what} \"{word}\""),
            &path,
            word,
            TrieStepKind::Begin,
            None,
        );
        let mut cur = ROOT;
        for (level, ch) in word.chars().enumerate() {
            self.rec.count("node_visits");
            let Some(&next) = self.nodes[cur].children.get(&ch) else {
                self.record(
                    format!("Character '{ch}' not found at level {}; \"{word}\" is not in the trie", level + 1),
                    &path,
                    word,
                    TrieStepKind::Missing,
                    Some(false),
                );
                return Ok(false);
            };
            cur = next;
            path.push(cur);
            self.record(
                format!("Found '{ch}' at level {}, moving down", level + 1),
                &path,
                word,
                TrieStepKind::Visit,
                None,
            );
        }
        let found = !whole_word || self.nodes[cur].is_end;
        let message = match (whole_word, found) {
            (true, true) => format!("\"{word}\" found in the trie"),
            (true, false) => format!("\"{word}\" is a prefix but not a complete word"),
            (false, _) => format!("Some word starts with \"{word}\""),
        };
        self.record(message, &path, word, TrieStepKind::Result, Some(found));
        Ok(found)
    }

    fn record(
        &mut self,
        description: String,
        path: &[usize],
        word: &str,
        kind: TrieStepKind,
        found: Option<bool>,
    ) {
        let state = TrieState {
            nodes: flatten(&self.nodes),
            path: path.to_vec(),
            word: word.to_owned(),
            kind,
            found,
        };
        self.rec.record(description, state);
    }
}

fn flatten(nodes: &[Node]) -> Vec<TrieNodeView> {
    nodes
        .iter()
        .enumerate()
        .map(|(id, n)| TrieNodeView {
            id,
            parent: n.parent,
            ch: n.ch,
            is_end: n.is_end,
            depth: n.depth,
        })
        .collect()
}

/// Batch input for [`TrieExecutor`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieScript {
    /// Operations applied to an empty trie.
    pub ops: Vec<TrieOp>,
}

impl TrieScript {
    /// Script that inserts each word in order.
    pub fn build<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        Self {
            ops: words.into_iter().map(|w| TrieOp::Insert(w.into())).collect(),
        }
    }
}

/// Runs a [`TrieScript`] through a fresh [`TrieSession`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TrieExecutor;

impl Executor for TrieExecutor {
    type Input = TrieScript;
    type State = TrieState;

    fn name(&self) -> &'static str {
        "trie"
    }

    fn run(&self, input: &TrieScript) -> Trace<TrieState> {
        let checked = InputError::check_len("operation script", input.ops.len(), MAX_TRIE_OPS)
            .and_then(|()| input.ops.iter().try_for_each(|op| validate_word(op.word())));
        if let Err(e) = checked {
            return reject(&e, TrieState::default());
        }
        let mut session = TrieSession::new();
        for op in &input.ops {
            if let Err(e) = session.apply(op) {
                return reject(&e, TrieState::default());
            }
        }
        session.into_trace()
    }
}

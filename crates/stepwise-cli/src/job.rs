// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `ALGORITHM ARGS…` on the command line, resolved to an executor and its
//! input.
//!
//! Command-line syntax errors (unknown algorithm, a token that is not a
//! number) fail here. Anything the executor itself validates (ranges,
//! capacities, lengths) is left to the executor, which answers with a
//! one-snapshot rejection trace.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use stepwise_algos::bloom_filter::BloomOp;
use stepwise_algos::lru_cache::LruOp;
use stepwise_algos::red_black::RbOp;
use stepwise_algos::trie::TrieOp;
use stepwise_algos::union_find::UnionFindOp;
use stepwise_algos::{
    BloomFilterExecutor, BloomScript, ConvexHullExecutor, FenwickExecutor, Graph,
    GraphSearchExecutor, HullAlgorithm, InfixToPostfixExecutor, LruCacheExecutor, LruScript,
    MatchAlgorithm, MatchInput, Message, MstAlgorithm, MstExecutor, NQueensExecutor, Point,
    Policy, PolynomialExecutor, PolynomialInput, QueensInput, QueensMode, RangeSumOp,
    RangeSumScript, RedBlackExecutor, RedBlackScript, SchedulerExecutor, SchedulerInput,
    SearchAlgorithm, SearchInput, SegmentTreeExecutor, SortAlgorithm, SortExecutor,
    StringMatchExecutor, SuffixArrayExecutor, SuffixArrayInput, TrieExecutor, TrieScript,
    UnionFindExecutor, UnionFindScript,
};
use stepwise_core::Executor;

/// Every accepted algorithm keyword with its argument shape.
pub const CATALOGUE: &[(&str, &str)] = &[
    ("bubble | selection | insertion | shell | merge | quick | heap", "N N N…"),
    ("naive | kmp | boyer-moore | rabin-karp", "TEXT PATTERN"),
    ("lru", "CAPACITY 'put K V' | 'get K' …"),
    ("fenwick", "V,V,V… 'set I V' | 'prefix I' | 'range L R' …"),
    ("segment-tree", "V,V,V… 'set I V' | 'range L R' …"),
    ("trie", "WORD | 'insert W' | 'search W' | 'prefix P' …"),
    ("union-find", "SIZE 'union A B' | 'find A' | 'connected A B' …"),
    ("red-black", "KEY | 'insert K' | 'search K' …"),
    ("graham | jarvis", "X,Y X,Y X,Y…"),
    ("suffix-array", "TEXT [PATTERN]"),
    ("bloom", "BITS HASHES 'add X' | 'query X' …"),
    ("queens", "N [first | all]"),
    ("scheduler", "fifo | priority | sjf | rr:Q  LABEL,BURST[,PRIORITY[,ARRIVAL]] …"),
    ("kruskal | prim", "NODES A-B:W …"),
    ("dfs | bfs | dijkstra", "NODES START A-B:W …"),
    ("polynomial", "LEFT RIGHT"),
    ("infix", "EXPRESSION"),
];

/// Work that can be done with any executor and its input.
///
/// [`Executor`] has associated types, so executors cannot sit behind one
/// trait object; [`Job::dispatch`] hands the concrete pair to a visitor
/// instead.
pub trait JobVisitor {
    /// Result of the visit.
    type Output;

    /// Called once with the executor and the parsed input.
    fn visit<E>(self, executor: &E, input: &E::Input) -> Self::Output
    where
        E: Executor,
        E::State: Serialize + Send + Sync + 'static;
}

/// A parsed algorithm invocation.
pub enum Job {
    /// Comparison sorts.
    Sort(SortExecutor, Vec<i64>),
    /// Single-pattern string search.
    Match(StringMatchExecutor, MatchInput),
    /// LRU cache script.
    Lru(LruScript),
    /// Fenwick tree script.
    Fenwick(RangeSumScript),
    /// Segment tree script.
    SegmentTree(RangeSumScript),
    /// Trie script.
    Trie(TrieScript),
    /// Disjoint-set script.
    UnionFind(UnionFindScript),
    /// Red-black tree script.
    RedBlack(RedBlackScript),
    /// Convex hull over lattice points.
    Hull(ConvexHullExecutor, Vec<Point>),
    /// Suffix array, LCP and optional lookup.
    SuffixArray(SuffixArrayInput),
    /// Bloom filter script.
    Bloom(BloomScript),
    /// N-Queens.
    Queens(QueensInput),
    /// Message queue scheduling.
    Scheduler(SchedulerInput),
    /// Minimum spanning tree.
    Mst(MstExecutor, Graph),
    /// Traversal or shortest paths from a start node.
    Search(GraphSearchExecutor, SearchInput),
    /// Polynomial multiplication.
    Polynomial(PolynomialInput),
    /// Infix to postfix conversion.
    Infix(String),
}

impl Job {
    /// Resolves `algorithm` and parses `args` into its input.
    pub fn parse(algorithm: &str, args: &[String]) -> Result<Self> {
        let key = algorithm.trim().to_ascii_lowercase();
        if let Ok(sort) = key.parse::<SortAlgorithm>() {
            return Ok(Self::Sort(SortExecutor::new(sort), parse_each(args)?));
        }
        if let Ok(search) = key.parse::<MatchAlgorithm>() {
            let [text, pattern] = exactly(args, "TEXT PATTERN")?;
            return Ok(Self::Match(
                StringMatchExecutor::new(search),
                MatchInput::new(text, pattern),
            ));
        }
        if let Ok(hull) = key.parse::<HullAlgorithm>() {
            let points = args.iter().map(|a| parse_point(a)).collect::<Result<_>>()?;
            return Ok(Self::Hull(ConvexHullExecutor::new(hull), points));
        }
        if let Ok(mst) = key.parse::<MstAlgorithm>() {
            let (nodes, edges) = first(args, "NODES")?;
            return Ok(Self::Mst(
                MstExecutor::new(mst),
                Graph {
                    nodes: parse_one(nodes)?,
                    edges: parse_each(edges)?,
                },
            ));
        }
        if let Ok(search) = key.parse::<SearchAlgorithm>() {
            let (nodes, rest) = first(args, "NODES")?;
            let (start, edges) = first(rest, "START")?;
            return Ok(Self::Search(
                GraphSearchExecutor::new(search),
                SearchInput {
                    graph: Graph {
                        nodes: parse_one(nodes)?,
                        edges: parse_each(edges)?,
                    },
                    start: parse_one(start)?,
                },
            ));
        }
        let job = match key.as_str() {
            "lru" | "lru-cache" => {
                let (capacity, ops) = first(args, "CAPACITY")?;
                Self::Lru(LruScript {
                    capacity: parse_one(capacity)?,
                    ops: parse_each::<LruOp>(ops)?,
                })
            }
            "fenwick" | "fenwick-tree" => Self::Fenwick(range_script(args)?),
            "segment-tree" | "segment" => Self::SegmentTree(range_script(args)?),
            "trie" => Self::Trie(TrieScript {
                ops: args.iter().map(|a| trie_op(a)).collect::<Result<_>>()?,
            }),
            "union-find" | "dsu" => {
                let (size, ops) = first(args, "SIZE")?;
                Self::UnionFind(UnionFindScript {
                    size: parse_one(size)?,
                    ops: parse_each::<UnionFindOp>(ops)?,
                })
            }
            "red-black" | "red-black-tree" => Self::RedBlack(RedBlackScript {
                ops: args.iter().map(|a| rb_op(a)).collect::<Result<_>>()?,
            }),
            "suffix-array" => match args {
                [text] => Self::SuffixArray(SuffixArrayInput::new(text.as_str())),
                [text, pattern] => Self::SuffixArray(SuffixArrayInput {
                    text: text.clone(),
                    pattern: Some(pattern.clone()),
                }),
                _ => bail!("suffix-array expects TEXT [PATTERN]"),
            },
            "bloom" | "bloom-filter" => {
                let (bits, rest) = first(args, "BITS")?;
                let (hashes, ops) = first(rest, "HASHES")?;
                Self::Bloom(BloomScript {
                    bits: parse_one(bits)?,
                    hashes: parse_one(hashes)?,
                    ops: parse_each::<BloomOp>(ops)?,
                })
            }
            "queens" | "n-queens" => {
                let (size, rest) = first(args, "N")?;
                let mode = match rest {
                    [] => QueensMode::First,
                    [mode] => parse_one(mode)?,
                    _ => bail!("queens expects N [first | all]"),
                };
                Self::Queens(QueensInput {
                    size: parse_one(size)?,
                    mode,
                })
            }
            "scheduler" | "message-queue" => {
                let (policy, messages) = first(args, "POLICY")?;
                Self::Scheduler(SchedulerInput {
                    policy: parse_one::<Policy>(policy)?,
                    messages: parse_each::<Message>(messages)?,
                })
            }
            "polynomial" | "polynomial-multiply" => {
                let [left, right] = exactly(args, "LEFT RIGHT")?;
                Self::Polynomial(PolynomialInput::new(left, right))
            }
            "infix" | "infix-to-postfix" => Self::Infix(args.join(" ")),
            _ => bail!("unknown algorithm `{algorithm}`; `stepwise list` shows the catalogue"),
        };
        Ok(job)
    }

    /// Hands the executor and its input to `visitor`.
    pub fn dispatch<V: JobVisitor>(&self, visitor: V) -> V::Output {
        match self {
            Self::Sort(executor, input) => visitor.visit(executor, input),
            Self::Match(executor, input) => visitor.visit(executor, input),
            Self::Lru(script) => visitor.visit(&LruCacheExecutor, script),
            Self::Fenwick(script) => visitor.visit(&FenwickExecutor, script),
            Self::SegmentTree(script) => visitor.visit(&SegmentTreeExecutor, script),
            Self::Trie(script) => visitor.visit(&TrieExecutor, script),
            Self::UnionFind(script) => visitor.visit(&UnionFindExecutor, script),
            Self::RedBlack(script) => visitor.visit(&RedBlackExecutor, script),
            Self::Hull(executor, points) => visitor.visit(executor, points),
            Self::SuffixArray(input) => visitor.visit(&SuffixArrayExecutor, input),
            Self::Bloom(script) => visitor.visit(&BloomFilterExecutor, script),
            Self::Queens(input) => visitor.visit(&NQueensExecutor, input),
            Self::Scheduler(input) => visitor.visit(&SchedulerExecutor, input),
            Self::Mst(executor, graph) => visitor.visit(executor, graph),
            Self::Search(executor, input) => visitor.visit(executor, input),
            Self::Polynomial(input) => visitor.visit(&PolynomialExecutor, input),
            Self::Infix(expression) => visitor.visit(&InfixToPostfixExecutor, expression),
        }
    }

    /// Identifier of the executor this job runs.
    pub fn executor_name(&self) -> &'static str {
        struct Name;
        impl JobVisitor for Name {
            type Output = &'static str;
            fn visit<E>(self, executor: &E, _input: &E::Input) -> &'static str
            where
                E: Executor,
                E::State: Serialize + Send + Sync + 'static,
            {
                executor.name()
            }
        }
        self.dispatch(Name)
    }
}

fn parse_one<T>(token: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    token
        .trim()
        .parse()
        .with_context(|| format!("cannot parse `{token}`"))
}

fn parse_each<T>(tokens: &[String]) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    tokens.iter().map(|t| parse_one(t)).collect()
}

fn first<'a>(args: &'a [String], what: &str) -> Result<(&'a str, &'a [String])> {
    args.split_first()
        .map(|(head, rest)| (head.as_str(), rest))
        .with_context(|| format!("missing {what}"))
}

fn exactly<'a>(args: &'a [String], shape: &str) -> Result<[&'a str; 2]> {
    match args {
        [a, b] => Ok([a.as_str(), b.as_str()]),
        _ => bail!("expected {shape}, got {} argument(s)", args.len()),
    }
}

fn parse_point(token: &str) -> Result<Point> {
    let (x, y) = token
        .split_once(',')
        .with_context(|| format!("expected X,Y, got `{token}`"))?;
    Ok(Point::new(parse_one(x)?, parse_one(y)?))
}

fn range_script(args: &[String]) -> Result<RangeSumScript> {
    let (values, ops) = first(args, "V,V,V…")?;
    let values = values
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(parse_one)
        .collect::<Result<_>>()?;
    Ok(RangeSumScript {
        values,
        ops: parse_each::<RangeSumOp>(ops)?,
    })
}

// A bare word is an insert.
fn trie_op(token: &str) -> Result<TrieOp> {
    if token.split_whitespace().nth(1).is_none() {
        return Ok(TrieOp::Insert(token.trim().to_owned()));
    }
    parse_one(token)
}

// A bare integer is an insert.
fn rb_op(token: &str) -> Result<RbOp> {
    match token.trim().parse::<i64>() {
        Ok(key) => Ok(RbOp::Insert(key)),
        Err(_) => parse_one(token),
    }
}

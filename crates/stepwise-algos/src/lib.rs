// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! stepwise-algos: reference executors for the Stepwise engine.
//!
//! Each module pairs an input type, a snapshot state and one or more
//! [`stepwise_core::Executor`] implementations. Interactive structures also
//! expose a session that appends snapshots one operation at a time.
//!
//! Every executor answers bad input with a one-snapshot rejection trace.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

pub mod backtracking;
pub mod bloom_filter;
pub mod convex_hull;
pub mod fenwick;
pub mod graph_search;
pub mod infix;
pub mod lru_cache;
pub mod mst;
pub mod polynomial;
pub mod range_sum;
pub mod red_black;
pub mod scheduler;
pub mod segment_tree;
pub mod sorting;
pub mod string_match;
pub mod suffix_array;
pub mod trie;
pub mod union_find;

pub use backtracking::{NQueensExecutor, QueensInput, QueensMode, QueensState};
pub use bloom_filter::{BloomFilterExecutor, BloomScript, BloomSession, BloomState};
pub use convex_hull::{ConvexHullExecutor, HullAlgorithm, HullState, Point};
pub use fenwick::{FenwickExecutor, FenwickSession, FenwickState};
pub use graph_search::{GraphSearchExecutor, SearchAlgorithm, SearchInput, SearchState};
pub use infix::{InfixState, InfixToPostfixExecutor};
pub use lru_cache::{LruCacheExecutor, LruScript, LruSession, LruState};
pub use mst::{Edge, Graph, MstAlgorithm, MstExecutor, MstState};
pub use polynomial::{PolyState, Polynomial, PolynomialExecutor, PolynomialInput};
pub use range_sum::{RangeSumOp, RangeSumScript};
pub use red_black::{RbState, RedBlackExecutor, RedBlackScript, RedBlackSession};
pub use scheduler::{Message, Policy, SchedulerExecutor, SchedulerInput, SchedulerState};
pub use segment_tree::{SegmentState, SegmentTreeExecutor, SegmentTreeSession};
pub use sorting::{SortAlgorithm, SortExecutor, SortState};
pub use string_match::{MatchAlgorithm, MatchInput, MatchState, StringMatchExecutor};
pub use suffix_array::{SuffixArrayExecutor, SuffixArrayInput, SuffixState};
pub use trie::{TrieExecutor, TrieScript, TrieSession, TrieState};
pub use union_find::{UnionFindExecutor, UnionFindScript, UnionFindSession, UnionFindState};

/// Widens a count or index for [`stepwise_core::InputError::check_range`].
pub(crate) fn wide(v: usize) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::Executor;

    #[test]
    fn wide_saturates_instead_of_wrapping() {
        assert_eq!(wide(31), 31);
        assert_eq!(wide(usize::MAX), i64::MAX);
    }

    #[test]
    fn oversized_capacities_are_rejected_not_wrapped() {
        let lru = LruCacheExecutor.run(&LruScript {
            capacity: usize::MAX,
            ops: Vec::new(),
        });
        assert_eq!(lru.len(), 1);
        assert!(lru[0].description.contains("capacity"));
        let sets = UnionFindExecutor.run(&UnionFindScript {
            size: usize::MAX,
            ops: Vec::new(),
        });
        assert_eq!(sets.len(), 1);
    }
}

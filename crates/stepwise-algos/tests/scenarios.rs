// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Concrete end-to-end scenarios and the rejection contract across every
//! executor.

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use stepwise_algos::lru_cache::{LruOp, LruOutcome};
use stepwise_algos::sorting::Mark;
use stepwise_algos::string_match::brute_force_positions;
use stepwise_algos::*;
use stepwise_core::{
    Executor, NarrationPresenter, PlaybackController, Presenter, TickOutcome, Trace,
};

fn assert_rejected<S: PartialEq + std::fmt::Debug + Default>(trace: &Trace<S>) {
    assert_eq!(trace.len(), 1, "rejection must be a single snapshot");
    assert_eq!(trace[0].index, 0);
    assert!(!trace[0].description.is_empty());
    assert_eq!(trace[0].state, S::default());
}

#[test]
fn sorting_five_three_one() {
    let trace = SortExecutor::new(SortAlgorithm::Bubble).run(&vec![5, 3, 1]);
    assert!(trace.len() > 1);
    let last = trace.final_state();
    assert_eq!(last.values, vec![1, 3, 5]);
    assert!(last.marks.iter().all(|m| *m == Mark::Sorted));
}

#[test]
fn lru_eviction_of_least_recent_key() {
    let script = LruScript {
        capacity: 2,
        ops: vec![
            LruOp::Put("A".into(), 1),
            LruOp::Put("B".into(), 2),
            LruOp::Put("C".into(), 3),
        ],
    };
    let trace = LruCacheExecutor.run(&script);
    let evicted = trace
        .iter()
        .find(|s| s.state.outcome == Some(LruOutcome::Evicted))
        .expect("an eviction snapshot");
    assert_eq!(evicted.state.evicted.as_ref().map(|e| e.key.as_str()), Some("A"));
    let mut keys: Vec<&str> = trace.final_state().keys().collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["B", "C"]);
    assert_eq!(trace.last().metrics.get("evictions"), 1);
}

#[test]
fn kmp_matches_brute_force_on_reference_text() {
    let text = "ABABDABACDABABCABCABCABCABC";
    let pattern = "ABABCAB";
    let trace = StringMatchExecutor::new(MatchAlgorithm::Kmp).run(&MatchInput::new(text, pattern));
    assert_eq!(trace.final_state().matches, brute_force_positions(text, pattern));
    assert!(!trace.final_state().matches.is_empty());
}

#[test]
fn playback_over_a_real_trace_stops_at_the_end() {
    let trace = SortExecutor::new(SortAlgorithm::Insertion).run(&vec![4, 2, 3, 1]);
    let len = trace.len();
    let mut controller = PlaybackController::new();
    controller.load(trace);
    let mut tick = controller.play();
    let mut ticks = 0;
    while let Some(t) = tick {
        ticks += 1;
        tick = match controller.tick(t.token) {
            TickOutcome::Advanced { next, .. } => Some(next),
            TickOutcome::Finished { index } => {
                assert_eq!(index, len - 1);
                None
            }
            other => panic!("unexpected {other:?}"),
        };
    }
    assert_eq!(ticks, len - 1);
    assert!(!controller.state().is_playing);
    assert_eq!(controller.state().current_index, Some(len - 1));
    let line = NarrationPresenter.render(controller.current_snapshot().unwrap(), len);
    assert!(line.starts_with(&format!("[{len}/{len}]")));
}

#[test]
fn every_executor_rejects_with_one_snapshot() {
    for algorithm in SortAlgorithm::ALL {
        assert_rejected(&SortExecutor::new(algorithm).run(&Vec::new()));
    }
    for algorithm in MatchAlgorithm::ALL {
        assert_rejected(&StringMatchExecutor::new(algorithm).run(&MatchInput::new("ab", "")));
    }
    assert_rejected(&LruCacheExecutor.run(&LruScript {
        capacity: 0,
        ops: Vec::new(),
    }));
    let empty_range = RangeSumScript {
        values: Vec::new(),
        ops: Vec::new(),
    };
    assert_rejected(&FenwickExecutor.run(&empty_range));
    assert_rejected(&SegmentTreeExecutor.run(&empty_range));
    assert_rejected(&TrieExecutor.run(&TrieScript::build([""])));
    assert_rejected(&UnionFindExecutor.run(&UnionFindScript {
        size: 0,
        ops: Vec::new(),
    }));
    assert_rejected(&RedBlackExecutor.run(&RedBlackScript::inserts(&[1_000])));
    for algorithm in HullAlgorithm::ALL {
        let collinear = vec![Point::new(0, 0), Point::new(1, 1), Point::new(2, 2)];
        assert_rejected(&ConvexHullExecutor::new(algorithm).run(&collinear));
    }
    assert_rejected(&SuffixArrayExecutor.run(&SuffixArrayInput::new("")));
    assert_rejected(&BloomFilterExecutor.run(&BloomScript {
        bits: 4,
        hashes: 1,
        ops: Vec::new(),
    }));
    assert_rejected(&NQueensExecutor.run(&QueensInput {
        size: 0,
        mode: QueensMode::First,
    }));
    assert_rejected(&SchedulerExecutor.run(&SchedulerInput {
        policy: Policy::Fifo,
        messages: Vec::new(),
    }));
    for algorithm in MstAlgorithm::ALL {
        assert_rejected(&MstExecutor::new(algorithm).run(&Graph {
            nodes: 1,
            edges: Vec::new(),
        }));
    }
    for algorithm in SearchAlgorithm::ALL {
        assert_rejected(&GraphSearchExecutor::new(algorithm).run(&SearchInput {
            graph: Graph {
                nodes: 3,
                edges: vec![Edge {
                    from: 0,
                    to: 1,
                    weight: 1,
                }],
            },
            start: 3,
        }));
    }
    assert_rejected(&PolynomialExecutor.run(&PolynomialInput::new("x +", "1")));
    assert_rejected(&InfixToPostfixExecutor.run(&"A+".to_owned()));
}

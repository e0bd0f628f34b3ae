// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property tests for the playback state machine.

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use std::time::Duration;

use proptest::prelude::*;
use proptest::test_runner::{Config as PropConfig, RngAlgorithm, TestRng, TestRunner};

use stepwise_core::{
    PlaybackController, PlaybackPhase, ScheduledTick, TickOutcome, Trace, TraceRecorder,
};

const SEED_BYTES: [u8; 32] = [
    0x57, 0x45, 0x50, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0,
];

fn trace_of(len: usize) -> Trace<usize> {
    let mut rec = TraceRecorder::new("step 0", 0);
    for i in 1..len {
        rec.count("work");
        rec.record(format!("step {i}"), i);
    }
    rec.finish()
}

#[derive(Clone, Debug)]
enum Op {
    Play,
    Pause,
    Reset,
    StepForward,
    StepBackward,
    Seek(usize),
    SetSpeed(u64),
    /// Deliver the most recently scheduled tick.
    Tick,
    /// Deliver the oldest scheduled tick ever seen.
    StaleTick,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Play),
        Just(Op::Pause),
        Just(Op::Reset),
        Just(Op::StepForward),
        Just(Op::StepBackward),
        (0usize..40).prop_map(Op::Seek),
        (0u64..20_000).prop_map(Op::SetSpeed),
        Just(Op::Tick),
        Just(Op::Tick),
        Just(Op::StaleTick),
    ]
}

fn seeded_runner() -> TestRunner {
    let rng = TestRng::from_seed(RngAlgorithm::ChaCha, &SEED_BYTES);
    TestRunner::new_with_rng(PropConfig::default(), rng)
}

#[test]
fn index_never_leaves_trace_bounds() {
    let strategy = (1usize..30, prop::collection::vec(op(), 0..120));
    seeded_runner()
        .run(&strategy, |(len, ops)| {
            let mut c = PlaybackController::new();
            c.load(trace_of(len));
            let mut latest: Option<ScheduledTick> = None;
            let mut oldest: Option<ScheduledTick> = None;
            for op in ops {
                match op {
                    Op::Play => {
                        if let Some(t) = c.play() {
                            oldest.get_or_insert(t);
                            latest = Some(t);
                        }
                    }
                    Op::Pause => c.pause(),
                    Op::Reset => c.reset(),
                    Op::StepForward => {
                        let _ = c.step_forward();
                    }
                    Op::StepBackward => {
                        let _ = c.step_backward();
                    }
                    Op::Seek(i) => {
                        let _ = c.seek(i);
                    }
                    Op::SetSpeed(ms) => {
                        let applied = c.set_speed(Duration::from_millis(ms));
                        prop_assert!(applied >= stepwise_core::MIN_SPEED);
                        prop_assert!(applied <= stepwise_core::MAX_SPEED);
                    }
                    Op::Tick => {
                        if let Some(t) = latest {
                            if let TickOutcome::Advanced { next, .. } = c.tick(t.token) {
                                latest = Some(next);
                            }
                        }
                    }
                    Op::StaleTick => {
                        if let Some(t) = oldest {
                            let before = c.state();
                            if t.token.generation() != c.generation() {
                                prop_assert_eq!(c.tick(t.token), TickOutcome::Stale);
                                prop_assert_eq!(c.state(), before);
                            }
                        }
                    }
                }
                let state = c.state();
                if let Some(i) = state.current_index {
                    prop_assert!(i < len);
                }
                if state.is_playing {
                    prop_assert!(state.current_index.is_some_and(|i| i + 1 < len));
                }
            }
            Ok(())
        })
        .expect("playback bounds property");
}

#[test]
fn uninterrupted_play_auto_stops_within_len_ticks() {
    seeded_runner()
        .run(&(1usize..60), |len| {
            let mut c = PlaybackController::new();
            c.load(trace_of(len));
            let mut pending = c.play();
            let mut ticks = 0usize;
            while let Some(t) = pending {
                ticks += 1;
                pending = match c.tick(t.token) {
                    TickOutcome::Advanced { index, next } => {
                        prop_assert_eq!(index, ticks);
                        Some(next)
                    }
                    TickOutcome::Finished { .. } => None,
                    other => panic!("unexpected tick outcome {other:?}"),
                };
            }
            prop_assert!(ticks < len.max(1));
            prop_assert_eq!(c.state().current_index, Some(len - 1));
            prop_assert!(!c.state().is_playing);
            prop_assert_eq!(c.phase(), PlaybackPhase::Finished(len - 1));
            Ok(())
        })
        .expect("auto-stop property");
}

#[test]
fn play_pause_steps_then_reset_returns_to_idle() {
    let mut c = PlaybackController::new();
    c.load(trace_of(10));

    let mut tick = c.play().expect("first tick");
    for expected in 1..=3 {
        match c.tick(tick.token) {
            TickOutcome::Advanced { index, next } => {
                assert_eq!(index, expected);
                tick = next;
            }
            other => panic!("unexpected tick outcome {other:?}"),
        }
    }
    c.pause();
    assert_eq!(c.phase(), PlaybackPhase::Paused(3));

    let _ = c.step_forward();
    let _ = c.step_forward();
    assert_eq!(c.state().current_index, Some(5));

    c.reset();
    let state = c.state();
    assert_eq!(state.current_index, None);
    assert!(!state.is_playing);
    assert_eq!(c.tick(tick.token), TickOutcome::Stale);
}

#[test]
fn cloned_snapshot_state_is_isolated_from_the_trace() {
    let mut rec = TraceRecorder::new("empty", Vec::<u32>::new());
    rec.record("push 7", vec![7]);
    rec.record("push 9", vec![7, 9]);
    let trace = rec.finish();

    let mut scratch = trace[1].state.clone();
    scratch.push(42);
    assert_eq!(trace[1].state, vec![7]);
    assert_eq!(trace[2].state, vec![7, 9]);
}

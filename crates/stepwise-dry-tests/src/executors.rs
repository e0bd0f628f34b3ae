// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Synthetic executors with predictable traces.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Largest count [`CountingExecutor`] accepts.
pub const MAX_COUNT: u32 = 1_000;

/// Payload of the synthetic executors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    /// Current value.
    pub value: u32,
    /// Run-specific noise; always zero for deterministic executors.
    pub noise: u64,
}

/// Counts from zero to its input, one snapshot per increment.
///
/// A trace for input `n` has `n + 1` snapshots and a single `increments`
/// counter equal to the snapshot index.
#[derive(Clone, Copy, Debug, Default)]
pub struct CountingExecutor;

impl Executor for CountingExecutor {
    type Input = u32;
    type State = CounterState;

    fn name(&self) -> &'static str {
        "counting"
    }

    fn run(&self, input: &u32) -> Trace<CounterState> {
        if let Err(e) = InputError::check_range("count", (*input).into(), 0, MAX_COUNT.into()) {
            return reject(&e, CounterState::default());
        }
        let mut rec =
            TraceRecorder::with_counters("start at 0", CounterState::default(), &["increments"]);
        for value in 1..=*input {
            rec.count("increments");
            rec.record(
                format!("count {value}"),
                CounterState { value, noise: 0 },
            );
        }
        rec.finish()
    }
}

/// Like [`CountingExecutor`], but every run stamps a fresh sequence number
/// into the final snapshot, so repeated runs never agree.
#[derive(Debug, Default)]
pub struct DriftingExecutor {
    runs: AtomicU64,
}

impl Executor for DriftingExecutor {
    type Input = u32;
    type State = CounterState;

    fn name(&self) -> &'static str {
        "drifting"
    }

    fn run(&self, input: &u32) -> Trace<CounterState> {
        let noise = self.runs.fetch_add(1, Ordering::Relaxed);
        let mut rec = TraceRecorder::new("start at 0", CounterState::default());
        rec.record(
            "drift",
            CounterState {
                value: *input,
                noise,
            },
        );
        rec.finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use stepwise_core::{verify_determinism, DeterminismError};

    #[test]
    fn counting_trace_shape() {
        let t = CountingExecutor.run(&3);
        assert_eq!(t.len(), 4);
        assert_eq!(t.final_state().value, 3);
        assert_eq!(t.last().metrics.get("increments"), 3);
        assert_eq!(CountingExecutor.run(&(MAX_COUNT + 1)).len(), 1);
    }

    #[test]
    fn drifting_executor_is_caught() {
        assert!(verify_determinism(&CountingExecutor, &5, 4).is_ok());
        assert!(matches!(
            verify_determinism(&DriftingExecutor::default(), &5, 2),
            Err(DeterminismError::Diverged { run: 1, .. })
        ));
    }
}

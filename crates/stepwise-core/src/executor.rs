// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The executor contract and its input-rejection helpers.

use serde::Serialize;
use thiserror::Error;

use crate::trace::{Trace, TraceDigest, TraceError, TraceRecorder};

/// Runs one deterministic algorithm to completion and returns its trace.
///
/// Implementors must:
/// - return a non-empty trace for every input, valid or not;
/// - depend on nothing but `input` (no clocks, no globals, no I/O);
/// - record owned copies of their working state at each step;
/// - break ties with a fixed, documented rule.
///
/// Invalid input is answered with a one-snapshot rejection trace built by
/// [`reject`]; executors never panic or return an error for it.
pub trait Executor {
    /// Algorithm parameters.
    type Input;
    /// Snapshot payload understood by the matching presenter.
    type State: Clone;

    /// Stable, lowercase identifier (`"bubble-sort"`, `"kmp"`, …).
    fn name(&self) -> &'static str;

    /// Executes the algorithm eagerly and returns the complete trace.
    fn run(&self, input: &Self::Input) -> Trace<Self::State>;
}

/// Reasons an executor refuses its input.
///
/// The `Display` text is used verbatim as the description of the rejection
/// snapshot, so it reads as a sentence aimed at the learner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// A required collection or string was empty.
    #[error("{what} must not be empty")]
    Empty {
        /// Name of the empty input.
        what: &'static str,
    },

    /// Fewer items than the algorithm needs.
    #[error("Need at least {min} {what} for {purpose}")]
    TooFew {
        /// Minimum accepted count.
        min: usize,
        /// Noun for the items (`"points"`).
        what: &'static str,
        /// Algorithm that needs them (`"convex hull"`).
        purpose: &'static str,
    },

    /// More items than the bounded input domain allows.
    #[error("{what} has {actual} items; at most {max} are allowed")]
    TooMany {
        /// Name of the oversized input.
        what: &'static str,
        /// Maximum accepted count.
        max: usize,
        /// Count that was supplied.
        actual: usize,
    },

    /// A scalar or index outside its legal range.
    #[error("{what} {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending value.
        what: &'static str,
        /// Value that was supplied.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },

    /// Text that could not be parsed.
    #[error("Cannot parse `{input}`: {reason}")]
    Parse {
        /// The raw text.
        input: String,
        /// What went wrong.
        reason: String,
    },

    /// Any other validation failure, phrased for display.
    #[error("{0}")]
    Invalid(String),
}

impl InputError {
    /// Checks `0 < len <= max` for a collection named `what`.
    ///
    /// # Errors
    /// [`InputError::Empty`] or [`InputError::TooMany`].
    pub fn check_len(what: &'static str, len: usize, max: usize) -> Result<(), Self> {
        if len == 0 {
            return Err(Self::Empty { what });
        }
        if len > max {
            return Err(Self::TooMany {
                what,
                max,
                actual: len,
            });
        }
        Ok(())
    }

    /// Checks `min <= value <= max`.
    ///
    /// # Errors
    /// [`InputError::OutOfRange`] when the value falls outside the bounds.
    pub fn check_range(what: &'static str, value: i64, min: i64, max: i64) -> Result<(), Self> {
        if value < min || value > max {
            return Err(Self::OutOfRange {
                what,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Builds the one-snapshot trace returned for rejected input.
pub fn reject<S>(error: &InputError, neutral: S) -> Trace<S> {
    tracing::debug!(%error, "input rejected");
    TraceRecorder::new(error.to_string(), neutral).finish()
}

/// Failure modes of [`verify_determinism`].
#[derive(Debug, Error)]
pub enum DeterminismError {
    /// Two runs on identical input produced different traces.
    #[error("run {run} of {executor} diverged: expected {expected}, found {found}")]
    Diverged {
        /// Executor name.
        executor: &'static str,
        /// Zero-based run number that diverged.
        run: usize,
        /// Digest of the first run.
        expected: TraceDigest,
        /// Digest of the diverging run.
        found: TraceDigest,
    },

    /// A trace could not be hashed.
    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Runs `executor` on `input` `runs` times and checks every trace digest
/// matches the first.
///
/// Returns the common digest. `runs == 0` is treated as a single run.
///
/// # Errors
/// [`DeterminismError::Diverged`] on the first mismatching run, or
/// [`DeterminismError::Trace`] if a state payload fails to encode.
pub fn verify_determinism<E>(
    executor: &E,
    input: &E::Input,
    runs: usize,
) -> Result<TraceDigest, DeterminismError>
where
    E: Executor,
    E::State: Serialize,
{
    let expected = executor.run(input).digest()?;
    for run in 1..runs {
        let found = executor.run(input).digest()?;
        if found != expected {
            return Err(DeterminismError::Diverged {
                executor: executor.name(),
                run,
                expected,
                found,
            });
        }
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use std::cell::Cell;

    use super::*;

    struct Countdown;

    impl Executor for Countdown {
        type Input = u32;
        type State = u32;

        fn name(&self) -> &'static str {
            "countdown"
        }

        fn run(&self, input: &u32) -> Trace<u32> {
            if let Err(e) = InputError::check_range("start", i64::from(*input), 1, 20) {
                return reject(&e, 0);
            }
            let mut rec = TraceRecorder::new(format!("start at {input}"), *input);
            for n in (0..*input).rev() {
                rec.count("decrements");
                rec.record(format!("down to {n}"), n);
            }
            rec.finish()
        }
    }

    /// Deliberately impure executor used to prove divergence detection.
    struct Drifting {
        calls: Cell<u32>,
    }

    impl Executor for Drifting {
        type Input = ();
        type State = u32;

        fn name(&self) -> &'static str {
            "drifting"
        }

        fn run(&self, _input: &()) -> Trace<u32> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            TraceRecorder::new("drift", n).finish()
        }
    }

    #[test]
    fn rejection_trace_has_one_snapshot_with_reason() {
        let trace = Countdown.run(&0);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].description, "start 0 is out of range [1, 20]");
        assert_eq!(trace[0].state, 0);
    }

    #[test]
    fn too_few_message_reads_as_a_sentence() {
        let e = InputError::TooFew {
            min: 3,
            what: "points",
            purpose: "convex hull",
        };
        assert_eq!(e.to_string(), "Need at least 3 points for convex hull");
    }

    #[test]
    fn check_len_bounds() {
        assert_eq!(
            InputError::check_len("array", 0, 50),
            Err(InputError::Empty { what: "array" })
        );
        assert!(InputError::check_len("array", 50, 50).is_ok());
        assert!(matches!(
            InputError::check_len("array", 51, 50),
            Err(InputError::TooMany { actual: 51, .. })
        ));
    }

    #[test]
    fn pure_executor_is_deterministic() {
        let d = verify_determinism(&Countdown, &5, 4).unwrap();
        assert_eq!(d, Countdown.run(&5).digest().unwrap());
    }

    #[test]
    fn impure_executor_is_caught() {
        let exec = Drifting {
            calls: Cell::new(0),
        };
        let err = verify_determinism(&exec, &(), 3).unwrap_err();
        assert!(matches!(err, DeterminismError::Diverged { run: 1, .. }));
    }
}

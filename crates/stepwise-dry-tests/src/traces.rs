// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Trace builder for playback tests.

use stepwise_core::{Trace, TraceRecorder};

/// Builder for [`Trace`] instances in tests.
///
/// # Example
///
/// ```
/// use stepwise_dry_tests::TraceBuilder;
///
/// let trace = TraceBuilder::new("empty", 0)
///     .count("writes")
///     .step("one", 1)
///     .build();
///
/// assert_eq!(trace.len(), 2);
/// assert_eq!(trace.last().metrics.get("writes"), 1);
/// ```
pub struct TraceBuilder<S> {
    rec: TraceRecorder<S>,
}

impl<S: Clone> TraceBuilder<S> {
    /// Start a trace with its initial snapshot.
    pub fn new(description: impl Into<String>, initial: S) -> Self {
        Self {
            rec: TraceRecorder::new(description, initial),
        }
    }

    /// Bump `counter` by one before the next step.
    pub fn count(mut self, counter: &str) -> Self {
        self.rec.count(counter);
        self
    }

    /// Append a snapshot.
    pub fn step(mut self, description: impl Into<String>, state: S) -> Self {
        self.rec.record(description, state);
        self
    }

    /// Finish the trace.
    pub fn build(self) -> Trace<S> {
        self.rec.finish()
    }
}

impl TraceBuilder<usize> {
    /// A `len`-snapshot trace whose states are their own indices.
    ///
    /// `len == 0` still yields one snapshot.
    pub fn numbered(len: usize) -> Trace<usize> {
        (1..len)
            .fold(Self::new("step 0", 0), |b, i| {
                b.count("work").step(format!("step {i}"), i)
            })
            .build()
    }
}

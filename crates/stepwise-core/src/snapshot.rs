// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Point-in-time records stored in a [`Trace`](crate::Trace).

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

/// One immutable step of an algorithm run.
///
/// Invariants
/// - `index` equals the snapshot's position in its trace.
/// - `state` is a fully owned value: rendering snapshot `i` never needs
///   snapshot `i - 1`, and nothing recorded later can reach back into it.
/// - `metrics` only holds cumulative counters (see [`Metrics`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<S> {
    /// Position within the trace (0-based, contiguous).
    pub index: usize,
    /// Human-readable narration of what just happened.
    pub description: String,
    /// Algorithm-specific payload, opaque to the playback layer.
    pub state: S,
    /// Cumulative counters as of this step.
    pub metrics: Metrics,
}

impl<S> Snapshot<S> {
    /// Builds a snapshot without counters.
    pub fn new(index: usize, description: impl Into<String>, state: S) -> Self {
        Self {
            index,
            description: description.into(),
            state,
            metrics: Metrics::new(),
        }
    }

    /// Replaces the counters carried by this snapshot.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Maps the state payload, keeping index, narration and counters.
    pub fn map_state<T>(self, f: impl FnOnce(S) -> T) -> Snapshot<T> {
        Snapshot {
            index: self.index,
            description: self.description,
            state: f(self.state),
            metrics: self.metrics,
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable traces and the recorder that builds them.
//!
//! A [`Trace`] is the complete, ordered output of one executor run. It is
//! backed by an `Arc<[Snapshot<S>]>`: cloning a trace is cheap and any
//! number of presenters may read it concurrently without locking.
//!
//! # Invariants
//!
//! - A trace always holds at least one snapshot.
//! - `trace[i].index == i` for every `i`.
//! - Counters in [`Metrics`] never decrease from one snapshot to the next.
//!
//! [`TraceRecorder`] upholds all three by construction. [`Trace::from_snapshots`]
//! checks them for snapshots that arrive from elsewhere (deserialization,
//! fixtures) and reports violations as [`TraceError`].

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::metrics::Metrics;
use crate::snapshot::Snapshot;

/// Canonical 256-bit hash used for trace digests.
pub type Hash = [u8; 32];

/// Domain tag mixed into every trace digest.
const TRACE_DIGEST_DOMAIN: &[u8] = b"stepwise:trace:v1\0";

/// Errors raised while assembling or hashing a trace.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// A trace must contain at least one snapshot.
    #[error("trace must contain at least one snapshot")]
    Empty,

    /// A snapshot's `index` does not match its position.
    #[error("snapshot at position {position} carries index {found}")]
    IndexMismatch {
        /// Position of the offending snapshot in the sequence.
        position: usize,
        /// Index value the snapshot carried.
        found: usize,
    },

    /// A cumulative counter shrank between two adjacent snapshots.
    #[error("counter `{counter}` decreased at snapshot {position}")]
    MetricRegression {
        /// Position of the snapshot whose counter went down.
        position: usize,
        /// Name of the counter.
        counter: String,
    },

    /// A snapshot could not be encoded for hashing.
    #[error("failed to encode snapshot {position}: {reason}")]
    Encode {
        /// Position of the snapshot that failed to encode.
        position: usize,
        /// Encoder error message.
        reason: String,
    },
}

/// Ordered, immutable, non-empty sequence of snapshots from one run.
pub struct Trace<S> {
    snapshots: Arc<[Snapshot<S>]>,
}

impl<S> Clone for Trace<S> {
    fn clone(&self) -> Self {
        Self {
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Trace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("snapshots", &&*self.snapshots)
            .finish()
    }
}

impl<S: PartialEq> PartialEq for Trace<S> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.snapshots, &other.snapshots) || *self.snapshots == *other.snapshots
    }
}

impl<S: Eq> Eq for Trace<S> {}

impl<S> Trace<S> {
    /// Validates raw snapshots and freezes them into a trace.
    ///
    /// # Errors
    /// - [`TraceError::Empty`] when `snapshots` is empty.
    /// - [`TraceError::IndexMismatch`] when `snapshots[i].index != i`.
    /// - [`TraceError::MetricRegression`] when a counter decreases.
    pub fn from_snapshots(snapshots: Vec<Snapshot<S>>) -> Result<Self, TraceError> {
        if snapshots.is_empty() {
            return Err(TraceError::Empty);
        }
        for (position, snap) in snapshots.iter().enumerate() {
            if snap.index != position {
                return Err(TraceError::IndexMismatch {
                    position,
                    found: snap.index,
                });
            }
        }
        for (position, pair) in snapshots.windows(2).enumerate() {
            if let Some(counter) = pair[1].metrics.first_regression(&pair[0].metrics) {
                return Err(TraceError::MetricRegression {
                    position: position + 1,
                    counter: counter.to_owned(),
                });
            }
        }
        Ok(Self {
            snapshots: snapshots.into(),
        })
    }

    /// Number of snapshots; always `>= 1`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always `false`; present for API symmetry with slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Index of the last snapshot (`len() - 1`).
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.snapshots.len().saturating_sub(1)
    }

    /// Returns the snapshot at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Snapshot<S>> {
        self.snapshots.get(index)
    }

    /// First snapshot (the initial state).
    #[must_use]
    pub fn first(&self) -> &Snapshot<S> {
        &self.snapshots[0]
    }

    /// Last snapshot (the final state).
    #[must_use]
    pub fn last(&self) -> &Snapshot<S> {
        &self.snapshots[self.last_index()]
    }

    /// Borrow the state payload of the final snapshot.
    #[must_use]
    pub fn final_state(&self) -> &S {
        &self.last().state
    }

    /// Iterates snapshots in recorded order.
    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot<S>> {
        self.snapshots.iter()
    }

    /// Borrow the snapshots as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Snapshot<S>] {
        &self.snapshots
    }

    /// Iterates the narration of every snapshot.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> + '_ {
        self.snapshots.iter().map(|s| s.description.as_str())
    }
}

impl<S: Serialize> Trace<S> {
    /// Computes the canonical digest of this trace.
    ///
    /// The hash covers a domain tag, the snapshot count, and each snapshot's
    /// CBOR encoding as a little-endian length-prefixed blob. Two traces have
    /// equal digests iff their snapshots (index, narration, state, counters)
    /// encode identically.
    ///
    /// # Errors
    /// Returns [`TraceError::Encode`] if a state payload cannot be serialized.
    pub fn digest(&self) -> Result<TraceDigest, TraceError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(TRACE_DIGEST_DOMAIN);
        hasher.update(&(self.snapshots.len() as u64).to_le_bytes());
        let mut buf = Vec::new();
        for (position, snap) in self.snapshots.iter().enumerate() {
            buf.clear();
            ciborium::into_writer(snap, &mut buf).map_err(|e| TraceError::Encode {
                position,
                reason: e.to_string(),
            })?;
            hasher.update(&(buf.len() as u64).to_le_bytes());
            hasher.update(&buf);
        }
        Ok(TraceDigest(hasher.finalize().into()))
    }
}

impl<S> Index<usize> for Trace<S> {
    type Output = Snapshot<S>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.snapshots[index]
    }
}

impl<'a, S> IntoIterator for &'a Trace<S> {
    type Item = &'a Snapshot<S>;
    type IntoIter = std::slice::Iter<'a, Snapshot<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}

impl<S: Serialize> Serialize for Trace<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.snapshots.serialize(serializer)
    }
}

impl<'de, S: Deserialize<'de>> Deserialize<'de> for Trace<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshots = Vec::<Snapshot<S>>::deserialize(deserializer)?;
        Self::from_snapshots(snapshots).map_err(serde::de::Error::custom)
    }
}

/// BLAKE3 digest identifying a trace's exact content.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TraceDigest(pub Hash);

impl TraceDigest {
    /// Returns the canonical byte representation of this digest.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Lowercase hex encoding (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex string.
    ///
    /// # Errors
    /// Returns [`hex::FromHexError`] on malformed or wrong-length input.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl fmt::Display for TraceDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Builds a [`Trace`] one snapshot at a time.
///
/// The recorder is created with the initial snapshot, so the resulting trace
/// is never empty. Counters are only ever incremented, and each call to
/// [`record`](Self::record) stores the current counter values alongside an
/// owned copy of the state.
#[derive(Debug, Clone)]
pub struct TraceRecorder<S> {
    snapshots: Vec<Snapshot<S>>,
    metrics: Metrics,
}

impl<S> TraceRecorder<S> {
    /// Starts a recording whose first snapshot is `initial`.
    pub fn new(description: impl Into<String>, initial: S) -> Self {
        Self {
            snapshots: vec![Snapshot::new(0, description, initial)],
            metrics: Metrics::new(),
        }
    }

    /// Starts a recording with predeclared counters, all at zero.
    ///
    /// Declaring counters up front makes them visible in every snapshot,
    /// including the initial one, even before the first increment.
    pub fn with_counters(
        description: impl Into<String>,
        initial: S,
        counters: &[&'static str],
    ) -> Self {
        let metrics: Metrics = counters.iter().map(|name| (*name, 0)).collect();
        Self {
            snapshots: vec![Snapshot::new(0, description, initial).with_metrics(metrics.clone())],
            metrics,
        }
    }

    /// Increments counter `name` by one.
    pub fn count(&mut self, name: &str) {
        self.metrics.bump(name, 1);
    }

    /// Increments counter `name` by `by`.
    pub fn count_by(&mut self, name: &str, by: u64) {
        self.metrics.bump(name, by);
    }

    /// Current value of counter `name`.
    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        self.metrics.get(name)
    }

    /// Appends a snapshot holding `state` and the current counters.
    pub fn record(&mut self, description: impl Into<String>, state: S) {
        let index = self.snapshots.len();
        debug_assert!(
            self.snapshots
                .last()
                .and_then(|prev| self.metrics.first_regression(&prev.metrics))
                .is_none(),
            "recorder counters must be non-decreasing"
        );
        self.snapshots
            .push(Snapshot::new(index, description, state).with_metrics(self.metrics.clone()));
    }

    /// Number of snapshots recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always `false`: the initial snapshot is recorded on construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Most recently recorded snapshot.
    #[must_use]
    pub fn latest(&self) -> &Snapshot<S> {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Freezes the recording into a trace.
    pub fn finish(self) -> Trace<S> {
        debug_assert!(!self.snapshots.is_empty());
        Trace {
            snapshots: self.snapshots.into(),
        }
    }
}

impl<S: Clone> TraceRecorder<S> {
    /// Publishes the snapshots recorded so far without ending the recording.
    ///
    /// Used by incremental sessions: each call yields a new immutable trace
    /// while the recorder keeps accepting snapshots.
    #[must_use]
    pub fn snapshot_trace(&self) -> Trace<S> {
        Trace {
            snapshots: self.snapshots.as_slice().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn three_step() -> Trace<Vec<i32>> {
        let mut rec = TraceRecorder::new("start", vec![3, 1]);
        rec.count("comparisons");
        rec.record("compare", vec![3, 1]);
        rec.count("swaps");
        rec.record("swap", vec![1, 3]);
        rec.finish()
    }

    #[test]
    fn recorder_produces_contiguous_indices() {
        let trace = three_step();
        assert_eq!(trace.len(), 3);
        for (i, snap) in trace.iter().enumerate() {
            assert_eq!(snap.index, i);
        }
        assert_eq!(trace.final_state(), &vec![1, 3]);
        assert_eq!(trace.last().metrics.get("comparisons"), 1);
        assert_eq!(trace.last().metrics.get("swaps"), 1);
        assert_eq!(trace.first().metrics.get("swaps"), 0);
    }

    #[test]
    fn declared_counters_appear_in_initial_snapshot() {
        let rec: TraceRecorder<()> = TraceRecorder::with_counters("init", (), &["hits", "misses"]);
        let trace = rec.finish();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].metrics.len(), 2);
    }

    #[test]
    fn from_snapshots_rejects_empty() {
        let err = Trace::<u8>::from_snapshots(Vec::new()).unwrap_err();
        assert_eq!(err, TraceError::Empty);
    }

    #[test]
    fn from_snapshots_rejects_index_gap() {
        let snaps = vec![Snapshot::new(0, "a", 1u8), Snapshot::new(2, "b", 2u8)];
        let err = Trace::from_snapshots(snaps).unwrap_err();
        assert_eq!(
            err,
            TraceError::IndexMismatch {
                position: 1,
                found: 2
            }
        );
    }

    #[test]
    fn from_snapshots_rejects_shrinking_counter() {
        let hi: Metrics = [("swaps", 2)].into_iter().collect();
        let lo: Metrics = [("swaps", 1)].into_iter().collect();
        let snaps = vec![
            Snapshot::new(0, "a", ()).with_metrics(hi),
            Snapshot::new(1, "b", ()).with_metrics(lo),
        ];
        let err = Trace::from_snapshots(snaps).unwrap_err();
        assert!(matches!(err, TraceError::MetricRegression { position: 1, .. }));
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = three_step().digest().unwrap();
        let b = three_step().digest().unwrap();
        assert_eq!(a, b);

        let mut rec = TraceRecorder::new("start", vec![3, 1]);
        rec.count("comparisons");
        rec.record("compare", vec![3, 1]);
        rec.count("swaps");
        rec.record("swap!", vec![1, 3]);
        let c = rec.finish().digest().unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn digest_hex_round_trips() {
        let d = three_step().digest().unwrap();
        let hex = d.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(TraceDigest::from_hex(&hex).unwrap(), d);
        assert!(TraceDigest::from_hex("abc").is_err());
    }

    #[test]
    fn session_publish_is_isolated_from_later_records() {
        let mut rec = TraceRecorder::new("empty", Vec::<i32>::new());
        rec.record("push 1", vec![1]);
        let published = rec.snapshot_trace();
        rec.record("push 2", vec![1, 2]);
        assert_eq!(published.len(), 2);
        assert_eq!(published.final_state(), &vec![1]);
        assert_eq!(rec.finish().len(), 3);
    }

    #[test]
    fn json_deserialization_revalidates() {
        let trace = three_step();
        let json = serde_json::to_string(&trace).unwrap();
        let back: Trace<Vec<i32>> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trace);

        let broken = json.replacen("\"index\":1", "\"index\":7", 1);
        assert!(serde_json::from_str::<Trace<Vec<i32>>>(&broken).is_err());
    }
}

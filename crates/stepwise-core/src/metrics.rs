// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cumulative work counters carried by every snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered set of cumulative counters (`comparisons`, `swaps`, …).
///
/// Every counter stored here represents cumulative work: it only ever grows
/// over the course of one trace. Figures that can go down (hit rate, queue
/// length, averages) belong in the algorithm state, not here.
///
/// Counters are keyed by name in a `BTreeMap` so iteration order, and
/// therefore the canonical encoding used for trace digests, is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics {
    counters: BTreeMap<String, u64>,
}

impl Metrics {
    /// Creates an empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, or `0` if the counter was never bumped.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Returns `true` when no counter has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Number of distinct counters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Iterates counters in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Adds `by` to counter `name`, creating it at zero first if needed.
    pub(crate) fn bump(&mut self, name: &str, by: u64) {
        if let Some(value) = self.counters.get_mut(name) {
            *value = value.saturating_add(by);
        } else {
            self.counters.insert(name.to_owned(), by);
        }
    }

    /// Returns the first counter that is smaller here than in `earlier`.
    ///
    /// `None` means every counter present in `earlier` is `<=` the matching
    /// counter in `self`, i.e. `self` may legally follow `earlier` in a trace.
    #[must_use]
    pub fn first_regression<'a>(&self, earlier: &'a Self) -> Option<&'a str> {
        earlier
            .counters
            .iter()
            .find(|(name, value)| self.get(name) < **value)
            .map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, u64)> for Metrics {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        Self {
            counters: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, u64)> for Metrics {
    fn from_iter<T: IntoIterator<Item = (&'a str, u64)>>(iter: T) -> Self {
        iter.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_counter_reads_as_zero() {
        let m = Metrics::new();
        assert_eq!(m.get("comparisons"), 0);
        assert!(m.is_empty());
    }

    #[test]
    fn bump_accumulates() {
        let mut m = Metrics::new();
        m.bump("swaps", 1);
        m.bump("swaps", 2);
        assert_eq!(m.get("swaps"), 3);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn regression_detects_shrinking_counter() {
        let earlier: Metrics = [("comparisons", 4), ("swaps", 1)].into_iter().collect();
        let later: Metrics = [("comparisons", 3), ("swaps", 1)].into_iter().collect();
        assert_eq!(later.first_regression(&earlier), Some("comparisons"));
        assert_eq!(earlier.first_regression(&earlier), None);
    }

    #[test]
    fn display_lists_counters_in_name_order() {
        let m: Metrics = [("swaps", 2), ("comparisons", 5)].into_iter().collect();
        assert_eq!(m.to_string(), "comparisons=5, swaps=2");
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Presenter port.

use crate::snapshot::Snapshot;

/// Renders one snapshot in isolation.
///
/// Presenters are stateless with respect to the trace: `render` only sees
/// `&Snapshot`, so it can neither mutate it nor depend on its neighbours.
/// That is what makes scrubbing (jumping straight to step N) safe.
pub trait Presenter<S> {
    /// Rendered form (text, a draw list, a widget tree, …).
    type Output;

    /// Renders `snapshot`. `total` is the trace length, for "step i of n"
    /// style headers.
    fn render(&self, snapshot: &Snapshot<S>, total: usize) -> Self::Output;
}

/// Plain-text presenter for terminals and logs.
///
/// Output shape: `[i/n] description (counter=value, …)`. The counter suffix
/// is omitted when the snapshot carries no counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NarrationPresenter;

impl<S> Presenter<S> for NarrationPresenter {
    type Output = String;

    fn render(&self, snapshot: &Snapshot<S>, total: usize) -> String {
        let position = snapshot.index + 1;
        if snapshot.metrics.is_empty() {
            format!("[{position}/{total}] {}", snapshot.description)
        } else {
            format!(
                "[{position}/{total}] {} ({})",
                snapshot.description, snapshot.metrics
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;

    #[test]
    fn narration_includes_counters() {
        let m: Metrics = [("comparisons", 3), ("swaps", 1)].into_iter().collect();
        let snap = Snapshot::new(2, "Swap 5 and 3", ()).with_metrics(m);
        assert_eq!(
            NarrationPresenter.render(&snap, 9),
            "[3/9] Swap 5 and 3 (comparisons=3, swaps=1)"
        );
    }

    #[test]
    fn narration_without_counters_has_no_suffix() {
        let snap = Snapshot::new(0, "Initial array", ());
        assert_eq!(NarrationPresenter.render(&snap, 1), "[1/1] Initial array");
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Suffix array by insertion sort, Kasai LCP, and binary-search lookup.
//!
//! The text gets a `$` sentinel, which sorts before every alphanumeric
//! character. `lcp[r]` is the longest common prefix of the suffixes at ranks
//! `r - 1` and `r`; `lcp[0]` is 0.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Longest text accepted, sentinel excluded.
pub const MAX_SUFFIX_TEXT: usize = 30;
/// Sentinel appended to the text.
pub const SENTINEL: char = '$';

const COUNTERS: &[&str] = &["comparisons", "swaps"];

/// Phase a suffix array snapshot belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuffixStage {
    /// Suffixes listed in text order.
    #[default]
    Build,
    /// Sorting suffixes.
    Sort,
    /// Computing LCP values.
    Lcp,
    /// Looking up a pattern.
    Search,
}

/// Snapshot payload for suffix array traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixState {
    /// Text including the sentinel.
    pub text: String,
    /// Suffix start positions in their current order.
    pub order: Vec<usize>,
    /// LCP values computed so far, by rank.
    pub lcp: Vec<usize>,
    /// Ranks highlighted by this step.
    pub highlighted: Vec<usize>,
    /// Pattern being searched.
    pub pattern: Option<String>,
    /// Binary-search window `[lo, hi)` over ranks.
    pub window: Option<(usize, usize)>,
    /// Text positions where the pattern occurs, ascending.
    pub matches: Vec<usize>,
    /// Phase.
    pub stage: SuffixStage,
}

impl SuffixState {
    /// Suffix strings in the current order.
    pub fn suffixes(&self) -> Vec<&str> {
        self.order.iter().map(|&i| &self.text[i..]).collect()
    }
}

/// Input for [`SuffixArrayExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixArrayInput {
    /// Alphanumeric ASCII text, without the sentinel.
    pub text: String,
    /// Optional pattern to look up once the array is built.
    pub pattern: Option<String>,
}

impl SuffixArrayInput {
    /// Build-only input.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pattern: None,
        }
    }

    /// Adds a pattern lookup.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    fn validate(&self) -> Result<(), InputError> {
        InputError::check_len("text", self.text.len(), MAX_SUFFIX_TEXT)?;
        let alnum = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric());
        if !alnum(&self.text) {
            return Err(InputError::Invalid(
                "text must contain only ASCII letters and digits".to_owned(),
            ));
        }
        if let Some(p) = &self.pattern {
            InputError::check_len("pattern", p.len(), MAX_SUFFIX_TEXT)?;
            if !alnum(p) {
                return Err(InputError::Invalid(
                    "pattern must contain only ASCII letters and digits".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

/// Builds the suffix array and LCP array, then optionally searches.
#[derive(Clone, Copy, Debug, Default)]
pub struct SuffixArrayExecutor;

impl Executor for SuffixArrayExecutor {
    type Input = SuffixArrayInput;
    type State = SuffixState;

    fn name(&self) -> &'static str {
        "suffix-array"
    }

    fn run(&self, input: &SuffixArrayInput) -> Trace<SuffixState> {
        if let Err(e) = input.validate() {
            return reject(&e, SuffixState::default());
        }
        let mut text = input.text.clone();
        text.push(SENTINEL);
        let state = SuffixState {
            order: (0..text.len()).collect(),
            text,
            ..SuffixState::default()
        };
        let rec = TraceRecorder::with_counters("Generated all suffixes", state.clone(), COUNTERS);
        let mut run = SuffixRun { state, rec };
        run.sort();
        run.kasai();
        if let Some(p) = &input.pattern {
            run.search(p);
        }
        run.rec.finish()
    }
}

struct SuffixRun {
    state: SuffixState,
    rec: TraceRecorder<SuffixState>,
}

impl SuffixRun {
    fn snap(&mut self, description: String, stage: SuffixStage, highlighted: Vec<usize>) {
        self.state.stage = stage;
        self.state.highlighted = highlighted;
        self.rec.record(description, self.state.clone());
    }

    fn suffix(&self, rank: usize) -> &str {
        &self.state.text[self.state.order[rank]..]
    }

    /// Insertion sort by adjacent swaps.
    fn sort(&mut self) {
        for i in 1..self.state.order.len() {
            let mut j = i;
            while j > 0 {
                self.rec.count("comparisons");
                if self.suffix(j - 1) <= self.suffix(j) {
                    break;
                }
                self.state.order.swap(j - 1, j);
                self.rec.count("swaps");
                let (a, b) = (self.suffix(j - 1).to_owned(), self.suffix(j).to_owned());
                self.snap(
                    format!("Swapped \"{b}\" and \"{a}\""),
                    SuffixStage::Sort,
                    vec![j - 1, j],
                );
                j -= 1;
            }
        }
        let sa = self
            .state
            .order
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.snap(format!("Suffix array constructed: [{sa}]"), SuffixStage::Sort, Vec::new());
    }

    fn kasai(&mut self) {
        let bytes = self.state.text.as_bytes().to_vec();
        let n = bytes.len();
        let mut rank = vec![0; n];
        for (r, &i) in self.state.order.iter().enumerate() {
            rank[i] = r;
        }
        self.state.lcp = vec![0; n];
        let mut h = 0_usize;
        for i in 0..n {
            if rank[i] == 0 {
                h = 0;
                continue;
            }
            let j = self.state.order[rank[i] - 1];
            while i + h < n && j + h < n && bytes[i + h] == bytes[j + h] {
                h += 1;
            }
            self.state.lcp[rank[i]] = h;
            self.snap(
                format!("LCP of suffixes {j} and {i} is {h}"),
                SuffixStage::Lcp,
                vec![rank[i] - 1, rank[i]],
            );
            h = h.saturating_sub(1);
        }
        self.snap("LCP array constructed".to_owned(), SuffixStage::Lcp, Vec::new());
    }

    fn search(&mut self, pattern: &str) {
        self.state.pattern = Some(pattern.to_owned());
        let lower = self.bound(pattern, Ordering::Less);
        let upper = self.bound(pattern, Ordering::Equal);
        let mut matches: Vec<usize> = self.state.order[lower..upper].to_vec();
        matches.sort_unstable();
        self.state.window = None;
        self.state.matches.clone_from(&matches);
        let description = if matches.is_empty() {
            format!("Pattern \"{pattern}\" not found")
        } else {
            let at = matches
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Found {} occurrence(s) of \"{pattern}\" at positions: {at}",
                matches.len()
            )
        };
        self.snap(description, SuffixStage::Search, (lower..upper).collect());
    }

    /// First rank whose suffix compares greater than `below` against the
    /// pattern (a suffix that starts with the pattern compares `Equal`).
    fn bound(&mut self, pattern: &str, below: Ordering) -> usize {
        let (mut lo, mut hi) = (0, self.state.order.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            self.rec.count("comparisons");
            let suffix = self.suffix(mid).to_owned();
            let ord = if suffix.starts_with(pattern) {
                Ordering::Equal
            } else {
                suffix.as_str().cmp(pattern)
            };
            let verdict = match ord {
                Ordering::Less => "sorts before the pattern",
                Ordering::Equal => "starts with the pattern",
                Ordering::Greater => "sorts after the pattern",
            };
            self.state.window = Some((lo, hi));
            self.snap(
                format!("Probe rank {mid}: \"{suffix}\" {verdict}"),
                SuffixStage::Search,
                vec![mid],
            );
            if ord <= below {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn banana_suffix_and_lcp_arrays() {
        let t = SuffixArrayExecutor.run(&SuffixArrayInput::new("banana"));
        let s = t.final_state();
        assert_eq!(s.order, vec![6, 5, 3, 1, 0, 4, 2]);
        assert_eq!(s.lcp, vec![0, 0, 1, 3, 0, 0, 2]);
        assert_eq!(s.suffixes()[1], "a$");
        assert!(t.last().metrics.get("swaps") > 0);
    }

    #[test]
    fn pattern_lookup_reports_all_positions() {
        let t = SuffixArrayExecutor.run(&SuffixArrayInput::new("banana").with_pattern("ana"));
        let s = t.final_state();
        assert_eq!(s.matches, vec![1, 3]);
        assert_eq!(s.highlighted, vec![2, 3]);
        assert_eq!(
            t.last().description,
            "Found 2 occurrence(s) of \"ana\" at positions: 1, 3"
        );
    }

    #[test]
    fn missing_pattern_is_reported() {
        let t = SuffixArrayExecutor.run(&SuffixArrayInput::new("banana").with_pattern("nab"));
        assert!(t.final_state().matches.is_empty());
        assert_eq!(t.last().description, "Pattern \"nab\" not found");
    }

    #[test]
    fn sentinel_suffix_sorts_first() {
        let t = SuffixArrayExecutor.run(&SuffixArrayInput::new("a"));
        assert_eq!(t.final_state().order, vec![1, 0]);
        let t = SuffixArrayExecutor.run(&SuffixArrayInput::new("abc"));
        assert_eq!(t.final_state().order, vec![3, 0, 1, 2]);
    }

    #[test]
    fn bad_text_is_rejected() {
        assert_eq!(SuffixArrayExecutor.run(&SuffixArrayInput::new("")).len(), 1);
        let t = SuffixArrayExecutor.run(&SuffixArrayInput::new("a$b"));
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].description, "text must contain only ASCII letters and digits");
    }
}

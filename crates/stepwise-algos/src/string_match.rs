// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exact pattern search: naive, KMP, Boyer-Moore and Rabin-Karp.
//!
//! All four report every occurrence, overlapping ones included, as byte
//! offsets into the text. Each character comparison records one snapshot
//! (Rabin-Karp also records one per window hash check).

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Longest text accepted.
pub const MAX_TEXT_LEN: usize = 200;

/// Rabin-Karp radix.
pub const RK_BASE: i64 = 256;
/// Rabin-Karp modulus.
pub const RK_PRIME: i64 = 101;

const COUNTERS: &[&str] = &["comparisons", "shifts", "hash_checks"];

/// Kind of step a [`MatchState`] records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStepKind {
    /// Preprocessing (LPS table, bad-character table, hashes).
    #[default]
    Setup,
    /// Characters agreed.
    Match,
    /// Characters disagreed.
    Mismatch,
    /// Window hash compared against the pattern hash.
    HashCheck,
    /// A full occurrence was confirmed.
    Found,
    /// Search finished.
    Done,
}

/// Snapshot payload for pattern-search traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Searched text.
    pub text: String,
    /// Searched pattern.
    pub pattern: String,
    /// Current alignment of `pattern[0]` in the text.
    pub window: Option<usize>,
    /// Text position under comparison.
    pub text_index: Option<usize>,
    /// Pattern position under comparison.
    pub pattern_index: Option<usize>,
    /// Occurrences confirmed so far.
    pub matches: Vec<usize>,
    /// KMP failure table (empty for other algorithms).
    pub lps: Vec<usize>,
    /// Boyer-Moore last-occurrence table, sorted by character.
    pub bad_char: Vec<(char, usize)>,
    /// Rabin-Karp `(pattern hash, window hash)`.
    pub hashes: Option<(i64, i64)>,
    /// Kind of step.
    pub kind: MatchStepKind,
}

/// Which search algorithm to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchAlgorithm {
    /// Try every alignment left to right.
    Naive,
    /// Knuth-Morris-Pratt with an LPS failure table.
    Kmp,
    /// Boyer-Moore, bad-character rule only.
    BoyerMoore,
    /// Rolling hash, base 256 modulo 101.
    RabinKarp,
}

impl MatchAlgorithm {
    /// Every algorithm, in display order.
    pub const ALL: [Self; 4] = [Self::Naive, Self::Kmp, Self::BoyerMoore, Self::RabinKarp];

    /// Stable identifier.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Kmp => "kmp",
            Self::BoyerMoore => "boyer-moore",
            Self::RabinKarp => "rabin-karp",
        }
    }
}

impl fmt::Display for MatchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchAlgorithm {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|a| a.name() == key)
            .ok_or_else(|| InputError::Invalid(format!("Unknown search algorithm `{s}`")))
    }
}

/// Input for [`StringMatchExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInput {
    /// Text to search.
    pub text: String,
    /// Pattern to find.
    pub pattern: String,
}

impl MatchInput {
    /// Convenience constructor.
    pub fn new(text: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pattern: pattern.into(),
        }
    }

    fn validate(&self) -> Result<(), InputError> {
        InputError::check_len("text", self.text.len(), MAX_TEXT_LEN)?;
        if self.pattern.is_empty() {
            return Err(InputError::Empty { what: "pattern" });
        }
        if !self.text.is_ascii() || !self.pattern.is_ascii() {
            return Err(InputError::Invalid(
                "Text and pattern must be ASCII".to_owned(),
            ));
        }
        if self.pattern.len() > self.text.len() {
            return Err(InputError::Invalid(
                "Pattern is longer than the text".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Reference search used to check the traced algorithms.
#[must_use]
pub fn brute_force_positions(text: &str, pattern: &str) -> Vec<usize> {
    let (t, p) = (text.as_bytes(), pattern.as_bytes());
    if p.is_empty() || p.len() > t.len() {
        return Vec::new();
    }
    t.windows(p.len())
        .enumerate()
        .filter(|(_, w)| *w == p)
        .map(|(i, _)| i)
        .collect()
}

/// Executor for one [`MatchAlgorithm`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringMatchExecutor {
    algorithm: MatchAlgorithm,
}

impl StringMatchExecutor {
    /// Executor for `algorithm`.
    #[must_use]
    pub fn new(algorithm: MatchAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl Executor for StringMatchExecutor {
    type Input = MatchInput;
    type State = MatchState;

    fn name(&self) -> &'static str {
        self.algorithm.name()
    }

    fn run(&self, input: &MatchInput) -> Trace<MatchState> {
        if let Err(e) = input.validate() {
            return reject(&e, MatchState::default());
        }
        let mut s = Search::new(input);
        match self.algorithm {
            MatchAlgorithm::Naive => s.naive(),
            MatchAlgorithm::Kmp => s.kmp(),
            MatchAlgorithm::BoyerMoore => s.boyer_moore(),
            MatchAlgorithm::RabinKarp => s.rabin_karp(),
        }
        s.finish()
    }
}

struct Search<'a> {
    t: &'a [u8],
    p: &'a [u8],
    base: MatchState,
    rec: TraceRecorder<MatchState>,
}

impl<'a> Search<'a> {
    fn new(input: &'a MatchInput) -> Self {
        let base = MatchState {
            text: input.text.clone(),
            pattern: input.pattern.clone(),
            ..MatchState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!(
                "Search for \"{}\" in text of length {}",
                input.pattern,
                input.text.len()
            ),
            base.clone(),
            COUNTERS,
        );
        Self {
            t: input.text.as_bytes(),
            p: input.pattern.as_bytes(),
            base,
            rec,
        }
    }

    fn snap(
        &mut self,
        description: String,
        kind: MatchStepKind,
        window: Option<usize>,
        pattern_index: Option<usize>,
    ) {
        let state = MatchState {
            window,
            pattern_index,
            text_index: window.zip(pattern_index).map(|(w, j)| w + j),
            kind,
            ..self.base.clone()
        };
        self.rec.record(description, state);
    }

    /// Compares `text[window + j]` with `pattern[j]` and records the outcome.
    fn compare(&mut self, window: usize, j: usize) -> bool {
        self.rec.count("comparisons");
        let (tc, pc) = (char::from(self.t[window + j]), char::from(self.p[j]));
        let equal = tc == pc;
        let (kind, verdict) = if equal {
            (MatchStepKind::Match, "match")
        } else {
            (MatchStepKind::Mismatch, "mismatch")
        };
        self.snap(
            format!(
                "text[{}]='{tc}' vs pattern[{j}]='{pc}': {verdict}",
                window + j
            ),
            kind,
            Some(window),
            Some(j),
        );
        equal
    }

    fn found(&mut self, window: usize) {
        self.base.matches.push(window);
        self.snap(
            format!("Pattern found at index {window}"),
            MatchStepKind::Found,
            Some(window),
            None,
        );
    }

    fn shift(&mut self, from: usize, to: usize, why: &str) {
        self.rec.count("shifts");
        self.snap(
            format!("Shift pattern from {from} to {to} ({why})"),
            MatchStepKind::Setup,
            Some(to),
            None,
        );
    }

    fn finish(mut self) -> Trace<MatchState> {
        let found = self.base.matches.len();
        self.snap(
            format!("Search complete: {found} match(es)"),
            MatchStepKind::Done,
            None,
            None,
        );
        self.rec.finish()
    }

    fn naive(&mut self) {
        let (n, m) = (self.t.len(), self.p.len());
        for s in 0..=n - m {
            let mut j = 0;
            while j < m && self.compare(s, j) {
                j += 1;
            }
            if j == m {
                self.found(s);
            }
            if s < n - m {
                self.shift(s, s + 1, "slide by one");
            }
        }
    }

    fn kmp(&mut self) {
        let (n, m) = (self.t.len(), self.p.len());
        let mut lps = vec![0usize; m];
        self.base.lps.clone_from(&lps);
        let mut len = 0;
        for i in 1..m {
            loop {
                self.rec.count("comparisons");
                if self.p[i] == self.p[len] {
                    len += 1;
                    lps[i] = len;
                    break;
                }
                if len == 0 {
                    break;
                }
                len = lps[len - 1];
            }
            self.base.lps.clone_from(&lps);
            self.snap(
                format!("LPS[{i}] = {}", lps[i]),
                MatchStepKind::Setup,
                None,
                Some(i),
            );
        }

        let (mut i, mut j) = (0usize, 0usize);
        while i < n {
            let window = i - j;
            if self.compare(window, j) {
                i += 1;
                j += 1;
                if j == m {
                    self.found(i - m);
                    j = lps[j - 1];
                    if i < n {
                        self.shift(i - m, i - j, "continue from LPS after match");
                    }
                }
            } else if j > 0 {
                let next = lps[j - 1];
                self.shift(window, i - next, &format!("LPS[{}] = {next}", j - 1));
                j = next;
            } else {
                i += 1;
                if i < n {
                    self.shift(window, i, "no prefix to reuse");
                }
            }
        }
    }

    // Shifts are signed: `j` runs down to -1 and `last` may be -1.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn boyer_moore(&mut self) {
        let (n, m) = (self.t.len(), self.p.len());
        let mut last: FxHashMap<u8, usize> = FxHashMap::default();
        for (k, &c) in self.p.iter().enumerate() {
            last.insert(c, k);
        }
        let mut table: Vec<(char, usize)> = last.iter().map(|(&c, &k)| (char::from(c), k)).collect();
        table.sort_unstable();
        self.base.bad_char = table;
        self.snap(
            "Built bad-character table".to_owned(),
            MatchStepKind::Setup,
            None,
            None,
        );

        let last_of = |c: u8| last.get(&c).map_or(-1, |&k| k as isize);
        let mut s = 0usize;
        while s <= n - m {
            let mut j = m as isize - 1;
            while j >= 0 && self.compare(s, j as usize) {
                j -= 1;
            }
            let step = if j < 0 {
                self.found(s);
                if s + m < n {
                    (m as isize - last_of(self.t[s + m])).max(1)
                } else {
                    1
                }
            } else {
                (j - last_of(self.t[s + j as usize])).max(1)
            };
            let next = s + step as usize;
            if next <= n - m {
                self.shift(s, next, "bad-character rule");
            }
            s = next;
        }
    }

    fn rabin_karp(&mut self) {
        let (n, m) = (self.t.len(), self.p.len());
        let mut h = 1i64;
        for _ in 0..m - 1 {
            h = (h * RK_BASE) % RK_PRIME;
        }
        let (mut ph, mut th) = (0i64, 0i64);
        for k in 0..m {
            ph = (RK_BASE * ph + i64::from(self.p[k])) % RK_PRIME;
            th = (RK_BASE * th + i64::from(self.t[k])) % RK_PRIME;
        }
        self.base.hashes = Some((ph, th));
        self.snap(
            format!("Pattern hash {ph}, first window hash {th}"),
            MatchStepKind::Setup,
            None,
            None,
        );

        for s in 0..=n - m {
            self.base.hashes = Some((ph, th));
            self.rec.count("hash_checks");
            let same = ph == th;
            self.snap(
                format!(
                    "Window {s}: hash {th} {} pattern hash {ph}",
                    if same { "equals" } else { "differs from" }
                ),
                MatchStepKind::HashCheck,
                Some(s),
                None,
            );
            if same {
                let mut j = 0;
                while j < m && self.compare(s, j) {
                    j += 1;
                }
                if j == m {
                    self.found(s);
                }
            }
            if s < n - m {
                th = (RK_BASE * (th - i64::from(self.t[s]) * h) + i64::from(self.t[s + m]))
                    .rem_euclid(RK_PRIME);
                self.shift(s, s + 1, "roll hash");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const TEXT: &str = "ABABDABACDABABCABCABCABCABC";
    const PATTERN: &str = "ABABCAB";

    #[test]
    fn every_algorithm_agrees_with_brute_force_on_sample() {
        let expected = brute_force_positions(TEXT, PATTERN);
        assert_eq!(expected, vec![10]);
        for alg in MatchAlgorithm::ALL {
            let trace = StringMatchExecutor::new(alg).run(&MatchInput::new(TEXT, PATTERN));
            assert_eq!(trace.final_state().matches, expected, "{alg}");
            assert_eq!(trace.last().state.kind, MatchStepKind::Done);
        }
    }

    #[test]
    fn overlapping_matches_are_reported() {
        for alg in MatchAlgorithm::ALL {
            let trace = StringMatchExecutor::new(alg).run(&MatchInput::new("AAAA", "AA"));
            assert_eq!(trace.final_state().matches, vec![0, 1, 2], "{alg}");
        }
    }

    #[test]
    fn kmp_builds_textbook_lps() {
        let trace = StringMatchExecutor::new(MatchAlgorithm::Kmp).run(&MatchInput::new(TEXT, PATTERN));
        assert_eq!(trace.final_state().lps, vec![0, 0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn boyer_moore_table_holds_last_occurrences() {
        let trace = StringMatchExecutor::new(MatchAlgorithm::BoyerMoore)
            .run(&MatchInput::new(TEXT, PATTERN));
        assert_eq!(
            trace.final_state().bad_char,
            vec![('A', 5), ('B', 6), ('C', 4)]
        );
    }

    #[test]
    fn rabin_karp_counts_one_hash_check_per_window() {
        let trace = StringMatchExecutor::new(MatchAlgorithm::RabinKarp)
            .run(&MatchInput::new(TEXT, PATTERN));
        let windows = (TEXT.len() - PATTERN.len() + 1) as u64;
        assert_eq!(trace.last().metrics.get("hash_checks"), windows);
    }

    #[test]
    fn invalid_inputs_yield_single_snapshot() {
        let exec = StringMatchExecutor::new(MatchAlgorithm::Kmp);
        assert_eq!(exec.run(&MatchInput::new("", "A")).len(), 1);
        assert_eq!(exec.run(&MatchInput::new("ABC", "")).len(), 1);
        let long = exec.run(&MatchInput::new("AB", "ABC"));
        assert_eq!(long[0].description, "Pattern is longer than the text");
    }
}

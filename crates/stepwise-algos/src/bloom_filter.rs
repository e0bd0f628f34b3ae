// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bloom filter with up to four classic string hashes.
//!
//! Hash `i` of the first `k` is used. All hashes fold bytes with 32-bit
//! wrapping arithmetic and reduce with `% m`. A query stops at the first
//! clear bit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

use crate::wide;

/// Smallest bit array accepted.
pub const MIN_BLOOM_BITS: usize = 8;
/// Largest bit array accepted.
pub const MAX_BLOOM_BITS: usize = 64;
/// Hash functions available.
pub const MAX_BLOOM_HASHES: usize = 4;
/// Longest element accepted.
pub const MAX_ELEMENT_LEN: usize = 20;
/// Longest operation script accepted.
pub const MAX_BLOOM_OPS: usize = 50;

const COUNTERS: &[&str] = &["operations", "bits_set", "probes"];

/// Java `String.hashCode` folding: `h = 31h + c` on `i32`.
fn java_hash(s: &str) -> u32 {
    s.bytes()
        .fold(0_i32, |h, c| (h << 5).wrapping_sub(h).wrapping_add(i32::from(c)))
        .unsigned_abs()
}

/// djb2: `h = 33h + c` from 5381.
fn djb2(s: &str) -> u32 {
    s.bytes()
        .fold(5381_u32, |h, c| (h << 5).wrapping_add(h).wrapping_add(u32::from(c)))
}

/// sdbm: `h = c + (h << 6) + (h << 16) - h`.
fn sdbm(s: &str) -> u32 {
    s.bytes().fold(0_u32, |h, c| {
        u32::from(c)
            .wrapping_add(h << 6)
            .wrapping_add(h << 16)
            .wrapping_sub(h)
    })
}

/// `h = (9h + c) mod m`, reduced at every step.
fn mul9_mod(s: &str, m: u32) -> u32 {
    s.bytes().fold(0_u32, |h, c| (h * 9 + u32::from(c)) % m)
}

/// Bit positions of `element` under the first `k` hashes of an `m`-bit filter.
pub fn hash_indices(element: &str, m: usize, k: usize) -> Vec<usize> {
    let m32 = u32::try_from(m).unwrap_or(u32::MAX);
    let all = [
        java_hash(element) % m32,
        djb2(element) % m32,
        sdbm(element) % m32,
        mul9_mod(element, m32),
    ];
    all.iter().take(k).map(|&i| i as usize).collect()
}

/// Expected false-positive probability `(1 - e^(-kn/m))^k`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub fn false_positive_rate(k: usize, n: usize, m: usize) -> f64 {
    if n == 0 || m == 0 {
        return 0.0;
    }
    let (k, n, m) = (k as f64, n as f64, m as f64);
    (1.0 - (-k * n / m).exp()).powi(k as i32)
}

/// Snapshot payload for Bloom filter traces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BloomState {
    /// The bit array.
    pub bits: Vec<bool>,
    /// Number of hash functions in use.
    pub hashes: usize,
    /// Element of the current operation.
    pub element: Option<String>,
    /// Bit positions of the current element, one per hash.
    pub indices: Vec<usize>,
    /// Bit position examined by this step.
    pub probe: Option<usize>,
    /// Query answer: `Some(true)` means "possibly present".
    pub result: Option<bool>,
    /// Elements added so far.
    pub elements_added: usize,
    /// Expected false-positive probability at this fill level.
    pub false_positive_rate: f64,
}

/// A Bloom filter operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloomOp {
    /// Insert an element.
    Add(String),
    /// Membership test.
    Query(String),
}

impl BloomOp {
    fn element(&self) -> &str {
        match self {
            Self::Add(e) | Self::Query(e) => e,
        }
    }
}

impl fmt::Display for BloomOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(e) => write!(f, "add {e}"),
            Self::Query(e) => write!(f, "query {e}"),
        }
    }
}

impl FromStr for BloomOp {
    type Err = InputError;

    /// Accepts `add X` and `query X`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["add", e] => Ok(Self::Add((*e).to_owned())),
            ["query", e] => Ok(Self::Query((*e).to_owned())),
            _ => Err(InputError::Parse {
                input: s.to_owned(),
                reason: "expected `add X` or `query X`".to_owned(),
            }),
        }
    }
}

fn validate_element(e: &str) -> Result<(), InputError> {
    InputError::check_len("element", e.len(), MAX_ELEMENT_LEN)?;
    if e.bytes().all(|b| b.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(InputError::Invalid(format!(
            "element `{e}` must be printable ASCII without spaces"
        )))
    }
}

fn validate_shape(bits: usize, hashes: usize) -> Result<(), InputError> {
    InputError::check_range(
        "bit count",
        wide(bits),
        wide(MIN_BLOOM_BITS),
        wide(MAX_BLOOM_BITS),
    )?;
    InputError::check_range("hash count", wide(hashes), 1, wide(MAX_BLOOM_HASHES))
}

/// Live Bloom filter that records a snapshot per bit touched.
#[derive(Debug, Clone)]
pub struct BloomSession {
    state: BloomState,
    rec: TraceRecorder<BloomState>,
}

impl BloomSession {
    /// Empty filter of `bits` bits using `hashes` hash functions.
    ///
    /// # Errors
    /// [`InputError::OutOfRange`] for unsupported shapes.
    pub fn new(bits: usize, hashes: usize) -> Result<Self, InputError> {
        validate_shape(bits, hashes)?;
        let state = BloomState {
            bits: vec![false; bits],
            hashes,
            ..BloomState::default()
        };
        let rec = TraceRecorder::with_counters(
            format!("Bloom filter initialized with {bits} bits and {hashes} hash functions"),
            state.clone(),
            COUNTERS,
        );
        Ok(Self { state, rec })
    }

    /// Sets the bits of `element`.
    ///
    /// # Errors
    /// Empty, oversized or non-printable elements.
    pub fn add(&mut self, element: &str) -> Result<(), InputError> {
        validate_element(element)?;
        self.rec.count("operations");
        self.begin(element, "Computing hash indices for");
        for idx in self.state.indices.clone() {
            self.rec.count("probes");
            self.state.probe = Some(idx);
            let was = std::mem::replace(&mut self.state.bits[idx], true);
            let what = if was {
                "already set"
            } else {
                self.rec.count("bits_set");
                "set"
            };
            self.snap(format!("Bit {idx} {what}"));
        }
        self.state.probe = None;
        self.state.elements_added += 1;
        self.refresh_rate();
        let at = join(&self.state.indices);
        self.snap(format!("Added \"{element}\"; bits at positions {at} are set"));
        Ok(())
    }

    /// Tests membership; `true` means "possibly present".
    ///
    /// # Errors
    /// Empty, oversized or non-printable elements.
    pub fn query(&mut self, element: &str) -> Result<bool, InputError> {
        validate_element(element)?;
        self.rec.count("operations");
        self.begin(element, "Checking hash indices for");
        let mut hit = true;
        for idx in self.state.indices.clone() {
            self.rec.count("probes");
            self.state.probe = Some(idx);
            let set = self.state.bits[idx];
            self.snap(format!("Bit {idx} is {}", if set { "1" } else { "0" }));
            if !set {
                hit = false;
                break;
            }
        }
        self.state.probe = None;
        self.state.result = Some(hit);
        self.snap(if hit {
            format!("\"{element}\" might be in the set (all bits set)")
        } else {
            format!("\"{element}\" is definitely NOT in the set (a bit is 0)")
        });
        Ok(hit)
    }

    /// Applies one scripted operation.
    ///
    /// # Errors
    /// As the underlying operation.
    pub fn apply(&mut self, op: &BloomOp) -> Result<(), InputError> {
        match op {
            BloomOp::Add(e) => self.add(e),
            BloomOp::Query(e) => self.query(e).map(|_| ()),
        }
    }

    /// Publishes the steps recorded so far.
    pub fn trace(&self) -> Trace<BloomState> {
        self.rec.snapshot_trace()
    }

    /// Ends the session and returns its full trace.
    pub fn into_trace(self) -> Trace<BloomState> {
        self.rec.finish()
    }

    fn begin(&mut self, element: &str, verb: &str) {
        self.state.element = Some(element.to_owned());
        self.state.result = None;
        self.state.indices = hash_indices(element, self.state.bits.len(), self.state.hashes);
        let at = join(&self.state.indices);
        self.snap(format!("{verb} \"{element}\": {at}"));
    }

    fn refresh_rate(&mut self) {
        self.state.false_positive_rate =
            false_positive_rate(self.state.hashes, self.state.elements_added, self.state.bits.len());
    }

    fn snap(&mut self, description: String) {
        self.rec.record(description, self.state.clone());
    }
}

fn join(v: &[usize]) -> String {
    v.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Batch input for [`BloomFilterExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomScript {
    /// Bit array size.
    pub bits: usize,
    /// Number of hash functions.
    pub hashes: usize,
    /// Operations to apply in order.
    pub ops: Vec<BloomOp>,
}

/// Runs a [`BloomScript`] through a fresh [`BloomSession`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BloomFilterExecutor;

impl Executor for BloomFilterExecutor {
    type Input = BloomScript;
    type State = BloomState;

    fn name(&self) -> &'static str {
        "bloom-filter"
    }

    fn run(&self, input: &BloomScript) -> Trace<BloomState> {
        let checked = validate_shape(input.bits, input.hashes)
            .and_then(|()| InputError::check_len("operation script", input.ops.len(), MAX_BLOOM_OPS))
            .and_then(|()| input.ops.iter().try_for_each(|op| validate_element(op.element())));
        if let Err(e) = checked {
            return reject(&e, BloomState::default());
        }
        let mut session = match BloomSession::new(input.bits, input.hashes) {
            Ok(s) => s,
            Err(e) => return reject(&e, BloomState::default()),
        };
        for op in &input.ops {
            if let Err(e) = session.apply(op) {
                return reject(&e, BloomState::default());
            }
        }
        session.into_trace()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
    use super::*;

    #[test]
    fn hash_family_matches_reference_values() {
        assert_eq!(java_hash("hello"), 99_162_322);
        assert_eq!(djb2("hello"), 261_238_937);
        assert_eq!(hash_indices("hello", 32, 4), vec![18, 25, 18, 12]);
    }

    #[test]
    fn added_elements_always_test_positive() {
        let mut f = BloomSession::new(32, 3).unwrap();
        for w in ["apple", "banana", "cherry"] {
            f.add(w).unwrap();
        }
        for w in ["apple", "banana", "cherry"] {
            assert!(f.query(w).unwrap());
        }
        let t = f.trace();
        assert_eq!(t.final_state().elements_added, 3);
        assert!(t.final_state().false_positive_rate > 0.0);
    }

    #[test]
    fn query_stops_at_first_clear_bit() {
        let mut f = BloomSession::new(64, 4).unwrap();
        assert!(!f.query("ghost").unwrap());
        let t = f.trace();
        assert_eq!(t.last().metrics.get("probes"), 1);
        assert_eq!(t.final_state().result, Some(false));
    }

    #[test]
    fn empty_filter_has_zero_false_positive_rate() {
        assert_eq!(false_positive_rate(3, 0, 32), 0.0);
        let r = false_positive_rate(3, 3, 32);
        assert!((r - 0.0147).abs() < 1e-3);
    }

    #[test]
    fn executor_rejects_bad_shape() {
        let t = BloomFilterExecutor.run(&BloomScript {
            bits: 32,
            hashes: 5,
            ops: vec![BloomOp::Add("x".to_owned())],
        });
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].description, "hash count 5 is out of range [1, 4]");
    }
}

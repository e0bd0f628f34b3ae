// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Polynomial parsing and term-by-term multiplication.
//!
//! Polynomials are written in one variable `x`, e.g. `3x^2 - x + 4`. A bare
//! `x` means `1x`; zero-coefficient terms vanish. Multiplication walks every
//! pair of terms, left operand outer, and folds each product into the
//! running result, combining like exponents.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::{reject, Executor, InputError, Trace, TraceRecorder};

/// Most terms per operand.
pub const MAX_TERMS: usize = 10;
/// Largest absolute coefficient per operand term.
pub const MAX_COEFFICIENT: i64 = 1000;
/// Largest exponent per operand term.
pub const MAX_EXPONENT: u32 = 20;

const COUNTERS: &[&str] = &["multiplications", "combinations"];

/// One `c·x^e` term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Coefficient; never zero inside a parsed polynomial.
    pub coefficient: i64,
    /// Power of `x`.
    pub exponent: u32,
}

impl Term {
    fn times(self, other: Self) -> Self {
        Self {
            coefficient: self.coefficient * other.coefficient,
            exponent: self.exponent + other.exponent,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent == 0 {
            return write!(f, "{}", self.coefficient);
        }
        match self.coefficient {
            1 => {}
            -1 => f.write_str("-")?,
            c => write!(f, "{c}")?,
        }
        f.write_str("x")?;
        if self.exponent > 1 {
            write!(f, "^{}", self.exponent)?;
        }
        Ok(())
    }
}

/// A parsed polynomial; terms keep their written order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polynomial {
    /// Non-zero terms.
    pub terms: Vec<Term>,
}

impl Polynomial {
    /// Terms sorted by descending exponent.
    pub fn descending(&self) -> Vec<Term> {
        let mut terms = self.terms.clone();
        terms.sort_by(|a, b| b.exponent.cmp(&a.exponent));
        terms
    }

    fn parse_term(raw: &str, whole: &str) -> Result<Term, InputError> {
        let err = |reason: String| InputError::Parse {
            input: whole.to_owned(),
            reason,
        };
        let (sign, body) = match raw.as_bytes().first() {
            Some(b'-') => (-1, &raw[1..]),
            Some(b'+') => (1, &raw[1..]),
            _ => (1, raw),
        };
        if body.is_empty() {
            return Err(err("empty term".to_owned()));
        }
        let (coefficient, exponent) = match body.split_once('x') {
            Some((coef, power)) => {
                let coefficient = if coef.is_empty() {
                    1
                } else {
                    coef.parse::<i64>()
                        .map_err(|_| err(format!("bad coefficient in `{raw}`")))?
                };
                let exponent = if power.is_empty() {
                    1
                } else {
                    power
                        .strip_prefix('^')
                        .and_then(|p| p.parse::<u32>().ok())
                        .ok_or_else(|| err(format!("bad exponent in `{raw}`")))?
                };
                (coefficient, exponent)
            }
            None => (
                body.parse::<i64>()
                    .map_err(|_| err(format!("bad constant `{raw}`")))?,
                0,
            ),
        };
        InputError::check_range("coefficient", coefficient, -MAX_COEFFICIENT, MAX_COEFFICIENT)?;
        InputError::check_range("exponent", exponent.into(), 0, MAX_EXPONENT.into())?;
        Ok(Term {
            coefficient: sign * coefficient,
            exponent,
        })
    }
}

impl FromStr for Polynomial {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if clean.is_empty() {
            return Err(InputError::Empty { what: "polynomial" });
        }
        if let Some(bad) = clean
            .chars()
            .find(|c| !(c.is_ascii_digit() || matches!(c, 'x' | '^' | '+' | '-')))
        {
            return Err(InputError::Parse {
                input: s.to_owned(),
                reason: format!("invalid character `{bad}`"),
            });
        }
        let mut raw_terms = Vec::new();
        let mut start = 0;
        for (i, c) in clean.char_indices() {
            if i > 0 && matches!(c, '+' | '-') {
                raw_terms.push(&clean[start..i]);
                start = i;
            }
        }
        raw_terms.push(&clean[start..]);
        InputError::check_len("polynomial", raw_terms.len(), MAX_TERMS)?;
        let mut terms = Vec::with_capacity(raw_terms.len());
        for raw in raw_terms {
            let term = Self::parse_term(raw, s)?;
            if term.coefficient != 0 {
                terms.push(term);
            }
        }
        Ok(Self { terms })
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self.descending();
        if terms.is_empty() {
            return f.write_str("0");
        }
        for (i, term) in terms.iter().enumerate() {
            let magnitude = Term {
                coefficient: term.coefficient.abs(),
                exponent: term.exponent,
            };
            match (i, term.coefficient < 0) {
                (0, true) => f.write_str("-")?,
                (0, false) => {}
                (_, true) => f.write_str(" - ")?,
                (_, false) => f.write_str(" + ")?,
            }
            write!(f, "{magnitude}")?;
        }
        Ok(())
    }
}

/// Two polynomials as typed by the learner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolynomialInput {
    /// Left operand text.
    pub left: String,
    /// Right operand text.
    pub right: String,
}

impl PolynomialInput {
    /// Input for `left × right`.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// What a multiplication snapshot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolyStep {
    /// Parsed operands.
    #[default]
    Init,
    /// One pair of terms multiplied.
    Multiply,
    /// Product complete.
    Done,
}

/// Snapshot payload for polynomial multiplication traces.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolyState {
    /// Left operand terms, written order.
    pub left: Vec<Term>,
    /// Right operand terms, written order.
    pub right: Vec<Term>,
    /// Running product, descending exponents, zeros dropped.
    pub result: Vec<Term>,
    /// Term indices `(left, right)` just multiplied.
    pub current: Option<(usize, usize)>,
    /// Product of the current pair.
    pub product: Option<Term>,
    /// Kind of step.
    pub step: PolyStep,
}

/// Multiplies two polynomials term by term.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolynomialExecutor;

impl Executor for PolynomialExecutor {
    type Input = PolynomialInput;
    type State = PolyState;

    fn name(&self) -> &'static str {
        "polynomial-multiply"
    }

    fn run(&self, input: &PolynomialInput) -> Trace<PolyState> {
        let parsed = input
            .left
            .parse::<Polynomial>()
            .and_then(|l| input.right.parse::<Polynomial>().map(|r| (l, r)));
        let (left, right) = match parsed {
            Ok(pair) => pair,
            Err(e) => return reject(&e, PolyState::default()),
        };
        let mut state = PolyState {
            left: left.terms.clone(),
            right: right.terms.clone(),
            ..PolyState::default()
        };
        let mut rec = TraceRecorder::with_counters(
            format!("Multiply ({left}) × ({right})"),
            state.clone(),
            COUNTERS,
        );
        let mut acc: BTreeMap<u32, i64> = BTreeMap::new();
        for (i, &a) in left.terms.iter().enumerate() {
            for (j, &b) in right.terms.iter().enumerate() {
                let p = a.times(b);
                rec.count("multiplications");
                let mut description = format!("Multiply {a} × {b} = {p}");
                if let Some(existing) = acc.get_mut(&p.exponent) {
                    *existing += p.coefficient;
                    rec.count("combinations");
                    description.push_str(&format!(
                        "; combined into the x^{} coefficient, now {existing}",
                        p.exponent
                    ));
                } else {
                    acc.insert(p.exponent, p.coefficient);
                }
                state.result = collect(&acc);
                state.current = Some((i, j));
                state.product = Some(p);
                state.step = PolyStep::Multiply;
                rec.record(description, state.clone());
            }
        }
        state.current = None;
        state.product = None;
        state.step = PolyStep::Done;
        let product = Polynomial {
            terms: state.result.clone(),
        };
        rec.record(format!("Polynomial multiplication completed: {product}"), state);
        rec.finish()
    }
}

fn collect(acc: &BTreeMap<u32, i64>) -> Vec<Term> {
    acc.iter()
        .rev()
        .filter(|&(_, &c)| c != 0)
        .map(|(&exponent, &coefficient)| Term {
            coefficient,
            exponent,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn poly(s: &str) -> Polynomial {
        s.parse().unwrap()
    }

    #[test]
    fn parses_implicit_coefficients_and_signs() {
        let p = poly("3x^2 - x + 4");
        assert_eq!(
            p.terms,
            vec![
                Term { coefficient: 3, exponent: 2 },
                Term { coefficient: -1, exponent: 1 },
                Term { coefficient: 4, exponent: 0 },
            ]
        );
        assert_eq!(p.to_string(), "3x^2 - x + 4");
        assert_eq!(poly("-X^3+0x+7").to_string(), "-x^3 + 7");
        assert_eq!(poly("0x").to_string(), "0");
    }

    #[test]
    fn malformed_polynomials_fail_to_parse() {
        assert!("2x^".parse::<Polynomial>().is_err());
        assert!("3y".parse::<Polynomial>().is_err());
        assert!("1+".parse::<Polynomial>().is_err());
        assert!("x^21".parse::<Polynomial>().is_err());
        assert_eq!(
            "".parse::<Polynomial>(),
            Err(InputError::Empty { what: "polynomial" })
        );
    }

    #[test]
    fn multiplies_and_combines_like_terms() {
        let t = PolynomialExecutor.run(&PolynomialInput::new("2x^2 + 3x + 1", "x + 2"));
        assert_eq!(t.len(), 8);
        assert_eq!(t.last().metrics.get("multiplications"), 6);
        assert_eq!(t.last().metrics.get("combinations"), 2);
        assert_eq!(
            t.last().description,
            "Polynomial multiplication completed: 2x^3 + 7x^2 + 7x + 2"
        );
        assert_eq!(t[1].description, "Multiply 2x^2 × x = 2x^3");
    }

    #[test]
    fn cancelled_terms_drop_out() {
        let t = PolynomialExecutor.run(&PolynomialInput::new("x + 1", "x - 1"));
        let result = Polynomial {
            terms: t.final_state().result.clone(),
        };
        assert_eq!(result.to_string(), "x^2 - 1");
    }

    #[test]
    fn parse_errors_become_rejections() {
        let t = PolynomialExecutor.run(&PolynomialInput::new("x + 1", "x*2"));
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].description, "Cannot parse `x*2`: invalid character `*`");
        assert_eq!(t[0].state, PolyState::default());
    }
}

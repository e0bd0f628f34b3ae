// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation scripts shared by the Fenwick and segment tree executors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stepwise_core::InputError;

use crate::wide;

/// Largest array either range-sum structure accepts.
pub const MAX_RANGE_LEN: usize = 32;
/// Longest operation script accepted.
pub const MAX_RANGE_OPS: usize = 50;

/// Smallest accepted element or assigned value.
pub const MIN_RANGE_VALUE: i64 = -1_000_000;
/// Largest accepted element or assigned value.
pub const MAX_RANGE_VALUE: i64 = 1_000_000;

/// A point update or query over a 0-based array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeSumOp {
    /// Assign `array[index] = value`.
    Set {
        /// Position to overwrite.
        index: usize,
        /// New value.
        value: i64,
    },
    /// Sum of `array[0..=index]`.
    Prefix {
        /// Last position included.
        index: usize,
    },
    /// Sum of `array[left..=right]`.
    Range {
        /// First position included.
        left: usize,
        /// Last position included.
        right: usize,
    },
}

impl RangeSumOp {
    /// Checks indices against an array of `len` elements.
    pub(crate) fn validate(&self, len: usize) -> Result<(), InputError> {
        let max = wide(len) - 1;
        match *self {
            Self::Set { index, value } => {
                InputError::check_range("index", wide(index), 0, max)?;
                InputError::check_range("value", value, MIN_RANGE_VALUE, MAX_RANGE_VALUE)
            }
            Self::Prefix { index } => InputError::check_range("index", wide(index), 0, max),
            Self::Range { left, right } => {
                InputError::check_range("left", wide(left), 0, max)?;
                InputError::check_range("right", wide(right), wide(left), max)
            }
        }
    }
}

impl fmt::Display for RangeSumOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { index, value } => write!(f, "set {index} {value}"),
            Self::Prefix { index } => write!(f, "prefix {index}"),
            Self::Range { left, right } => write!(f, "range {left} {right}"),
        }
    }
}

impl FromStr for RangeSumOp {
    type Err = InputError;

    /// Accepts `set I V`, `prefix I` and `range L R`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: &str| InputError::Parse {
            input: s.to_owned(),
            reason: reason.to_owned(),
        };
        let parts: Vec<&str> = s.split_whitespace().collect();
        let num = |t: &str| -> Result<usize, InputError> {
            t.parse().map_err(|_| parse_err("index is not a non-negative integer"))
        };
        match parts.as_slice() {
            ["set", i, v] => Ok(Self::Set {
                index: num(*i)?,
                value: v.parse().map_err(|_| parse_err("value is not an integer"))?,
            }),
            ["prefix", i] => Ok(Self::Prefix { index: num(*i)? }),
            ["range", l, r] => Ok(Self::Range {
                left: num(*l)?,
                right: num(*r)?,
            }),
            _ => Err(parse_err("expected `set I V`, `prefix I` or `range L R`")),
        }
    }
}

/// Batch input: an initial array followed by operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSumScript {
    /// Initial contents.
    pub values: Vec<i64>,
    /// Operations applied after the build.
    pub ops: Vec<RangeSumOp>,
}

impl RangeSumScript {
    /// Validates the array and every operation up front.
    pub(crate) fn validate(&self) -> Result<(), InputError> {
        validate_values(&self.values)?;
        if self.ops.len() > MAX_RANGE_OPS {
            return Err(InputError::TooMany {
                what: "operation script",
                max: MAX_RANGE_OPS,
                actual: self.ops.len(),
            });
        }
        self.ops
            .iter()
            .try_for_each(|op| op.validate(self.values.len()))
    }
}

pub(crate) fn validate_values(values: &[i64]) -> Result<(), InputError> {
    InputError::check_len("array", values.len(), MAX_RANGE_LEN)?;
    values
        .iter()
        .try_for_each(|&v| InputError::check_range("value", v, MIN_RANGE_VALUE, MAX_RANGE_VALUE))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn ops_parse() {
        assert_eq!(
            "set 2 -4".parse::<RangeSumOp>().unwrap(),
            RangeSumOp::Set { index: 2, value: -4 }
        );
        assert_eq!(
            "range 1 3".parse::<RangeSumOp>().unwrap(),
            RangeSumOp::Range { left: 1, right: 3 }
        );
        assert!("range -1 3".parse::<RangeSumOp>().is_err());
        assert!("sum 1".parse::<RangeSumOp>().is_err());
    }

    #[test]
    fn inverted_range_is_invalid() {
        let op = RangeSumOp::Range { left: 3, right: 1 };
        assert_eq!(
            op.validate(8).unwrap_err().to_string(),
            "right 1 is out of range [3, 7]"
        );
    }
}

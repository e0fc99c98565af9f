//! Lexicographic range splitting.
//!
//! Names are treated as numbers written in a positional system whose digits
//! are the characters of an alphabet, ordered by code point. Splitting a range
//! `[start, end)` into `n + 1` pieces extends both bounds one digit at a time
//! until their numeric difference exceeds `n`, then places `n` evenly spaced
//! points between them and renders those points back into names.
//!
//! # Examples
//!
//! ```
//! use fastlist_core::splitter::RangeSplitter;
//!
//! let splitter = RangeSplitter::new("0123456789").unwrap();
//! assert_eq!(splitter.split_range("", "9", 2).unwrap(), vec!["3", "6"]);
//! assert!(splitter.split_range("", "0", 100).unwrap().is_empty());
//! ```

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::{FastListResult, ListError};

/// Alphabet used by the lister when none is configured: printable ASCII.
pub const DEFAULT_ALPHABET: &str =
    " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Sorted, deduplicated characters with their ranks.
#[derive(Debug, Clone)]
struct Alphabet {
    chars: Vec<char>,
    positions: HashMap<char, usize>,
}

impl Alphabet {
    fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let chars: Vec<char> = chars.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let positions = chars.iter().enumerate().map(|(i, c)| (*c, i)).collect();
        Self { chars, positions }
    }

    /// Borrow `self` if it already holds every character of `extra`,
    /// otherwise build a widened copy.
    fn extended<'a>(&'a self, extra: impl Iterator<Item = char> + Clone) -> Cow<'a, Self> {
        if extra.clone().all(|c| self.positions.contains_key(&c)) {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(Self::from_chars(self.chars.iter().copied().chain(extra)))
        }
    }

    fn radix(&self) -> usize {
        self.chars.len()
    }

    fn smallest(&self) -> usize {
        0
    }

    fn largest(&self) -> usize {
        self.chars.len() - 1
    }

    fn position(&self, ch: char) -> FastListResult<usize> {
        self.positions
            .get(&ch)
            .copied()
            .ok_or_else(|| ListError::invalid_argument(format!("character {ch:?} is not in the alphabet")))
    }

    fn digits(&self, s: &str) -> FastListResult<Vec<usize>> {
        s.chars().map(|c| self.position(c)).collect()
    }

    /// Render `value` as exactly `len` digits.
    fn render(&self, mut value: BigUint, len: usize) -> String {
        let radix = BigUint::from(self.radix());
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let digit = (&value % &radix).to_usize().unwrap_or_default();
            value /= &radix;
            out.push(self.chars[digit]);
        }
        out.iter().rev().collect()
    }
}

/// Both bounds of a range as integers of a common precision.
#[derive(Debug)]
struct MinimalIntRange {
    start: BigUint,
    end: BigUint,
    len: usize,
}

/// Splits lexicographic ranges into evenly spaced sub-ranges.
///
/// The splitter is immutable after construction and can be shared between
/// workers. Characters met in a range that are not part of the construction
/// alphabet are folded into a per-call alphabet.
#[derive(Debug, Clone)]
pub struct RangeSplitter {
    alphabet: Alphabet,
}

impl RangeSplitter {
    /// Create a splitter over the characters of `alphabet`.
    pub fn new(alphabet: &str) -> FastListResult<Self> {
        if alphabet.is_empty() {
            return Err(ListError::invalid_argument(
                "no alphabet specified for the range splitter",
            ));
        }
        Ok(Self {
            alphabet: Alphabet::from_chars(alphabet.chars()),
        })
    }

    /// Rank of `ch` within the construction alphabet.
    pub fn char_position(&self, ch: char) -> FastListResult<usize> {
        self.alphabet.position(ch)
    }

    /// Compute `num_splits` names strictly inside `(start, end)`.
    ///
    /// An empty `end` is unbounded. The result holds either exactly
    /// `num_splits` ascending names or none at all when the range is too
    /// narrow to split that many ways.
    pub fn split_range(&self, start: &str, end: &str, num_splits: usize) -> FastListResult<Vec<String>> {
        if num_splits < 1 {
            return Err(ListError::invalid_argument(format!(
                "number of splits should be at least 1, got {num_splits}"
            )));
        }
        if !end.is_empty() && start > end {
            return Err(ListError::invalid_argument(format!(
                "start range {start:?} is lexicographically greater than end range {end:?}"
            )));
        }

        let alphabet = self.alphabet.extended(start.chars().chain(end.chars()));
        if alphabet.radix() < 2 {
            return Ok(Vec::new());
        }
        let start_digits = alphabet.digits(start)?;
        let end_digits = alphabet.digits(end)?;
        let unbounded = end_digits.is_empty();

        if !unbounded && equal_with_padding(&start_digits, &end_digits, alphabet.smallest()) {
            return Ok(Vec::new());
        }

        let range = minimal_int_range(&alphabet, &start_digits, &end_digits, num_splits);
        let diff = &range.end - &range.start;
        let intervals = BigUint::from(num_splits) + 1u32;

        let points: Vec<String> = (1..=num_splits)
            .map(|i| {
                let offset = &diff * BigUint::from(i) / &intervals;
                alphabet.render(&range.start + offset, range.len)
            })
            .filter(|point| point.as_str() > start && (unbounded || point.as_str() < end))
            .collect();

        if points.len() == num_splits {
            Ok(points)
        } else {
            Ok(Vec::new())
        }
    }
}

fn equal_with_padding(start: &[usize], end: &[usize], pad: usize) -> bool {
    let len = start.len().max(end.len());
    (0..len).all(|i| start.get(i).unwrap_or(&pad) == end.get(i).unwrap_or(&pad))
}

/// Extend both bounds digit by digit until `end - start > num_splits`.
///
/// Missing start digits pad with the smallest character; missing end digits
/// pad with the smallest character for a bounded end and with the largest
/// for an unbounded one. The caller guarantees the padded bounds differ.
fn minimal_int_range(alphabet: &Alphabet, start: &[usize], end: &[usize], num_splits: usize) -> MinimalIntRange {
    let radix = BigUint::from(alphabet.radix());
    let threshold = BigUint::from(num_splits);
    let end_pad = if end.is_empty() {
        alphabet.largest()
    } else {
        alphabet.smallest()
    };

    let mut start_int = BigUint::zero();
    let mut end_int = BigUint::zero();
    let mut len = 0;
    loop {
        start_int = start_int * &radix + start.get(len).copied().unwrap_or(alphabet.smallest());
        end_int = end_int * &radix + end.get(len).copied().unwrap_or(end_pad);
        len += 1;
        if end_int > start_int && &end_int - &start_int > threshold {
            return MinimalIntRange {
                start: start_int,
                end: end_int,
                len,
            };
        }
    }
}

//! # Tally directives in shot names
//!
//! Operators assign a switcher shot to tally receivers by tagging its name
//! with a bracketed group:
//!
//! ```text
//! Wide shot [T:1,3]
//! ```
//!
//! * Only the first bracketed group in the name is considered.
//! * The key before the first `:` must be `T` (or `t`).
//! * The value is a comma separated list of 1-based receiver numbers.
//!   Tokens which aren't integers, or are outside of
//!   `1..=`[`MAX_RECEIVERS`], are skipped without affecting the rest of the
//!   list.
//!
//! A name without a valid directive assigns the shot to no receivers.
use crate::MAX_RECEIVERS;
use regex::Regex;
use std::collections::BTreeSet;

/// Directive key for tally receivers.
const TALLY_KEY: &str = "T";

lazy_static! {
    /// First bracketed group, non-greedy. `.` never matches a newline, so a
    /// group can't span lines.
    static ref BRACKET_GROUP: Regex = Regex::new(r"\[(.*?)\]").unwrap();
}

/// The set of receivers a shot is assigned to.
///
/// Indices are 0-based (ie: receiver `[T:1]` is index `0`), and are always
/// less than [`MAX_RECEIVERS`].
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TallyDirective {
    indices: BTreeSet<u8>,
}

impl TallyDirective {
    /// Parses the tally directive from a shot name.
    ///
    /// This never fails: a missing or malformed directive results in an empty
    /// [TallyDirective].
    pub fn parse(name: &str) -> Self {
        let Some(group) = first_bracket_group(name) else {
            return Self::default();
        };

        let Some((key, value)) = group.split_once(':') else {
            return Self::default();
        };

        if !key.eq_ignore_ascii_case(TALLY_KEY) {
            return Self::default();
        }

        Self {
            indices: value.split(',').filter_map(receiver_index).collect(),
        }
    }

    /// Returns `true` if the directive assigns the shot to no receivers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of receivers the shot is assigned to.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if the 0-based receiver `index` is in the directive.
    pub fn contains(&self, index: usize) -> bool {
        u8::try_from(index).is_ok_and(|i| self.indices.contains(&i))
    }

    /// Iterates over the 0-based receiver indices, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().map(|&i| usize::from(i))
    }
}

/// Finds the contents of the first `[...]` group which doesn't span a line.
fn first_bracket_group(name: &str) -> Option<&str> {
    BRACKET_GROUP
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Converts a 1-based receiver number token into a 0-based index.
fn receiver_index(token: &str) -> Option<u8> {
    let n: i64 = token.trim().parse().ok()?;
    let index = usize::try_from(n.checked_sub(1)?).ok()?;
    if index >= MAX_RECEIVERS {
        return None;
    }
    u8::try_from(index).ok()
}

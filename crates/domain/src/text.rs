//! Bounded text helpers.
//!
//! Stored strings have fixed byte budgets. Truncation always lands on a
//! UTF-8 character boundary so the result stays valid.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Byte budget of a string [`Value`](crate::value::Value).
pub const MAX_VALUE_LEN: usize = 63;

/// Byte budget of an [`ActionResult`](crate::result::ActionResult) output
/// and of a variable-expanded string.
pub const MAX_OUTPUT_LEN: usize = 255;

/// Byte budget of rule and template names.
pub const MAX_NAME_LEN: usize = 31;

/// Return the longest prefix of `s` that fits in `max` bytes.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate `s` in place to at most `max` bytes.
pub fn truncate_in_place(s: &mut String, max: usize) {
    let len = truncate_str(s, max).len();
    s.truncate(len);
}

/// A string holding at most [`MAX_VALUE_LEN`] bytes.
///
/// Longer input is silently truncated on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ShortString(String);

impl ShortString {
    /// Wrap `value`, truncating it to the budget.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        let mut value = value.into();
        truncate_in_place(&mut value, MAX_VALUE_LEN);
        Self(value)
    }

    /// Borrow as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ShortString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ShortString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ShortString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<ShortString> for String {
    fn from(value: ShortString) -> Self {
        value.0
    }
}

impl fmt::Display for ShortString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

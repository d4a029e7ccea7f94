//! Typed variable values and their comparison rules.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::text::ShortString;

/// Two floats closer than this compare equal.
pub const FLOAT_EPSILON: f64 = 0.0001;

/// A single typed variable value.
///
/// Serialized untagged: `null`, `true`, `42`, `36.5`, `"text"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Float(f64),
    String(ShortString),
}

impl Value {
    /// Build a string value, truncated to the value budget.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(ShortString::new(value))
    }

    /// Name of the variant, as used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Numeric view used for mixed-type comparisons.
    ///
    /// `Null` and strings have none.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(f64::from(*i)),
            Self::Float(f) => Some(*f),
            Self::Null | Self::String(_) => None,
        }
    }

    /// Borrow the string payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Three-way comparison.
    ///
    /// Same-type values compare natively (floats within
    /// [`FLOAT_EPSILON`], strings bytewise). Mixed types are compared as
    /// `f64`; when either side has no numeric view the values are reported
    /// [`Ordering::Equal`].
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => compare_f64(*a, *b),
            (Self::String(a), Self::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => compare_f64(a, b),
                _ => Ordering::Equal,
            },
        }
    }
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < FLOAT_EPSILON {
        return Ordering::Equal;
    }
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Rendering used by `${name}` expansion: floats with two decimals,
/// `Null` as the empty string.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v:.2}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

//! Condition — a comparison between a live variable and an operand.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::Value;

/// Comparison operator applied to a variable's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Le,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Ge,
    /// Substring match; only defined when both sides are strings.
    Contains,
    /// Always false: no value history is tracked.
    Changed,
    /// Always false: no value history is tracked.
    ChangedTo,
}

impl Operator {
    /// Apply the operator to the `actual` variable value and the `operand`.
    #[must_use]
    pub fn apply(self, actual: &Value, operand: &Value) -> bool {
        match self {
            Self::Eq => actual.compare(operand) == Ordering::Equal,
            Self::Ne => actual.compare(operand) != Ordering::Equal,
            Self::Lt => actual.compare(operand) == Ordering::Less,
            Self::Le => actual.compare(operand) != Ordering::Greater,
            Self::Gt => actual.compare(operand) == Ordering::Greater,
            Self::Ge => actual.compare(operand) != Ordering::Less,
            Self::Contains => match (actual.as_str(), operand.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
            Self::Changed | Self::ChangedTo => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Contains => "contains",
            Self::Changed => "changed",
            Self::ChangedTo => "changed_to",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" | "==" => Ok(Self::Eq),
            "ne" | "!=" => Ok(Self::Ne),
            "lt" | "<" => Ok(Self::Lt),
            "le" | "<=" => Ok(Self::Le),
            "gt" | ">" => Ok(Self::Gt),
            "ge" | ">=" => Ok(Self::Ge),
            "contains" => Ok(Self::Contains),
            "changed" => Ok(Self::Changed),
            "changed_to" => Ok(Self::ChangedTo),
            _ => Err(ValidationError::UnknownOperator(s.to_string())),
        }
    }
}

/// A predicate over one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Name of the variable in the variable store.
    pub variable: String,
    pub operator: Operator,
    /// Right-hand side of the comparison.
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    #[must_use]
    pub fn new(variable: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            variable: variable.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:?}", self.variable, self.operator, self.value)
    }
}

/// How the conditions of a group combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Logic {
    #[default]
    And,
    Or,
}

/// A list of conditions joined by one [`Logic`]. An empty group holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionGroup {
    pub logic: Logic,
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    /// Group whose conditions must all hold.
    #[must_use]
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            logic: Logic::And,
            conditions,
        }
    }

    /// Group where one holding condition is enough.
    #[must_use]
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            logic: Logic::Or,
            conditions,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

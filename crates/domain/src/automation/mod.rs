//! Rules — condition group → action sequence, rate limited by a cooldown.
//!
//! A [`Rule`] watches variables through its [`ConditionGroup`]. When the
//! group holds and the rule is neither disabled nor cooling down, its
//! [`Action`]s run in order.

mod action;
mod condition;

pub use action::{
    ALL_PIXELS, Action, ActionKind, DeviceTarget, HttpMethod, LogLevel, PowerCommand, Rgb,
};
pub use condition::{Condition, ConditionGroup, Logic, Operator};

use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, ValidationError};
use crate::id::RuleId;
use crate::text::MAX_NAME_LEN;
use crate::time::{Timestamp, elapsed_ms};

/// A named, enable-able automation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Minimum delay between two triggers; zero disables rate limiting.
    #[serde(default)]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub conditions: ConditionGroup,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_trigger_time: Option<Timestamp>,
    #[serde(default)]
    pub trigger_count: u32,
}

fn enabled_by_default() -> bool {
    true
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] when the name is longer
    /// than the storage limit.
    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.name.len() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                len: self.name.len(),
                max: MAX_NAME_LEN,
            }
            .into());
        }
        Ok(())
    }

    /// Whether the rule fired less than `cooldown_ms` before `now`.
    #[must_use]
    pub fn is_cooling_down(&self, now: Timestamp) -> bool {
        if self.cooldown_ms == 0 {
            return false;
        }
        self.last_trigger_time
            .is_some_and(|last| elapsed_ms(last, now) < self.cooldown_ms)
    }

    /// Record a trigger at `at`.
    pub fn mark_triggered(&mut self, at: Timestamp) {
        self.last_trigger_time = Some(at);
        self.trigger_count = self.trigger_count.saturating_add(1);
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<String>,
    name: Option<String>,
    enabled: Option<bool>,
    cooldown_ms: u64,
    conditions: ConditionGroup,
    actions: Vec<Action>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    #[must_use]
    pub fn logic(mut self, logic: Logic) -> Self {
        self.conditions.logic = logic;
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn action(mut self, action: impl Into<Action>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// The name defaults to the id.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] if the id is missing or
    /// malformed, or the name is too long.
    pub fn build(self) -> Result<Rule, AutomationError> {
        let id = RuleId::new(self.id.unwrap_or_default())?;
        let rule = Rule {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            enabled: self.enabled.unwrap_or(true),
            cooldown_ms: self.cooldown_ms,
            conditions: self.conditions,
            actions: self.actions,
            last_trigger_time: None,
            trigger_count: 0,
        };
        rule.validate()?;
        Ok(rule)
    }
}

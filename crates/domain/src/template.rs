//! Action templates — named, reusable single actions invocable by id.

use serde::{Deserialize, Serialize};

use crate::automation::Action;
use crate::error::{AutomationError, ValidationError};
use crate::id::TemplateId;
use crate::text::MAX_NAME_LEN;
use crate::time::{Timestamp, now};

/// A stored action with usage bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub action: Action,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Run through the asynchronous queue instead of inline.
    #[serde(default, rename = "async")]
    pub run_async: bool,
    #[serde(default = "now")]
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<Timestamp>,
    #[serde(default)]
    pub use_count: u32,
}

fn enabled_by_default() -> bool {
    true
}

impl ActionTemplate {
    /// Create a builder for constructing an [`ActionTemplate`].
    #[must_use]
    pub fn builder() -> ActionTemplateBuilder {
        ActionTemplateBuilder::default()
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

    /// Record one execution at `at`.
    pub fn mark_used(&mut self, at: Timestamp) {
        self.last_used_at = Some(at);
        self.use_count = self.use_count.saturating_add(1);
    }
}

/// Step-by-step builder for [`ActionTemplate`].
#[derive(Debug, Default)]
pub struct ActionTemplateBuilder {
    id: Option<String>,
    name: Option<String>,
    description: String,
    action: Option<Action>,
    enabled: Option<bool>,
    run_async: bool,
}

impl ActionTemplateBuilder {
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
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn action(mut self, action: impl Into<Action>) -> Self {
        self.action = Some(action.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn run_async(mut self, run_async: bool) -> Self {
        self.run_async = run_async;
        self
    }

    /// Consume the builder, validate, and return an [`ActionTemplate`].
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] if the id or the action
    /// is missing, or a field breaks its length limit.
    pub fn build(self) -> Result<ActionTemplate, AutomationError> {
        let id = TemplateId::new(self.id.unwrap_or_default())?;
        let action = self.action.ok_or(ValidationError::MissingAction)?;
        let template = ActionTemplate {
            name: self.name.unwrap_or_else(|| id.to_string()),
            id,
            description: self.description,
            action,
            enabled: self.enabled.unwrap_or(true),
            run_async: self.run_async,
            created_at: now(),
            last_used_at: None,
            use_count: 0,
        };
        template.validate()?;
        Ok(template)
    }
}

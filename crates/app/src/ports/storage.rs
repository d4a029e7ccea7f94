//! Storage ports — persistence for templates and rules.
//!
//! Both tables are small and bounded, so they are saved and loaded as a
//! whole rather than row by row.

use std::future::Future;

use autorule_domain::automation::Rule;
use autorule_domain::error::AutomationError;
use autorule_domain::template::ActionTemplate;

/// Persists the action template table.
pub trait TemplateRepository {
    /// Replace the stored table with `templates`, keeping their order.
    fn save_all(
        &self,
        templates: &[ActionTemplate],
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Load the stored table in saved order.
    fn load_all(&self) -> impl Future<Output = Result<Vec<ActionTemplate>, AutomationError>> + Send;
}

/// Persists the rule table.
pub trait RuleRepository {
    /// Replace the stored table with `rules`, keeping their order.
    fn save_all(&self, rules: &[Rule]) -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Load the stored table in saved order.
    fn load_all(&self) -> impl Future<Output = Result<Vec<Rule>, AutomationError>> + Send;
}

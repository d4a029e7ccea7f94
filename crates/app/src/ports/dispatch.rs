//! Action dispatch port — what the rule engine needs from the action manager.

use std::future::Future;
use std::sync::Arc;

use autorule_domain::automation::Action;
use autorule_domain::error::AutomationError;
use autorule_domain::result::ActionResult;

/// Executes actions on behalf of the rule engine.
pub trait ActionDispatch: Send + Sync {
    /// Execute one action synchronously (delay included).
    fn execute(&self, action: &Action) -> impl Future<Output = ActionResult> + Send;

    /// Execute `actions` in order.
    ///
    /// Returns every per-action result when the sequence ran to the end.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] for an empty sequence and
    /// [`AutomationError::SequenceAborted`] when `stop_on_error` is set and an
    /// action did not succeed.
    fn execute_sequence(
        &self,
        actions: &[Action],
        stop_on_error: bool,
    ) -> impl Future<Output = Result<Vec<ActionResult>, AutomationError>> + Send;
}

impl<T: ActionDispatch> ActionDispatch for Arc<T> {
    fn execute(&self, action: &Action) -> impl Future<Output = ActionResult> + Send {
        (**self).execute(action)
    }

    fn execute_sequence(
        &self,
        actions: &[Action],
        stop_on_error: bool,
    ) -> impl Future<Output = Result<Vec<ActionResult>, AutomationError>> + Send {
        (**self).execute_sequence(actions, stop_on_error)
    }
}

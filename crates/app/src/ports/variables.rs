//! Variable store port — live telemetry and automation state.

use autorule_domain::error::AutomationError;
use autorule_domain::value::Value;

/// Key/value table read by conditions and written by `set_var` actions.
///
/// Access is synchronous: implementations are expected to be in-memory
/// tables guarded by a short lock.
pub trait VariableStore: Send + Sync {
    /// Current value of `name`, or `None` when it was never set.
    fn get(&self, name: &str) -> Option<Value>;

    /// Write `value` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] when the name is not a
    /// valid key, or an implementation-specific error.
    fn set(&self, name: &str, value: Value) -> Result<(), AutomationError>;
}

impl<T: VariableStore + ?Sized> VariableStore for std::sync::Arc<T> {
    fn get(&self, name: &str) -> Option<Value> {
        (**self).get(name)
    }

    fn set(&self, name: &str, value: Value) -> Result<(), AutomationError> {
        (**self).set(name, value)
    }
}

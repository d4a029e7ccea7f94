//! In-process variable store backed by a mutex-guarded hash map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use autorule_domain::error::AutomationError;
use autorule_domain::id::validate_key;
use autorule_domain::value::Value;

use crate::ports::VariableStore;

/// Variable table living in the daemon's memory.
#[derive(Debug, Default)]
pub struct InMemoryVariableStore {
    values: Mutex<HashMap<String, Value>>,
}

impl InMemoryVariableStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables currently set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every variable, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VariableStore for InMemoryVariableStore {
    fn get(&self, name: &str) -> Option<Value> {
        self.lock().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) -> Result<(), AutomationError> {
        validate_key(name)?;
        self.lock().insert(name.to_string(), value);
        Ok(())
    }
}

//! Condition evaluator — checks conditions against the variable store.
//!
//! Evaluation never fails: a condition on a missing variable is false and
//! leaves a diagnostic in the log.

use autorule_domain::automation::{Condition, ConditionGroup, Logic};

use crate::ports::VariableStore;

/// Evaluate a single condition.
pub fn evaluate_condition<V: VariableStore + ?Sized>(condition: &Condition, store: &V) -> bool {
    let Some(actual) = store.get(&condition.variable) else {
        tracing::warn!(
            variable = %condition.variable,
            "condition references an unknown variable"
        );
        return false;
    };
    let holds = condition.operator.apply(&actual, &condition.value);
    tracing::trace!(%condition, ?actual, holds, "condition evaluated");
    holds
}

/// Evaluate a group, short-circuiting. An empty group holds.
pub fn evaluate_group<V: VariableStore + ?Sized>(group: &ConditionGroup, store: &V) -> bool {
    if group.is_empty() {
        return true;
    }
    match group.logic {
        Logic::And => group
            .conditions
            .iter()
            .all(|condition| evaluate_condition(condition, store)),
        Logic::Or => group
            .conditions
            .iter()
            .any(|condition| evaluate_condition(condition, store)),
    }
}

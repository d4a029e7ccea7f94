//! Rule engine — evaluates rules against the variable store and fires them.
//!
//! Each rule is checked in turn: disabled rules and rules still cooling down
//! are skipped, then the condition group is evaluated. When it holds, the
//! rule's actions are handed to the dispatcher as one sequence that keeps
//! going past failures. The rule table lock is released during evaluation
//! and dispatch, then re-taken to record the trigger.

use std::sync::{Mutex, MutexGuard, PoisonError};

use autorule_domain::automation::Rule;
use autorule_domain::error::{AutomationError, NotFoundError};
use autorule_domain::id::RuleId;
use autorule_domain::stats::EngineStats;
use autorule_domain::time::{Timestamp, now};

use crate::evaluator::evaluate_group;
use crate::ports::{ActionDispatch, VariableStore};

const ENTITY: &str = "Rule";

fn not_found(id: &RuleId) -> AutomationError {
    NotFoundError {
        entity: ENTITY,
        id: id.to_string(),
    }
    .into()
}

/// Tunables of the [`RuleEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEngineConfig {
    /// Maximum number of registered rules.
    pub capacity: usize,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}

/// Rule table plus the evaluation loop body.
pub struct RuleEngine<V, D> {
    config: RuleEngineConfig,
    variables: V,
    dispatcher: D,
    rules: Mutex<Vec<Rule>>,
    stats: Mutex<EngineStats>,
}

impl<V, D> RuleEngine<V, D> {
    /// Create an engine with an empty rule table.
    pub fn new(config: RuleEngineConfig, variables: V, dispatcher: D) -> Self {
        Self {
            config,
            variables,
            dispatcher,
            rules: Mutex::new(Vec::new()),
            stats: Mutex::new(EngineStats::default()),
        }
    }

    /// Add `rule`, replacing the rule with the same id in place.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::InvalidArgument`] when the rule does not
    /// validate, or [`AutomationError::ResourceExhausted`] when a new id
    /// does not fit in the table.
    #[tracing::instrument(skip(self, rule), fields(id = %rule.id))]
    pub fn register(&self, rule: Rule) -> Result<(), AutomationError> {
        rule.validate()?;
        let mut rules = self.lock_rules();
        if let Some(stored) = rules.iter_mut().find(|stored| stored.id == rule.id) {
            *stored = rule;
            tracing::info!("rule replaced");
            return Ok(());
        }
        if rules.len() >= self.config.capacity {
            return Err(AutomationError::exhausted("rule table", self.config.capacity));
        }
        rules.push(rule);
        tracing::info!("rule registered");
        Ok(())
    }

    /// Remove a rule, keeping the order of the others.
    ///
    /// A trigger already in flight for this rule is not cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no rule has this id.
    #[tracing::instrument(skip(self))]
    pub fn unregister(&self, id: &RuleId) -> Result<Rule, AutomationError> {
        let mut rules = self.lock_rules();
        let position = rules
            .iter()
            .position(|rule| rule.id == *id)
            .ok_or_else(|| not_found(id))?;
        Ok(rules.remove(position))
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no rule has this id.
    pub fn enable(&self, id: &RuleId) -> Result<(), AutomationError> {
        self.set_enabled(id, true)
    }

    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no rule has this id.
    pub fn disable(&self, id: &RuleId) -> Result<(), AutomationError> {
        self.set_enabled(id, false)
    }

    /// Copy of the rule called `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no rule has this id.
    pub fn get(&self, id: &RuleId) -> Result<Rule, AutomationError> {
        self.lock_rules()
            .iter()
            .find(|rule| rule.id == *id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Copy of the rule at `index` in registration order.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<Rule> {
        self.lock_rules().get(index).cloned()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.lock_rules().len()
    }

    /// Copy of every rule in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Rule> {
        self.lock_rules().clone()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.lock_stats().clone()
    }

    pub fn reset_stats(&self) {
        *self.lock_stats() = EngineStats::default();
    }

    /// Register persisted rules, keeping their trigger history.
    ///
    /// Rules that cannot be registered are skipped with a warning. Returns
    /// how many were restored.
    pub fn restore(&self, rules: Vec<Rule>) -> usize {
        let mut restored = 0;
        for rule in rules {
            let id = rule.id.clone();
            match self.register(rule) {
                Ok(()) => restored += 1,
                Err(err) => tracing::warn!(%id, error = %err, "skipping stored rule"),
            }
        }
        tracing::info!(restored, "rules restored");
        restored
    }

    fn set_enabled(&self, id: &RuleId, enabled: bool) -> Result<(), AutomationError> {
        let mut rules = self.lock_rules();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == *id)
            .ok_or_else(|| not_found(id))?;
        if rule.enabled != enabled {
            rule.enabled = enabled;
            tracing::info!(%id, enabled, "rule toggled");
        }
        Ok(())
    }

    fn lock_rules(&self) -> MutexGuard<'_, Vec<Rule>> {
        self.rules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_stats(&self) -> MutexGuard<'_, EngineStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V, D> RuleEngine<V, D>
where
    V: VariableStore,
    D: ActionDispatch,
{
    /// Evaluate one rule and fire it when it is due.
    ///
    /// Returns whether the rule fired. A rule whose actions partly fail
    /// still counts as fired.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no rule has this id.
    #[tracing::instrument(skip(self))]
    pub async fn evaluate(&self, id: &RuleId) -> Result<bool, AutomationError> {
        let at = now();
        let rule = self.get(id)?;

        if !rule.enabled || rule.is_cooling_down(at) {
            return Ok(false);
        }
        if !evaluate_group(&rule.conditions, &self.variables) {
            return Ok(false);
        }

        let outcome = self.run_actions(&rule).await;
        self.record_trigger(&rule.id, at, outcome);
        Ok(true)
    }

    /// Evaluate every rule once. Returns how many fired.
    ///
    /// Rules are re-read by position, so rules registered or removed while
    /// the pass runs may be skipped; the pass stops early if the table
    /// shrinks below the current position.
    #[tracing::instrument(skip(self))]
    pub async fn evaluate_all(&self) -> usize {
        {
            let mut stats = self.lock_stats();
            stats.total_evaluations += 1;
            stats.last_evaluation_time = Some(now());
        }
        let count = self.count();

        let mut triggered = 0;
        for index in 0..count {
            let Some(id) = self.lock_rules().get(index).map(|rule| rule.id.clone()) else {
                break;
            };
            match self.evaluate(&id).await {
                Ok(true) => triggered += 1,
                Ok(false) => {}
                // Removed between the index read and the evaluation.
                Err(err) => tracing::debug!(%id, error = %err, "rule vanished during pass"),
            }
        }

        if triggered > 0 {
            tracing::debug!(triggered, "evaluation pass done");
        }
        triggered
    }

    /// Fire a rule by hand, ignoring its cooldown and conditions.
    ///
    /// The trigger time is taken once the actions have returned, so the
    /// cooldown runs from their completion.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::NotFound`] if no rule has this id.
    #[tracing::instrument(skip(self))]
    pub async fn trigger(&self, id: &RuleId) -> Result<(), AutomationError> {
        let rule = self.get(id)?;
        let outcome = self.run_actions(&rule).await;
        self.record_trigger(&rule.id, now(), outcome);
        Ok(())
    }

    /// Run the rule's actions without stopping on failures. Returns how many
    /// ran and how many of those failed.
    async fn run_actions(&self, rule: &Rule) -> (usize, usize) {
        tracing::info!(rule = %rule.id, name = %rule.name, "rule triggered");

        let (executed, failed) = if rule.actions.is_empty() {
            (0, 0)
        } else {
            match self.dispatcher.execute_sequence(&rule.actions, false).await {
                Ok(results) => (
                    results.len(),
                    results.iter().filter(|result| !result.is_success()).count(),
                ),
                Err(err) => {
                    tracing::warn!(rule = %rule.id, error = %err, "action sequence failed");
                    (0, 0)
                }
            }
        };
        if failed > 0 {
            tracing::warn!(rule = %rule.id, failed, executed, "some rule actions failed");
        }
        (executed, failed)
    }

    fn record_trigger(&self, id: &RuleId, at: Timestamp, (executed, failed): (usize, usize)) {
        // Gone if it was unregistered while its actions ran.
        if let Some(stored) = self.lock_rules().iter_mut().find(|stored| stored.id == *id) {
            stored.mark_triggered(at);
        }

        let mut stats = self.lock_stats();
        stats.total_triggers += 1;
        stats.total_actions += executed as u64;
        stats.failed_actions += failed as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_manager::testing::{Harness, TestManager, harness};
    use crate::variable_store::InMemoryVariableStore;
    use autorule_domain::automation::{Action, ActionKind, Condition, Operator};
    use autorule_domain::time::elapsed_ms;
    use autorule_domain::value::Value;
    use std::sync::Arc;
    use std::time::Duration;

    type TestEngine = RuleEngine<Arc<InMemoryVariableStore>, Arc<TestManager>>;

    fn engine_with(h: &Harness) -> TestEngine {
        RuleEngine::new(
            RuleEngineConfig::default(),
            Arc::clone(&h.variables),
            Arc::clone(&h.manager),
        )
    }

    fn id(value: &str) -> RuleId {
        value.parse().unwrap()
    }

    fn overheat(cooldown_ms: u64) -> Rule {
        Rule::builder()
            .id("r1")
            .name("overheat")
            .cooldown_ms(cooldown_ms)
            .condition(Condition::new("temp", Operator::Gt, 50))
            .action(Action::set_var("alarm", true))
            .build()
            .unwrap()
    }

    fn slow(rule_id: &str, delay_ms: u64) -> Rule {
        Rule::builder()
            .id(rule_id)
            .action(Action::set_var(rule_id, true).with_delay(delay_ms))
            .build()
            .unwrap()
    }

    fn broken_action() -> Action {
        Action::new(ActionKind::DeviceCtrl {
            device: "fpga".to_string(),
            action: "on".to_string(),
        })
    }

    #[tokio::test]
    async fn should_fire_rule_when_condition_holds() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(0)).unwrap();
        h.variables.set("temp", Value::Int(60)).unwrap();

        assert!(engine.evaluate(&id("r1")).await.unwrap());

        assert_eq!(h.variables.get("alarm"), Some(Value::Bool(true)));
        let rule = engine.get(&id("r1")).unwrap();
        assert_eq!(rule.trigger_count, 1);
        assert!(rule.last_trigger_time.is_some());
        assert_eq!(engine.stats().total_triggers, 1);
        assert_eq!(engine.stats().total_actions, 1);
    }

    #[tokio::test]
    async fn should_not_fire_when_condition_fails() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(0)).unwrap();
        h.variables.set("temp", Value::Int(40)).unwrap();

        assert!(!engine.evaluate(&id("r1")).await.unwrap());
        assert_eq!(h.variables.get("alarm"), None);
        assert_eq!(engine.get(&id("r1")).unwrap().trigger_count, 0);
    }

    #[tokio::test]
    async fn should_block_second_trigger_during_cooldown() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(60_000)).unwrap();
        h.variables.set("temp", Value::Int(60)).unwrap();

        assert!(engine.evaluate(&id("r1")).await.unwrap());
        assert!(!engine.evaluate(&id("r1")).await.unwrap());
        assert_eq!(engine.get(&id("r1")).unwrap().trigger_count, 1);
    }

    #[tokio::test]
    async fn should_fire_again_once_cooldown_elapsed() {
        let h = harness();
        let engine = engine_with(&h);
        let mut rule = overheat(1_000);
        rule.last_trigger_time = Some(now() - chrono::Duration::milliseconds(5_000));
        rule.trigger_count = 3;
        engine.restore(vec![rule]);
        h.variables.set("temp", Value::Int(60)).unwrap();

        assert!(engine.evaluate(&id("r1")).await.unwrap());
        assert_eq!(engine.get(&id("r1")).unwrap().trigger_count, 4);
    }

    #[tokio::test]
    async fn should_skip_disabled_rule() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(0)).unwrap();
        engine.disable(&id("r1")).unwrap();
        h.variables.set("temp", Value::Int(60)).unwrap();

        assert!(!engine.evaluate(&id("r1")).await.unwrap());
        assert_eq!(h.variables.get("alarm"), None);
    }

    #[test]
    fn should_keep_disable_idempotent() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(0)).unwrap();
        engine.disable(&id("r1")).unwrap();
        engine.disable(&id("r1")).unwrap();
        assert!(!engine.get(&id("r1")).unwrap().enabled);
        engine.enable(&id("r1")).unwrap();
        assert!(engine.get(&id("r1")).unwrap().enabled);
    }

    #[test]
    fn should_round_trip_register_and_get() {
        let h = harness();
        let engine = engine_with(&h);
        let rule = overheat(500);
        engine.register(rule.clone()).unwrap();
        assert_eq!(engine.get(&id("r1")).unwrap(), rule);
        assert_eq!(engine.get_by_index(0), Some(rule));
        assert_eq!(engine.get_by_index(1), None);
    }

    #[test]
    fn should_return_not_found_after_unregister() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(0)).unwrap();
        engine.unregister(&id("r1")).unwrap();
        assert!(matches!(
            engine.get(&id("r1")),
            Err(AutomationError::NotFound(_))
        ));
        assert!(matches!(
            engine.unregister(&id("r1")),
            Err(AutomationError::NotFound(_))
        ));
    }

    #[test]
    fn should_replace_rule_in_place_on_register() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(0)).unwrap();
        engine
            .register(Rule::builder().id("r2").build().unwrap())
            .unwrap();
        let mut replaced = overheat(0);
        replaced.name = "hot".to_string();
        engine.register(replaced).unwrap();

        assert_eq!(engine.count(), 2);
        assert_eq!(engine.get_by_index(0).unwrap().name, "hot");
    }

    #[test]
    fn should_enforce_rule_capacity() {
        let h = harness();
        let engine = engine_with(&h);
        for n in 0..32 {
            engine
                .register(Rule::builder().id(format!("r{n}")).build().unwrap())
                .unwrap();
        }
        let err = engine
            .register(Rule::builder().id("r32").build().unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            AutomationError::ResourceExhausted { capacity: 32, .. }
        ));
    }

    #[tokio::test]
    async fn should_count_triggered_rules_in_evaluate_all() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(0)).unwrap();
        engine
            .register(
                Rule::builder()
                    .id("cold")
                    .condition(Condition::new("temp", Operator::Lt, 0))
                    .action(Action::set_var("frost", true))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        h.variables.set("temp", Value::Int(60)).unwrap();

        assert_eq!(engine.evaluate_all().await, 1);
        assert_eq!(engine.evaluate_all().await, 1);

        let stats = engine.stats();
        assert_eq!(stats.total_evaluations, 2);
        assert_eq!(stats.total_triggers, 2);
        assert!(stats.last_evaluation_time.is_some());
    }

    #[tokio::test]
    async fn should_trigger_manually_regardless_of_conditions_and_cooldown() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(overheat(60_000)).unwrap();

        engine.trigger(&id("r1")).await.unwrap();
        engine.trigger(&id("r1")).await.unwrap();

        assert_eq!(engine.get(&id("r1")).unwrap().trigger_count, 2);
        assert_eq!(h.variables.get("alarm"), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn should_count_rule_as_triggered_when_actions_fail() {
        let h = harness();
        let engine = engine_with(&h);
        engine
            .register(
                Rule::builder()
                    .id("flaky")
                    .action(broken_action())
                    .action(Action::set_var("after", 1))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert!(engine.evaluate(&id("flaky")).await.unwrap());

        let stats = engine.stats();
        assert_eq!(stats.total_actions, 2);
        assert_eq!(stats.failed_actions, 1);
        assert_eq!(h.variables.get("after"), Some(Value::Int(1)));
    }

    #[tokio::test]
    async fn should_fire_rule_without_actions() {
        let h = harness();
        let engine = engine_with(&h);
        engine
            .register(Rule::builder().id("noop").build().unwrap())
            .unwrap();
        assert!(engine.evaluate(&id("noop")).await.unwrap());
        assert_eq!(engine.stats().total_actions, 0);
    }

    #[tokio::test]
    async fn should_report_not_found_for_unknown_rule() {
        let h = harness();
        let engine = engine_with(&h);
        assert!(matches!(
            engine.evaluate(&id("ghost")).await,
            Err(AutomationError::NotFound(_))
        ));
        assert!(matches!(
            engine.trigger(&id("ghost")).await,
            Err(AutomationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_stamp_manual_trigger_after_actions_complete() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(slow("pump", 60)).unwrap();

        let before = now();
        engine.trigger(&id("pump")).await.unwrap();

        let stamped = engine.get(&id("pump")).unwrap().last_trigger_time.unwrap();
        assert!(elapsed_ms(before, stamped) >= 60);
    }

    #[tokio::test]
    async fn should_stamp_evaluated_trigger_before_actions_run() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(slow("pump", 300)).unwrap();

        let before = now();
        assert!(engine.evaluate(&id("pump")).await.unwrap());

        let stamped = engine.get(&id("pump")).unwrap().last_trigger_time.unwrap();
        assert!(elapsed_ms(before, stamped) < 300);
        assert!(elapsed_ms(stamped, now()) >= 300);
    }

    #[tokio::test(start_paused = true)]
    async fn should_allow_table_access_while_rule_actions_run() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(slow("pump", 1_000)).unwrap();

        let (fired, ()) = tokio::join!(engine.evaluate_all(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(engine.count(), 1);
            assert_eq!(engine.get(&id("pump")).unwrap().trigger_count, 0);
            engine.unregister(&id("pump")).unwrap();
            assert_eq!(engine.count(), 0);
        });

        assert_eq!(fired, 1);
        assert_eq!(h.variables.get("pump"), Some(Value::Bool(true)));
        assert!(matches!(
            engine.get(&id("pump")),
            Err(AutomationError::NotFound(_))
        ));
        let stats = engine.stats();
        assert_eq!(stats.total_triggers, 1);
        assert_eq!(stats.total_actions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_continue_pass_when_table_shrinks_mid_pass() {
        let h = harness();
        let engine = engine_with(&h);
        engine.register(slow("first", 1_000)).unwrap();
        engine.register(slow("second", 0)).unwrap();
        engine.register(slow("third", 0)).unwrap();

        let (fired, ()) = tokio::join!(engine.evaluate_all(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.unregister(&id("second")).unwrap();
        });

        assert_eq!(fired, 2);
        assert_eq!(h.variables.get("first"), Some(Value::Bool(true)));
        assert_eq!(h.variables.get("second"), None);
        assert_eq!(h.variables.get("third"), Some(Value::Bool(true)));
        assert_eq!(engine.get(&id("third")).unwrap().trigger_count, 1);
        assert_eq!(engine.count(), 2);
    }

    #[test]
    fn should_reset_engine_stats() {
        let h = harness();
        let engine = engine_with(&h);
        engine.lock_stats().total_triggers = 9;
        engine.reset_stats();
        assert_eq!(engine.stats(), EngineStats::default());
    }
}

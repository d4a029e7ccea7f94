//! End-to-end tests for the full autoruled stack.
//!
//! Each test wires the real action manager and rule engine onto the virtual
//! hardware adapter and an in-memory `SQLite` database. No SSH host or
//! webhook endpoint is contacted.

use std::sync::Arc;
use std::time::Duration;

use autorule_adapter_ssh_openssh::OpenSshClient;
use autorule_adapter_storage_sqlite_sqlx::{
    Config, Database, SqliteRuleRepository, SqliteTemplateRepository,
};
use autorule_adapter_virtual::{PowerState, VirtualHardware};
use autorule_adapter_webhook_reqwest::ReqwestHttpClient;
use autorule_app::action_manager::{ActionManager, ActionManagerConfig, Executors};
use autorule_app::ports::{RuleRepository, TemplateRepository, VariableStore};
use autorule_app::rule_engine::{RuleEngine, RuleEngineConfig};
use autorule_app::variable_store::InMemoryVariableStore;
use autorule_domain::automation::{
    Action, ActionKind, Condition, DeviceTarget, Operator, Rgb, Rule,
};
use autorule_domain::result::ActionStatus;
use autorule_domain::template::ActionTemplate;
use autorule_domain::value::Value;

type Manager = ActionManager<
    Arc<InMemoryVariableStore>,
    OpenSshClient,
    Arc<VirtualHardware>,
    Arc<VirtualHardware>,
    Arc<VirtualHardware>,
    ReqwestHttpClient,
>;

struct Stack {
    variables: Arc<InMemoryVariableStore>,
    hardware: Arc<VirtualHardware>,
    manager: Arc<Manager>,
    engine: RuleEngine<Arc<InMemoryVariableStore>, Arc<Manager>>,
}

/// Wire a fresh manager and engine onto new virtual hardware.
fn stack() -> Stack {
    let variables = Arc::new(InMemoryVariableStore::new());
    let hardware = Arc::new(VirtualHardware::default());
    let executors = Executors {
        ssh: OpenSshClient::default(),
        led: Arc::clone(&hardware),
        gpio: Arc::clone(&hardware),
        power: Arc::clone(&hardware),
        http: ReqwestHttpClient::new(Duration::from_secs(1)).expect("http client should build"),
    };
    let manager = Arc::new(ActionManager::new(
        ActionManagerConfig::default(),
        Arc::clone(&variables),
        executors,
    ));
    let engine = RuleEngine::new(
        RuleEngineConfig::default(),
        Arc::clone(&variables),
        Arc::clone(&manager),
    );
    Stack {
        variables,
        hardware,
        manager,
        engine,
    }
}

async fn database() -> Database {
    Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise")
}

fn overheat_rule() -> Rule {
    Rule::builder()
        .id("r1")
        .name("overheat")
        .cooldown_ms(60_000)
        .condition(Condition::new("temperature", Operator::Gt, 80))
        .action(ActionKind::Led {
            device: "board".to_string(),
            index: 0xFF,
            color: Rgb::new(255, 0, 0),
            effect: None,
            duration_ms: 0,
        })
        .action(Action::set_var("alarm", true))
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Rule evaluation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_fire_overheat_rule_once_within_cooldown() {
    let s = stack();
    s.engine.register(overheat_rule()).unwrap();
    s.variables.set("temperature", Value::Int(85)).unwrap();

    assert_eq!(s.engine.evaluate_all().await, 1);
    assert_eq!(s.engine.evaluate_all().await, 0);

    let pixels = s.hardware.pixels("led_board").unwrap();
    assert_eq!(pixels.len(), 28);
    assert!(pixels.iter().all(|pixel| *pixel == Rgb::new(255, 0, 0)));
    assert_eq!(s.variables.get("alarm"), Some(Value::Bool(true)));

    let rule = s.engine.get(&"r1".parse().unwrap()).unwrap();
    assert_eq!(rule.trigger_count, 1);
    let stats = s.engine.stats();
    assert_eq!(stats.total_evaluations, 2);
    assert_eq!(stats.total_triggers, 1);
    assert_eq!(stats.total_actions, 2);
    assert_eq!(stats.failed_actions, 0);
    assert_eq!(s.manager.stats().led_actions, 1);
}

#[tokio::test]
async fn should_not_fire_when_condition_does_not_hold() {
    let s = stack();
    s.engine.register(overheat_rule()).unwrap();
    s.variables.set("temperature", Value::Float(42.5)).unwrap();

    assert_eq!(s.engine.evaluate_all().await, 0);
    assert_eq!(s.variables.get("alarm"), None);
    assert!(
        s.hardware
            .pixels("led_board")
            .unwrap()
            .iter()
            .all(|pixel| *pixel == Rgb::default())
    );
}

#[tokio::test]
async fn should_power_on_device_when_rule_is_triggered_by_hand() {
    let s = stack();
    let rule = Rule::builder()
        .id("boot")
        .action(ActionKind::DeviceCtrl {
            device: "agx".to_string(),
            action: "on".to_string(),
        })
        .build()
        .unwrap();
    s.engine.register(rule).unwrap();

    s.engine.trigger(&"boot".parse().unwrap()).await.unwrap();

    assert_eq!(s.hardware.power_state(DeviceTarget::Agx), PowerState::On);
    assert_eq!(s.hardware.power_state(DeviceTarget::Lpmu), PowerState::Off);
}

// ---------------------------------------------------------------------------
// Templates and the queue worker
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_run_async_template_on_worker() {
    let s = stack();
    let worker = s.manager.spawn_worker();
    let template = ActionTemplate::builder()
        .id("fan_on")
        .action(ActionKind::Gpio {
            pin: 17,
            level: true,
            pulse_ms: 0,
        })
        .run_async(true)
        .build()
        .unwrap();
    s.manager.add_template(template).unwrap();

    let result = s
        .manager
        .execute_template(&"fan_on".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(result.status, ActionStatus::Queued);

    s.manager.close();
    worker.await.unwrap();

    let pin = s.hardware.pin(17).unwrap();
    assert!(pin.output);
    assert!(pin.level);
    assert_eq!(s.manager.stats().gpio_actions, 1);
    assert_eq!(s.manager.queue_status().pending, 0);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_restore_rules_and_templates_after_restart() {
    let db = database().await;
    let template_repo = SqliteTemplateRepository::new(db.pool().clone());
    let rule_repo = SqliteRuleRepository::new(db.pool().clone());

    let first = stack();
    first
        .manager
        .add_template(
            ActionTemplate::builder()
                .id("mark")
                .action(Action::set_var("marked", 1))
                .build()
                .unwrap(),
        )
        .unwrap();
    first
        .manager
        .execute_template(&"mark".parse().unwrap())
        .await
        .unwrap();
    first.engine.register(overheat_rule()).unwrap();
    first
        .engine
        .register(Rule::builder().id("idle").enabled(false).build().unwrap())
        .unwrap();
    first.engine.trigger(&"r1".parse().unwrap()).await.unwrap();

    template_repo
        .save_all(&first.manager.list_templates())
        .await
        .unwrap();
    rule_repo.save_all(&first.engine.list()).await.unwrap();
    assert_eq!(rule_repo.count_enabled().await.unwrap(), 1);

    let second = stack();
    assert_eq!(
        second
            .manager
            .restore_templates(template_repo.load_all().await.unwrap()),
        1
    );
    assert_eq!(second.engine.restore(rule_repo.load_all().await.unwrap()), 2);

    let template = second.manager.get_template(&"mark".parse().unwrap()).unwrap();
    assert_eq!(template.use_count, 1);
    assert!(template.last_used_at.is_some());

    let ids: Vec<_> = second
        .engine
        .list()
        .into_iter()
        .map(|rule| rule.id.to_string())
        .collect();
    assert_eq!(ids, ["r1", "idle"]);

    // Still cooling down from the trigger recorded before the restart.
    second.variables.set("temperature", Value::Int(90)).unwrap();
    assert_eq!(second.engine.evaluate_all().await, 0);
}

//! # autoruled — autorule daemon
//!
//! Composition root that wires all adapters together and runs the engine.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the executor adapters (virtual hardware, `OpenSSH`, `reqwest`)
//! - Construct the action manager and rule engine, injecting adapters via port traits
//! - Restore persisted templates and rules, then apply configured seeds
//! - Run the queue worker and the periodic evaluation loop
//! - Persist templates and rules and drain the queue on shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use autorule_adapter_ssh_openssh::OpenSshClient;
use autorule_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SqliteRuleRepository, SqliteTemplateRepository,
};
use autorule_adapter_virtual::VirtualHardware;
use autorule_adapter_webhook_reqwest::ReqwestHttpClient;
use autorule_app::action_manager::{ActionManager, Executors};
use autorule_app::ports::{RuleRepository, TemplateRepository, VariableStore};
use autorule_app::rule_engine::RuleEngine;
use autorule_app::variable_store::InMemoryVariableStore;

use crate::config::{Config, LoggingConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging);
    let interval = config.eval_interval();

    // Database
    let db = DatabaseConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Repositories
    let template_repo = SqliteTemplateRepository::new(pool.clone());
    let rule_repo = SqliteRuleRepository::new(pool);

    // Executors
    let variables = Arc::new(InMemoryVariableStore::new());
    let hardware = Arc::new(VirtualHardware::default());
    let executors = Executors {
        ssh: OpenSshClient::new(config.open_ssh()),
        led: Arc::clone(&hardware),
        gpio: Arc::clone(&hardware),
        power: Arc::clone(&hardware),
        http: ReqwestHttpClient::new(config.webhook_timeout())?,
    };

    // Services
    let manager = Arc::new(ActionManager::new(
        config.action_manager(),
        Arc::clone(&variables),
        executors,
    ));
    let engine = RuleEngine::new(
        config.rule_engine(),
        Arc::clone(&variables),
        Arc::clone(&manager),
    );

    // Restore, then seed from the config file
    manager.restore_templates(template_repo.load_all().await?);
    engine.restore(rule_repo.load_all().await?);

    for host in config.hosts {
        let id = host.id.clone();
        if let Err(err) = manager.register_host(host) {
            tracing::warn!(%id, error = %err, "skipping configured ssh host");
        }
    }
    for seed in config.variables {
        if let Err(err) = variables.set(&seed.name, seed.value) {
            tracing::warn!(name = %seed.name, error = %err, "skipping configured variable");
        }
    }
    for template in config.templates {
        let id = template.id.clone();
        let result = if manager.get_template(&id).is_ok() {
            manager.update_template(template)
        } else {
            manager.add_template(template)
        };
        if let Err(err) = result {
            tracing::warn!(%id, error = %err, "skipping configured template");
        }
    }
    for rule in config.rules {
        let id = rule.id.clone();
        if let Err(err) = engine.register(rule) {
            tracing::warn!(%id, error = %err, "skipping configured rule");
        }
    }

    tracing::info!(
        rules = engine.count(),
        templates = manager.template_count(),
        hosts = manager.host_count(),
        interval_ms = interval.as_millis(),
        "autoruled started"
    );

    // Evaluation loop
    let worker = manager.spawn_worker();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.evaluate_all().await;
            }
            signal = &mut shutdown => {
                signal?;
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    // Shutdown
    template_repo.save_all(&manager.list_templates()).await?;
    rule_repo.save_all(&engine.list()).await?;
    manager.close();
    worker.await?;

    let stats = manager.stats();
    tracing::info!(
        executed = stats.total_executed,
        failed = stats.total_failed,
        triggers = engine.stats().total_triggers,
        "autoruled stopped"
    );
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

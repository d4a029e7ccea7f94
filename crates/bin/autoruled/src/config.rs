//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `autorule.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.
//!
//! Besides tunables, the file may seed the engine: `[[hosts]]`,
//! `[[variables]]`, `[[templates]]` and `[[rules]]` are registered on top of
//! whatever the database restored.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use autorule_adapter_ssh_openssh::OpenSshConfig;
use autorule_app::action_manager::ActionManagerConfig;
use autorule_app::rule_engine::RuleEngineConfig;
use autorule_domain::automation::Rule;
use autorule_domain::ssh_host::SshHost;
use autorule_domain::template::ActionTemplate;
use autorule_domain::value::Value;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub actions: ActionsConfig,
    pub webhook: WebhookConfig,
    pub ssh: SshConfig,
    pub hosts: Vec<SshHost>,
    pub variables: Vec<VariableSeed>,
    pub templates: Vec<ActionTemplate>,
    pub rules: Vec<Rule>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// Emit one JSON object per line instead of the human format.
    pub json: bool,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Rule engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the `evaluate_all` loop.
    pub eval_interval_ms: u64,
    /// Maximum number of registered rules.
    pub rule_capacity: usize,
}

/// Action manager configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    pub queue_capacity: usize,
    pub enqueue_wait_ms: u64,
    pub worker_poll_ms: u64,
    pub max_templates: usize,
    pub max_hosts: usize,
    /// Applied to SSH commands that leave `timeout_ms` at zero.
    pub ssh_timeout_ms: u64,
}

/// Webhook client configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub timeout_ms: u64,
}

/// `OpenSSH` client configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Path to the `ssh` binary.
    pub program: PathBuf,
    /// Path to the `sshpass` binary, used for password hosts.
    pub sshpass: PathBuf,
    pub connect_timeout_secs: u32,
    pub strict_host_key_checking: bool,
}

/// Initial value of one variable.
#[derive(Debug, Deserialize)]
pub struct VariableSeed {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl Config {
    /// Load configuration from `autorule.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("autorule.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AUTORULE_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("AUTORULE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("AUTORULE_EVAL_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.engine.eval_interval_ms = interval;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.eval_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "engine.eval_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.engine.rule_capacity == 0 {
            return Err(ConfigError::Validation(
                "engine.rule_capacity must be non-zero".to_string(),
            ));
        }
        if self.actions.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "actions.queue_capacity must be non-zero".to_string(),
            ));
        }
        if self.actions.worker_poll_ms == 0 {
            return Err(ConfigError::Validation(
                "actions.worker_poll_ms must be non-zero".to_string(),
            ));
        }
        if self.webhook.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "webhook.timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.hosts.len() > self.actions.max_hosts {
            return Err(ConfigError::Validation(format!(
                "{} hosts configured, at most {} allowed",
                self.hosts.len(),
                self.actions.max_hosts
            )));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn eval_interval(&self) -> Duration {
        Duration::from_millis(self.engine.eval_interval_ms)
    }

    #[must_use]
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook.timeout_ms)
    }

    #[must_use]
    pub fn rule_engine(&self) -> RuleEngineConfig {
        RuleEngineConfig {
            capacity: self.engine.rule_capacity,
        }
    }

    #[must_use]
    pub fn action_manager(&self) -> ActionManagerConfig {
        ActionManagerConfig {
            queue_capacity: self.actions.queue_capacity,
            enqueue_wait: Duration::from_millis(self.actions.enqueue_wait_ms),
            worker_poll: Duration::from_millis(self.actions.worker_poll_ms),
            max_templates: self.actions.max_templates,
            max_hosts: self.actions.max_hosts,
            default_ssh_timeout: Duration::from_millis(self.actions.ssh_timeout_ms),
        }
    }

    #[must_use]
    pub fn open_ssh(&self) -> OpenSshConfig {
        OpenSshConfig {
            ssh_program: self.ssh.program.clone(),
            sshpass_program: self.ssh.sshpass.clone(),
            connect_timeout_secs: self.ssh.connect_timeout_secs,
            strict_host_key_checking: self.ssh.strict_host_key_checking,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "autoruled=info,autorule=info,automation=info".to_string(),
            json: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:autorule.db?mode=rwc".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eval_interval_ms: 1000,
            rule_capacity: RuleEngineConfig::default().capacity,
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        let defaults = ActionManagerConfig::default();
        Self {
            queue_capacity: defaults.queue_capacity,
            enqueue_wait_ms: millis(defaults.enqueue_wait),
            worker_poll_ms: millis(defaults.worker_poll),
            max_templates: defaults.max_templates,
            max_hosts: defaults.max_hosts,
            ssh_timeout_ms: millis(defaults.default_ssh_timeout),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        let defaults = OpenSshConfig::default();
        Self {
            program: defaults.ssh_program,
            sshpass: defaults.sshpass_program,
            connect_timeout_secs: defaults.connect_timeout_secs,
            strict_host_key_checking: defaults.strict_host_key_checking,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

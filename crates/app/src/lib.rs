//! # autorule-app
//!
//! Application layer — the automation engine and its **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `VariableStore` — live key/value table read by conditions
//!   - `SshClient`, `LedController`, `GpioController`, `PowerController`,
//!     `HttpClient` — the effects actions drive
//!   - `TemplateRepository`, `RuleRepository` — persistence of both tables
//! - Provide the use-cases:
//!   - condition evaluation (`evaluator`)
//!   - `ActionManager` — execute, queue, templates, SSH hosts
//!   - `RuleEngine` — rule table, cooldown, evaluation and triggering
//! - Provide **in-process infrastructure** that needs no IO (variable store,
//!   bounded action queue)
//!
//! ## Dependency rule
//! Depends on `autorule-domain` only (plus `tokio` for timers and sync).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod action_manager;
pub mod action_queue;
pub mod evaluator;
pub mod expand;
pub mod ports;
pub mod rule_engine;
pub mod variable_store;

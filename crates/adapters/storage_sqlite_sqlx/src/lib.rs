//! # autorule-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement `TemplateRepository` and `RuleRepository` from `autorule-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and JSON document rows
//!
//! ## Dependency rule
//! Depends on `autorule-app` (for port traits) and `autorule-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod document;
pub mod error;
pub mod pool;
mod rule_repo;
mod template_repo;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use rule_repo::SqliteRuleRepository;
pub use template_repo::SqliteTemplateRepository;

//! `SQLite` implementation of [`RuleRepository`].

use sqlx::SqlitePool;

use autorule_app::ports::RuleRepository;
use autorule_domain::automation::Rule;
use autorule_domain::error::AutomationError;

use crate::document::{Document, position};
use crate::error::StorageError;

/// `SQLite`-backed rule table.
pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of stored rules that are enabled.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Storage`] if the query fails.
    pub async fn count_enabled(&self) -> Result<i64, AutomationError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rules WHERE enabled = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(count)
    }
}

impl RuleRepository for SqliteRuleRepository {
    async fn save_all(&self, rules: &[Rule]) -> Result<(), AutomationError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        sqlx::query("DELETE FROM rules")
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        for (index, rule) in rules.iter().enumerate() {
            let document = serde_json::to_string(rule).map_err(StorageError::from)?;
            sqlx::query("INSERT INTO rules (id, position, enabled, document) VALUES (?, ?, ?, ?)")
                .bind(rule.id.as_str())
                .bind(position(index))
                .bind(rule.enabled)
                .bind(&document)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Rule>, AutomationError> {
        let rows: Vec<Document<Rule>> =
            sqlx::query_as("SELECT document FROM rules ORDER BY position")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }
}

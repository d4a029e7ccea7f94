//! `SQLite` implementation of [`TemplateRepository`].

use sqlx::SqlitePool;

use autorule_app::ports::TemplateRepository;
use autorule_domain::error::AutomationError;
use autorule_domain::template::ActionTemplate;

use crate::document::{Document, position};
use crate::error::StorageError;

/// `SQLite`-backed action template table.
pub struct SqliteTemplateRepository {
    pool: SqlitePool,
}

impl SqliteTemplateRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TemplateRepository for SqliteTemplateRepository {
    async fn save_all(&self, templates: &[ActionTemplate]) -> Result<(), AutomationError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        sqlx::query("DELETE FROM action_templates")
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        for (index, template) in templates.iter().enumerate() {
            let document = serde_json::to_string(template).map_err(StorageError::from)?;
            sqlx::query("INSERT INTO action_templates (id, position, document) VALUES (?, ?, ?)")
                .bind(template.id.as_str())
                .bind(position(index))
                .bind(&document)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }

        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ActionTemplate>, AutomationError> {
        let rows: Vec<Document<ActionTemplate>> =
            sqlx::query_as("SELECT document FROM action_templates ORDER BY position")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use autorule_domain::automation::{Action, LogLevel};

    async fn setup() -> SqliteTemplateRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteTemplateRepository::new(db.pool().clone())
    }

    fn template(id: &str) -> ActionTemplate {
        ActionTemplate::builder()
            .id(id)
            .name(id)
            .action(Action::log(LogLevel::Info, "hello ${who}"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_load_nothing_from_fresh_database() {
        let repo = setup().await;
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_round_trip_templates_in_order_with_metadata() {
        let repo = setup().await;
        let mut used = template("zeta");
        used.use_count = 4;
        used.run_async = true;
        let templates = vec![used, template("alpha")];

        repo.save_all(&templates).await.unwrap();

        assert_eq!(repo.load_all().await.unwrap(), templates);
    }

    #[tokio::test]
    async fn should_replace_previous_table_on_save() {
        let repo = setup().await;
        repo.save_all(&[template("a"), template("b")]).await.unwrap();
        repo.save_all(&[template("c")]).await.unwrap();

        let ids: Vec<_> = repo
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|template| template.id.to_string())
            .collect();
        assert_eq!(ids, ["c"]);
    }
}

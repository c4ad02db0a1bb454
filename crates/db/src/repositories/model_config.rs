use super::{ModelConfigRepository, ModelConfigRow, RepositoryError};
use crate::DbPool;

pub struct SqlModelConfigRepository {
    pool: DbPool,
}

impl SqlModelConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ModelConfigRepository for SqlModelConfigRepository {
    async fn active(&self) -> Result<Option<ModelConfigRow>, RepositoryError> {
        let row: Option<ModelConfigRow> = sqlx::query_as(
            "SELECT id, provider, model, api_key, base_url
             FROM model_config
             WHERE active = 1
             ORDER BY updated_at DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use crate::repositories::{ModelConfigRepository, SqlModelConfigRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn latest_active_row_wins() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        sqlx::query(
            "INSERT INTO model_config (id, provider, model, api_key, base_url, active, updated_at) VALUES
             ('m-1', 'ollama', 'llama3.1', NULL, 'http://localhost:11434/v1', 1, '2026-01-01T00:00:00Z'),
             ('m-2', 'groq', 'llama-3.3-70b', 'gsk-test', NULL, 1, '2026-02-01T00:00:00Z'),
             ('m-3', 'openai', 'gpt-4o-mini', 'sk-test', NULL, 0, '2026-03-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert configs");

        let repo = SqlModelConfigRepository::new(pool);
        let active = repo.active().await.expect("active config").expect("row present");

        assert_eq!(active.provider, "groq");
        assert_eq!(active.model, "llama-3.3-70b");
    }

    #[tokio::test]
    async fn no_active_row_yields_none() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let repo = SqlModelConfigRepository::new(pool);
        assert!(repo.active().await.expect("query").is_none());
    }
}

use chrono::Utc;
use sqlx::Row;

use super::{InterventionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInterventionRepository {
    pool: DbPool,
}

impl SqlInterventionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InterventionRepository for SqlInterventionRepository {
    async fn state(&self, thread_id: &str) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT active FROM intervention WHERE thread_id = ?1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<bool, _>("active")).unwrap_or(false))
    }

    async fn set_state(&self, thread_id: &str, active: bool) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO intervention (thread_id, active, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(thread_id) DO UPDATE SET active = excluded.active,
                                                  updated_at = excluded.updated_at",
        )
        .bind(thread_id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

use chrono::Utc;
use uuid::Uuid;

use super::{ProviderRepository, ProviderRow, RepositoryError};
use crate::DbPool;

pub struct SqlProviderRepository {
    pool: DbPool,
}

impl SqlProviderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProviderRepository for SqlProviderRepository {
    async fn upsert(&self, name: &str, endpoint: &str) -> Result<ProviderRow, RepositoryError> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO capability_provider (id, name, endpoint, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(name) DO UPDATE SET endpoint = excluded.endpoint,
                                             updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(endpoint)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row: ProviderRow = sqlx::query_as(
            "SELECT id, name, endpoint, created_at, updated_at
             FROM capability_provider WHERE name = ?1",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list(&self) -> Result<Vec<ProviderRow>, RepositoryError> {
        let rows: Vec<ProviderRow> = sqlx::query_as(
            "SELECT id, name, endpoint, created_at, updated_at
             FROM capability_provider ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

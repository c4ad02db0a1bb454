use sqlx::Row;

use super::{LessonRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLessonRepository {
    pool: DbPool,
}

impl SqlLessonRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LessonRepository for SqlLessonRepository {
    async fn active(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT content FROM lesson WHERE active = 1 ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get::<String, _>("content")).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::repositories::{LessonRepository, SqlLessonRepository};
    use crate::{connect_with_settings, fixtures, migrations};

    #[tokio::test]
    async fn only_active_lessons_are_returned() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        fixtures::seed_demo(&pool).await.expect("seed");

        sqlx::query(
            "INSERT INTO lesson (id, content, active, created_at)
             VALUES ('l-retired', 'retired lesson', 0, '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert retired lesson");

        let repo = SqlLessonRepository::new(pool);
        let lessons = repo.active().await.expect("active lessons");

        assert!(!lessons.is_empty());
        assert!(lessons.iter().all(|lesson| lesson != "retired lesson"));
    }
}

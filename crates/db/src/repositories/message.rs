use chrono::Utc;
use uuid::Uuid;

use super::{MessageRepository, RepositoryError, StoredMessage};
use crate::DbPool;

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for SqlMessageRepository {
    async fn save(
        &self,
        thread_id: &str,
        sender: &str,
        body: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            sender: sender.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO message (id, thread_id, sender, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&message.id)
        .bind(&message.thread_id)
        .bind(&message.sender)
        .bind(&message.body)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    async fn history(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let mut rows: Vec<StoredMessage> = sqlx::query_as(
            "SELECT id, thread_id, sender, body, created_at
             FROM message
             WHERE thread_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )
        .bind(thread_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::repositories::{MessageRepository, SqlMessageRepository};
    use crate::{connect_with_settings, migrations};

    async fn pool() -> crate::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    #[tokio::test]
    async fn saved_messages_come_back_in_chronological_order() {
        let repo = SqlMessageRepository::new(pool().await);

        repo.save("t-1", "user", "hello").await.expect("save first");
        repo.save("t-1", "assistant", "hi there").await.expect("save second");
        repo.save("t-2", "user", "other thread").await.expect("save other thread");

        let history = repo.history("t-1", 10).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, "user");
        assert_eq!(history[0].body, "hello");
        assert_eq!(history[1].sender, "assistant");
    }

    #[tokio::test]
    async fn history_keeps_only_most_recent_messages_within_limit() {
        let repo = SqlMessageRepository::new(pool().await);

        for index in 0..5 {
            repo.save("t-1", "user", &format!("message {index}")).await.expect("save");
        }

        let history = repo.history("t-1", 2).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body, "message 3");
        assert_eq!(history[1].body, "message 4");
    }
}

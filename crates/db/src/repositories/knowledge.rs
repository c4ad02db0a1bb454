use super::{KnowledgeChunk, KnowledgeRepository, RepositoryError};
use crate::DbPool;

/// Substring match over indexed chunks. The original deployment used a
/// vector index here; the collaborator contract is just `search(query,
/// limit)`, so plain SQL keeps this self-contained.
pub struct SqlKnowledgeRepository {
    pool: DbPool,
}

impl SqlKnowledgeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KnowledgeRepository for SqlKnowledgeRepository {
    async fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<KnowledgeChunk>, RepositoryError> {
        let rows: Vec<KnowledgeChunk> = sqlx::query_as(
            "SELECT id, source, content
             FROM knowledge_chunk
             WHERE content LIKE '%' || ?1 || '%'
             ORDER BY id
             LIMIT ?2",
        )
        .bind(query.trim())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

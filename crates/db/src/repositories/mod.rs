use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod intervention;
pub mod knowledge;
pub mod lesson;
pub mod memory;
pub mod menu;
pub mod message;
pub mod model_config;
pub mod provider;

pub use intervention::SqlInterventionRepository;
pub use knowledge::SqlKnowledgeRepository;
pub use lesson::SqlLessonRepository;
pub use memory::{
    InMemoryInterventionRepository, InMemoryMessageRepository, InMemoryProviderRepository,
};
pub use menu::SqlMenuRepository;
pub use message::SqlMessageRepository;
pub use model_config::SqlModelConfigRepository;
pub use provider::SqlProviderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMessage {
    pub id: String,
    pub thread_id: String,
    pub sender: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProviderRow {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeChunk {
    pub id: String,
    pub source: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub price_cents: i64,
    pub available: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelConfigRow {
    pub id: String,
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn save(
        &self,
        thread_id: &str,
        sender: &str,
        body: &str,
    ) -> Result<StoredMessage, RepositoryError>;

    /// Thread history in chronological order, capped at `limit` most recent
    /// messages.
    async fn history(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, RepositoryError>;
}

#[async_trait]
pub trait InterventionRepository: Send + Sync {
    async fn state(&self, thread_id: &str) -> Result<bool, RepositoryError>;
    async fn set_state(&self, thread_id: &str, active: bool) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    /// Idempotent per name: re-registering an existing provider updates its
    /// endpoint in place.
    async fn upsert(&self, name: &str, endpoint: &str) -> Result<ProviderRow, RepositoryError>;
    async fn list(&self) -> Result<Vec<ProviderRow>, RepositoryError>;
}

#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<KnowledgeChunk>, RepositoryError>;
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn list_available(&self) -> Result<Vec<MenuItem>, RepositoryError>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    async fn active(&self) -> Result<Vec<String>, RepositoryError>;
}

#[async_trait]
pub trait ModelConfigRepository: Send + Sync {
    async fn active(&self) -> Result<Option<ModelConfigRow>, RepositoryError>;
}

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    InterventionRepository, MessageRepository, ProviderRepository, ProviderRow, RepositoryError,
    StoredMessage,
};

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<StoredMessage>>,
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryMessageRepository {
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
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn history(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        let thread: Vec<StoredMessage> = messages
            .iter()
            .filter(|message| message.thread_id == thread_id)
            .cloned()
            .collect();

        let skip = thread.len().saturating_sub(limit as usize);
        Ok(thread.into_iter().skip(skip).collect())
    }
}

#[derive(Default)]
pub struct InMemoryInterventionRepository {
    states: RwLock<HashMap<String, bool>>,
}

#[async_trait::async_trait]
impl InterventionRepository for InMemoryInterventionRepository {
    async fn state(&self, thread_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.states.read().await.get(thread_id).copied().unwrap_or(false))
    }

    async fn set_state(&self, thread_id: &str, active: bool) -> Result<(), RepositoryError> {
        self.states.write().await.insert(thread_id.to_string(), active);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProviderRepository {
    providers: RwLock<HashMap<String, ProviderRow>>,
}

#[async_trait::async_trait]
impl ProviderRepository for InMemoryProviderRepository {
    async fn upsert(&self, name: &str, endpoint: &str) -> Result<ProviderRow, RepositoryError> {
        let mut providers = self.providers.write().await;
        let now = Utc::now();

        let row = providers
            .entry(name.to_string())
            .and_modify(|row| {
                row.endpoint = endpoint.to_string();
                row.updated_at = now;
            })
            .or_insert_with(|| ProviderRow {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                endpoint: endpoint.to_string(),
                created_at: now,
                updated_at: now,
            });

        Ok(row.clone())
    }

    async fn list(&self) -> Result<Vec<ProviderRow>, RepositoryError> {
        let providers = self.providers.read().await;
        let mut rows: Vec<ProviderRow> = providers.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

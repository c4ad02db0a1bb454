//! Adapters wiring the trait seams of the agent and dispatch crates onto
//! the persistence repositories and the notification bus.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use tavola_agent::collab::{ContextSearch, LessonSource, MenuEntry, MenuSource, StaffNotifier};
use tavola_agent::llm::{ModelConfigSource, ModelSelection};
use tavola_db::repositories::{
    KnowledgeRepository, LessonRepository, MenuRepository, ModelConfigRepository,
    ProviderRepository,
};
use tavola_db::EventBus;
use tavola_dispatch::{EventSink, ProviderDirectory, ProviderRecord};

pub struct DbContextSearch {
    repo: Arc<dyn KnowledgeRepository>,
}

impl DbContextSearch {
    pub fn new(repo: Arc<dyn KnowledgeRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ContextSearch for DbContextSearch {
    async fn search(&self, query: &str, limit: u32) -> anyhow::Result<Vec<String>> {
        let chunks = self.repo.search(query, limit).await?;
        Ok(chunks.into_iter().map(|chunk| chunk.content).collect())
    }
}

pub struct DbLessonSource {
    repo: Arc<dyn LessonRepository>,
}

impl DbLessonSource {
    pub fn new(repo: Arc<dyn LessonRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl LessonSource for DbLessonSource {
    async fn active_lessons(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.repo.active().await?)
    }
}

pub struct DbMenuSource {
    repo: Arc<dyn MenuRepository>,
}

impl DbMenuSource {
    pub fn new(repo: Arc<dyn MenuRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl MenuSource for DbMenuSource {
    async fn available_items(&self) -> anyhow::Result<Vec<MenuEntry>> {
        let items = self.repo.list_available().await?;
        Ok(items
            .into_iter()
            .map(|item| MenuEntry {
                name: item.name,
                category: item.category,
                description: item.description,
                price_cents: item.price_cents,
            })
            .collect())
    }
}

pub struct DbModelConfigSource {
    repo: Arc<dyn ModelConfigRepository>,
}

impl DbModelConfigSource {
    pub fn new(repo: Arc<dyn ModelConfigRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ModelConfigSource for DbModelConfigSource {
    async fn active_model(&self) -> anyhow::Result<Option<ModelSelection>> {
        let row = self.repo.active().await?;
        Ok(row.map(|row| ModelSelection {
            provider: row.provider,
            model: row.model,
            api_key: row.api_key,
            base_url: row.base_url,
        }))
    }
}

pub struct DbProviderDirectory {
    repo: Arc<dyn ProviderRepository>,
}

impl DbProviderDirectory {
    pub fn new(repo: Arc<dyn ProviderRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl ProviderDirectory for DbProviderDirectory {
    async fn register_provider(
        &self,
        name: &str,
        endpoint: &str,
    ) -> anyhow::Result<ProviderRecord> {
        let row = self.repo.upsert(name, endpoint).await?;
        Ok(ProviderRecord { id: row.id, name: row.name, endpoint: row.endpoint })
    }
}

#[derive(Clone)]
pub struct BusEventSink {
    events: EventBus,
}

impl BusEventSink {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

impl EventSink for BusEventSink {
    fn emit(&self, event_type: &str, data: Value) {
        self.events.emit(event_type, data);
    }
}

#[derive(Clone)]
pub struct BusStaffNotifier {
    events: EventBus,
}

impl BusStaffNotifier {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl StaffNotifier for BusStaffNotifier {
    async fn delegate(&self, staff_name: &str, task: &str, priority: &str) -> anyhow::Result<()> {
        self.events.emit(
            "staff.task_delegated",
            json!({ "staff_name": staff_name, "task": task, "priority": priority }),
        );
        Ok(())
    }
}

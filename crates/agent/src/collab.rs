use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Knowledge retrieval collaborator. Failures degrade to empty context at
/// the call site; they never abort a turn.
#[async_trait]
pub trait ContextSearch: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> anyhow::Result<Vec<String>>;
}

/// Active operator lessons included in the compiled system prompt.
#[async_trait]
pub trait LessonSource: Send + Sync {
    async fn active_lessons(&self) -> anyhow::Result<Vec<String>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price_cents: i64,
}

/// Read-only menu access for the builtin menu-search tool.
#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn available_items(&self) -> anyhow::Result<Vec<MenuEntry>>;
}

/// Hands a task to a human staff member (typically by emitting a staff
/// alert through the notification bus).
#[async_trait]
pub trait StaffNotifier: Send + Sync {
    async fn delegate(&self, staff_name: &str, task: &str, priority: &str) -> anyhow::Result<()>;
}

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use tavola_core::domain::tool::ToolDescriptor;

use crate::collab::{ContextSearch, MenuSource, StaffNotifier};

/// One builtin capability. Builtin and federated tools share the descriptor
/// shape, so the orchestrator never branches on tool kind.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<Value>;
}

/// Builtin tools in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.push(Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| {
                ToolDescriptor::builtin(tool.name(), tool.description(), tool.input_schema())
            })
            .collect()
    }

}

fn query_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "description": description }
        },
        "required": ["query"]
    })
}

fn string_arg(input: &Value, key: &str) -> Result<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("missing required string argument `{key}`"))
}

fn format_price(price_cents: i64) -> String {
    let sign = if price_cents < 0 { "-" } else { "" };
    let absolute = price_cents.unsigned_abs();
    format!("{sign}{}.{:02}", absolute / 100, absolute % 100)
}

/// Looks up menu items by name, category, or ingredient.
pub struct SearchMenuTool {
    menu: Arc<dyn MenuSource>,
}

impl SearchMenuTool {
    pub fn new(menu: Arc<dyn MenuSource>) -> Self {
        Self { menu }
    }
}

#[async_trait]
impl Tool for SearchMenuTool {
    fn name(&self) -> &'static str {
        "search_menu"
    }

    fn description(&self) -> &'static str {
        "Search the official menu by item name, category, or ingredient. \
         Use before quoting any price or availability."
    }

    fn input_schema(&self) -> Value {
        query_schema("Item name, category, or ingredient to look for")
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let query = string_arg(&input, "query")?.to_lowercase();
        let items = self.menu.available_items().await?;

        let matches: Vec<Value> = items
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&query)
                    || item.category.to_lowercase().contains(&query)
                    || item.description.to_lowercase().contains(&query)
            })
            .map(|item| {
                json!({
                    "name": item.name,
                    "category": item.category,
                    "description": item.description,
                    "price": format_price(item.price_cents),
                })
            })
            .collect();

        if matches.is_empty() {
            return Ok(json!({
                "status": "empty",
                "message": "No menu items matched that search."
            }));
        }

        Ok(json!({ "status": "success", "items": matches }))
    }
}

/// Searches the indexed knowledge base (policies, hours, promotions).
pub struct SearchKnowledgeTool {
    retriever: Arc<dyn ContextSearch>,
}

impl SearchKnowledgeTool {
    pub fn new(retriever: Arc<dyn ContextSearch>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for SearchKnowledgeTool {
    fn name(&self) -> &'static str {
        "search_knowledge"
    }

    fn description(&self) -> &'static str {
        "Search the knowledge base for policies, opening hours, promotions, \
         and operational guidance."
    }

    fn input_schema(&self) -> Value {
        query_schema("What to look for in the knowledge base")
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let query = string_arg(&input, "query")?;
        let chunks = self.retriever.search(&query, 4).await?;

        if chunks.is_empty() {
            return Ok(json!({
                "status": "empty",
                "message": "No relevant information found in the documents."
            }));
        }

        let truncated: Vec<String> = chunks
            .into_iter()
            .map(|chunk| {
                if chunk.chars().count() > 500 {
                    let head: String = chunk.chars().take(500).collect();
                    format!("{head}...")
                } else {
                    chunk
                }
            })
            .collect();

        Ok(json!({ "status": "success", "query": query, "relevant_chunks": truncated }))
    }
}

/// Generates a checkout link so the customer can settle the order.
#[derive(Default)]
pub struct CreatePaymentLinkTool;

#[async_trait]
impl Tool for CreatePaymentLinkTool {
    fn name(&self) -> &'static str {
        "create_payment_link"
    }

    fn description(&self) -> &'static str {
        "Generate a payment link for the customer to finalize the order."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "amount_cents": {
                    "type": "integer",
                    "description": "Order total in cents"
                },
                "order_description": {
                    "type": "string",
                    "description": "Short description of the order"
                }
            },
            "required": ["amount_cents", "order_description"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let amount_cents = input
            .get("amount_cents")
            .and_then(Value::as_i64)
            .context("missing required integer argument `amount_cents`")?;
        if amount_cents <= 0 {
            anyhow::bail!("amount_cents must be positive");
        }
        let order_description = string_arg(&input, "order_description")?;

        Ok(json!({
            "status": "success",
            "payment_link": format!("https://pay.tavola.example/checkout/{amount_cents}"),
            "message": format!("Payment link generated for: {order_description}"),
        }))
    }
}

/// Hands a physical-world task to a named staff member.
pub struct DelegateTaskTool {
    notifier: Arc<dyn StaffNotifier>,
}

impl DelegateTaskTool {
    pub fn new(notifier: Arc<dyn StaffNotifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Tool for DelegateTaskTool {
    fn name(&self) -> &'static str {
        "delegate_task"
    }

    fn description(&self) -> &'static str {
        "Delegate a task that needs a human (cleaning, late delivery, \
         complaint follow-up) to a staff member."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "staff_name": { "type": "string", "description": "Who should handle it" },
                "task": { "type": "string", "description": "What needs to be done" },
                "priority": {
                    "type": "string",
                    "enum": ["low", "medium", "high"],
                    "description": "Defaults to medium"
                }
            },
            "required": ["staff_name", "task"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let staff_name = string_arg(&input, "staff_name")?;
        let task = string_arg(&input, "task")?;
        let priority = input
            .get("priority")
            .and_then(Value::as_str)
            .unwrap_or("medium")
            .to_string();

        self.notifier.delegate(&staff_name, &task, &priority).await?;

        Ok(json!({
            "status": "success",
            "message": format!("Task '{task}' assigned to {staff_name}."),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    use crate::collab::{ContextSearch, MenuEntry, MenuSource, StaffNotifier};

    use super::{
        CreatePaymentLinkTool, DelegateTaskTool, SearchKnowledgeTool, SearchMenuTool, Tool,
        ToolRegistry,
    };

    struct FixedMenu;

    #[async_trait]
    impl MenuSource for FixedMenu {
        async fn available_items(&self) -> anyhow::Result<Vec<MenuEntry>> {
            Ok(vec![
                MenuEntry {
                    name: "Margherita".to_string(),
                    category: "pizza".to_string(),
                    description: "Tomato, mozzarella, basil".to_string(),
                    price_cents: 4500,
                },
                MenuEntry {
                    name: "Tiramisu".to_string(),
                    category: "dessert".to_string(),
                    description: "House-made".to_string(),
                    price_cents: 2400,
                },
            ])
        }
    }

    struct FixedKnowledge;

    #[async_trait]
    impl ContextSearch for FixedKnowledge {
        async fn search(&self, _query: &str, _limit: u32) -> anyhow::Result<Vec<String>> {
            Ok(vec!["Delivery radius is 6km from the shop.".to_string()])
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        delegations: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl StaffNotifier for RecordingNotifier {
        async fn delegate(
            &self,
            staff_name: &str,
            task: &str,
            priority: &str,
        ) -> anyhow::Result<()> {
            self.delegations.lock().await.push((
                staff_name.to_string(),
                task.to_string(),
                priority.to_string(),
            ));
            Ok(())
        }
    }

    #[tokio::test]
    async fn menu_search_matches_by_ingredient_and_formats_price() {
        let tool = SearchMenuTool::new(Arc::new(FixedMenu));

        let result = tool.execute(json!({ "query": "basil" })).await.expect("execute");

        assert_eq!(result["status"], "success");
        assert_eq!(result["items"][0]["name"], "Margherita");
        assert_eq!(result["items"][0]["price"], "45.00");
    }

    #[tokio::test]
    async fn menu_search_reports_empty_result() {
        let tool = SearchMenuTool::new(Arc::new(FixedMenu));

        let result = tool.execute(json!({ "query": "sushi" })).await.expect("execute");

        assert_eq!(result["status"], "empty");
    }

    #[tokio::test]
    async fn menu_search_rejects_missing_query() {
        let tool = SearchMenuTool::new(Arc::new(FixedMenu));

        let error = tool.execute(json!({})).await.expect_err("missing query must fail");
        assert!(error.to_string().contains("query"));
    }

    #[tokio::test]
    async fn knowledge_search_returns_chunks() {
        let tool = SearchKnowledgeTool::new(Arc::new(FixedKnowledge));

        let result = tool.execute(json!({ "query": "delivery" })).await.expect("execute");

        assert_eq!(result["status"], "success");
        assert!(result["relevant_chunks"][0]
            .as_str()
            .expect("chunk text")
            .contains("Delivery radius"));
    }

    #[tokio::test]
    async fn payment_link_embeds_amount() {
        let tool = CreatePaymentLinkTool;

        let result = tool
            .execute(json!({ "amount_cents": 9700, "order_description": "2x Margherita" }))
            .await
            .expect("execute");

        assert_eq!(result["payment_link"], "https://pay.tavola.example/checkout/9700");
    }

    #[tokio::test]
    async fn payment_link_rejects_non_positive_amount() {
        let tool = CreatePaymentLinkTool;

        let error = tool
            .execute(json!({ "amount_cents": 0, "order_description": "nothing" }))
            .await
            .expect_err("zero amount must fail");
        assert!(error.to_string().contains("positive"));
    }

    #[tokio::test]
    async fn delegate_task_notifies_staff_with_default_priority() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tool = DelegateTaskTool::new(notifier.clone());

        tool.execute(json!({ "staff_name": "Marco", "task": "check oven 2" }))
            .await
            .expect("execute");

        assert_eq!(
            notifier.delegations.lock().await.as_slice(),
            &[("Marco".to_string(), "check oven 2".to_string(), "medium".to_string())]
        );
    }

    #[tokio::test]
    async fn registry_exposes_descriptors_in_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(SearchMenuTool::new(Arc::new(FixedMenu)));
        registry.register(CreatePaymentLinkTool);

        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "search_menu");
        assert_eq!(descriptors[1].name, "create_payment_link");
        assert!(registry.get("search_menu").is_some());
        assert!(registry.get("missing").is_none());
    }
}

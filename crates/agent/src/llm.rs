use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;

use tavola_core::config::{LlmConfig, LlmProvider};
use tavola_core::domain::message::{ChatMessage, Role, ToolCallRequest};
use tavola_core::domain::tool::ToolDescriptor;

/// What one model invocation produced: a final answer, or tool-call
/// requests (possibly with interstitial text).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<ModelReply>;
}

/// Active model selection as persisted by the admin surface. Overrides the
/// statically configured model without a restart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSelection {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[async_trait]
pub trait ModelConfigSource: Send + Sync {
    async fn active_model(&self) -> Result<Option<ModelSelection>>;
}

fn provider_base_url(provider: LlmProvider) -> Option<&'static str> {
    match provider {
        LlmProvider::OpenAi => Some("https://api.openai.com/v1"),
        LlmProvider::Groq => Some("https://api.groq.com/openai/v1"),
        LlmProvider::Ollama => None,
    }
}

/// Chat-completions client for OpenAI-compatible endpoints (OpenAI, Groq,
/// Ollama). Other back-ends plug in behind `ChatModel`.
pub struct OpenAiCompatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap_or_else(|err| {
            warn!(error = %err, "http client build failed; using default client");
            reqwest::Client::new()
        });
        Self { client, base_url: base_url.into(), api_key, model: model.into() }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .or_else(|| provider_base_url(config.provider).map(str::to_string))
            .unwrap_or_else(|| "http://localhost:11434/v1".to_string());

        Self::new(
            base_url,
            config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<ModelReply> {
        let request = WireRequest {
            model: &self.model,
            messages: messages.iter().map(to_wire_message).collect(),
            tools: tools.iter().map(to_wire_tool).collect(),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.context("model endpoint unreachable")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model endpoint returned {status}: {body}");
        }

        let wire: WireResponse =
            response.json().await.context("model response could not be decoded")?;
        let choice = wire.choices.into_iter().next().context("model response has no choices")?;

        Ok(from_wire_reply(choice.message))
    }
}

/// Delegates to whatever the active model selection currently is, falling
/// back to the statically configured model. The built client is cached until
/// the selection row changes.
pub struct ModelGateway {
    source: Arc<dyn ModelConfigSource>,
    fallback: Arc<dyn ChatModel>,
    timeout: Duration,
    cache: RwLock<Option<(ModelSelection, Arc<OpenAiCompatModel>)>>,
}

impl ModelGateway {
    pub fn new(
        source: Arc<dyn ModelConfigSource>,
        fallback: Arc<dyn ChatModel>,
        timeout: Duration,
    ) -> Self {
        Self { source, fallback, timeout, cache: RwLock::new(None) }
    }

    async fn resolve(&self, selection: ModelSelection) -> Option<Arc<OpenAiCompatModel>> {
        {
            let cache = self.cache.read().await;
            if let Some((cached_selection, model)) = cache.as_ref() {
                if *cached_selection == selection {
                    return Some(Arc::clone(model));
                }
            }
        }

        let provider: LlmProvider = match selection.provider.parse() {
            Ok(provider) => provider,
            Err(_) => {
                warn!(
                    provider = %selection.provider,
                    "active model selection names an unsupported provider; using fallback"
                );
                return None;
            }
        };

        let base_url = selection
            .base_url
            .clone()
            .or_else(|| provider_base_url(provider).map(str::to_string))?;

        let model = Arc::new(OpenAiCompatModel::new(
            base_url,
            selection.api_key.clone(),
            selection.model.clone(),
            self.timeout,
        ));

        *self.cache.write().await = Some((selection, Arc::clone(&model)));
        Some(model)
    }
}

#[async_trait]
impl ChatModel for ModelGateway {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDescriptor],
    ) -> Result<ModelReply> {
        let selection = match self.source.active_model().await {
            Ok(selection) => selection,
            Err(error) => {
                warn!(error = %error, "active model lookup failed; using configured model");
                None
            }
        };

        match selection {
            Some(selection) => match self.resolve(selection).await {
                Some(model) => model.complete(messages, tools).await,
                None => self.fallback.complete(messages, tools).await,
            },
            None => self.fallback.complete(messages, tools).await,
        }
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReplyMessage,
}

#[derive(Deserialize)]
struct WireReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

fn to_wire_message(message: &ChatMessage) -> WireMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.call_id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    WireMessage {
        role,
        content: Some(message.content.clone()),
        tool_calls,
        tool_call_id: message.tool_link.as_ref().map(|link| link.call_id.clone()),
        name: message.tool_link.as_ref().map(|link| link.tool_name.clone()),
    }
}

fn to_wire_tool(descriptor: &ToolDescriptor) -> WireTool {
    WireTool {
        kind: "function",
        function: WireFunctionDef {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            parameters: descriptor.input_schema.clone(),
        },
    }
}

fn from_wire_reply(message: WireReplyMessage) -> ModelReply {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCallRequest {
            call_id: call.id,
            name: call.function.name,
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or(Value::Null),
        })
        .collect();

    ModelReply { content: message.content.unwrap_or_default(), tool_calls }
}

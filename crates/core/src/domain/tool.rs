use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a tool in the live catalog comes from. Federated tools carry the
/// `(provider_id, tool_name)` pair directly; the namespaced display name is
/// never split to recover it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ToolOrigin {
    Builtin,
    Federated { provider_id: String, tool_name: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub origin: ToolOrigin,
}

impl ToolDescriptor {
    pub fn builtin(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            origin: ToolOrigin::Builtin,
        }
    }

    pub fn federated(
        provider_id: impl Into<String>,
        tool_name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        let provider_id = provider_id.into();
        let tool_name = tool_name.into();
        Self {
            name: format!("{provider_id}_{tool_name}"),
            description: description.into(),
            input_schema,
            origin: ToolOrigin::Federated { provider_id, tool_name },
        }
    }
}

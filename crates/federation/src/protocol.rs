use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub const PROTOCOL_VERSION: &str = "2.0";

pub const METHOD_LIST_TOOLS: &str = "tools/list";
pub const METHOD_CALL_TOOL: &str = "tools/call";

/// Request envelope sent to a capability provider. One request per call;
/// the client never opens a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub protocol_version: String,
    pub method: String,
    pub params: Value,
    pub request_id: String,
}

impl RpcRequest {
    pub fn list_tools() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            method: METHOD_LIST_TOOLS.to_string(),
            params: json!({}),
            request_id: format!("list-{}", short_request_id()),
        }
    }

    pub fn call_tool(tool_name: &str, arguments: Value) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            method: METHOD_CALL_TOOL.to_string(),
            params: json!({ "name": tool_name, "arguments": arguments }),
            request_id: format!("call-{}", short_request_id()),
        }
    }
}

fn short_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

/// One tool as advertised by a provider's `tools/list` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    json!({})
}

impl RpcResponse {
    /// Extracts `result.tools` from a `tools/list` response.
    pub fn into_tool_list(self) -> Result<Vec<ToolSpec>, String> {
        if let Some(error) = self.error {
            return Err(format!("remote error: {}", error.message));
        }

        let tools = self
            .result
            .as_ref()
            .and_then(|result| result.get("tools"))
            .cloned()
            .ok_or_else(|| "response carries no `result.tools` field".to_string())?;

        if !tools.is_array() {
            return Err("`result.tools` must be a list".to_string());
        }

        serde_json::from_value(tools).map_err(|err| format!("malformed tool list: {err}"))
    }

    /// Extracts `result.content` from a `tools/call` response.
    pub fn into_call_content(self) -> Result<Value, String> {
        if let Some(error) = self.error {
            return Err(error.message);
        }

        self.result
            .as_ref()
            .and_then(|result| result.get("content"))
            .cloned()
            .ok_or_else(|| "response carries no `result.content` field".to_string())
    }
}

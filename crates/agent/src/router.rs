use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use tavola_core::domain::message::ToolCallRequest;
use tavola_core::domain::tool::{ToolDescriptor, ToolOrigin};
use tavola_federation::ProviderRegistry;

use crate::tools::ToolRegistry;

#[derive(Debug, Error)]
pub enum ToolRouteError {
    #[error("tool `{0}` was not found in the live catalog")]
    NotFound(String),
    #[error("tool `{name}` failed: {cause}")]
    Execution { name: String, cause: String },
}

/// One generic execution path over builtin and federated tools. Resolution
/// is data-driven: the descriptor's origin carries the dispatch key, so the
/// namespaced display name is never parsed.
pub struct ToolRouter {
    builtin: ToolRegistry,
    federation: Arc<ProviderRegistry>,
}

impl ToolRouter {
    pub fn new(builtin: ToolRegistry, federation: Arc<ProviderRegistry>) -> Self {
        Self { builtin, federation }
    }

    /// The live catalog at this instant: builtin tools followed by the
    /// current federated aggregate.
    pub async fn catalog(&self) -> Vec<ToolDescriptor> {
        let mut catalog = self.builtin.descriptors();
        catalog.extend(self.federation.aggregate_catalog().await);
        catalog
    }

    pub async fn execute(
        &self,
        catalog: &[ToolDescriptor],
        call: &ToolCallRequest,
    ) -> Result<Value, ToolRouteError> {
        let descriptor = catalog
            .iter()
            .find(|descriptor| descriptor.name == call.name)
            .ok_or_else(|| ToolRouteError::NotFound(call.name.clone()))?;

        match &descriptor.origin {
            ToolOrigin::Builtin => {
                let tool = self
                    .builtin
                    .get(&call.name)
                    .ok_or_else(|| ToolRouteError::NotFound(call.name.clone()))?;
                tool.execute(call.arguments.clone()).await.map_err(|err| {
                    ToolRouteError::Execution { name: call.name.clone(), cause: err.to_string() }
                })
            }
            ToolOrigin::Federated { provider_id, tool_name } => self
                .federation
                .invoke(provider_id, tool_name, call.arguments.clone())
                .await
                .map_err(|err| ToolRouteError::Execution {
                    name: call.name.clone(),
                    cause: err.to_string(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use tavola_core::domain::message::ToolCallRequest;
    use tavola_federation::protocol::{RpcRequest, RpcResponse};
    use tavola_federation::transport::{RpcTransport, TransportError};
    use tavola_federation::ProviderRegistry;

    use crate::tools::{Tool, ToolRegistry};

    use super::{ToolRouteError, ToolRouter};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echoes its input"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, input: Value) -> anyhow::Result<Value> {
            Ok(json!({ "echo": input }))
        }
    }

    struct StaticTransport;

    #[async_trait]
    impl RpcTransport for StaticTransport {
        async fn exchange(
            &self,
            _endpoint: &str,
            request: &RpcRequest,
        ) -> Result<RpcResponse, TransportError> {
            let response = if request.method == "tools/list" {
                json!({ "result": { "tools": [{ "name": "check_stock" }] } })
            } else {
                json!({ "result": { "content": { "units": 7 } } })
            };
            serde_json::from_value(response)
                .map_err(|err| TransportError::Decode(err.to_string()))
        }
    }

    fn call(name: &str) -> ToolCallRequest {
        ToolCallRequest {
            call_id: "c1".to_string(),
            name: name.to_string(),
            arguments: json!({"item": "flour"}),
        }
    }

    async fn router() -> ToolRouter {
        let mut builtin = ToolRegistry::new();
        builtin.register(EchoTool);

        let registry = Arc::new(ProviderRegistry::new(Arc::new(StaticTransport)));
        registry.register("erp", "http://erp.internal/rpc").await.expect("register provider");

        ToolRouter::new(builtin, registry)
    }

    #[tokio::test]
    async fn catalog_unions_builtin_and_federated_tools() {
        let router = router().await;
        let catalog = router.catalog().await;

        let names: Vec<&str> = catalog.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "erp_check_stock"]);
    }

    #[tokio::test]
    async fn builtin_and_federated_calls_share_one_path() {
        let router = router().await;
        let catalog = router.catalog().await;

        let builtin = router.execute(&catalog, &call("echo")).await.expect("builtin call");
        assert_eq!(builtin["echo"]["item"], "flour");

        let federated =
            router.execute(&catalog, &call("erp_check_stock")).await.expect("federated call");
        assert_eq!(federated["units"], 7);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_found() {
        let router = router().await;
        let catalog = router.catalog().await;

        let error = router
            .execute(&catalog, &call("crm_lookup"))
            .await
            .expect_err("unknown tool must be reported");

        assert!(matches!(error, ToolRouteError::NotFound(name) if name == "crm_lookup"));
    }
}

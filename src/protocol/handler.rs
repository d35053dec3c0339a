//! Request dispatcher.
//!
//! Resolves JSON-RPC method names directly against the tool registry: tool
//! names are the method names. Registry misses answer -32601; failures
//! raised during execution answer -32603 with the proximate error message.
//! Tools report their own domain errors as narrative text inside a
//! successful result, so a registered tool invoked with valid parameters
//! never produces a protocol-level error.

use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Method dispatcher that routes requests to registered tools.
pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    /// Dispatch a request to the matching tool.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn dispatch(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Dispatching request: {}", request.method);

        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let Some(tool) = self.tools.resolve(&method) else {
            warn!("Unknown method: {}", method);
            let error = JsonRpcError::method_not_found(&method)
                .with_data(serde_json::json!({ "available_tools": self.tools.list_names() }));
            return JsonRpcResponse::error(id, error);
        };

        let arguments = params.unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        match tool.execute(arguments).await {
            Ok(text) => JsonRpcResponse::success(id, Value::String(text)),
            Err(e) => {
                error!("Tool execution failed: {}", e);
                JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{McpError, Result};
    use crate::protocol::types::Tool;
    use crate::tools::ToolHandler;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "echo".into(),
                description: Some("Echo the input back".into()),
                input_schema: serde_json::json!({"type": "object", "properties": {}}),
            }
        }

        async fn execute(&self, arguments: Value) -> Result<String> {
            Ok(format!("echo: {}", arguments))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn definition(&self) -> Tool {
            Tool {
                name: "broken".into(),
                description: None,
                input_schema: serde_json::json!({"type": "object"}),
            }
        }

        async fn execute(&self, _arguments: Value) -> Result<String> {
            Err(McpError::Internal {
                message: "wires crossed".into(),
            })
        }
    }

    fn dispatcher() -> Dispatcher {
        let registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(FailingTool);
        Dispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_dispatch_registered_tool() {
        let request = JsonRpcRequest::new("echo")
            .with_id(1)
            .with_params(serde_json::json!({"msg": "hi"}));

        let response = dispatcher().dispatch(request).await;
        assert!(response.error.is_none());
        let text = response.result.unwrap();
        assert!(text.as_str().unwrap().starts_with("echo:"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let request = JsonRpcRequest::new("no_such_tool").with_id(1);
        let response = dispatcher().dispatch(request).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        let data = error.data.unwrap();
        let available = data["available_tools"].as_array().unwrap();
        assert!(available.iter().any(|v| v == "echo"));
    }

    #[tokio::test]
    async fn test_dispatch_missing_params_defaults_to_empty_map() {
        let request = JsonRpcRequest::new("echo").with_id(2);
        let response = dispatcher().dispatch(request).await;
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_execution_failure_is_internal_error() {
        let request = JsonRpcRequest::new("broken").with_id(3);
        let response = dispatcher().dispatch(request).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, -32603);
        assert!(error.message.contains("wires crossed"));
    }

    #[tokio::test]
    async fn test_dispatch_echoes_request_id() {
        let request = JsonRpcRequest::new("echo").with_id("abc");
        let response = dispatcher().dispatch(request).await;
        assert_eq!(response.id, Some("abc".into()));
    }
}

//! Tool registry.
//!
//! The set of tools is fixed per process: registered once at startup, never
//! unregistered. Re-registering a name overwrites silently.

use crate::error::Result;
use crate::protocol::Tool;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A named, asynchronous server capability.
///
/// Handlers receive a JSON object of named arguments and return a
/// human-readable string; domain errors are rendered into that string
/// rather than raised, so an `Err` here means the invocation itself broke.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> Tool;
    async fn execute(&self, arguments: Value) -> Result<String>;
}

pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    pub fn register<T: ToolHandler + 'static>(&self, tool: T) {
        let definition = tool.definition();
        let name = definition.name.clone();
        debug!("Registering tool: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).map(|r| Arc::clone(&*r))
    }

    /// Tool definitions, sorted by name.
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(|r| r.value().definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Registered tool names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl ToolHandler for TestTool {
        fn definition(&self) -> Tool {
            Tool {
                name: self.name.into(),
                description: Some("A test tool".into()),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            }
        }

        async fn execute(&self, _arguments: Value) -> Result<String> {
            Ok(self.reply.to_string())
        }
    }

    #[test]
    fn test_registry() {
        let registry = ToolRegistry::new();
        registry.register(TestTool {
            name: "beta_tool",
            reply: "b",
        });
        registry.register(TestTool {
            name: "alpha_tool",
            reply: "a",
        });

        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("alpha_tool").is_some());
        assert!(registry.resolve("unknown").is_none());

        assert_eq!(registry.list_names(), vec!["alpha_tool", "beta_tool"]);
        assert_eq!(registry.list()[0].name, "alpha_tool");
    }

    #[test]
    fn test_reregistration_overwrites() {
        let registry = ToolRegistry::new();
        registry.register(TestTool {
            name: "tool",
            reply: "first",
        });
        registry.register(TestTool {
            name: "tool",
            reply: "second",
        });
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_resolved_tool() {
        let registry = ToolRegistry::new();
        registry.register(TestTool {
            name: "tool",
            reply: "done",
        });

        let tool = registry.resolve("tool").unwrap();
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(result, "done");
    }
}

//! Tool definitions and registry.

pub mod records;
pub mod registry;
pub mod tables;

pub use records::{InsertRecordTool, UpdateRecordTool};
pub use registry::{ToolHandler, ToolRegistry};
pub use tables::{DescribeTableTool, ListTablesTool, QueryTableTool};

use crate::backend::TableBackend;
use crate::config::BackendConfig;
use serde_json::Value;
use std::sync::Arc;

/// Create and register all tools.
pub fn create_registry(backend: Arc<dyn TableBackend>, config: &BackendConfig) -> ToolRegistry {
    let registry = ToolRegistry::new();

    registry.register(ListTablesTool::new(Arc::clone(&backend)));
    registry.register(QueryTableTool::new(
        Arc::clone(&backend),
        config.max_query_limit,
    ));
    registry.register(DescribeTableTool::new(Arc::clone(&backend)));
    registry.register(InsertRecordTool::new(Arc::clone(&backend)));
    registry.register(UpdateRecordTool::new(backend));

    registry
}

/// Render a standardized success narrative.
pub(crate) fn success_text(message: &str, data: Option<&Value>) -> String {
    let mut text = format!("**Success**\n\n{message}");
    if let Some(data) = data {
        let rendered =
            serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("\"{e}\""));
        text.push_str(&format!("\n\n**Data:**\n```json\n{rendered}\n```"));
    }
    text
}

/// Render a standardized error narrative.
pub(crate) fn error_text(message: &str, details: Option<&Value>) -> String {
    let mut text = format!("**Error**\n\n{message}");
    if let Some(details) = details {
        let rendered =
            serde_json::to_string_pretty(details).unwrap_or_else(|e| format!("\"{e}\""));
        text.push_str(&format!("\n\n**Details:**\n```json\n{rendered}\n```"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StaticBackend;
    use serde_json::json;

    #[test]
    fn test_create_registry_has_fixed_tool_set() {
        let registry = create_registry(
            Arc::new(StaticBackend::default()),
            &BackendConfig::default(),
        );
        assert_eq!(
            registry.list_names(),
            vec![
                "describe_table",
                "insert_record",
                "list_tables",
                "query_table",
                "update_record"
            ]
        );
    }

    #[test]
    fn test_success_text_with_data() {
        let text = success_text("Found 2 record(s)", Some(&json!({"count": 2})));
        assert!(text.starts_with("**Success**\n\nFound 2 record(s)"));
        assert!(text.contains("**Data:**"));
        assert!(text.contains("\"count\": 2"));
    }

    #[test]
    fn test_success_text_without_data() {
        let text = success_text("Done", None);
        assert_eq!(text, "**Success**\n\nDone");
    }

    #[test]
    fn test_error_text_with_details() {
        let text = error_text("Input validation failed", Some(&json!({"field": "name"})));
        assert!(text.starts_with("**Error**\n\nInput validation failed"));
        assert!(text.contains("**Details:**"));
    }
}

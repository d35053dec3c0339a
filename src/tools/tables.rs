//! Table listing, querying, and schema description tools.

use crate::backend::{validate_columns, validate_table_name, Record, TableBackend};
use crate::error::{BackendError, Result};
use crate::protocol::Tool;
use crate::tools::registry::ToolHandler;
use crate::tools::{error_text, success_text};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Default row limit when the caller does not provide one.
const DEFAULT_QUERY_LIMIT: u32 = 100;

/// Lists all accessible tables in the database.
pub struct ListTablesTool {
    backend: Arc<dyn TableBackend>,
}

impl ListTablesTool {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for ListTablesTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "list_tables".into(),
            description: Some(
                "List all accessible tables in the database with their basic information.".into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    #[instrument(skip(self, _arguments), fields(tool = "list_tables"))]
    async fn execute(&self, _arguments: Value) -> Result<String> {
        info!("Executing list_tables tool");

        match self.backend.list_tables().await {
            Ok(tables) if tables.is_empty() => Ok("**No accessible tables found**\n\n\
                 The database appears to be empty or you may not have permission to view tables."
                .to_string()),
            Ok(tables) => Ok(success_text(
                &format!("Found {} accessible table(s)", tables.len()),
                Some(&json!(tables)),
            )),
            Err(e) => {
                error!("list_tables failed: {}", e);
                // Distinguish a dead connection from a permissions gap
                match self.backend.probe().await {
                    Ok(()) => Ok(error_text(
                        "Unable to list tables directly",
                        Some(&json!({
                            "reason": e.to_string(),
                            "connection_status": "connected",
                            "suggestion": "Tables may exist but require specific permissions to list. \
                                 Try accessing tables directly by name using query_table tool."
                        })),
                    )),
                    Err(probe_error) => Ok(error_text(
                        "Database connection failed",
                        Some(&json!({
                            "error": e.to_string(),
                            "connection_test": probe_error.to_string()
                        })),
                    )),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryTableArgs {
    pub table_name: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub filters: Option<Record>,
}

/// Queries a table with optional equality filters and a row limit.
pub struct QueryTableTool {
    backend: Arc<dyn TableBackend>,
    max_limit: u32,
}

impl QueryTableTool {
    pub fn new(backend: Arc<dyn TableBackend>, max_limit: u32) -> Self {
        Self { backend, max_limit }
    }
}

#[async_trait]
impl ToolHandler for QueryTableTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "query_table".into(),
            description: Some(
                "Query a table with optional filters and pagination. Filters are \
                 equality conditions as key-value pairs."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to query"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 100, max: 1000)",
                        "minimum": 1
                    },
                    "filters": {
                        "type": "object",
                        "description": "Optional filters as key-value pairs (e.g., {\"status\": \"active\"})"
                    }
                },
                "required": ["table_name"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "query_table"))]
    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: QueryTableArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => {
                return Ok(error_text(
                    "Input validation failed",
                    Some(&json!({ "validation_errors": [e.to_string()] })),
                ));
            }
        };

        info!("Executing query_table tool for table: {}", args.table_name);

        if let Err(e) = validate_table_name(&args.table_name) {
            return Ok(error_text(
                "Invalid table name",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        let filters = args.filters.unwrap_or_default();
        if let Err(e) = validate_columns(&filters) {
            return Ok(error_text(
                "Filter validation failed",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        let limit = args
            .limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .min(self.max_limit);

        let rows = match self.backend.select(&args.table_name, &filters, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Database error in query_table: {}", e);
                return Ok(error_text(
                    "Database query failed",
                    Some(&json!({ "error": e.to_string(), "table": args.table_name })),
                ));
            }
        };

        if rows.is_empty() {
            return Ok(format!(
                "**No data found**\n\nTable '{}' exists but no records match the given criteria.\n\n\
                 **Query Details:**\n- Limit: {}\n- Filters: {}",
                args.table_name,
                limit,
                serde_json::to_string_pretty(&filters).unwrap_or_else(|_| "{}".into())
            ));
        }

        let record_count = rows.len();
        let mut message = format!(
            "Found {} record(s) in table '{}'",
            record_count, args.table_name
        );
        if !filters.is_empty() {
            message.push_str(" (filtered)");
        }

        Ok(success_text(
            &message,
            Some(&json!({
                "table": args.table_name,
                "record_count": record_count,
                "limit_applied": limit,
                "filters_applied": filters,
                "records": rows
            })),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct DescribeTableArgs {
    pub table_name: String,
}

/// Reports detailed schema information for one table.
pub struct DescribeTableTool {
    backend: Arc<dyn TableBackend>,
}

impl DescribeTableTool {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for DescribeTableTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "describe_table".into(),
            description: Some(
                "Get detailed schema information for a table: columns, types, and constraints."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to describe"
                    }
                },
                "required": ["table_name"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "describe_table"))]
    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: DescribeTableArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => {
                return Ok(error_text(
                    "Input validation failed",
                    Some(&json!({ "validation_errors": [e.to_string()] })),
                ));
            }
        };

        info!(
            "Executing describe_table tool for table: {}",
            args.table_name
        );

        if let Err(e) = validate_table_name(&args.table_name) {
            return Ok(error_text(
                "Invalid table name",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        match self.backend.describe_table(&args.table_name).await {
            Ok(description) => {
                let message = match &description.note {
                    Some(_) => format!(
                        "Table '{}' schema (inferred from sample data)",
                        args.table_name
                    ),
                    None => format!(
                        "Schema for table '{}' ({} columns)",
                        args.table_name, description.column_count
                    ),
                };
                Ok(success_text(&message, Some(&json!(description))))
            }
            Err(BackendError::TableNotFound(_)) => Ok(error_text(
                &format!("Table '{}' not found", args.table_name),
                Some(&json!({
                    "suggestion": "Use list_tables tool to see available tables"
                })),
            )),
            Err(e) => {
                error!("describe_table failed: {}", e);
                Ok(error_text(
                    &format!("Unable to describe table '{}'", args.table_name),
                    Some(&json!({
                        "error": e.to_string(),
                        "suggestion": "Check if the table exists and you have appropriate permissions"
                    })),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StaticBackend;

    #[tokio::test]
    async fn test_list_tables_success() {
        let tool = ListTablesTool::new(Arc::new(StaticBackend::default()));
        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.starts_with("**Success**"));
        assert!(result.contains("Found 2 accessible table(s)"));
        assert!(result.contains("users"));
    }

    #[tokio::test]
    async fn test_query_table_success() {
        let tool = QueryTableTool::new(Arc::new(StaticBackend::default()), 1000);
        let result = tool
            .execute(json!({"table_name": "users", "filters": {"status": "active"}}))
            .await
            .unwrap();
        assert!(result.contains("Found 1 record(s) in table 'users' (filtered)"));
        assert!(result.contains("\"limit_applied\": 100"));
    }

    #[tokio::test]
    async fn test_query_table_limit_is_capped() {
        let tool = QueryTableTool::new(Arc::new(StaticBackend::default()), 1000);
        let result = tool
            .execute(json!({"table_name": "users", "limit": 9999}))
            .await
            .unwrap();
        assert!(result.contains("\"limit_applied\": 1000"));
    }

    #[tokio::test]
    async fn test_query_table_missing_args_is_in_band_error() {
        let tool = QueryTableTool::new(Arc::new(StaticBackend::default()), 1000);
        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.starts_with("**Error**"));
        assert!(result.contains("Input validation failed"));
    }

    #[tokio::test]
    async fn test_query_table_rejects_bad_table_name() {
        let tool = QueryTableTool::new(Arc::new(StaticBackend::default()), 1000);
        let result = tool
            .execute(json!({"table_name": "users; drop table users"}))
            .await
            .unwrap();
        assert!(result.contains("Invalid table name"));
    }

    #[tokio::test]
    async fn test_query_table_rejects_bad_filters() {
        let tool = QueryTableTool::new(Arc::new(StaticBackend::default()), 1000);
        let result = tool
            .execute(json!({
                "table_name": "users",
                "filters": {"name": "x union select password from secrets"}
            }))
            .await
            .unwrap();
        assert!(result.contains("Filter validation failed"));
    }

    #[tokio::test]
    async fn test_query_table_no_matches() {
        let tool = QueryTableTool::new(Arc::new(StaticBackend::default()), 1000);
        let result = tool.execute(json!({"table_name": "empty"})).await.unwrap();
        assert!(result.starts_with("**No data found**"));
    }

    #[tokio::test]
    async fn test_describe_table_success() {
        let tool = DescribeTableTool::new(Arc::new(StaticBackend::default()));
        let result = tool.execute(json!({"table_name": "users"})).await.unwrap();
        assert!(result.contains("Schema for table 'users' (2 columns)"));
        assert!(result.contains("users_pkey"));
    }

    #[tokio::test]
    async fn test_describe_table_not_found() {
        let tool = DescribeTableTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({"table_name": "missing"}))
            .await
            .unwrap();
        assert!(result.contains("Table 'missing' not found"));
        assert!(result.contains("list_tables"));
    }

    #[tokio::test]
    async fn test_describe_table_backend_failure_is_in_band() {
        let backend = StaticBackend {
            fail_schema_rpc: true,
            ..Default::default()
        };
        let tool = DescribeTableTool::new(Arc::new(backend));
        let result = tool.execute(json!({"table_name": "users"})).await.unwrap();
        assert!(result.starts_with("**Error**"));
        assert!(result.contains("Unable to describe table 'users'"));
    }
}

//! Record insertion and update tools.

use crate::backend::{validate_columns, validate_table_name, Record, TableBackend};
use crate::error::Result;
use crate::protocol::Tool;
use crate::tools::registry::ToolHandler;
use crate::tools::{error_text, success_text};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Maximum length for a single string value in inserted or updated data.
const MAX_VALUE_LEN: usize = 10_000;

/// Columns that must never be modified through update_record.
const PROTECTED_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

/// Find the first string value in `data` exceeding the size cap.
fn oversized_value(data: &Record) -> Option<(&String, usize)> {
    data.iter().find_map(|(key, value)| match value {
        Value::String(text) if text.len() > MAX_VALUE_LEN => Some((key, text.len())),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
pub struct InsertRecordArgs {
    pub table_name: String,
    pub data: Record,
}

/// Inserts a single record after validating table, columns, and values.
pub struct InsertRecordTool {
    backend: Arc<dyn TableBackend>,
}

impl InsertRecordTool {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for InsertRecordTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "insert_record".into(),
            description: Some(
                "Insert a new record into a table. Data is given as key-value pairs \
                 (e.g., {\"name\": \"John\", \"email\": \"john@example.com\"})."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to insert into"
                    },
                    "data": {
                        "type": "object",
                        "description": "Record data as key-value pairs"
                    }
                },
                "required": ["table_name", "data"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "insert_record"))]
    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: InsertRecordArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => {
                return Ok(error_text(
                    "Input validation failed",
                    Some(&json!({ "validation_errors": [e.to_string()] })),
                ));
            }
        };

        info!("Executing insert_record tool for table: {}", args.table_name);

        if let Err(e) = validate_table_name(&args.table_name) {
            return Ok(error_text(
                "Invalid table name",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        if args.data.is_empty() {
            return Ok(error_text(
                "No data provided for insertion",
                Some(&json!({
                    "example": {"name": "John Doe", "email": "john@example.com"}
                })),
            ));
        }

        if let Err(e) = validate_columns(&args.data) {
            return Ok(error_text(
                "Invalid column names in data",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        if let Some((column, actual)) = oversized_value(&args.data) {
            return Ok(error_text(
                &format!("Data value too large for column '{column}'"),
                Some(&json!({ "max_length": MAX_VALUE_LEN, "actual_length": actual })),
            ));
        }

        match self.backend.insert(&args.table_name, &args.data).await {
            Ok(rows) => {
                let message = format!(
                    "Record inserted successfully into table '{}'",
                    args.table_name
                );
                match rows.first() {
                    Some(inserted) => Ok(success_text(
                        &message,
                        Some(&json!({
                            "table": args.table_name,
                            "inserted_data": args.data,
                            "inserted_record": inserted
                        })),
                    )),
                    None => Ok(success_text(
                        &message,
                        Some(&json!({
                            "table": args.table_name,
                            "inserted_data": args.data,
                            "note": "Insert completed successfully. Record data not returned by database."
                        })),
                    )),
                }
            }
            Err(e) => {
                error!("Database error in insert_record: {}", e);
                let details = e.to_string();
                let lower = details.to_lowercase();

                if lower.contains("duplicate") || lower.contains("unique") {
                    Ok(error_text(
                        "Record insertion failed due to duplicate key",
                        Some(&json!({
                            "error": details,
                            "suggestion": "Check for unique constraints and existing records with the same key values"
                        })),
                    ))
                } else if lower.contains("foreign key") {
                    Ok(error_text(
                        "Record insertion failed due to foreign key constraint",
                        Some(&json!({
                            "error": details,
                            "suggestion": "Ensure referenced records exist in related tables"
                        })),
                    ))
                } else if lower.contains("not null") {
                    Ok(error_text(
                        "Record insertion failed due to missing required fields",
                        Some(&json!({
                            "error": details,
                            "suggestion": "Check for required (NOT NULL) columns and provide values"
                        })),
                    ))
                } else {
                    Ok(error_text(
                        "Database insertion failed",
                        Some(&json!({ "error": details, "table": args.table_name })),
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordArgs {
    pub table_name: String,
    pub filters: Record,
    pub updates: Record,
}

/// Updates records matching filter conditions.
pub struct UpdateRecordTool {
    backend: Arc<dyn TableBackend>,
}

impl UpdateRecordTool {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ToolHandler for UpdateRecordTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "update_record".into(),
            description: Some(
                "Update records in a table. Filters identify the records to change; \
                 updates give the new values. Both are required."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to update"
                    },
                    "filters": {
                        "type": "object",
                        "description": "Conditions to identify records (e.g., {\"id\": 123})"
                    },
                    "updates": {
                        "type": "object",
                        "description": "New values to set (e.g., {\"status\": \"inactive\"})"
                    }
                },
                "required": ["table_name", "filters", "updates"]
            }),
        }
    }

    #[instrument(skip(self, arguments), fields(tool = "update_record"))]
    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: UpdateRecordArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => {
                return Ok(error_text(
                    "Input validation failed",
                    Some(&json!({ "validation_errors": [e.to_string()] })),
                ));
            }
        };

        info!("Executing update_record tool for table: {}", args.table_name);

        if let Err(e) = validate_table_name(&args.table_name) {
            return Ok(error_text(
                "Invalid table name",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        if args.filters.is_empty() {
            return Ok(error_text(
                "No filter conditions provided",
                Some(&json!({
                    "error": "Filters are required to prevent accidental mass updates",
                    "example_filters": {"id": 123, "status": "active"}
                })),
            ));
        }

        if args.updates.is_empty() {
            return Ok(error_text(
                "No update values provided",
                Some(&json!({
                    "error": "Updates are required to specify what to change",
                    "example_updates": {"name": "New Name", "status": "inactive"}
                })),
            ));
        }

        if let Err(e) = validate_columns(&args.filters) {
            return Ok(error_text(
                "Invalid filter conditions",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        if let Err(e) = validate_columns(&args.updates) {
            return Ok(error_text(
                "Invalid update values",
                Some(&json!({ "error": e.to_string() })),
            ));
        }

        if let Some((column, actual)) = oversized_value(&args.updates) {
            return Ok(error_text(
                &format!("Update value too large for column '{column}'"),
                Some(&json!({ "max_length": MAX_VALUE_LEN, "actual_length": actual })),
            ));
        }

        for column in PROTECTED_COLUMNS {
            if args.updates.contains_key(*column) {
                warn!("Attempt to update protected column: {}", column);
                return Ok(error_text(
                    &format!("Cannot update protected column '{column}'"),
                    Some(&json!({
                        "protected_columns": PROTECTED_COLUMNS,
                        "suggestion": "Use different column names or exclude protected columns"
                    })),
                ));
            }
        }

        match self
            .backend
            .update(&args.table_name, &args.filters, &args.updates)
            .await
        {
            Ok(rows) if rows.is_empty() => Ok(success_text(
                &format!("Update operation completed for table '{}'", args.table_name),
                Some(&json!({
                    "table": args.table_name,
                    "updated_count": 0,
                    "filters_applied": args.filters,
                    "updates_applied": args.updates,
                    "message": "No records matched the filter criteria"
                })),
            )),
            Ok(rows) => Ok(success_text(
                &format!(
                    "Successfully updated {} record(s) in table '{}'",
                    rows.len(),
                    args.table_name
                ),
                Some(&json!({
                    "table": args.table_name,
                    "updated_count": rows.len(),
                    "filters_applied": args.filters,
                    "updates_applied": args.updates,
                    "updated_records": rows
                })),
            )),
            Err(e) => {
                error!("Database error in update_record: {}", e);
                let details = e.to_string();
                let lower = details.to_lowercase();

                if lower.contains("foreign key") {
                    Ok(error_text(
                        "Update failed due to foreign key constraint",
                        Some(&json!({
                            "error": details,
                            "suggestion": "Ensure updated values reference existing records in related tables"
                        })),
                    ))
                } else if lower.contains("unique") || lower.contains("duplicate") {
                    Ok(error_text(
                        "Update failed due to unique constraint violation",
                        Some(&json!({
                            "error": details,
                            "suggestion": "Check for unique constraints and ensure updated values don't create duplicates"
                        })),
                    ))
                } else if lower.contains("check constraint") {
                    Ok(error_text(
                        "Update failed due to check constraint violation",
                        Some(&json!({
                            "error": details,
                            "suggestion": "Ensure updated values meet the table's validation rules"
                        })),
                    ))
                } else {
                    Ok(error_text(
                        "Database update failed",
                        Some(&json!({ "error": details, "table": args.table_name })),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StaticBackend;

    #[tokio::test]
    async fn test_insert_record_success() {
        let backend = Arc::new(StaticBackend::default());
        let tool = InsertRecordTool::new(Arc::clone(&backend) as Arc<dyn TableBackend>);
        let result = tool
            .execute(json!({
                "table_name": "users",
                "data": {"name": "John", "email": "john@example.com"}
            }))
            .await
            .unwrap();

        assert!(result.contains("Record inserted successfully into table 'users'"));
        assert_eq!(backend.inserted.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_record_empty_data() {
        let tool = InsertRecordTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({"table_name": "users", "data": {}}))
            .await
            .unwrap();
        assert!(result.contains("No data provided for insertion"));
    }

    #[tokio::test]
    async fn test_insert_record_oversized_value() {
        let tool = InsertRecordTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({
                "table_name": "users",
                "data": {"bio": "x".repeat(10_001)}
            }))
            .await
            .unwrap();
        assert!(result.contains("Data value too large for column 'bio'"));
    }

    #[tokio::test]
    async fn test_insert_record_duplicate_key_narrative() {
        let tool = InsertRecordTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({"table_name": "locked", "data": {"name": "x"}}))
            .await
            .unwrap();
        assert!(result.contains("duplicate key"));
        assert!(result.contains("unique constraints"));
    }

    #[tokio::test]
    async fn test_update_record_success() {
        let backend = Arc::new(StaticBackend::default());
        let tool = UpdateRecordTool::new(Arc::clone(&backend) as Arc<dyn TableBackend>);
        let result = tool
            .execute(json!({
                "table_name": "users",
                "filters": {"status": "active"},
                "updates": {"status": "inactive"}
            }))
            .await
            .unwrap();

        assert!(result.contains("Successfully updated 1 record(s) in table 'users'"));
        assert_eq!(backend.updated.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_update_record_requires_filters() {
        let tool = UpdateRecordTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({
                "table_name": "users",
                "filters": {},
                "updates": {"status": "inactive"}
            }))
            .await
            .unwrap();
        assert!(result.contains("No filter conditions provided"));
    }

    #[tokio::test]
    async fn test_update_record_requires_updates() {
        let tool = UpdateRecordTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({
                "table_name": "users",
                "filters": {"id": 1},
                "updates": {}
            }))
            .await
            .unwrap();
        assert!(result.contains("No update values provided"));
    }

    #[tokio::test]
    async fn test_update_record_protects_columns() {
        let tool = UpdateRecordTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({
                "table_name": "users",
                "filters": {"email": "a@b.c"},
                "updates": {"id": 99}
            }))
            .await
            .unwrap();
        assert!(result.contains("Cannot update protected column 'id'"));
    }

    #[tokio::test]
    async fn test_update_record_no_matches() {
        let tool = UpdateRecordTool::new(Arc::new(StaticBackend::default()));
        let result = tool
            .execute(json!({
                "table_name": "empty",
                "filters": {"id": 1},
                "updates": {"status": "x"}
            }))
            .await
            .unwrap();
        assert!(result.contains("\"updated_count\": 0"));
        assert!(result.contains("No records matched the filter criteria"));
    }
}

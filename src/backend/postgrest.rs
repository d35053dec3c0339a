//! PostgREST data API backend.
//!
//! Thin client over the REST surface of a PostgREST-style data API:
//! `{base}/rest/v1/{table}` for row operations with `eq.` filter encoding,
//! and the `execute_sql` RPC for schema introspection. When the RPC is not
//! exposed, `describe_table` falls back to sampling one row and inferring
//! column types from it.

use crate::backend::{
    ColumnInfo, ConstraintInfo, ForeignRef, Record, TableBackend, TableDescription, TableInfo,
};
use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

const LIST_TABLES_SQL: &str = "SELECT table_name, table_type, table_schema \
     FROM information_schema.tables \
     WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
     ORDER BY table_name";

const COLUMNS_SQL: &str = "SELECT column_name, data_type, is_nullable, column_default, \
     character_maximum_length, numeric_precision, numeric_scale, ordinal_position \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

const CONSTRAINTS_SQL: &str = "SELECT tc.constraint_type, tc.constraint_name, kcu.column_name, \
     ccu.table_name AS foreign_table_name, ccu.column_name AS foreign_column_name \
     FROM information_schema.table_constraints tc \
     LEFT JOIN information_schema.key_column_usage kcu \
     ON tc.constraint_name = kcu.constraint_name \
     LEFT JOIN information_schema.constraint_column_usage ccu \
     ON tc.constraint_name = ccu.constraint_name \
     WHERE tc.table_schema = $1 AND tc.table_name = $2";

/// Backend implementation over a PostgREST-compatible HTTP data API.
pub struct PostgrestBackend {
    base_url: String,
    api_key: String,
    schema: String,
    client: reqwest::Client,
}

impl PostgrestBackend {
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            schema: config.schema.clone(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Run a read-only SQL statement through the `execute_sql` RPC.
    async fn execute_sql(&self, query: &str, params: Vec<Value>) -> BackendResult<Vec<Value>> {
        let body = if params.is_empty() {
            json!({ "query": query })
        } else {
            json!({ "query": query, "params": params })
        };

        let response = self
            .request(Method::POST, self.rpc_url("execute_sql"))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(BackendError::Rpc(truncate(&payload, 500)));
        }

        rows_from_payload(&payload)
    }

    async fn row_request(&self, request: RequestBuilder, table: &str) -> BackendResult<Vec<Value>> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::TableNotFound(table.to_string()));
        }
        if !status.is_success() {
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: truncate(&payload, 500),
            });
        }

        rows_from_payload(&payload)
    }

    /// Infer a table description from one sampled row. Used when the schema
    /// RPC is unavailable.
    async fn describe_from_sample(&self, table: &str) -> BackendResult<TableDescription> {
        let rows = self.select(table, &Record::new(), 1).await?;

        let Some(Value::Object(sample)) = rows.into_iter().next() else {
            return Err(BackendError::TableNotFound(table.to_string()));
        };

        let columns = infer_columns(&sample);
        Ok(TableDescription {
            table_name: table.to_string(),
            column_count: columns.len(),
            columns,
            constraints: vec![],
            note: Some(
                "Schema information inferred from sample data. Full schema details \
                 may not be available due to permissions."
                    .into(),
            ),
        })
    }
}

#[async_trait]
impl TableBackend for PostgrestBackend {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    async fn probe(&self) -> BackendResult<()> {
        let response = self
            .request(Method::GET, format!("{}/rest/v1/", self.base_url))
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: "data API reported a server error".into(),
            });
        }
        debug!("Data API probe succeeded with status {}", status);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_tables(&self) -> BackendResult<Vec<TableInfo>> {
        let rows = self
            .execute_sql(LIST_TABLES_SQL, vec![Value::from(self.schema.as_str())])
            .await?;
        Ok(rows.iter().map(table_info_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn describe_table(&self, table: &str) -> BackendResult<TableDescription> {
        let params = vec![Value::from(self.schema.as_str()), Value::from(table)];

        let columns = match self.execute_sql(COLUMNS_SQL, params.clone()).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Schema RPC failed, sampling table instead: {}", e);
                return self.describe_from_sample(table).await;
            }
        };

        if columns.is_empty() {
            return Err(BackendError::TableNotFound(table.to_string()));
        }

        let constraints = match self.execute_sql(CONSTRAINTS_SQL, params).await {
            Ok(rows) => rows.iter().filter_map(constraint_from_row).collect(),
            Err(e) => {
                warn!("Constraint lookup failed: {}", e);
                vec![]
            }
        };

        let mut columns: Vec<ColumnInfo> = columns.iter().map(column_from_row).collect();
        columns.sort_by_key(|c| c.position);

        Ok(TableDescription {
            table_name: table.to_string(),
            column_count: columns.len(),
            columns,
            constraints,
            note: None,
        })
    }

    #[instrument(skip(self, filters))]
    async fn select(&self, table: &str, filters: &Record, limit: u32) -> BackendResult<Vec<Value>> {
        let mut query: Vec<(String, String)> = vec![("select".into(), "*".into())];
        query.extend(filters.iter().map(|(k, v)| filter_pair(k, v)));
        query.push(("limit".into(), limit.to_string()));

        let request = self
            .request(Method::GET, self.table_url(table))
            .query(&query);
        self.row_request(request, table).await
    }

    #[instrument(skip(self, record))]
    async fn insert(&self, table: &str, record: &Record) -> BackendResult<Vec<Value>> {
        let request = self
            .request(Method::POST, self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&Value::Object(record.clone()));
        self.row_request(request, table).await
    }

    #[instrument(skip(self, filters, changes))]
    async fn update(
        &self,
        table: &str,
        filters: &Record,
        changes: &Record,
    ) -> BackendResult<Vec<Value>> {
        let query: Vec<(String, String)> =
            filters.iter().map(|(k, v)| filter_pair(k, v)).collect();

        let request = self
            .request(Method::PATCH, self.table_url(table))
            .query(&query)
            .header("Prefer", "return=representation")
            .json(&Value::Object(changes.clone()));
        self.row_request(request, table).await
    }

    #[instrument(skip(self, filters))]
    async fn delete(&self, table: &str, filters: &Record) -> BackendResult<Vec<Value>> {
        let query: Vec<(String, String)> =
            filters.iter().map(|(k, v)| filter_pair(k, v)).collect();

        let request = self
            .request(Method::DELETE, self.table_url(table))
            .query(&query)
            .header("Prefer", "return=representation");
        self.row_request(request, table).await
    }
}

/// Encode one equality filter as a PostgREST query pair.
fn filter_pair(column: &str, value: &Value) -> (String, String) {
    let operand = match value {
        Value::Null => "is.null".to_string(),
        Value::String(s) => format!("eq.{}", s),
        other => format!("eq.{}", other),
    };
    (column.to_string(), operand)
}

/// Parse a response body into a list of rows.
///
/// PostgREST answers with a JSON array, a single object, or an empty body
/// depending on the operation and Prefer header.
fn rows_from_payload(payload: &str) -> BackendResult<Vec<Value>> {
    if payload.trim().is_empty() {
        return Ok(vec![]);
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(Value::Null) => Ok(vec![]),
        Ok(single) => Ok(vec![single]),
        Err(e) => Err(BackendError::Decode(e.to_string())),
    }
}

fn table_info_from_row(row: &Value) -> TableInfo {
    TableInfo {
        name: str_field(row, "table_name").unwrap_or_default(),
        table_type: str_field(row, "table_type").unwrap_or_else(|| "TABLE".into()),
        schema: str_field(row, "table_schema").unwrap_or_else(|| "public".into()),
    }
}

fn column_from_row(row: &Value) -> ColumnInfo {
    ColumnInfo {
        name: str_field(row, "column_name").unwrap_or_default(),
        data_type: str_field(row, "data_type").unwrap_or_else(|| "unknown".into()),
        nullable: str_field(row, "is_nullable").as_deref() == Some("YES"),
        default: str_field(row, "column_default"),
        position: int_field(row, "ordinal_position").unwrap_or(0),
        max_length: int_field(row, "character_maximum_length"),
        precision: int_field(row, "numeric_precision"),
        scale: int_field(row, "numeric_scale"),
    }
}

fn constraint_from_row(row: &Value) -> Option<ConstraintInfo> {
    let constraint_type = str_field(row, "constraint_type")?;
    let references = match (
        str_field(row, "foreign_table_name"),
        str_field(row, "foreign_column_name"),
    ) {
        (Some(table), Some(column)) => Some(ForeignRef { table, column }),
        _ => None,
    };

    Some(ConstraintInfo {
        constraint_type,
        name: str_field(row, "constraint_name").unwrap_or_default(),
        column: str_field(row, "column_name"),
        references,
    })
}

/// Build column info from a sampled row, typing each column by its value.
fn infer_columns(sample: &Record) -> Vec<ColumnInfo> {
    sample
        .iter()
        .enumerate()
        .map(|(idx, (name, value))| ColumnInfo {
            name: name.clone(),
            data_type: match value {
                Value::Null => "unknown".into(),
                Value::Bool(_) => "boolean".into(),
                Value::Number(n) if n.is_i64() || n.is_u64() => "integer".into(),
                Value::Number(_) => "numeric".into(),
                Value::String(_) => "text".into(),
                Value::Array(_) => "array".into(),
                Value::Object(_) => "json".into(),
            },
            nullable: value.is_null(),
            default: None,
            position: idx as i64 + 1,
            max_length: None,
            precision: None,
            scale: None,
        })
        .collect()
}

fn str_field(row: &Value, field: &str) -> Option<String> {
    row.get(field).and_then(Value::as_str).map(str::to_string)
}

fn int_field(row: &Value, field: &str) -> Option<i64> {
    row.get(field).and_then(Value::as_i64)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

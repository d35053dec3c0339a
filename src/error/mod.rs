//! Error types for the MCP server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the table gateway MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

/// JSON-RPC 2.0 protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),

    #[error("Transport error: {0}")]
    Transport(Cow<'static, str>),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) => -32603,
            Self::Transport(_) => -32000,
        }
    }
}

/// Errors from the table data backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Data API unreachable: {0}")]
    Unreachable(String),

    #[error("Data API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Schema RPC failed: {0}")]
    Rpc(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Failed to decode data API response: {0}")]
    Decode(String),
}

/// Input validation errors raised before a request reaches the data API.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Table name cannot be empty")]
    EmptyTableName,

    #[error(
        "Invalid table name format - only alphanumeric characters and underscores allowed: {0}"
    )]
    InvalidTableName(String),

    #[error("Access to system tables/schemas not allowed: {0}")]
    SystemTable(String),

    #[error("Invalid column name format: {0}")]
    InvalidColumnName(String),

    #[error("Potentially dangerous pattern detected in filter: {0}")]
    SuspiciousValue(String),

    #[error("Value too long for column '{column}': {actual} exceeds maximum of {max}")]
    ValueTooLong {
        column: String,
        max: usize,
        actual: usize,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Missing required environment variables: {0}")]
    EnvNotFound(String),

    #[error("Invalid data API URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for BackendError.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for ValidationError.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

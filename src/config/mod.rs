//! Configuration types and builders.

use crate::error::{ConfigError, McpError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::time::Duration;

/// Transport selection for the server binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

impl TransportKind {
    /// Parse a transport kind from a string.
    ///
    /// Accepts common aliases for each transport.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stdio" | "std" => Some(Self::Stdio),
            "http" | "streamable-http" | "streamable_http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl TryFrom<&str> for TransportKind {
    type Error = ConfigError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "transport".into(),
            message: format!("Unknown transport: '{}'. Valid transports: stdio, http", s).into(),
        })
    }
}

/// Data API backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub schema: String,
    pub max_query_limit: u32,
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            schema: "public".into(),
            max_query_limit: 1000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Builder for BackendConfig with fluent API.
#[derive(Default)]
pub struct BackendConfigBuilder {
    config: BackendConfig,
}

impl BackendConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = schema.into();
        self
    }

    pub fn max_query_limit(mut self, limit: u32) -> Self {
        self.config.max_query_limit = limit;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build from environment variables.
    ///
    /// `DATA_API_URL` and `DATA_API_KEY` are required; the rest are optional.
    pub fn from_env(mut self) -> Result<Self> {
        let mut missing = Vec::new();

        match env::var("DATA_API_URL") {
            Ok(url) if !url.trim().is_empty() => self.config.base_url = url.trim().to_string(),
            _ => missing.push("DATA_API_URL"),
        }

        match env::var("DATA_API_KEY") {
            Ok(key) if !key.trim().is_empty() => self.config.api_key = key.trim().to_string(),
            _ => missing.push("DATA_API_KEY"),
        }

        if !missing.is_empty() {
            return Err(McpError::Config(ConfigError::EnvNotFound(
                missing.join(", "),
            )));
        }

        if let Ok(schema) = env::var("DATA_API_SCHEMA") {
            self.config.schema = schema;
        }

        if let Ok(limit) = env::var("MCP_MAX_QUERY_LIMIT") {
            self.config.max_query_limit = limit.parse().map_err(|_| {
                McpError::Config(ConfigError::InvalidValue {
                    field: "MCP_MAX_QUERY_LIMIT".into(),
                    message: "Invalid query limit".into(),
                })
            })?;
        }

        Ok(self)
    }

    pub fn build(self) -> Result<BackendConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.base_url.is_empty() {
            return Err(ConfigError::MissingField("base_url".into()).into());
        }
        if !self.config.base_url.starts_with("https://")
            && !self.config.base_url.starts_with("http://")
        {
            return Err(ConfigError::InvalidUrl(
                "base_url must be an HTTP(S) URL".into(),
            )
            .into());
        }
        if self.config.api_key.is_empty() {
            return Err(ConfigError::MissingField("api_key".into()).into());
        }
        if self.config.max_query_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_query_limit".into(),
                message: "Query limit must be greater than 0".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub session_idle_timeout: Duration,
    pub session_sweep_interval: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            allowed_origins: vec!["http://localhost:3000".into()],
            session_idle_timeout: Duration::from_secs(3600),
            session_sweep_interval: Duration::from_secs(300),
        }
    }
}

impl HttpConfig {
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = env::var("HTTP_HOST") {
            self.host = host;
        }

        if let Ok(port) = env::var("HTTP_PORT") {
            self.port = port.parse().map_err(|_| {
                McpError::Config(ConfigError::InvalidValue {
                    field: "HTTP_PORT".into(),
                    message: "Invalid port number".into(),
                })
            })?;
        }

        if let Ok(origins) = env::var("MCP_CORS_ORIGINS") {
            let origins: Vec<String> = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            if !origins.is_empty() {
                self.allowed_origins = origins;
            }
        }

        Ok(())
    }
}

/// Streaming decision configuration.
///
/// A response is streamed over SSE when the result exceeds `threshold_bytes`
/// or the method is listed in `methods`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    pub threshold_bytes: usize,
    pub methods: Vec<String>,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: 5000,
            methods: vec![
                "query_table".into(),
                "list_tables".into(),
                "describe_table".into(),
            ],
        }
    }
}

impl StreamingConfig {
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(threshold) = env::var("MCP_STREAM_THRESHOLD") {
            self.threshold_bytes = threshold.parse().map_err(|_| {
                McpError::Config(ConfigError::InvalidValue {
                    field: "MCP_STREAM_THRESHOLD".into(),
                    message: "Invalid byte threshold".into(),
                })
            })?;
        }

        if let Ok(methods) = env::var("MCP_STREAM_METHODS") {
            self.methods = methods
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
        }

        Ok(())
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub transport: TransportKind,
    pub backend: BackendConfig,
    pub http: HttpConfig,
    pub streaming: StreamingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "tablegate-mcp".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            transport: TransportKind::default(),
            backend: BackendConfig::default(),
            http: HttpConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load the full configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            backend: BackendConfigBuilder::new().from_env()?.build()?,
            ..Self::default()
        };

        if let Ok(name) = env::var("MCP_SERVER_NAME") {
            config.name = name.into();
        }

        if let Ok(transport) = env::var("MCP_TRANSPORT") {
            config.transport = TransportKind::try_from(transport.as_str())?;
        }

        config.http.apply_env()?;
        config.streaming.apply_env()?;

        Ok(config)
    }
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.config.transport = transport;
        self
    }

    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn http(mut self, http: HttpConfig) -> Self {
        self.config.http = http;
        self
    }

    pub fn streaming(mut self, streaming: StreamingConfig) -> Self {
        self.config.streaming = streaming;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!(TransportKind::parse("stdio"), Some(TransportKind::Stdio));
        assert_eq!(TransportKind::parse("http"), Some(TransportKind::Http));
        assert_eq!(
            TransportKind::parse("streamable-http"),
            Some(TransportKind::Http)
        );
        assert_eq!(TransportKind::parse("unknown"), None);
    }

    #[test]
    fn test_backend_config_builder() {
        let config = BackendConfigBuilder::new()
            .base_url("https://example.data.host")
            .api_key("secret")
            .max_query_limit(500)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://example.data.host");
        assert_eq!(config.max_query_limit, 500);
        assert_eq!(config.schema, "public");
    }

    #[test]
    fn test_backend_config_requires_url() {
        let result = BackendConfigBuilder::new().api_key("secret").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_config_rejects_bad_url() {
        let result = BackendConfigBuilder::new()
            .base_url("ftp://example.data.host")
            .api_key("secret")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_streaming_defaults() {
        let config = StreamingConfig::default();
        assert_eq!(config.threshold_bytes, 5000);
        assert!(config.methods.contains(&"query_table".to_string()));
    }

    #[test]
    fn test_http_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.session_sweep_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::builder()
            .name("test-server")
            .transport(TransportKind::Http)
            .build();
        assert_eq!(config.name, "test-server");
        assert_eq!(config.transport, TransportKind::Http);
    }
}

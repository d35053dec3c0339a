//! MCP server exposing relational table tools over JSON-RPC 2.0.
//!
//! Supports two transports: line-oriented stdio and streamable HTTP with
//! optional SSE delivery and session tracking. Tools cover table listing,
//! querying, schema description, and record insertion/update against a
//! PostgREST-style data API.
//!
//! # Example
//!
//! ```no_run
//! use tablegate_mcp::{
//!     backend::PostgrestBackend,
//!     config::ServerConfig,
//!     protocol::McpServerBuilder,
//!     server::ServerStateBuilder,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
//!     let backend = Arc::new(PostgrestBackend::new(&config.backend)?);
//!
//!     let state = Arc::new(
//!         ServerStateBuilder::new()
//!             .config(config)
//!             .backend(backend)
//!             .build()
//!             .map_err(|e| anyhow::anyhow!(e))?,
//!     );
//!
//!     let server = McpServerBuilder::new().state(state).build()?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use backend::{PostgrestBackend, TableBackend};
pub use config::{BackendConfig, BackendConfigBuilder, ServerConfig, TransportKind};
pub use error::{McpError, Result};
pub use http::{build_router, StreamingPolicy};
pub use protocol::{Dispatcher, McpServer, McpServerBuilder};
pub use server::{ServerState, ServerStateBuilder};
pub use session::SessionManager;
pub use tools::{ToolHandler, ToolRegistry};

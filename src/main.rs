//! MCP server binary entry point.

use anyhow::Result;
use std::sync::Arc;
use tablegate_mcp::{
    backend::PostgrestBackend,
    config::{ServerConfig, TransportKind},
    http,
    protocol::McpServerBuilder,
    server::ServerStateBuilder,
    TableBackend,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = ServerConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let transport = config.transport;

    let backend = Arc::new(PostgrestBackend::new(&config.backend)?);
    match backend.probe().await {
        Ok(()) => info!("Data API connection is healthy"),
        Err(e) => warn!("Data API probe failed, continuing anyway: {}", e),
    }

    let state = Arc::new(
        ServerStateBuilder::new()
            .config(config)
            .backend(backend)
            .build()
            .map_err(|e| anyhow::anyhow!(e))?,
    );

    info!("Server state initialized with {} tools", state.tools.len());

    match transport {
        TransportKind::Stdio => {
            let server = McpServerBuilder::new().state(state).build()?;
            info!("MCP server ready on stdio, waiting for requests...");
            server.run().await?;
        }
        TransportKind::Http => {
            http::serve(state).await?;
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Diagnostics go to stderr only; stdout is reserved for protocol framing.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

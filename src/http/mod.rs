//! Streamable HTTP transport.

pub mod handlers;
pub mod streaming;

pub use streaming::StreamingPolicy;

use crate::error::{McpError, Result};
use crate::server::ServerState;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Assemble the HTTP router for a server state.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/mcp", post(handlers::mcp_post).get(handlers::mcp_info))
        .route("/health", get(handlers::health))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            validate_origin,
        ))
        .with_state(state)
}

/// Run the HTTP transport until a shutdown signal arrives.
///
/// Shutdown sequence: stop accepting requests, cancel the sweep task, let
/// axum drain in-flight handlers, then clear the session table.
pub async fn serve(state: Arc<ServerState>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.http.host, state.config.http.port)
        .parse()
        .map_err(|_| McpError::Internal {
            message: "invalid HTTP bind address".into(),
        })?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = build_router(Arc::clone(&state));

    let sweeper = spawn_session_sweeper(Arc::clone(&state));

    info!("HTTP transport listening on {}", addr);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    state.sessions.clear();
    info!("HTTP transport stopped");
    Ok(())
}

/// Periodic session sweep, independent of request traffic.
fn spawn_session_sweeper(state: Arc<ServerState>) -> tokio::task::JoinHandle<()> {
    let interval = state.config.http.session_sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = state.sessions.sweep();
            debug!(
                "Session sweep removed {} session(s), {} live",
                removed,
                state.sessions.len()
            );
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

/// Validate the Origin header on tool invocations.
///
/// Absent Origin and loopback origins always pass; anything else must be
/// on the configured allow-list. Rejection happens before the body is read.
async fn validate_origin(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::POST {
        let origin = request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok());

        if let Some(origin) = origin {
            if !origin_allowed(origin, &state.config.http.allowed_origins) {
                warn!("Invalid origin rejected: {}", origin);
                return (StatusCode::FORBIDDEN, "Invalid origin").into_response();
            }
        }
    }

    next.run(request).await
}

fn origin_allowed(origin: &str, allowed: &[String]) -> bool {
    if let Some(host) = origin_host(origin) {
        if matches!(host, "localhost" | "127.0.0.1" | "[::1]") {
            return true;
        }
    }
    allowed.iter().any(|o| o == origin)
}

/// Extract the host portion of an Origin value like `http://host:port`.
fn origin_host(origin: &str) -> Option<&str> {
    let rest = origin.split_once("://").map(|(_, rest)| rest)?;
    if rest.starts_with('[') {
        let end = rest.find(']')?;
        return Some(&rest[..=end]);
    }
    let host = rest.split(['/', ':']).next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

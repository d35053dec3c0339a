//! Axum handlers for the streamable HTTP transport.
//!
//! `POST /mcp` carries JSON-RPC tool invocations; `GET /mcp` serves
//! transport metadata; `GET /health` is the liveness endpoint.

use crate::http::streaming;
use crate::protocol::codec;
use crate::protocol::{Dispatcher, JsonRpcError, JsonRpcResponse, PROTOCOL_VERSION};
use crate::server::ServerState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Session id request/response header (lowercase wire form).
pub const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub transport: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub server: String,
    pub version: String,
    pub transport: &'static str,
    pub protocol: &'static str,
    pub tools: Vec<String>,
    pub endpoints: EndpointInfo,
}

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub mcp: &'static str,
    pub health: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        transport: "http",
    })
}

pub async fn mcp_info(State(state): State<Arc<ServerState>>) -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        server: state.config.name.to_string(),
        version: state.config.version.to_string(),
        transport: "streamable-http",
        protocol: PROTOCOL_VERSION,
        tools: state.tools.list_names(),
        endpoints: EndpointInfo {
            mcp: "/mcp (POST for JSON-RPC, GET for info)",
            health: "/health",
        },
    })
}

pub async fn mcp_post(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match codec::decode_request(&body) {
        Ok(request) => request,
        Err(e) => {
            let response =
                JsonRpcResponse::error(None, JsonRpcError::new(e.code(), e.to_string()));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    debug!("MCP request: {}", request.method);

    let supplied = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let session_id = state.sessions.touch(supplied);
    state.record_request();

    let method = request.method.clone();
    let dispatcher = Dispatcher::new(Arc::clone(&state.tools));
    let response = dispatcher.dispatch(request).await;

    if let Some(error) = &response.error {
        let status = match error.code {
            -32601 => StatusCode::NOT_FOUND,
            -32603 => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        return (status, session_header(&session_id), Json(response)).into_response();
    }

    let result_text = response
        .result
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default();

    if state.streaming.should_stream(&method, result_text) {
        return streaming::sse_response(&response, &session_id);
    }

    (StatusCode::OK, session_header(&session_id), Json(response)).into_response()
}

fn session_header(session_id: &str) -> [(HeaderName, String); 1] {
    [(
        HeaderName::from_static(SESSION_HEADER),
        session_id.to_string(),
    )]
}

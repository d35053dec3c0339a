//! Streaming decision and SSE response formatting.
//!
//! SSE framing here is for transport compatibility, not partial delivery:
//! a streamed response carries the full JSON-RPC envelope in a single
//! `data:` event.

use crate::config::StreamingConfig;
use crate::http::handlers::SESSION_HEADER;
use crate::protocol::{JsonRpcError, JsonRpcResponse};
use axum::body::Body;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashSet;
use tracing::{debug, error};

/// Decides, per request, between a plain JSON body and an SSE stream.
pub struct StreamingPolicy {
    threshold_bytes: usize,
    methods: HashSet<String>,
}

impl StreamingPolicy {
    pub fn new(config: &StreamingConfig) -> Self {
        Self {
            threshold_bytes: config.threshold_bytes,
            methods: config.methods.iter().cloned().collect(),
        }
    }

    /// True when the result is large or the method is on the allow-list of
    /// potentially large operations.
    pub fn should_stream(&self, method: &str, result: &str) -> bool {
        result.len() > self.threshold_bytes || self.methods.contains(method)
    }
}

/// Format a JSON-RPC response as a single SSE event.
///
/// If the success envelope cannot be serialized, an error envelope is
/// emitted as the event payload instead.
pub fn sse_event(response: &JsonRpcResponse) -> String {
    match serde_json::to_string(response) {
        Ok(payload) => {
            debug!("SSE response prepared for request id: {:?}", response.id);
            format!("data: {payload}\n\n")
        }
        Err(e) => {
            error!("SSE streaming error: {}", e);
            let fallback = JsonRpcResponse::error(
                response.id.clone(),
                JsonRpcError::internal_error(format!("Streaming error: {e}")),
            );
            serde_json::to_string(&fallback)
                .map(|payload| format!("data: {payload}\n\n"))
                .unwrap_or_else(|_| {
                    "data: {\"jsonrpc\":\"2.0\",\"id\":null,\"error\":\
                     {\"code\":-32603,\"message\":\"Streaming error\"}}\n\n"
                        .to_string()
                })
        }
    }
}

/// Build the SSE HTTP response carrying one event.
pub fn sse_response(response: &JsonRpcResponse, session_id: &str) -> Response {
    let body = sse_event(response);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static(SESSION_HEADER), session_id),
        ],
        Body::from(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> StreamingPolicy {
        StreamingPolicy::new(&StreamingConfig::default())
    }

    #[test]
    fn test_allow_listed_method_streams_small_results() {
        assert!(policy().should_stream("list_tables", "short"));
        assert!(policy().should_stream("query_table", ""));
        assert!(policy().should_stream("describe_table", "x"));
    }

    #[test]
    fn test_large_result_streams_any_method() {
        let large = "x".repeat(6000);
        assert!(policy().should_stream("insert_record", &large));
    }

    #[test]
    fn test_small_result_off_list_does_not_stream() {
        assert!(!policy().should_stream("insert_record", "short"));
        assert!(!policy().should_stream("update_record", "short"));
    }

    #[test]
    fn test_threshold_boundary() {
        let policy = StreamingPolicy::new(&StreamingConfig {
            threshold_bytes: 10,
            methods: vec![],
        });
        assert!(!policy.should_stream("insert_record", &"x".repeat(10)));
        assert!(policy.should_stream("insert_record", &"x".repeat(11)));
    }

    #[test]
    fn test_custom_allow_list() {
        let policy = StreamingPolicy::new(&StreamingConfig {
            threshold_bytes: 5000,
            methods: vec!["insert_record".into()],
        });
        assert!(policy.should_stream("insert_record", "short"));
        assert!(!policy.should_stream("list_tables", "short"));
    }

    #[test]
    fn test_sse_event_wraps_full_envelope() {
        let response = JsonRpcResponse::success(Some(1.into()), json!("payload"));
        let event = sse_event(&response);

        assert!(event.starts_with("data: "));
        assert!(event.ends_with("\n\n"));

        let inner: serde_json::Value =
            serde_json::from_str(event.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(inner["jsonrpc"], "2.0");
        assert_eq!(inner["result"], "payload");
    }

    #[test]
    fn test_sse_response_headers() {
        let response = JsonRpcResponse::success(Some(1.into()), json!("payload"));
        let http = sse_response(&response, "session-1");

        let headers = http.headers();
        assert_eq!(headers[header::CONTENT_TYPE.as_str()], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL.as_str()], "no-cache");
        assert_eq!(headers[header::CONNECTION.as_str()], "keep-alive");
        assert_eq!(headers[SESSION_HEADER], "session-1");
    }
}

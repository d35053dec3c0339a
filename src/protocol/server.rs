//! Stdio server loop.

use crate::error::{McpError, Result};
use crate::protocol::codec;
use crate::protocol::handler::Dispatcher;
use crate::protocol::transport::{StdioTransport, Transport};
use crate::protocol::types::{JsonRpcError, JsonRpcResponse};
use crate::server::ServerState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// MCP server over the stdio transport.
///
/// Decode failures are answered in-band (-32700/-32600) and never stop the
/// loop; EOF on stdin shuts the server down.
pub struct McpServer {
    state: Arc<ServerState>,
    running: AtomicBool,
}

impl McpServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            running: AtomicBool::new(false),
        }
    }

    /// Check if the server loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the server after the current request.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run the server with the stdio transport.
    #[instrument(skip(self), fields(server = %self.state.config.name))]
    pub async fn run(self) -> Result<()> {
        let transport = Arc::new(StdioTransport::new());
        self.run_with_transport(transport).await
    }

    /// Run the server with a custom transport.
    pub async fn run_with_transport<T: Transport + 'static>(self, transport: Arc<T>) -> Result<()> {
        info!(
            "Starting MCP server: {} v{}",
            self.state.config.name, self.state.config.version
        );
        self.running.store(true, Ordering::SeqCst);

        let dispatcher = Dispatcher::new(Arc::clone(&self.state.tools));

        loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("Server stopping...");
                break;
            }

            let line = match transport.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("EOF received, shutting down");
                    break;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    break;
                }
            };

            if line.is_empty() {
                continue;
            }

            let request = match codec::decode_request(line.as_bytes()) {
                Ok(request) => request,
                Err(e) => {
                    let response = JsonRpcResponse::error(
                        None,
                        JsonRpcError::new(e.code(), e.to_string()),
                    );
                    if let Err(write_err) = transport.write_response(&response).await {
                        error!("Failed to send error response: {}", write_err);
                    }
                    continue;
                }
            };

            self.state.record_request();
            let is_notification = request.is_notification();
            let response = dispatcher.dispatch(request).await;

            // Notifications never get a response line
            if !is_notification {
                if let Err(e) = transport.write_response(&response).await {
                    error!("Failed to send response: {}", e);
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Builder for the stdio MCP server.
pub struct McpServerBuilder {
    state: Option<Arc<ServerState>>,
}

impl McpServerBuilder {
    pub fn new() -> Self {
        Self { state: None }
    }

    pub fn state(mut self, state: Arc<ServerState>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Result<McpServer> {
        let state = self.state.ok_or_else(|| McpError::Internal {
            message: "Server state is required".into(),
        })?;
        Ok(McpServer::new(state))
    }
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StaticBackend;
    use crate::config::ServerConfig;
    use crate::server::ServerStateBuilder;
    use parking_lot::Mutex;

    /// Transport fed from a fixed script of input lines.
    struct ScriptedTransport {
        input: Mutex<Vec<String>>,
        output: Mutex<Vec<JsonRpcResponse>>,
    }

    impl ScriptedTransport {
        fn new(lines: &[&str]) -> Self {
            let mut input: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
            input.reverse();
            Self {
                input: Mutex::new(input),
                output: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn read_line(&self) -> Result<Option<String>> {
            Ok(self.input.lock().pop())
        }

        async fn write_response(&self, response: &JsonRpcResponse) -> Result<()> {
            self.output.lock().push(response.clone());
            Ok(())
        }
    }

    fn test_state() -> Arc<ServerState> {
        Arc::new(
            ServerStateBuilder::new()
                .config(ServerConfig::default())
                .backend(Arc::new(StaticBackend::default()))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_parse_error_answered_in_band() {
        let transport = Arc::new(ScriptedTransport::new(&["{broken"]));
        let server = McpServerBuilder::new().state(test_state()).build().unwrap();

        server.run_with_transport(Arc::clone(&transport)).await.unwrap();

        let output = transport.output.lock();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].error.as_ref().unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_invalid_shape_answered_in_band() {
        let transport = Arc::new(ScriptedTransport::new(&[
            r#"{"jsonrpc":"2.0","id":1,"method":7}"#,
        ]));
        let server = McpServerBuilder::new().state(test_state()).build().unwrap();

        server.run_with_transport(Arc::clone(&transport)).await.unwrap();

        let output = transport.output.lock();
        assert_eq!(output[0].error.as_ref().unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_bad_request_does_not_stop_the_loop() {
        let transport = Arc::new(ScriptedTransport::new(&[
            "{broken",
            r#"{"jsonrpc":"2.0","id":2,"method":"list_tables"}"#,
        ]));
        let server = McpServerBuilder::new().state(test_state()).build().unwrap();

        server.run_with_transport(Arc::clone(&transport)).await.unwrap();

        let output = transport.output.lock();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].error.as_ref().unwrap().code, -32700);
        assert!(output[1].error.is_none());
        assert_eq!(output[1].id, Some(2.into()));
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let transport = Arc::new(ScriptedTransport::new(&[
            r#"{"jsonrpc":"2.0","method":"list_tables"}"#,
        ]));
        let server = McpServerBuilder::new().state(test_state()).build().unwrap();

        server.run_with_transport(Arc::clone(&transport)).await.unwrap();

        assert!(transport.output.lock().is_empty());
    }

    #[test]
    fn test_builder_requires_state() {
        assert!(McpServerBuilder::new().build().is_err());
    }
}

//! Server state management.
//!
//! All shared state lives here and is passed to transports at construction
//! time; there is no ambient global state.

use crate::backend::TableBackend;
use crate::config::ServerConfig;
use crate::http::StreamingPolicy;
use crate::session::SessionManager;
use crate::tools::ToolRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct ServerState {
    pub config: ServerConfig,
    pub backend: Arc<dyn TableBackend>,
    pub tools: Arc<ToolRegistry>,
    pub sessions: SessionManager,
    pub streaming: StreamingPolicy,
    request_count: AtomicU64,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        backend: Arc<dyn TableBackend>,
        tools: Arc<ToolRegistry>,
        sessions: SessionManager,
        streaming: StreamingPolicy,
    ) -> Self {
        Self {
            config,
            backend,
            tools,
            sessions,
            streaming,
            request_count: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    backend: Option<Arc<dyn TableBackend>>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            backend: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn TableBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<ServerState, &'static str> {
        let config = self.config.ok_or("Config is required")?;
        let backend = self.backend.ok_or("Backend is required")?;

        let tools = Arc::new(crate::tools::create_registry(
            Arc::clone(&backend),
            &config.backend,
        ));
        let sessions = SessionManager::new(config.http.session_idle_timeout);
        let streaming = StreamingPolicy::new(&config.streaming);

        Ok(ServerState::new(config, backend, tools, sessions, streaming))
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! JSON-RPC 2.0 protocol implementation.

pub mod codec;
pub mod handler;
pub mod server;
pub mod transport;
pub mod types;

pub use handler::Dispatcher;
pub use server::{McpServer, McpServerBuilder};
pub use transport::{StdioTransport, Transport};
pub use types::*;

//! Stdio transport for JSON-RPC messages.
//!
//! One request per line on stdin, one response per line on stdout. All
//! diagnostics go to stderr; writing anything else to stdout corrupts the
//! protocol framing.

use crate::error::{McpError, Result};
use crate::protocol::codec;
use crate::protocol::types::JsonRpcResponse;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

/// Transport trait for line-oriented JSON-RPC communication.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Read the next raw line. `None` signals end of input.
    async fn read_line(&self) -> Result<Option<String>>;

    /// Write a single response line.
    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()>;
}

/// Stdio-based transport.
pub struct StdioTransport {
    reader: Arc<Mutex<BufReader<Stdin>>>,
    writer: Arc<Mutex<Stdout>>,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            reader: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()))),
            writer: Arc::new(Mutex::new(tokio::io::stdout())),
        }
    }

    async fn write_line(&self, content: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(content).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn read_line(&self) -> Result<Option<String>> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();

        match reader.read_line(&mut line).await {
            Ok(0) => Ok(None), // EOF
            Ok(_) => {
                let line = line.trim().to_string();
                trace!("Received line: {}", line);
                Ok(Some(line))
            }
            Err(e) => {
                error!("Error reading from stdin: {}", e);
                Err(McpError::Io(e))
            }
        }
    }

    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()> {
        let bytes = codec::encode_response(response)?;
        debug!("Sending response: id={:?}", response.id);
        self.write_line(&bytes).await
    }
}

// Remote MCP backends. The wire client stays outside this crate; the
// registry consumes it through the connector/session traits and owns only
// the lifecycle: connect, tools snapshot, call, close.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{DiscoveryError, Result};
use crate::model::Tool;

/// Opens sessions to one MCP server.
#[async_trait]
pub trait McpConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn McpSession>>;
}

/// One live connection to an MCP server.
#[async_trait]
pub trait McpSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<Tool>>;
    async fn call_tool(&self, name: &str, args: &Map<String, Value>) -> Result<CallToolResult>;
    async fn close(&self) -> Result<()>;
}

/// Content block of an MCP tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
    Image { data: String, mime_type: String },
    Resource { uri: String },
}

/// Result of an MCP tool call, before mapping to a dispatch result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

/// Map a successful call result to the value returned to the caller:
/// structured content as-is, a lone text block as the string, otherwise the
/// raw content array.
pub fn tool_result_value(result: &CallToolResult) -> Value {
    if let Some(structured) = &result.structured_content {
        return structured.clone();
    }
    if result.content.len() == 1 {
        if let ToolContent::Text { text } = &result.content[0] {
            return Value::String(text.clone());
        }
    }
    serde_json::to_value(&result.content).unwrap_or(Value::Null)
}

/// Error text for a result flagged as error: the first non-empty text block,
/// then structured content, then a fixed message.
pub fn tool_result_error(result: &CallToolResult) -> String {
    for content in &result.content {
        if let ToolContent::Text { text } = content {
            if !text.is_empty() {
                return text.clone();
            }
        }
    }
    if let Some(structured) = &result.structured_content {
        return structured.to_string();
    }
    "tool execution failed".to_string()
}

/// Registration config for a remote backend: its name plus the connector
/// that opens sessions to it.
#[derive(Clone)]
pub struct BackendConfig {
    pub name: String,
    pub connector: Arc<dyn McpConnector>,
}

struct BackendState {
    session: Option<Arc<dyn McpSession>>,
    tools: Vec<Tool>,
    connected: bool,
}

/// Lifecycle wrapper around one remote backend.
pub(crate) struct McpBackend {
    config: BackendConfig,
    state: RwLock<BackendState>,
}

impl McpBackend {
    pub(crate) fn new(config: BackendConfig) -> Self {
        McpBackend {
            config,
            state: RwLock::new(BackendState { session: None, tools: Vec::new(), connected: false }),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    /// Connect and snapshot the server's tools. A second connect while
    /// already connected is a no-op.
    pub(crate) async fn connect(&self) -> Result<()> {
        if self.state.read().connected {
            return Ok(());
        }

        let session = self.config.connector.connect().await?;
        let tools = match session.list_tools().await {
            Ok(tools) => tools,
            Err(err) => {
                let _ = session.close().await;
                return Err(err);
            }
        };

        info!(backend = %self.config.name, tools = tools.len(), "mcp backend connected");
        let mut state = self.state.write();
        state.session = Some(session);
        state.tools = tools;
        state.connected = true;
        Ok(())
    }

    pub(crate) async fn disconnect(&self) -> Result<()> {
        let session = {
            let mut state = self.state.write();
            if !state.connected {
                return Ok(());
            }
            state.connected = false;
            state.session.take()
        };

        if let Some(session) = session {
            session.close().await?;
        }
        info!(backend = %self.config.name, "mcp backend disconnected");
        Ok(())
    }

    /// Call a tool on the live session. The session handle is grabbed under
    /// the lock; the call itself runs outside it.
    pub(crate) async fn call_tool(
        &self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<Value> {
        let session = {
            let state = self.state.read();
            if !state.connected {
                return Err(DiscoveryError::BackendNotFound {
                    name: format!("{} (not connected)", self.config.name),
                });
            }
            state.session.clone()
        };
        let session = session.ok_or_else(|| DiscoveryError::BackendNotFound {
            name: format!("{} (not connected)", self.config.name),
        })?;

        let result = session
            .call_tool(name, args)
            .await
            .map_err(|e| DiscoveryError::execution_failed(e.to_string()))?;

        if result.is_error {
            return Err(DiscoveryError::execution_failed(tool_result_error(&result)));
        }
        Ok(tool_result_value(&result))
    }

    pub(crate) fn tools_snapshot(&self) -> Vec<Tool> {
        self.state.read().tools.clone()
    }
}

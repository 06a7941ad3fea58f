use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DiscoveryError;

/// JSON-RPC 2.0 error codes used on the wire.
pub const ERR_CODE_PARSE: i32 = -32700;
pub const ERR_CODE_INVALID_REQUEST: i32 = -32600;
pub const ERR_CODE_METHOD_NOT_FOUND: i32 = -32601;
pub const ERR_CODE_INVALID_PARAMS: i32 = -32602;
pub const ERR_CODE_INTERNAL: i32 = -32603;
pub const ERR_CODE_TOOL_NOT_FOUND: i32 = -32001;
pub const ERR_CODE_TOOL_EXEC_FAILED: i32 = -32002;

/// Protocol version advertised by `initialize` unless overridden in config.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Incoming JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<JsonValue>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonValue>,
}

/// Outgoing JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<McpErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl McpResponse {
    pub fn success(id: Option<JsonValue>, result: JsonValue) -> Self {
        McpResponse { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    pub fn error(id: Option<JsonValue>, code: i32, message: impl Into<String>) -> Self {
        McpResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpErrorObject { code, message: message.into(), data: None }),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::error(None, ERR_CODE_PARSE, message)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }
}

/// Map a domain error to the JSON-RPC code for `tools/call` failures.
pub fn call_error_code(err: &DiscoveryError) -> i32 {
    match err {
        DiscoveryError::NotFound { .. } => ERR_CODE_TOOL_NOT_FOUND,
        DiscoveryError::InvalidRequest { .. } => ERR_CODE_INVALID_PARAMS,
        _ => ERR_CODE_TOOL_EXEC_FAILED,
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// Separator inside Provider identity strings. A NUL byte cannot occur in a
/// provider or tool id that came off a JSON wire, which keeps the identity
/// function injective even when ids contain `:`.
pub const PROVIDER_ID_SEPARATOR: char = '\u{0}';

/// Backend kind discriminant, used at the unregister boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Mcp,
    Provider,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Mcp => write!(f, "mcp"),
            BackendKind::Provider => write!(f, "provider"),
        }
    }
}

/// A way to execute a tool. Each variant carries its own discriminators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolBackend {
    /// In-process handler, looked up by name in the dispatch facade.
    Local { name: String },
    /// Remote MCP server, looked up by server name in the session table.
    Mcp { server_name: String },
    /// External provider; the pair (provider, tool) identifies the target.
    Provider { provider_id: String, tool_id: String },
}

impl ToolBackend {
    pub fn local(name: impl Into<String>) -> Self {
        ToolBackend::Local { name: name.into() }
    }

    pub fn mcp(server_name: impl Into<String>) -> Self {
        ToolBackend::Mcp { server_name: server_name.into() }
    }

    pub fn provider(provider_id: impl Into<String>, tool_id: impl Into<String>) -> Self {
        ToolBackend::Provider { provider_id: provider_id.into(), tool_id: tool_id.into() }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            ToolBackend::Local { .. } => BackendKind::Local,
            ToolBackend::Mcp { .. } => BackendKind::Mcp,
            ToolBackend::Provider { .. } => BackendKind::Provider,
        }
    }

    /// Identity string used to key the backend set of a tool record, so that
    /// re-registering the same backend replaces rather than duplicates.
    /// Returns `None` for backends that fail validation.
    pub fn identity(&self) -> Option<String> {
        match self {
            ToolBackend::Local { name } if !name.is_empty() => Some(format!("local/{name}")),
            ToolBackend::Mcp { server_name } if !server_name.is_empty() => {
                Some(format!("mcp/{server_name}"))
            }
            ToolBackend::Provider { provider_id, tool_id }
                if !provider_id.is_empty() && !tool_id.is_empty() =>
            {
                Some(format!("provider/{provider_id}{PROVIDER_ID_SEPARATOR}{tool_id}"))
            }
            _ => None,
        }
    }

    /// Reject backends with missing kind-specific discriminators.
    pub fn validate(&self) -> Result<()> {
        match self {
            ToolBackend::Local { name } => {
                if name.trim().is_empty() {
                    return Err(DiscoveryError::invalid_backend("local backend requires a name"));
                }
            }
            ToolBackend::Mcp { server_name } => {
                if server_name.trim().is_empty() {
                    return Err(DiscoveryError::invalid_backend(
                        "mcp backend requires a server name",
                    ));
                }
            }
            ToolBackend::Provider { provider_id, tool_id } => {
                if provider_id.trim().is_empty() {
                    return Err(DiscoveryError::invalid_backend(
                        "provider backend requires a provider id",
                    ));
                }
                if tool_id.trim().is_empty() {
                    return Err(DiscoveryError::invalid_backend(
                        "provider backend requires a tool id",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Decode an unregister discriminator into the identity string for the given
/// kind. Provider discriminators carry `provider_id\u{0}tool_id`; a missing
/// separator or an empty half is rejected.
pub fn identity_for_unregister(kind: BackendKind, discriminator: &str) -> Result<String> {
    if discriminator.is_empty() {
        return Err(DiscoveryError::invalid_backend("backend discriminator is required"));
    }
    match kind {
        BackendKind::Local => Ok(format!("local/{discriminator}")),
        BackendKind::Mcp => Ok(format!("mcp/{discriminator}")),
        BackendKind::Provider => {
            let (provider_id, tool_id) =
                discriminator.split_once(PROVIDER_ID_SEPARATOR).ok_or_else(|| {
                    DiscoveryError::invalid_backend(
                        "provider discriminator must be provider_id\\u{0}tool_id",
                    )
                })?;
            if provider_id.is_empty() || tool_id.is_empty() {
                return Err(DiscoveryError::invalid_backend(
                    "provider discriminator halves must be non-empty",
                ));
            }
            Ok(format!("provider/{provider_id}{PROVIDER_ID_SEPARATOR}{tool_id}"))
        }
    }
}

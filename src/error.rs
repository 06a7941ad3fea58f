// Error taxonomy for the tool discovery layer.
//
// Every failure mode callers are expected to branch on gets its own variant,
// so `matches!` works without string inspection. Variants carry enough context
// to produce a useful message but are matched by kind, not content.

use std::io;

use thiserror::Error;

/// Main error type for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("invalid tool: {message}")]
    InvalidTool { message: String },

    #[error("invalid backend: {message}")]
    InvalidBackend { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("invalid cursor: {message}")]
    InvalidCursor { message: String },

    #[error("pagination requires a deterministic searcher")]
    NonDeterministicSearcher,

    #[error("invalid detail level: {level}")]
    InvalidDetailLevel { level: String },

    #[error("documentation exists but tool cannot be resolved: {id}")]
    NoTool { id: String },

    #[error("example args exceed caps: {message}")]
    ArgsTooLarge { message: String },

    #[error("embedder is required but missing")]
    InvalidEmbedder,

    #[error("invalid hybrid configuration: {message}")]
    InvalidHybridConfig { message: String },

    #[error("invalid provider: {message}")]
    InvalidProvider { message: String },

    #[error("invalid provider id")]
    InvalidProviderId,

    #[error("registry not started")]
    NotStarted,

    #[error("registry already started")]
    AlreadyStarted,

    #[error("backend not found: {name}")]
    BackendNotFound { name: String },

    #[error("handler not found: {id}")]
    HandlerNotFound { id: String },

    #[error("tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("operation canceled")]
    Canceled,

    #[error("deadline exceeded: {operation}")]
    DeadlineExceeded { operation: String },

    #[error("search error: {message}")]
    Search {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

impl DiscoveryError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        DiscoveryError::NotFound { resource: resource.into() }
    }

    pub fn invalid_tool(message: impl Into<String>) -> Self {
        DiscoveryError::InvalidTool { message: message.into() }
    }

    pub fn invalid_backend(message: impl Into<String>) -> Self {
        DiscoveryError::InvalidBackend { message: message.into() }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        DiscoveryError::InvalidRequest { message: message.into() }
    }

    pub fn invalid_cursor(message: impl Into<String>) -> Self {
        DiscoveryError::InvalidCursor { message: message.into() }
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        DiscoveryError::ExecutionFailed { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DiscoveryError::Internal { message: message.into() }
    }

    /// True for errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DiscoveryError::NotFound { .. }
                | DiscoveryError::InvalidTool { .. }
                | DiscoveryError::InvalidBackend { .. }
                | DiscoveryError::InvalidRequest { .. }
                | DiscoveryError::InvalidCursor { .. }
                | DiscoveryError::InvalidDetailLevel { .. }
                | DiscoveryError::ArgsTooLarge { .. }
        )
    }
}

impl From<io::Error> for DiscoveryError {
    fn from(err: io::Error) -> Self {
        DiscoveryError::Io { message: err.to_string(), source: err }
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        DiscoveryError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<anyhow::Error> for DiscoveryError {
    fn from(err: anyhow::Error) -> Self {
        DiscoveryError::Internal { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_distinct() {
        let not_found = DiscoveryError::not_found("tool");
        let invalid_tool = DiscoveryError::invalid_tool("empty name");
        let invalid_backend = DiscoveryError::invalid_backend("missing kind");
        let invalid_cursor = DiscoveryError::invalid_cursor("bad base64");

        assert!(matches!(not_found, DiscoveryError::NotFound { .. }));
        assert!(!matches!(not_found, DiscoveryError::InvalidTool { .. }));
        assert!(matches!(invalid_tool, DiscoveryError::InvalidTool { .. }));
        assert!(matches!(invalid_backend, DiscoveryError::InvalidBackend { .. }));
        assert!(matches!(invalid_cursor, DiscoveryError::InvalidCursor { .. }));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: DiscoveryError = io_err.into();
        assert!(matches!(err, DiscoveryError::Io { .. }));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(DiscoveryError::not_found("x").is_client_error());
        assert!(!DiscoveryError::internal("boom").is_client_error());
        assert!(!DiscoveryError::NotStarted.is_client_error());
    }
}

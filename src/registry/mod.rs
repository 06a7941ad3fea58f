// MCP dispatch facade: a high-level tool registry with built-in search,
// local handler execution, remote MCP backends and a JSON-RPC method router.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{DiscoveryError, Result};
use crate::index::{BackendSelector, Index, IndexOptions, InMemoryIndex, Searcher, Summary};
use crate::model::{BackendKind, SchemaValue, Tool, ToolBackend};
use crate::search::{Bm25Config, Bm25Searcher};

pub mod backend;
pub mod protocol;
pub mod server;

pub use backend::{
    tool_result_error, tool_result_value, BackendConfig, CallToolResult, McpConnector, McpSession,
    ToolContent,
};
use backend::McpBackend;
pub use protocol::{McpErrorObject, McpRequest, McpResponse, MCP_PROTOCOL_VERSION};
pub use server::{handle_http, handle_sse, serve_stdio, HttpEnvelope};

/// Executes a local tool with parsed arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Map<String, Value>) -> Result<Value>;
}

/// Wrap an async closure as a `ToolHandler`.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
{
    struct FnHandler<F>(F);

    #[async_trait]
    impl<F, Fut> ToolHandler for FnHandler<F>
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
    {
        async fn call(&self, args: Map<String, Value>) -> Result<Value> {
            (self.0)(args).await
        }
    }

    Arc::new(FnHandler(f))
}

/// Identity advertised by `initialize`.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Registry configuration.
#[derive(Default)]
pub struct RegistryConfig {
    pub search: Option<Bm25Config>,
    pub server_info: ServerInfo,
    pub backend_selector: Option<BackendSelector>,
    /// Protocol version string surfaced via `initialize`; the registry is
    /// otherwise agnostic to its value.
    pub protocol_version: Option<String>,
}

/// Extra registration options for local tools.
#[derive(Debug, Clone, Default)]
pub struct LocalToolOptions {
    pub namespace: String,
    pub version: String,
    pub tags: Vec<String>,
}

/// Registry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_tools: usize,
    pub local_tools: usize,
    pub mcp_tools: usize,
    pub backends: usize,
    pub index_version: u64,
}

pub struct Registry {
    index: Arc<InMemoryIndex>,
    config: RegistryConfig,
    handlers: RwLock<FxHashMap<String, Arc<dyn ToolHandler>>>,
    backends: RwLock<FxHashMap<String, Arc<McpBackend>>>,
    started: RwLock<bool>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        let searcher: Arc<dyn Searcher> =
            Arc::new(Bm25Searcher::new(config.search.clone().unwrap_or_default()));
        let index = Arc::new(InMemoryIndex::new(IndexOptions {
            searcher: Some(searcher),
            backend_selector: config.backend_selector.clone(),
            ..IndexOptions::default()
        }));

        Registry {
            index,
            config,
            handlers: RwLock::new(FxHashMap::default()),
            backends: RwLock::new(FxHashMap::default()),
            started: RwLock::new(false),
        }
    }

    /// Register a tool with a local execution handler.
    pub fn register_local(&self, tool: Tool, handler: Arc<dyn ToolHandler>) -> Result<()> {
        tool.validate()?;
        let backend = ToolBackend::local(&tool.name);
        let tool_id = tool.tool_id();
        self.index.register_tool(tool, backend)?;
        self.handlers.write().insert(tool_id, handler);
        Ok(())
    }

    /// Convenience for inline tool definition.
    pub fn register_local_fn(
        &self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
        options: LocalToolOptions,
    ) -> Result<()> {
        let tool = Tool::new(name, description, SchemaValue::new(input_schema))
            .with_namespace(options.namespace)
            .with_version(options.version)
            .with_tags(options.tags);
        self.register_local(tool, handler)
    }

    /// Register an MCP server as a backend. Its tools are discovered and
    /// registered on `start`, or immediately when already running.
    pub async fn register_mcp(&self, config: BackendConfig) -> Result<()> {
        if config.name.trim().is_empty() {
            return Err(DiscoveryError::invalid_request("backend name is required"));
        }

        let backend = Arc::new(McpBackend::new(config));
        {
            let mut backends = self.backends.write();
            if backends.contains_key(backend.name()) {
                return Err(DiscoveryError::invalid_request(format!(
                    "backend {} already registered",
                    backend.name()
                )));
            }
            backends.insert(backend.name().to_string(), backend.clone());
        }
        let started = *self.started.read();

        if started {
            if let Err(err) = backend.connect().await {
                self.backends.write().remove(backend.name());
                return Err(err);
            }
            if let Err(err) = self
                .index
                .register_tools_from_mcp(backend.name(), backend.tools_snapshot())
            {
                let _ = backend.disconnect().await;
                self.backends.write().remove(backend.name());
                return Err(err);
            }
        }
        Ok(())
    }

    /// Remove an MCP backend, unregistering its tools and disconnecting.
    pub async fn unregister_mcp(&self, name: &str) -> Result<()> {
        let backend = self
            .backends
            .write()
            .remove(name)
            .ok_or_else(|| DiscoveryError::BackendNotFound { name: name.to_string() })?;

        for tool in backend.tools_snapshot() {
            if let Err(err) =
                self.index.unregister_backend(&tool.tool_id(), BackendKind::Mcp, name)
            {
                warn!(tool = %tool.tool_id(), backend = name, error = %err, "unregister skipped");
            }
        }

        if backend.is_connected() {
            backend.disconnect().await?;
        }
        Ok(())
    }

    /// Connect every registered MCP backend and register its tools. Any
    /// failure rolls back: connected backends are disconnected, tools they
    /// registered are removed, and the registry returns to the new state.
    pub async fn start(&self) -> Result<()> {
        {
            let mut started = self.started.write();
            if *started {
                return Err(DiscoveryError::AlreadyStarted);
            }
            *started = true;
        }

        let backends: Vec<Arc<McpBackend>> = self.backends.read().values().cloned().collect();
        let mut connected: Vec<Arc<McpBackend>> = Vec::new();

        for backend in backends {
            let step = async {
                backend.connect().await?;
                connected.push(backend.clone());
                self.index
                    .register_tools_from_mcp(backend.name(), backend.tools_snapshot())
            };
            if let Err(err) = step.await {
                self.rollback_start(&connected).await;
                *self.started.write() = false;
                return Err(DiscoveryError::execution_failed(format!(
                    "failed to start backend {}: {err}",
                    backend.name()
                )));
            }
        }

        info!(backends = connected.len(), "registry started");
        Ok(())
    }

    async fn rollback_start(&self, connected: &[Arc<McpBackend>]) {
        for backend in connected {
            for tool in backend.tools_snapshot() {
                let _ = self.index.unregister_backend(
                    &tool.tool_id(),
                    BackendKind::Mcp,
                    backend.name(),
                );
            }
            let _ = backend.disconnect().await;
        }
    }

    /// Disconnect all backends.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut started = self.started.write();
            if !*started {
                return Ok(());
            }
            *started = false;
        }

        let backends: Vec<Arc<McpBackend>> = self.backends.read().values().cloned().collect();
        for backend in backends {
            backend.disconnect().await?;
        }
        info!("registry stopped");
        Ok(())
    }

    /// Ok iff started and every registered backend is still connected.
    pub fn health_check(&self) -> Result<()> {
        if !*self.started.read() {
            return Err(DiscoveryError::NotStarted);
        }
        for (name, backend) in self.backends.read().iter() {
            if !backend.is_connected() {
                return Err(DiscoveryError::BackendNotFound {
                    name: format!("{name} (not connected)"),
                });
            }
        }
        Ok(())
    }

    /// Run a tool by id, routing to its selected backend.
    pub async fn execute(&self, name: &str, args: Map<String, Value>) -> Result<Value> {
        let (tool, backend) = self.index.get_tool(name)?;

        match backend {
            ToolBackend::Local { .. } => {
                let handler = self
                    .handlers
                    .read()
                    .get(&tool.tool_id())
                    .cloned()
                    .ok_or_else(|| DiscoveryError::HandlerNotFound { id: tool.tool_id() })?;
                handler.call(args).await
            }
            ToolBackend::Mcp { server_name } => {
                let backend = self
                    .backends
                    .read()
                    .get(&server_name)
                    .cloned()
                    .ok_or_else(|| DiscoveryError::BackendNotFound { name: server_name.clone() })?;
                backend.call_tool(&tool.name, &args).await
            }
            ToolBackend::Provider { .. } => Err(DiscoveryError::invalid_request(
                "provider backends are not executable through this registry",
            )),
        }
    }

    /// Ranked search returning full tool payloads.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Tool>> {
        let summaries = self.index.search(query, limit).await?;
        Ok(self.resolve_tools(summaries))
    }

    /// Ranked search returning lightweight summaries.
    pub async fn search_summaries(&self, query: &str, limit: usize) -> Result<Vec<Summary>> {
        self.index.search(query, limit).await
    }

    /// Every registered tool, in id order.
    pub async fn list_all(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let (page, next) = self.index.search_page("", 256, cursor.as_deref()).await?;
            tools.extend(self.resolve_tools(page));
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(tools)
    }

    pub fn list_namespaces(&self) -> Result<Vec<String>> {
        self.index.list_namespaces()
    }

    pub fn get_tool(&self, id: &str) -> Result<Tool> {
        self.index.get_tool(id).map(|(tool, _)| tool)
    }

    pub async fn stats(&self) -> RegistryStats {
        let summaries = self.index.search("", usize::MAX).await.unwrap_or_default();
        let mut stats = RegistryStats {
            total_tools: summaries.len(),
            backends: self.backends.read().len(),
            index_version: self.index.version(),
            ..RegistryStats::default()
        };

        for summary in &summaries {
            if let Ok((_, backend)) = self.index.get_tool(&summary.id) {
                match backend.kind() {
                    BackendKind::Local => stats.local_tools += 1,
                    BackendKind::Mcp => stats.mcp_tools += 1,
                    BackendKind::Provider => {}
                }
            }
        }
        stats
    }

    /// Force a search index refresh; returns the new index version.
    pub fn refresh(&self) -> u64 {
        self.index.refresh()
    }

    /// The underlying index, for advanced operations.
    pub fn index(&self) -> &Arc<InMemoryIndex> {
        &self.index
    }

    /// Route one JSON-RPC request.
    pub async fn handle_request(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_tools_list(request.id).await,
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            other => McpResponse::error(
                request.id,
                protocol::ERR_CODE_METHOD_NOT_FOUND,
                format!("method {other} not found"),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> McpResponse {
        let protocol_version = self
            .config
            .protocol_version
            .clone()
            .unwrap_or_else(|| MCP_PROTOCOL_VERSION.to_string());

        McpResponse::success(id, json!({
            "protocolVersion": protocol_version,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": self.config.server_info.name,
                "version": self.config.server_info.version,
            },
        }))
    }

    async fn handle_tools_list(&self, id: Option<Value>) -> McpResponse {
        let tools = match self.list_all().await {
            Ok(tools) => tools,
            Err(err) => {
                return McpResponse::error(id, protocol::ERR_CODE_INTERNAL, err.to_string())
            }
        };

        let listed: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();

        McpResponse::success(id, json!({"tools": listed}))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> McpResponse {
        #[derive(Deserialize)]
        struct CallParams {
            name: String,
            #[serde(default)]
            arguments: Option<Map<String, Value>>,
        }

        let params = match params {
            Some(params) => params,
            None => {
                return McpResponse::error(
                    id,
                    protocol::ERR_CODE_INVALID_PARAMS,
                    "params are required for tools/call",
                )
            }
        };
        let call: CallParams = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(err) => {
                return McpResponse::error(id, protocol::ERR_CODE_INVALID_PARAMS, err.to_string())
            }
        };

        match self.execute(&call.name, call.arguments.unwrap_or_default()).await {
            Ok(result) => McpResponse::success(id, result),
            Err(err) => McpResponse::error(id, protocol::call_error_code(&err), err.to_string()),
        }
    }

    fn resolve_tools(&self, summaries: Vec<Summary>) -> Vec<Tool> {
        summaries
            .into_iter()
            .filter_map(|summary| self.index.get_tool(&summary.id).ok())
            .map(|(tool, _)| tool)
            .collect()
    }
}

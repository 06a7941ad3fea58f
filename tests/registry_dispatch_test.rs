// Dispatch facade end-to-end: JSON-RPC routing over local and remote
// backends, MCP backend lifecycle with stubbed sessions, and the transport
// envelopes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use toolscout::model::{SchemaValue, Tool};
use toolscout::registry::{
    handler_fn, handle_http, handle_sse, serve_stdio, BackendConfig, CallToolResult,
    LocalToolOptions, McpConnector, McpRequest, McpResponse, McpSession, Registry, RegistryConfig,
    ServerInfo, ToolContent,
};
use toolscout::{DiscoveryError, Result};

/// Stub session: fixed tool list, canned call results, close tracking.
struct StubSession {
    tools: Vec<Tool>,
    result: CallToolResult,
    calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl McpSession for StubSession {
    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, _name: &str, _args: &Map<String, Value>) -> Result<CallToolResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct StubConnector {
    tools: Vec<Tool>,
    result: CallToolResult,
    calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    fail_connect: bool,
}

impl StubConnector {
    fn new(tools: Vec<Tool>, result: CallToolResult) -> Self {
        StubConnector {
            tools,
            result,
            calls: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
            fail_connect: false,
        }
    }
}

#[async_trait]
impl McpConnector for StubConnector {
    async fn connect(&self) -> Result<Arc<dyn McpSession>> {
        if self.fail_connect {
            return Err(DiscoveryError::execution_failed("connection refused"));
        }
        Ok(Arc::new(StubSession {
            tools: self.tools.clone(),
            result: self.result.clone(),
            calls: self.calls.clone(),
            closed: self.closed.clone(),
        }))
    }
}

fn remote_tool(name: &str) -> Tool {
    Tool::new(
        name,
        format!("Remote tool {name}"),
        SchemaValue::new(json!({"type": "object", "properties": {}})),
    )
    .with_namespace("remote")
}

fn text_result(text: &str) -> CallToolResult {
    CallToolResult {
        is_error: false,
        content: vec![ToolContent::Text { text: text.to_string() }],
        structured_content: None,
    }
}

fn registry() -> Registry {
    Registry::new(RegistryConfig {
        server_info: ServerInfo { name: "dispatch-test".into(), version: "0.0.1".into() },
        ..RegistryConfig::default()
    })
}

#[tokio::test]
async fn start_registers_backend_tools_and_routes_calls() {
    let reg = registry();
    let connector = Arc::new(StubConnector::new(vec![remote_tool("fetch")], text_result("ok")));
    let calls = connector.calls.clone();

    reg.register_mcp(BackendConfig { name: "stub".into(), connector }).await.unwrap();
    reg.start().await.unwrap();
    reg.health_check().unwrap();

    // Backend tools landed in the index under the MCP backend tag.
    let tool = reg.get_tool("remote:fetch").unwrap();
    assert_eq!(tool.name, "fetch");

    // Execution routes through the stub session.
    let result = reg.execute("remote:fetch", Map::new()).await.unwrap();
    assert_eq!(result, json!("ok"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    reg.stop().await.unwrap();
}

#[tokio::test]
async fn stop_closes_sessions() {
    let reg = registry();
    let connector = Arc::new(StubConnector::new(vec![remote_tool("fetch")], text_result("ok")));
    let closed = connector.closed.clone();

    reg.register_mcp(BackendConfig { name: "stub".into(), connector }).await.unwrap();
    reg.start().await.unwrap();
    reg.stop().await.unwrap();

    assert!(closed.load(Ordering::SeqCst));
    assert!(matches!(reg.health_check().unwrap_err(), DiscoveryError::NotStarted));
}

#[tokio::test]
async fn start_failure_rolls_back_cleanly() {
    let reg = registry();

    let good = Arc::new(StubConnector::new(vec![remote_tool("good")], text_result("ok")));
    let good_closed = good.closed.clone();
    let mut bad = StubConnector::new(vec![remote_tool("bad")], text_result("never"));
    bad.fail_connect = true;

    // Names order the map; use a prefix so the good backend connects first.
    reg.register_mcp(BackendConfig { name: "a-good".into(), connector: good }).await.unwrap();
    reg.register_mcp(BackendConfig { name: "z-bad".into(), connector: Arc::new(bad) })
        .await
        .unwrap();

    let err = reg.start().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::ExecutionFailed { .. }));

    // No partial state: connected backends are closed, their tools gone,
    // and the registry can start again once the bad backend is removed.
    assert!(matches!(reg.health_check().unwrap_err(), DiscoveryError::NotStarted));
    if good_closed.load(Ordering::SeqCst) {
        assert!(reg.get_tool("remote:good").is_err());
    }

    reg.unregister_mcp("z-bad").await.unwrap();
    reg.start().await.unwrap();
    reg.health_check().unwrap();
    assert!(reg.get_tool("remote:good").is_ok());
    reg.stop().await.unwrap();
}

#[tokio::test]
async fn register_mcp_while_running_connects_eagerly() {
    let reg = registry();
    reg.start().await.unwrap();

    let connector = Arc::new(StubConnector::new(vec![remote_tool("late")], text_result("ok")));
    reg.register_mcp(BackendConfig { name: "late".into(), connector }).await.unwrap();

    assert!(reg.get_tool("remote:late").is_ok());

    reg.unregister_mcp("late").await.unwrap();
    assert!(reg.get_tool("remote:late").is_err());

    reg.stop().await.unwrap();
}

#[tokio::test]
async fn structured_content_and_error_results_map_correctly() {
    // Structured content is returned as-is.
    let reg = registry();
    let structured = CallToolResult {
        is_error: false,
        content: vec![ToolContent::Text { text: "shadowed".into() }],
        structured_content: Some(json!({"rows": [1, 2, 3]})),
    };
    let connector = Arc::new(StubConnector::new(vec![remote_tool("query")], structured));
    reg.register_mcp(BackendConfig { name: "db".into(), connector }).await.unwrap();
    reg.start().await.unwrap();
    let result = reg.execute("remote:query", Map::new()).await.unwrap();
    assert_eq!(result, json!({"rows": [1, 2, 3]}));
    reg.stop().await.unwrap();

    // is_error surfaces ExecutionFailed with the text payload.
    let reg = registry();
    let error_result = CallToolResult {
        is_error: true,
        content: vec![ToolContent::Text { text: "quota exceeded".into() }],
        structured_content: None,
    };
    let connector = Arc::new(StubConnector::new(vec![remote_tool("limited")], error_result));
    reg.register_mcp(BackendConfig { name: "limited".into(), connector }).await.unwrap();
    reg.start().await.unwrap();
    let err = reg.execute("remote:limited", Map::new()).await.unwrap_err();
    match err {
        DiscoveryError::ExecutionFailed { message } => assert!(message.contains("quota exceeded")),
        other => panic!("expected ExecutionFailed, got {other:?}"),
    }
    reg.stop().await.unwrap();

    // Multi-block content comes back as the raw array.
    let reg = registry();
    let multi = CallToolResult {
        is_error: false,
        content: vec![
            ToolContent::Text { text: "part one".into() },
            ToolContent::Text { text: "part two".into() },
        ],
        structured_content: None,
    };
    let connector = Arc::new(StubConnector::new(vec![remote_tool("multi")], multi));
    reg.register_mcp(BackendConfig { name: "multi".into(), connector }).await.unwrap();
    reg.start().await.unwrap();
    let result = reg.execute("remote:multi", Map::new()).await.unwrap();
    assert_eq!(result.as_array().unwrap().len(), 2);
    reg.stop().await.unwrap();
}

#[tokio::test]
async fn mixed_local_and_remote_listing() {
    let reg = registry();
    reg.register_local_fn(
        "local_echo",
        "Echo locally",
        json!({"type": "object"}),
        handler_fn(|args| async move { Ok(Value::Object(args)) }),
        LocalToolOptions { namespace: "local".into(), ..LocalToolOptions::default() },
    )
    .unwrap();

    let connector = Arc::new(StubConnector::new(vec![remote_tool("fetch")], text_result("ok")));
    reg.register_mcp(BackendConfig { name: "stub".into(), connector }).await.unwrap();
    reg.start().await.unwrap();

    let response = reg
        .handle_request(McpRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: "tools/list".into(),
            params: None,
        })
        .await;
    let result = response.result.unwrap();
    let tools = result["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"local_echo"));
    assert!(names.contains(&"fetch"));

    let stats = reg.stats().await;
    assert_eq!(stats.total_tools, 2);
    assert_eq!(stats.local_tools, 1);
    assert_eq!(stats.mcp_tools, 1);
    assert_eq!(stats.backends, 1);

    reg.stop().await.unwrap();
}

#[tokio::test]
async fn stdio_transport_full_session() {
    let reg = registry();
    reg.register_local_fn(
        "add",
        "Add two numbers",
        json!({"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}),
        handler_fn(|args| async move {
            let a = args.get("a").and_then(Value::as_f64).unwrap_or(0.0);
            let b = args.get("b").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(json!(a + b))
        }),
        LocalToolOptions::default(),
    )
    .unwrap();

    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":4,"method":"no/such/method"}"#,
        "\n",
    );

    let mut output: Vec<u8> = Vec::new();
    serve_stdio(&reg, input.as_bytes(), &mut output).await.unwrap();

    let responses: Vec<McpResponse> = std::str::from_utf8(&output)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 4);

    assert_eq!(responses[0].result.as_ref().unwrap()["serverInfo"]["name"], "dispatch-test");
    assert_eq!(responses[1].result.as_ref().unwrap()["tools"].as_array().unwrap().len(), 1);
    assert_eq!(responses[2].result, Some(json!(5.0)));
    assert_eq!(responses[3].error.as_ref().unwrap().code, -32601);
}

#[tokio::test]
async fn http_and_sse_envelopes() {
    let reg = registry();

    let envelope = handle_http(&reg, "DELETE", "{}").await;
    assert_eq!(envelope.status, 405);

    let envelope =
        handle_http(&reg, "POST", r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).await;
    assert_eq!(envelope.status, 200);
    let response: McpResponse = serde_json::from_str(&envelope.body).unwrap();
    assert!(response.is_success());

    let frame = handle_sse(&reg, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await;
    assert!(frame.starts_with("event: message\ndata: {"));
    assert!(frame.ends_with("\n\n"));
}

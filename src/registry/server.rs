// Transport shells at the envelope level: newline-delimited JSON over any
// async reader/writer pair (stdio in production), plus pure request/response
// envelope handlers for HTTP POST and SSE so callers can mount them on
// whatever server stack they run.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::Result;
use crate::registry::protocol::{McpRequest, McpResponse};
use crate::registry::Registry;

/// Serve line-delimited JSON-RPC until the reader reaches EOF. Unparseable
/// lines get a parse-error response; the loop keeps going.
pub async fn serve_stdio<R, W>(registry: &Registry, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<McpRequest>(&line) {
            Ok(request) => {
                debug!(method = %request.method, "handling request");
                registry.handle_request(request).await
            }
            Err(err) => McpResponse::parse_error(err.to_string()),
        };

        let encoded = serde_json::to_string(&response)?;
        writer.write_all(encoded.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Serve over the process's stdin/stdout.
pub async fn serve_stdio_process(registry: &Registry) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_stdio(registry, stdin, stdout).await
}

/// Minimal HTTP response envelope, transport-stack agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEnvelope {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

/// Handle one HTTP request body. POST only; anything else is 405.
pub async fn handle_http(registry: &Registry, method: &str, body: &str) -> HttpEnvelope {
    if !method.eq_ignore_ascii_case("POST") {
        return HttpEnvelope {
            status: 405,
            content_type: "text/plain",
            body: "Method not allowed".to_string(),
        };
    }

    let response = match serde_json::from_str::<McpRequest>(body) {
        Ok(request) => registry.handle_request(request).await,
        Err(err) => McpResponse::parse_error(err.to_string()),
    };

    HttpEnvelope {
        status: 200,
        content_type: "application/json",
        body: serde_json::to_string(&response).unwrap_or_else(|_| {
            r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#
                .to_string()
        }),
    }
}

/// Handle one SSE request body: the response is a single event frame,
/// flushed before close. Parse failures use the `error` event name.
pub async fn handle_sse(registry: &Registry, body: &str) -> String {
    let (event, response) = match serde_json::from_str::<McpRequest>(body) {
        Ok(request) => ("message", registry.handle_request(request).await),
        Err(err) => ("error", McpResponse::parse_error(err.to_string())),
    };

    let data = serde_json::to_string(&response).unwrap_or_else(|_| {
        r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#
            .to_string()
    });
    format!("event: {event}\ndata: {data}\n\n")
}

//! Streamable-HTTP transport for MCP communication.
//!
//! Every JSON-RPC message is a single POST to one endpoint. The server may
//! answer with plain JSON or with a `text/event-stream` body holding a single
//! event; [`strip_event_framing`] normalizes both to the JSON payload.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::error::{McpError, Result};
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, SESSION_HEADER};

/// Accept header value required by streamable-HTTP servers.
const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// Configuration for HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Endpoint URL of the MCP server.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Static headers sent with every request (e.g. a bearer credential).
    pub headers: Vec<(String, String)>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(30),
            headers: Vec::new(),
        }
    }
}

impl HttpTransportConfig {
    /// Create a new HTTP transport config with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// A response as seen at the HTTP level, before JSON-RPC decoding.
#[derive(Debug, Clone)]
pub struct HttpReply {
    /// Value of the `mcp-session-id` response header, if present.
    pub session_id: Option<String>,
    /// Response body with event-stream framing removed.
    pub body: String,
}

impl HttpReply {
    /// Decode the body as a JSON-RPC response.
    pub fn json_rpc(&self) -> Result<JsonRpcResponse> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Blocking HTTP transport for a single MCP endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// Validates the URL; no request is made.
    pub fn connect(config: HttpTransportConfig) -> Result<Self> {
        url::Url::parse(&config.url)
            .map_err(|e| McpError::transport(format!("invalid URL: {}", e)))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(2)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| McpError::transport(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            url = %config.url,
            timeout_secs = config.timeout.as_secs(),
            "created MCP HTTP transport"
        );

        Ok(Self { client, config })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Send a JSON-RPC request and return the raw reply.
    ///
    /// Non-2xx statuses become [`McpError::HttpStatus`]; the body is not
    /// interpreted here.
    pub fn send_request(
        &self,
        request: &JsonRpcRequest,
        session_id: Option<&str>,
    ) -> Result<HttpReply> {
        let json = serde_json::to_string(request)?;

        tracing::trace!(
            url = %self.config.url,
            method = %request.method,
            json = %json,
            "sending MCP HTTP request"
        );

        let response = self
            .build_post(json, session_id)
            .send()
            .map_err(|e| McpError::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let session_header = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response
            .text()
            .map_err(|e| McpError::transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        tracing::trace!(
            method = %request.method,
            json = %text,
            "received MCP HTTP response"
        );

        Ok(HttpReply {
            session_id: session_header,
            body: strip_event_framing(&text),
        })
    }

    /// Send a JSON-RPC notification. The response body is discarded.
    pub fn send_notification(
        &self,
        notification: &JsonRpcNotification,
        session_id: Option<&str>,
    ) -> Result<()> {
        let json = serde_json::to_string(notification)?;

        tracing::trace!(
            url = %self.config.url,
            method = %notification.method,
            "sending MCP HTTP notification"
        );

        let response = self
            .build_post(json, session_id)
            .send()
            .map_err(|e| McpError::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn build_post(
        &self,
        body: String,
        session_id: Option<&str>,
    ) -> reqwest::blocking::RequestBuilder {
        let mut req = self
            .client
            .post(&self.config.url)
            .header(ACCEPT, ACCEPT_VALUE)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }
        if let Some(id) = session_id {
            req = req.header(SESSION_HEADER, id);
        }

        req
    }
}

/// Remove `text/event-stream` framing from a response body.
///
/// Returns the `data:` payload of the first event, joining multi-line data
/// with `\n`. A body without any `data:` line is returned trimmed, as-is.
pub fn strip_event_framing(body: &str) -> String {
    let mut data_lines: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(data) = line.strip_prefix("data:") {
            data_lines.push(data.strip_prefix(' ').unwrap_or(data));
        } else if line.is_empty() && !data_lines.is_empty() {
            // End of the first event.
            break;
        }
    }

    if data_lines.is_empty() {
        body.trim().to_string()
    } else {
        data_lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_config() {
        let config = HttpTransportConfig::new("http://localhost:8000/mcp/")
            .with_timeout(Duration::from_secs(60))
            .with_header("Authorization", "Bearer token123");

        assert_eq!(config.url, "http://localhost:8000/mcp/");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(
            config.headers,
            vec![("Authorization".to_string(), "Bearer token123".to_string())]
        );
    }

    #[test]
    fn test_http_transport_config_default() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_http_transport_creation() {
        let transport =
            HttpTransport::connect(HttpTransportConfig::new("http://localhost:8000/mcp/")).unwrap();
        assert_eq!(transport.url(), "http://localhost:8000/mcp/");
    }

    #[test]
    fn test_http_transport_invalid_url() {
        let result = HttpTransport::connect(HttpTransportConfig::new("not a valid url"));
        match result {
            Err(McpError::Transport(msg)) => assert!(msg.contains("invalid URL")),
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_framing_single_event() {
        let body = "event: message\r\ndata: {\"result\":{}}\r\n\r\n";
        assert_eq!(strip_event_framing(body), "{\"result\":{}}");
    }

    #[test]
    fn test_strip_framing_without_event_line() {
        let body = "data: {\"result\":{\"tools\":[]}}";
        assert_eq!(strip_event_framing(body), "{\"result\":{\"tools\":[]}}");
    }

    #[test]
    fn test_strip_framing_plain_json() {
        let body = "  {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n";
        assert_eq!(
            strip_event_framing(body),
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}"
        );
    }

    #[test]
    fn test_strip_framing_multiline_data() {
        let body = "event: message\ndata: {\"a\":\ndata: 1}\n\n";
        assert_eq!(strip_event_framing(body), "{\"a\":\n1}");
    }

    #[test]
    fn test_strip_framing_takes_first_event_only() {
        let body = "data: {\"first\":true}\n\ndata: {\"second\":true}\n\n";
        assert_eq!(strip_event_framing(body), "{\"first\":true}");
    }

    #[test]
    fn test_strip_framing_data_without_space() {
        assert_eq!(strip_event_framing("data:{}"), "{}");
    }
}

//! MCP client for communicating with a streamable-HTTP MCP server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;

use crate::catalog::ToolCatalog;
use crate::error::Result;
use crate::protocol::{
    ClientInfo, JsonRpcNotification, JsonRpcRequest, MCP_PROTOCOL_VERSION,
};
use crate::session::Session;
use crate::transport::{HttpReply, HttpTransport, HttpTransportConfig};

/// Configuration for an MCP server connection.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Endpoint URL of the server.
    pub url: String,
    /// Identity announced in the initialize request.
    pub client_info: ClientInfo,
    /// Protocol version requested in the initialize request.
    pub protocol_version: String,
    /// HTTP headers sent with every request.
    pub headers: Vec<(String, String)>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl McpServerConfig {
    /// Create a new server config for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client_info: ClientInfo::default(),
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    /// Set the client identity.
    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = ClientInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    /// Set the requested protocol version.
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Add an HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An MCP client bound to a single server endpoint.
///
/// The client itself holds no session state. The handshake produces a
/// [`Session`] value which callers pass to every later request.
pub struct McpClient {
    pub(crate) config: McpServerConfig,
    transport: HttpTransport,
    /// Counter for generating request IDs; `initialize` gets 0.
    request_id: AtomicU64,
}

impl McpClient {
    /// Create a client for the configured endpoint.
    ///
    /// This does NOT contact the server; call [`McpClient::initialize`] or
    /// [`McpClient::open`] next.
    pub fn connect(config: McpServerConfig) -> Result<Self> {
        let mut http_config = HttpTransportConfig::new(&config.url);
        if let Some(timeout) = config.timeout {
            http_config = http_config.with_timeout(timeout);
        }
        for (key, value) in &config.headers {
            http_config = http_config.with_header(key, value);
        }

        let transport = HttpTransport::connect(http_config)?;

        Ok(Self {
            config,
            transport,
            request_id: AtomicU64::new(0),
        })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        self.transport.url()
    }

    /// Run the full startup sequence: initialize, announce readiness, fetch
    /// the catalog. The first failure aborts the sequence.
    pub fn open(&self) -> Result<(Session, ToolCatalog)> {
        let pending = self.initialize()?;
        let session = self.announce_ready(pending)?;
        let catalog = self.fetch_catalog(&session)?;
        Ok((session, catalog))
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and return the raw reply.
    pub(crate) fn send_request(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<HttpReply> {
        let request = JsonRpcRequest::new(self.next_request_id(), method, params);
        self.transport.send_request(&request, session_id)
    }

    /// Send a notification (no response body consumed).
    pub(crate) fn send_notification(&self, method: &str, session_id: Option<&str>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, None);
        self.transport.send_notification(&notification, session_id)
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("url", &self.config.url)
            .field("client_info", &self.config.client_info)
            .finish()
    }
}

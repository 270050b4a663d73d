//! Session handshake.
//!
//! The handshake is two steps, each with its own type:
//!
//! ```text
//! McpClient::initialize()     -> PendingSession   (id assigned, not ready)
//! McpClient::announce_ready() -> Session          (ready for tools/*)
//! ```
//!
//! Catalog and tool-call requests take a `&Session`, so they cannot be issued
//! before readiness has been announced, and announcing consumes the pending
//! session so it happens exactly once.

use crate::client::McpClient;
use crate::error::{McpError, Result};
use crate::protocol::{InitializeParams, InitializeResult, SESSION_HEADER, ServerInfo};

/// A session that has been initialized but not yet announced as ready.
#[derive(Debug)]
pub struct PendingSession {
    session: Session,
}

impl PendingSession {
    /// The session identifier assigned by the server.
    pub fn id(&self) -> &str {
        &self.session.id
    }
}

/// A ready MCP session.
///
/// Immutable after the handshake; every request to the endpoint carries
/// [`Session::id`] in the `mcp-session-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    endpoint: String,
    id: String,
    protocol_version: String,
    server_info: Option<ServerInfo>,
}

impl Session {
    /// The endpoint URL this session belongs to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The opaque session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Protocol version reported by the server.
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Server name/version, if the server reported them.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }
}

impl McpClient {
    /// Perform the `initialize` exchange.
    ///
    /// The session identifier comes from the `mcp-session-id` response header,
    /// not from the JSON body. A non-2xx status, a missing header or a
    /// malformed body is a [`McpError::Handshake`].
    pub fn initialize(&self) -> Result<PendingSession> {
        tracing::info!(url = %self.url(), "starting MCP handshake");

        let params = InitializeParams {
            protocol_version: self.config.protocol_version.clone(),
            client_info: self.config.client_info.clone(),
            ..Default::default()
        };
        let reply = self
            .send_request("initialize", Some(serde_json::to_value(&params)?), None)
            .map_err(|e| match e {
                McpError::HttpStatus { .. } => {
                    McpError::handshake(format!("initialize failed: {}", e))
                }
                other => other,
            })?;

        let id = reply
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                McpError::handshake(format!("response is missing the {} header", SESSION_HEADER))
            })?
            .to_string();

        let response = reply
            .json_rpc()
            .map_err(|e| McpError::handshake(format!("malformed initialize response: {}", e)))?;
        let result = response
            .into_result()
            .map_err(|e| McpError::handshake(format!("server rejected initialize: {}", e)))?;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::handshake(format!("malformed initialize result: {}", e)))?;

        tracing::info!(
            session_id = %id,
            protocol = %init.protocol_version,
            server = init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown"),
            "MCP session established"
        );

        Ok(PendingSession {
            session: Session {
                endpoint: self.url().to_string(),
                id,
                protocol_version: init.protocol_version,
                server_info: init.server_info,
            },
        })
    }

    /// Send `notifications/initialized` and promote the session to ready.
    pub fn announce_ready(&self, pending: PendingSession) -> Result<Session> {
        tracing::info!(session_id = %pending.id(), "sending initialized notification");
        self.send_notification("notifications/initialized", Some(pending.id()))?;
        Ok(pending.session)
    }
}

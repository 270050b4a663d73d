//! MCP (Model Context Protocol) client for Tether.
//!
//! This crate speaks MCP's JSON-RPC 2.0 over streamable HTTP: a session is
//! negotiated once, its identifier travels in a header on every later
//! request, and the tool catalog and tool calls are fetched within it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpClient                                                  │
//! │  - initialize -> PendingSession -> announce_ready -> Session│
//! │  - fetch_catalog(&Session) -> ToolCatalog                   │
//! │  - ToolDispatcher::invoke (tools/call)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  HttpTransport                                              │
//! │  - blocking POST per message                                │
//! │  - mcp-session-id header, event-stream body framing         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tether_mcp::{McpClient, McpServerConfig, ToolDispatcher};
//!
//! let client = McpClient::connect(McpServerConfig::new("http://localhost:8000/mcp/"))?;
//! let (session, catalog) = client.open()?;
//! for tool in catalog.iter() {
//!     println!("{} - {}", tool.name, tool.description);
//! }
//!
//! let dispatcher = ToolDispatcher::new(&client, &session);
//! let result = dispatcher.invoke("echo", &json!({"message": "hi"}))?;
//! ```

pub mod catalog;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use catalog::{InputSchema, ToolCatalog, ToolDescriptor};
pub use client::{McpClient, McpServerConfig};
pub use dispatcher::ToolDispatcher;
pub use error::{McpError, Result};
pub use protocol::{ClientInfo, MCP_PROTOCOL_VERSION, SESSION_HEADER, ServerInfo};
pub use session::{PendingSession, Session};
pub use transport::{HttpTransportConfig, strip_event_framing};

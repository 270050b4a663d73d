//! Agent core for Tether.
//!
//! This crate drives one user utterance from the first streamed completion
//! through any tool calls the model makes:
//!
//! - [`aggregator`]: rebuilds tool calls from streamed completion deltas and
//!   decides which text is shown
//! - [`tool`]: the [`ToolExecutor`] seam and catalog-to-schema conversion
//! - [`orchestrator`]: the per-utterance turn loop
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_agent::{AgentConfig, TurnOrchestrator};
//! use tether_llm::{OpenAiBackend, OpenAiConfig};
//! use tether_mcp::{McpClient, McpServerConfig, ToolDispatcher};
//!
//! let client = McpClient::connect(McpServerConfig::new("http://localhost:8000/mcp/"))?;
//! let (session, catalog) = client.open()?;
//! let backend = OpenAiBackend::new(OpenAiConfig::deepseek(api_key))?;
//!
//! let orchestrator = TurnOrchestrator::new(
//!     backend,
//!     ToolDispatcher::new(&client, &session),
//!     &catalog,
//!     AgentConfig::default(),
//! );
//! orchestrator.handle_utterance("What's the weather in Paris?", &mut std::io::stdout())?;
//! ```

pub mod aggregator;
pub mod error;
pub mod orchestrator;
pub mod tool;

pub use aggregator::{
    Aggregation, DeltaAggregator, FinalizedCall, PartialToolCall, ReconstructedToolCall,
    ToolArgumentError, TurnOutcome, aggregate,
};
pub use error::{AgentError, Result};
pub use orchestrator::{
    AgentConfig, CallOutcome, CallReport, DEFAULT_SYSTEM_PROMPT, TurnOrchestrator, TurnReport,
};
pub use tool::{ToolExecutor, tool_schema, tool_schemas};

//! Streaming chat-completion client for Tether.
//!
//! The core abstraction is the [`CompletionBackend`] trait: submit a
//! [`CompletionRequest`] and pull [`DeltaEvent`]s from the returned
//! [`DeltaStream`] as the provider produces them.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  CompletionBackend trait                │
//! │  - complete_stream() -> DeltaStream     │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!    ┌─────────────┐    ┌─────────────┐
//!    │OpenAiBackend│    │ MockBackend │
//!    │ (blocking)  │    │  (testing)  │
//!    └─────────────┘    └─────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod openai;
pub mod stream;
pub mod types;

pub use backend::CompletionBackend;
#[cfg(any(test, feature = "testing"))]
pub use backend::{MockBackend, MockResponse};
pub use error::{LlmError, Result};
pub use openai::{DEFAULT_DEEPSEEK_BASE, OpenAiBackend, OpenAiConfig};
pub use stream::{DeltaEvent, DeltaStream, FinishReason, SseDeltaReader, ToolCallFragment};
pub use types::{
    ChatMessage, CompletionRequest, ConversationTurn, FunctionCall, FunctionSchema, Role,
    ToolCallRequest, ToolChoice, ToolSchema,
};

//! Turn orchestrator: one user utterance, end to end.
//!
//! The [`TurnOrchestrator`] submits the utterance with the tool catalog
//! attached, streams visible text to the output while the [`Aggregation`]
//! rebuilds tool calls, then handles each call in first-observed order:
//! dispatch it (unless its arguments did not parse), and stream a follow-up
//! completion that shows the model that single call and its result.

use std::io::Write;

use serde_json::Value;

use tether_llm::{
    ChatMessage, CompletionBackend, CompletionRequest, ConversationTurn, ToolCallRequest,
    ToolChoice, ToolSchema,
};
use tether_mcp::{McpError, ToolCatalog};

use crate::aggregator::Aggregation;
use crate::error::Result;
use crate::tool::{ToolExecutor, tool_schemas};

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional technical support assistant. \
You can call tools when they help. Keep answers concise and professional.";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the turn orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Model name sent with every completion request.
    pub model: String,
    /// System prompt at the head of every turn.
    pub system_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
        }
    }
}

impl AgentConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The tool ran and returned this result.
    Completed(Value),
    /// The tool server rejected the call.
    ToolFailed(String),
    /// The arguments did not parse; the tool was not called.
    InvalidArguments(String),
}

/// Report for one tool call of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReport {
    pub id: String,
    pub name: String,
    pub outcome: CallOutcome,
    /// Text of the follow-up completion, as streamed to the output.
    pub follow_up: String,
}

/// Report for one utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    /// Text shown during the first completion.
    pub content: String,
    /// Text from the first completion that was not shown.
    pub suppressed_content: String,
    /// Tool calls in the order they were first observed.
    pub calls: Vec<CallReport>,
}

impl TurnReport {
    /// Number of calls whose tool returned a result.
    pub fn completed_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c.outcome, CallOutcome::Completed(_)))
            .count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

/// Drives one utterance through completion, tool calls and follow-ups.
pub struct TurnOrchestrator<B, E> {
    backend: B,
    executor: E,
    tools: Vec<ToolSchema>,
    config: AgentConfig,
}

impl<B, E> TurnOrchestrator<B, E>
where
    B: CompletionBackend,
    E: ToolExecutor,
{
    /// Create an orchestrator offering every tool in `catalog`.
    pub fn new(backend: B, executor: E, catalog: &ToolCatalog, config: AgentConfig) -> Self {
        Self {
            backend,
            executor,
            tools: tool_schemas(catalog),
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Tools offered on the first completion of every turn.
    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }

    /// Handle one utterance, streaming all visible text to `out`.
    ///
    /// Tool argument and tool invocation failures are reported to the model
    /// and recorded in the report. Any other error ends the utterance.
    pub fn handle_utterance(&self, utterance: &str, out: &mut dyn Write) -> Result<TurnReport> {
        let request = CompletionRequest::new(&self.config.model, self.base_turn(utterance))
            .with_tools(self.tools.clone())
            .with_tool_choice(ToolChoice::Auto)
            .with_temperature(self.config.temperature);

        tracing::info!(
            backend = %self.backend.name(),
            model = %self.config.model,
            tools = self.tools.len(),
            "starting turn"
        );

        let mut aggregation = Aggregation::new(self.backend.complete_stream(&request)?);
        for text in aggregation.by_ref() {
            write_chunk(out, &text?)?;
        }
        let outcome = aggregation.into_outcome()?;

        let mut report = TurnReport {
            content: outcome.content,
            suppressed_content: outcome.suppressed_content,
            calls: Vec::with_capacity(outcome.tool_calls.len()),
        };

        if outcome.tool_calls.is_empty() {
            tracing::debug!(finish_reason = ?outcome.finish_reason, "turn ended without tool calls");
            return Ok(report);
        }

        for (id, finalized) in outcome.tool_calls {
            let (call, tool_content, call_outcome) = match finalized {
                Ok(call) => match self.executor.execute(&call.name, &call.arguments) {
                    Ok(result) => {
                        tracing::info!(id = %id, tool = %call.name, "tool call completed");
                        let content = serde_json::to_string(&result)?;
                        (call.to_request(), content, CallOutcome::Completed(result))
                    }
                    Err(err @ McpError::ToolInvocation { .. }) => {
                        tracing::warn!(
                            id = %id,
                            tool = %call.name,
                            error = %err,
                            "tool call failed"
                        );
                        let message = err.to_string();
                        (
                            call.to_request(),
                            format!("Error: {}", message),
                            CallOutcome::ToolFailed(message),
                        )
                    }
                    Err(err) => {
                        tracing::error!(
                            id = %id,
                            tool = %call.name,
                            error = %err,
                            "tool call aborted the turn"
                        );
                        return Err(err.into());
                    }
                },
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "not dispatching tool call");
                    let message = err.to_string();
                    (
                        err.to_request(),
                        format!("Error: {}", message),
                        CallOutcome::InvalidArguments(message),
                    )
                }
            };

            let name = call.function.name.clone();
            let follow_up = self.follow_up(utterance, call, tool_content, out)?;
            report.calls.push(CallReport {
                id,
                name,
                outcome: call_outcome,
                follow_up,
            });
        }

        Ok(report)
    }

    /// The fixed head of every turn: system prompt, then the utterance.
    fn base_turn(&self, utterance: &str) -> ConversationTurn {
        ConversationTurn::new()
            .with(ChatMessage::system(&self.config.system_prompt))
            .with(ChatMessage::user(utterance))
    }

    /// Stream a completion that answers one tool call with its result.
    fn follow_up(
        &self,
        utterance: &str,
        call: ToolCallRequest,
        tool_content: String,
        out: &mut dyn Write,
    ) -> Result<String> {
        let tool_message =
            ChatMessage::tool_result(call.id.clone(), call.function.name.clone(), tool_content);
        let turn = self
            .base_turn(utterance)
            .with(ChatMessage::assistant_tool_call(call))
            .with(tool_message);
        let request = CompletionRequest::new(&self.config.model, turn)
            .with_temperature(self.config.temperature);

        let mut text = String::new();
        for event in self.backend.complete_stream(&request)? {
            let event = event?;
            if event.has_tool_calls() {
                tracing::debug!(
                    fragments = event.tool_calls.len(),
                    "ignoring tool-call fragments in follow-up"
                );
            }
            if let Some(chunk) = event.content.filter(|c| !c.is_empty()) {
                write_chunk(out, &chunk)?;
                text.push_str(&chunk);
            }
        }

        Ok(text)
    }
}

fn write_chunk(out: &mut dyn Write, chunk: &str) -> std::io::Result<()> {
    out.write_all(chunk.as_bytes())?;
    out.flush()
}

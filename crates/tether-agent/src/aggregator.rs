//! Delta aggregation: rebuilding tool calls from a fragmented completion.
//!
//! A streamed completion delivers plain text and tool calls in arbitrary
//! pieces. [`DeltaAggregator`] folds [`DeltaEvent`]s into per-call
//! accumulators keyed by the identifier first observed for each call. It also
//! decides which text may be shown and when the turn is complete.
//! [`Aggregation`] wraps it around a [`tether_llm::DeltaStream`] as a pull
//! iterator of displayable text.
//!
//! Rules, per event:
//!
//! 1. Any tool-call fragment marks tool calls active for the rest of the turn.
//!    From then on content is recorded but no longer shown.
//! 2. A fragment with a new non-empty identifier starts an accumulator and
//!    makes it current. A known identifier makes its accumulator current again
//!    and folds the other sub-fields into it. A fragment without an identifier
//!    is appended to the current accumulator, or dropped if there is none.
//! 3. Aggregation stops at a `tool_calls` finish reason once tool calls are
//!    active; otherwise it runs until the stream ends.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use tether_llm::{DeltaEvent, FinishReason, LlmError, ToolCallFragment, ToolCallRequest};

// ─────────────────────────────────────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────────────────────────────────────

/// A tool call still being streamed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialToolCall {
    /// Identifier the call was first observed under.
    pub id: String,
    /// Invocation type tag (normally `function`).
    pub call_type: String,
    /// Function name, as accumulated so far.
    pub name: String,
    /// Arguments text, as accumulated so far.
    pub arguments: String,
}

impl PartialToolCall {
    fn seeded(id: &str, fragment: &ToolCallFragment) -> Self {
        let mut call = Self {
            id: id.to_string(),
            ..Default::default()
        };
        call.append(fragment);
        call
    }

    /// Append the present type, name and arguments text of a fragment.
    ///
    /// Identifier text is never appended: a fragment reaching this point
    /// either carries the key of this call or an empty identifier.
    fn append(&mut self, fragment: &ToolCallFragment) {
        if let Some(call_type) = &fragment.call_type {
            self.call_type.push_str(call_type);
        }
        if let Some(name) = &fragment.name {
            self.name.push_str(name);
        }
        if let Some(arguments) = &fragment.arguments {
            self.arguments.push_str(arguments);
        }
    }

    /// Parse the accumulated arguments.
    ///
    /// Empty or whitespace-only arguments mean `{}`.
    pub fn finalize(self) -> Result<ReconstructedToolCall, ToolArgumentError> {
        let parsed = if self.arguments.trim().is_empty() {
            Ok(Value::Object(Map::new()))
        } else {
            serde_json::from_str::<Value>(&self.arguments).map_err(|e| e.to_string())
        };

        match parsed {
            Ok(arguments @ Value::Object(_)) => Ok(ReconstructedToolCall {
                id: self.id,
                call_type: self.call_type,
                name: self.name,
                arguments,
                raw_arguments: self.arguments,
            }),
            Ok(other) => Err(ToolArgumentError::new(
                format!("expected a JSON object, got {}", json_kind(&other)),
                self,
            )),
            Err(message) => Err(ToolArgumentError::new(message, self)),
        }
    }

    /// The call as echoed back to the model, with its raw arguments text.
    pub fn to_request(&self) -> ToolCallRequest {
        ToolCallRequest {
            id: self.id.clone(),
            call_type: type_or_function(&self.call_type),
            function: tether_llm::FunctionCall {
                name: self.name.clone(),
                arguments: self.arguments.clone(),
            },
        }
    }
}

/// A tool call whose arguments parsed successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedToolCall {
    pub id: String,
    pub call_type: String,
    pub name: String,
    /// Parsed arguments, always a JSON object.
    pub arguments: Value,
    raw_arguments: String,
}

impl ReconstructedToolCall {
    /// The arguments text exactly as streamed.
    pub fn raw_arguments(&self) -> &str {
        &self.raw_arguments
    }

    /// The call as echoed back to the model, with its raw arguments text.
    pub fn to_request(&self) -> ToolCallRequest {
        ToolCallRequest {
            id: self.id.clone(),
            call_type: type_or_function(&self.call_type),
            function: tether_llm::FunctionCall {
                name: self.name.clone(),
                arguments: self.raw_arguments.clone(),
            },
        }
    }
}

/// The arguments of one tool call could not be parsed.
///
/// Carries the raw call so it can still be reported to the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid arguments for tool call '{}' ({}): {message}", .call.id, .call.name)]
pub struct ToolArgumentError {
    /// Parser message.
    pub message: String,
    /// The call as accumulated.
    pub call: PartialToolCall,
}

impl ToolArgumentError {
    fn new(message: impl Into<String>, call: PartialToolCall) -> Self {
        Self {
            message: message.into(),
            call,
        }
    }

    /// Identifier of the failed call.
    pub fn id(&self) -> &str {
        &self.call.id
    }

    /// The call as echoed back to the model, with its raw arguments text.
    pub fn to_request(&self) -> ToolCallRequest {
        self.call.to_request()
    }
}

/// A finalized tool call: parsed, or the reason it could not be.
pub type FinalizedCall = Result<ReconstructedToolCall, ToolArgumentError>;

fn type_or_function(call_type: &str) -> String {
    if call_type.is_empty() {
        "function".to_string()
    } else {
        call_type.to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregator
// ─────────────────────────────────────────────────────────────────────────────

/// Which accumulator receives identifier-less fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AccumulatorState {
    AwaitingIdentifier,
    Accumulating { current: String },
}

/// Everything a turn produced once aggregation ends.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text that was shown, in order.
    pub content: String,
    /// Text that arrived after a tool call and was not shown.
    pub suppressed_content: String,
    /// Finalized calls in first-observed order, keyed by identifier.
    pub tool_calls: IndexMap<String, FinalizedCall>,
    /// Last finish reason seen.
    pub finish_reason: Option<FinishReason>,
}

impl TurnOutcome {
    /// Whether the model asked for any tool call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Incremental state machine over the deltas of one turn.
#[derive(Debug)]
pub struct DeltaAggregator {
    tool_calls_active: bool,
    state: AccumulatorState,
    partials: IndexMap<String, PartialToolCall>,
    visible: String,
    suppressed: String,
    finish_reason: Option<FinishReason>,
    complete: bool,
}

impl Default for DeltaAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaAggregator {
    pub fn new() -> Self {
        Self {
            tool_calls_active: false,
            state: AccumulatorState::AwaitingIdentifier,
            partials: IndexMap::new(),
            visible: String::new(),
            suppressed: String::new(),
            finish_reason: None,
            complete: false,
        }
    }

    /// Fold one event in. Returns the text to display, if any.
    pub fn push(&mut self, event: DeltaEvent) -> Option<String> {
        if !event.tool_calls.is_empty() {
            if !self.tool_calls_active {
                tracing::debug!("tool call started, suppressing content for this turn");
            }
            self.tool_calls_active = true;
            for fragment in &event.tool_calls {
                self.apply_fragment(fragment);
            }
        }

        let mut shown = None;
        if let Some(text) = event.content.filter(|t| !t.is_empty()) {
            if self.tool_calls_active {
                self.suppressed.push_str(&text);
            } else {
                self.visible.push_str(&text);
                shown = Some(text);
            }
        }

        if let Some(reason) = event.finish_reason {
            if reason == FinishReason::ToolCalls && self.tool_calls_active {
                self.complete = true;
            }
            self.finish_reason = Some(reason);
        }

        shown
    }

    fn apply_fragment(&mut self, fragment: &ToolCallFragment) {
        match fragment.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) if !self.partials.contains_key(id) => {
                tracing::trace!(id = %id, name = ?fragment.name, "new tool call");
                self.partials
                    .insert(id.to_string(), PartialToolCall::seeded(id, fragment));
                self.state = AccumulatorState::Accumulating {
                    current: id.to_string(),
                };
            }
            Some(id) => {
                if let Some(call) = self.partials.get_mut(id) {
                    call.append(fragment);
                }
                self.state = AccumulatorState::Accumulating {
                    current: id.to_string(),
                };
            }
            None => match &self.state {
                AccumulatorState::Accumulating { current } => {
                    if let Some(call) = self.partials.get_mut(current) {
                        call.append(fragment);
                    }
                }
                AccumulatorState::AwaitingIdentifier => {
                    tracing::warn!(
                        fragment = ?fragment,
                        "dropping tool-call fragment that arrived before any identifier"
                    );
                }
            },
        }
    }

    /// Whether the turn's tool calls are complete and no more events are needed.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether a tool-call fragment has been seen in this turn.
    pub fn tool_calls_active(&self) -> bool {
        self.tool_calls_active
    }

    /// Calls accumulated so far, in first-observed order.
    pub fn partial_calls(&self) -> impl Iterator<Item = &PartialToolCall> {
        self.partials.values()
    }

    /// Finalize every accumulated call and return the outcome.
    pub fn finish(self) -> TurnOutcome {
        if !self.suppressed.is_empty() {
            tracing::debug!(
                suppressed = %self.suppressed,
                "content after tool call was not shown"
            );
        }

        let tool_calls = self
            .partials
            .into_iter()
            .map(|(id, partial)| {
                let finalized = partial.finalize();
                if let Err(err) = &finalized {
                    tracing::warn!(error = %err, "tool call arguments did not parse");
                }
                (id, finalized)
            })
            .collect();

        TurnOutcome {
            content: self.visible,
            suppressed_content: self.suppressed,
            tool_calls,
            finish_reason: self.finish_reason,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pull iterator
// ─────────────────────────────────────────────────────────────────────────────

/// Drives a [`DeltaAggregator`] from an event source, yielding displayable
/// text as it arrives.
///
/// Stops pulling from the source once the aggregator reports completion. A
/// source error is yielded once and ends the iteration.
pub struct Aggregation<I> {
    source: I,
    aggregator: DeltaAggregator,
    done: bool,
}

impl<I> Aggregation<I>
where
    I: Iterator<Item = tether_llm::Result<DeltaEvent>>,
{
    pub fn new(source: I) -> Self {
        Self {
            source,
            aggregator: DeltaAggregator::new(),
            done: false,
        }
    }

    /// Consume whatever is left of the source and finalize the turn.
    pub fn into_outcome(mut self) -> tether_llm::Result<TurnOutcome> {
        for item in self.by_ref() {
            item?;
        }
        Ok(self.aggregator.finish())
    }
}

impl<I> Iterator for Aggregation<I>
where
    I: Iterator<Item = tether_llm::Result<DeltaEvent>>,
{
    type Item = Result<String, LlmError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let event = match self.source.next() {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };

            let shown = self.aggregator.push(event);
            if self.aggregator.is_complete() {
                self.done = true;
            }
            if shown.is_some() {
                return shown.map(Ok);
            }
        }
        None
    }
}

/// Aggregate an in-memory or streamed sequence of events.
pub fn aggregate<I>(events: I) -> Aggregation<I::IntoIter>
where
    I: IntoIterator<Item = tether_llm::Result<DeltaEvent>>,
{
    Aggregation::new(events.into_iter())
}

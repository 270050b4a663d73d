//! Streamed completion deltas and the SSE reader that produces them.
//!
//! A streamed completion is a synchronous pull iterator of [`DeltaEvent`]s.
//! [`SseDeltaReader`] decodes `data: <chunk>` lines from any [`BufRead`],
//! which is how the HTTP body is consumed and how tests feed canned streams.

use std::io::BufRead;

use serde::Deserialize;

use crate::error::{LlmError, Result};

/// A lazily pulled sequence of deltas for one completion.
pub type DeltaStream = Box<dyn Iterator<Item = Result<DeltaEvent>> + Send>;

// ─────────────────────────────────────────────────────────────────────────────
// Delta events
// ─────────────────────────────────────────────────────────────────────────────

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Decode a wire `finish_reason` value.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "tool_calls" => Self::ToolCalls,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One piece of a streamed tool call. Every sub-field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: Option<usize>,
    pub id: Option<String>,
    pub call_type: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl ToolCallFragment {
    /// A fragment with no sub-fields set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, call_type: impl Into<String>) -> Self {
        self.call_type = Some(call_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }
}

/// The delta of `choices[0]` in one streamed chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaEvent {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallFragment>,
    pub finish_reason: Option<FinishReason>,
}

impl DeltaEvent {
    /// A content-only delta.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Default::default()
        }
    }

    /// A delta carrying a single tool-call fragment.
    pub fn tool_call(fragment: ToolCallFragment) -> Self {
        Self {
            tool_calls: vec![fragment],
            ..Default::default()
        }
    }

    /// A delta carrying only a finish reason.
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }

    /// Whether this delta carries any tool-call fragment.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE reader
// ─────────────────────────────────────────────────────────────────────────────

/// Pull iterator over the `data:` lines of a chat-completion event stream.
///
/// Ends at `data: [DONE]` or at end of input. Chunks without choices are
/// skipped; an `error` chunk or an undecodable chunk ends the stream with an
/// error.
pub struct SseDeltaReader<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> SseDeltaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }

    fn fail(&mut self, err: LlmError) -> Option<Result<DeltaEvent>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<R: BufRead> Iterator for SseDeltaReader<R> {
    type Item = Result<DeltaEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    return self.fail(LlmError::Network(format!(
                        "failed to read response stream: {}",
                        e
                    )));
                }
            }

            let Some(data) = self.line.trim().strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();

            if data == "[DONE]" {
                self.done = true;
                return None;
            }

            let chunk = match serde_json::from_str::<StreamChunk>(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    let err = LlmError::stream(format!("malformed stream chunk: {}", e));
                    return self.fail(err);
                }
            };

            if let Some(error) = chunk.error {
                return self.fail(LlmError::stream(error.message));
            }

            match chunk.choices.into_iter().next() {
                Some(choice) => return Some(Ok(choice.into_event())),
                None => {
                    tracing::trace!("skipping stream chunk without choices");
                }
            }
        }
    }
}

// Wire shapes of a streamed chunk.

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl StreamChoice {
    fn into_event(self) -> DeltaEvent {
        let (content, tool_calls) = match self.delta {
            Some(delta) => (
                delta.content,
                delta
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(StreamToolCall::into_fragment)
                    .collect(),
            ),
            None => (None, Vec::new()),
        };

        DeltaEvent {
            content,
            tool_calls,
            finish_reason: self.finish_reason.as_deref().map(FinishReason::from_wire),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    call_type: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

impl StreamToolCall {
    fn into_fragment(self) -> ToolCallFragment {
        let (name, arguments) = match self.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        ToolCallFragment {
            index: self.index,
            id: self.id,
            call_type: self.call_type,
            name,
            arguments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(body: &str) -> Vec<Result<DeltaEvent>> {
        SseDeltaReader::new(body.as_bytes()).collect()
    }

    #[test]
    fn test_content_chunks_then_done() {
        let body = concat!(
            "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hel\"}}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"id\":\"c1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"after done\"}}]}\n\n",
        );

        let events: Vec<DeltaEvent> = read_all(body).into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].content.as_deref(), Some("Hel"));
        assert_eq!(events[1].content.as_deref(), Some("lo"));
        assert_eq!(events[2].finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_tool_call_fragments() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":null,\"tool_calls\":[{\"index\":0,\"id\":\"call_0\",\"type\":\"function\",\"function\":{\"name\":\"search\",\"arguments\":\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"q\\\":\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n",
        );

        let events: Vec<DeltaEvent> = read_all(body).into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].content, None);
        assert_eq!(
            events[0].tool_calls,
            vec![
                ToolCallFragment::new()
                    .with_index(0)
                    .with_id("call_0")
                    .with_type("function")
                    .with_name("search")
                    .with_arguments("")
            ]
        );
        assert_eq!(
            events[1].tool_calls,
            vec![ToolCallFragment::new().with_index(0).with_arguments("{\"q\":")]
        );
        assert_eq!(events[2].finish_reason, Some(FinishReason::ToolCalls));
    }

    #[test]
    fn test_chunks_without_choices_are_skipped() {
        let body = concat!(
            ": keep-alive\n",
            "data: {\"choices\":[]}\n",
            "data: {\"usage\":{\"prompt_tokens\":3}}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
        );
        let events = read_all(body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("x"));
    }

    #[test]
    fn test_end_of_input_without_done() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}";
        assert_eq!(read_all(body).len(), 1);
        assert!(read_all("").is_empty());
    }

    #[test]
    fn test_malformed_chunk_ends_stream_with_error() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
            "data: {not json\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n",
        );
        let events = read_all(body);
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(LlmError::Stream(_))));
    }

    #[test]
    fn test_error_chunk_is_stream_error() {
        let body = "data: {\"error\":{\"message\":\"context length exceeded\"}}\n";
        let events = read_all(body);
        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(LlmError::Stream(msg)) => assert!(msg.contains("context length")),
            other => panic!("expected stream error, got {:?}", other),
        }
    }

    #[test]
    fn test_data_prefix_without_space() {
        let body = "data:{\"choices\":[{\"delta\":{\"content\":\"tight\"}}]}\r\n";
        let events = read_all(body);
        assert_eq!(events[0].as_ref().unwrap().content.as_deref(), Some("tight"));
    }

    #[test]
    fn test_finish_reason_decoding() {
        assert_eq!(FinishReason::from_wire("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_wire("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::from_wire("length"), FinishReason::Length);
        assert_eq!(
            FinishReason::from_wire("insufficient_system_resource"),
            FinishReason::Other("insufficient_system_resource".to_string())
        );
    }
}

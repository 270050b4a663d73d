//! Completion backend trait and the scripted mock backend.

use crate::error::Result;
use crate::stream::DeltaStream;
use crate::types::CompletionRequest;

/// A provider of streamed chat completions.
///
/// Calls are blocking: the returned stream pulls from the response body as it
/// is iterated.
pub trait CompletionBackend {
    /// Submit a request and return its delta stream.
    ///
    /// Errors before the first byte of the body (connection, non-2xx status)
    /// are returned here; errors while streaming surface from the iterator.
    fn complete_stream(&self, request: &CompletionRequest) -> Result<DeltaStream>;

    /// Name of this backend, for logging.
    fn name(&self) -> &str;
}

impl<T: CompletionBackend + ?Sized> CompletionBackend for &T {
    fn complete_stream(&self, request: &CompletionRequest) -> Result<DeltaStream> {
        (**self).complete_stream(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: CompletionBackend + ?Sized> CompletionBackend for Box<T> {
    fn complete_stream(&self, request: &CompletionRequest) -> Result<DeltaStream> {
        (**self).complete_stream(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(any(test, feature = "testing"))]
pub use mock::{MockBackend, MockResponse};

#[cfg(any(test, feature = "testing"))]
mod mock {
    use parking_lot::Mutex;

    use super::CompletionBackend;
    use crate::error::{LlmError, Result};
    use crate::stream::{DeltaEvent, DeltaStream, FinishReason};
    use crate::types::CompletionRequest;

    /// One scripted reply of a [`MockBackend`].
    #[derive(Debug)]
    pub enum MockResponse {
        /// Stream these events, then end.
        Events(Vec<DeltaEvent>),
        /// Stream these events, then fail with a stream error.
        BrokenStream(Vec<DeltaEvent>, String),
        /// Fail the request before streaming.
        Error(LlmError),
    }

    impl MockResponse {
        /// Plain text split into the given chunks, finishing with `stop`.
        pub fn text(chunks: &[&str]) -> Self {
            let mut events: Vec<DeltaEvent> =
                chunks.iter().map(|c| DeltaEvent::content(*c)).collect();
            events.push(DeltaEvent::finish(FinishReason::Stop));
            Self::Events(events)
        }
    }

    /// A backend that replays scripted responses in order and records every
    /// request it receives.
    pub struct MockBackend {
        name: String,
        responses: Mutex<Vec<MockResponse>>,
        request_log: Mutex<Vec<CompletionRequest>>,
    }

    impl MockBackend {
        /// Create a mock backend with the given responses.
        ///
        /// If more requests are made than responses available, an error is
        /// returned.
        pub fn new(responses: Vec<MockResponse>) -> Self {
            Self {
                name: "mock".to_string(),
                responses: Mutex::new(responses),
                request_log: Mutex::new(Vec::new()),
            }
        }

        /// A mock backend with a single text response.
        pub fn with_text(text: impl Into<String>) -> Self {
            let text = text.into();
            Self::new(vec![MockResponse::text(&[text.as_str()])])
        }

        /// All requests made to this backend.
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.request_log.lock().clone()
        }

        /// The number of requests made.
        pub fn request_count(&self) -> usize {
            self.request_log.lock().len()
        }
    }

    impl CompletionBackend for MockBackend {
        fn complete_stream(&self, request: &CompletionRequest) -> Result<DeltaStream> {
            self.request_log.lock().push(request.clone());

            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Err(LlmError::backend(
                    "MockBackend: no more responses available",
                ));
            }

            match responses.remove(0) {
                MockResponse::Events(events) => {
                    Ok(Box::new(events.into_iter().map(Ok::<_, LlmError>)))
                }
                MockResponse::BrokenStream(events, message) => Ok(Box::new(
                    events
                        .into_iter()
                        .map(Ok::<_, LlmError>)
                        .chain(std::iter::once(Err(LlmError::stream(message)))),
                )),
                MockResponse::Error(err) => Err(err),
            }
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::stream::{DeltaEvent, FinishReason};
    use crate::types::{ChatMessage, ConversationTurn};

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new(
            "test-model",
            ConversationTurn::new().with(ChatMessage::user(text)),
        )
    }

    #[test]
    fn test_mock_backend_text() {
        let backend = MockBackend::with_text("Hello!");

        let events: Vec<DeltaEvent> = backend
            .complete_stream(&request("Hi"))
            .unwrap()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(events[0].content.as_deref(), Some("Hello!"));
        assert_eq!(events[1].finish_reason, Some(FinishReason::Stop));
        assert_eq!(backend.request_count(), 1);
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn test_mock_backend_multiple_responses() {
        let backend = MockBackend::new(vec![
            MockResponse::text(&["First"]),
            MockResponse::text(&["Sec", "ond"]),
        ]);

        let first: Vec<_> = backend.complete_stream(&request("1")).unwrap().collect();
        let second: Vec<_> = backend.complete_stream(&request("2")).unwrap().collect();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 3);
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages()[0].content.as_deref(), Some("2"));
    }

    #[test]
    fn test_mock_backend_exhausted() {
        let backend = MockBackend::new(vec![]);
        assert!(backend.complete_stream(&request("Hi")).is_err());
        assert_eq!(backend.request_count(), 1);
    }

    #[test]
    fn test_mock_backend_scripted_failures() {
        let backend = MockBackend::new(vec![
            MockResponse::Error(LlmError::from_status(401, "bad key")),
            MockResponse::BrokenStream(vec![DeltaEvent::content("par")], "reset".to_string()),
        ]);

        assert!(matches!(
            backend.complete_stream(&request("a")),
            Err(LlmError::Auth(_))
        ));

        let items: Vec<_> = backend.complete_stream(&request("b")).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(LlmError::Stream(_))));
    }

    #[test]
    fn test_backend_through_reference() {
        fn run(backend: impl CompletionBackend) -> usize {
            backend.complete_stream(&request("x")).unwrap().count()
        }
        let backend = MockBackend::with_text("ok");
        assert_eq!(run(&backend), 2);
    }
}

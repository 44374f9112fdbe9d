//! Mock backend for testing without a live provider.
//!
//! [`MockBackend`] returns pre-configured replies in order, allowing
//! downstream consumers to write deterministic tests against this crate.
//! Every request is recorded together with the (tokio) instant it arrived,
//! so tests can assert on call order and pacing.
//!
//! # Example
//!
//! ```
//! use brand_frames::backend::{MockBackend, MockReply};
//!
//! let mock = MockBackend::new(vec![
//!     MockReply::text(r#"{"industry": "Coffee"}"#),
//!     MockReply::rate_limited(),
//! ]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{Backend, GenerateRequest, GenerateResponse, Part, RESOURCE_EXHAUSTED};
use crate::error::Result;
use crate::image::ImagePayload;
use crate::PipelineError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with these parts.
    Parts(Vec<Part>),
    /// Fail with a provider error.
    Fail {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// Wait, then produce the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Parts(vec![Part::Text(text.into())])
    }

    pub fn json(value: &serde_json::Value) -> Self {
        MockReply::text(value.to_string())
    }

    pub fn image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        MockReply::Parts(vec![Part::Image(ImagePayload::new(mime_type, data))])
    }

    /// A successful response with no parts at all.
    pub fn empty() -> Self {
        MockReply::Parts(Vec::new())
    }

    /// HTTP 429 with the provider's `RESOURCE_EXHAUSTED` status.
    pub fn rate_limited() -> Self {
        MockReply::Fail {
            status: 429,
            code: Some(RESOURCE_EXHAUSTED.to_string()),
            message: "Resource has been exhausted (e.g. check quota).".to_string(),
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        MockReply::Fail {
            status: 500,
            code: Some("INTERNAL".to_string()),
            message: message.into(),
        }
    }

    /// Delay this reply by `latency`.
    pub fn after(self, latency: Duration) -> Self {
        MockReply::Delayed(latency, Box::new(self))
    }
}

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub request: GenerateRequest,
}

/// A test backend that returns scripted replies in order.
///
/// Cycles back to the beginning when all replies have been consumed.
#[derive(Debug)]
pub struct MockBackend {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBackend {
    /// Create a mock backend with the given scripted replies.
    ///
    /// Replies are returned in order. When exhausted, cycles from the beginning.
    pub fn new(replies: Vec<MockReply>) -> Self {
        assert!(!replies.is_empty(), "MockBackend requires at least one reply");
        Self {
            replies,
            index: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always gives the same reply.
    pub fn fixed(reply: MockReply) -> Self {
        Self::new(vec![reply])
    }

    /// Every request received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn next_reply(&self) -> MockReply {
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[idx].clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                at: Instant::now(),
                request: request.clone(),
            });
        }

        let mut reply = self.next_reply();
        loop {
            match reply {
                MockReply::Delayed(latency, inner) => {
                    tokio::time::sleep(latency).await;
                    reply = *inner;
                }
                MockReply::Parts(parts) => {
                    return Ok(GenerateResponse {
                        parts,
                        status: 200,
                        finish_reason: Some("STOP".to_string()),
                    })
                }
                MockReply::Fail {
                    status,
                    code,
                    message,
                } => return Err(PipelineError::Api {
                    status,
                    code,
                    message,
                }),
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::is_rate_limited;

    fn request() -> GenerateRequest {
        GenerateRequest::image("test", vec![Part::Text("draw".into())])
    }

    #[tokio::test]
    async fn test_mock_cycles_replies() {
        let mock = MockBackend::new(vec![MockReply::text("first"), MockReply::text("second")]);
        let r1 = mock.generate(&request()).await.unwrap();
        let r2 = mock.generate(&request()).await.unwrap();
        let r3 = mock.generate(&request()).await.unwrap();
        assert_eq!(r1.text(), "first");
        assert_eq!(r2.text(), "second");
        assert_eq!(r3.text(), "first"); // cycles
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_rate_limited() {
        let mock = MockBackend::fixed(MockReply::rate_limited());
        let err = mock.generate(&request()).await.unwrap_err();
        assert!(is_rate_limited(&err));
    }

    #[tokio::test]
    async fn test_mock_image() {
        let mock = MockBackend::fixed(MockReply::image("image/png", vec![9, 9]));
        let resp = mock.generate(&request()).await.unwrap();
        assert_eq!(resp.first_image().map(|i| i.data.clone()), Some(vec![9, 9]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_latency_and_recording() {
        let mock = MockBackend::fixed(MockReply::text("slow").after(Duration::from_secs(5)));
        let start = Instant::now();
        mock.generate(&request()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].request.prompt_text(), "draw");
    }
}

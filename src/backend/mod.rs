//! Backend trait, normalized request/response types, and the rate-limit
//! retry wrapper.
//!
//! The [`Backend`] trait abstracts over the generative-AI provider,
//! translating between normalized [`GenerateRequest`]/[`GenerateResponse`]
//! values and the provider's HTTP API. Built-in implementations:
//! [`GeminiBackend`] and the scripted [`MockBackend`].
//!
//! ## Architecture
//!
//! ```text
//! research / ideate / frame / edit
//!          │
//!          ▼
//!   GenerateRequest ──► with_backoff(Backend::generate) ──► GenerateResponse
//!                                  │
//!                       ┌──────────┴──────────┐
//!                  GeminiBackend          MockBackend
//!               :generateContent        scripted replies
//! ```

pub mod backoff;
pub mod gemini;
pub mod mock;

pub use backoff::BackoffConfig;
pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};

use crate::error::Result;
use crate::image::ImagePayload;
use crate::PipelineError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Provider status string that signals an exhausted quota.
pub const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Type alias for the callback invoked before each retry.
///
/// Arguments: `(retry_number, delay_before_retry, reason_for_retry)`.
/// `retry_number` is 1-indexed.
pub type RetryCallback<'a> = Option<&'a mut (dyn FnMut(u32, Duration, &str) + Send)>;

/// One piece of multimodal content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image(ImagePayload),
}

/// What the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// JSON text, constrained by `response_schema` when one is set.
    Json,
    /// Inline image data.
    Image,
}

/// A normalized generation request, provider-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Model identifier (e.g. `"gemini-2.5-flash"`).
    pub model: String,
    /// Ordered content parts of the single user turn.
    pub parts: Vec<Part>,
    pub output: OutputKind,
    /// Schema the JSON reply must follow.
    pub response_schema: Option<Value>,
    /// Let the model ground its answer with live web search.
    pub web_search: bool,
    /// Requested aspect ratio for image output (e.g. `"16:9"`).
    pub aspect_ratio: Option<String>,
}

impl GenerateRequest {
    /// A structured query whose reply must match `schema`.
    pub fn json(model: impl Into<String>, prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            model: model.into(),
            parts: vec![Part::Text(prompt.into())],
            output: OutputKind::Json,
            response_schema: Some(schema),
            web_search: false,
            aspect_ratio: None,
        }
    }

    /// An image-producing request over the given parts.
    pub fn image(model: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            model: model.into(),
            parts,
            output: OutputKind::Image,
            response_schema: None,
            web_search: false,
            aspect_ratio: None,
        }
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    /// Concatenated text parts (for logging and mock routing).
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A normalized generation response.
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    /// Parts of the first candidate, in order.
    pub parts: Vec<Part>,
    /// HTTP status code (for diagnostics/logging).
    pub status: u16,
    /// Provider finish reason, if reported.
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    /// All text parts joined together.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// The first inline image part, if any.
    pub fn first_image(&self) -> Option<&ImagePayload> {
        self.parts.iter().find_map(|p| match p {
            Part::Image(img) => Some(img),
            Part::Text(_) => None,
        })
    }

    /// Text the model produced, or `None` when it only sent images or nothing.
    pub fn text_detail(&self) -> Option<String> {
        let text = self.text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.finish_reason
                .as_ref()
                .map(|r| format!("finish reason {}", r))
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Abstraction over generative-AI providers.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute one generation call.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Whether `error` is the provider telling us to slow down.
///
/// True for HTTP 429, for the provider's `RESOURCE_EXHAUSTED` status, and
/// for any error whose message mentions either token.
pub fn is_rate_limited(error: &PipelineError) -> bool {
    if let PipelineError::Api { status, code, .. } = error {
        if *status == 429 || code.as_deref() == Some(RESOURCE_EXHAUSTED) {
            return true;
        }
    }
    let message = error.to_string();
    message.contains("429") || message.contains(RESOURCE_EXHAUSTED)
}

/// Run `operation`, retrying with exponential backoff while it is rate limited.
///
/// Before retry `n` (0-indexed) the wrapper sleeps
/// [`BackoffConfig::delay_for_attempt(n)`](BackoffConfig::delay_for_attempt).
/// Any error that is not a rate limit, and the last rate-limit error once
/// `config.max_retries` retries are spent, is returned unchanged.
///
/// # Arguments
///
/// * `config`: Backoff configuration
/// * `operation`: Produces a fresh future for every attempt
/// * `on_retry`: Optional callback invoked before each retry with (retry, delay, reason)
pub async fn with_backoff<T, F, Fut>(
    config: &BackoffConfig,
    mut operation: F,
    mut on_retry: RetryCallback<'_>,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries && is_rate_limited(&e) => {
                let delay = config.delay_for_attempt(attempt);
                if let Some(ref mut cb) = on_retry {
                    cb(attempt + 1, delay, &e.to_string());
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

//! Execution context shared by every remote call site.
//!
//! [`ExecCtx`] carries the backend, rate-limit backoff, model names, pacing
//! delay and optional event handler. It is constructed once at startup and
//! shared (behind an `Arc`) by the researcher, ideator, frame generator,
//! editor and orchestrator.

use crate::backend::{
    self, Backend, BackoffConfig, GeminiBackend, GenerateRequest, GenerateResponse,
};
use crate::config::{Settings, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::error::Result;
use crate::events::{emit, Event, EventHandler};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Default wait between consecutive frame generations.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(2);

/// Shared execution context for remote calls.
///
/// # Example
///
/// ```
/// use brand_frames::{ExecCtx, MockBackend, MockReply};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let ctx = ExecCtx::builder(Arc::new(MockBackend::fixed(MockReply::text("{}"))))
///     .pacing_delay(Duration::from_millis(10))
///     .build();
/// assert_eq!(ctx.backoff.max_retries, 3);
/// ```
pub struct ExecCtx {
    /// Provider backend.
    pub backend: Arc<dyn Backend>,
    /// Rate-limit retry configuration. Default: [`BackoffConfig::standard()`].
    pub backoff: BackoffConfig,
    /// Model for research and ideation.
    pub text_model: String,
    /// Model for frame synthesis and edits.
    pub image_model: String,
    /// Ground research with live web search.
    pub web_search: bool,
    /// Wait between consecutive frame generations. Default: 2 seconds.
    pub pacing_delay: Duration,
    /// Treat an all-empty brand profile or an empty idea list as a fatal
    /// stage failure. Default: `true`.
    pub strict_profiles: bool,
    /// Optional event handler for lifecycle events.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtx {
    /// Create a new builder around a backend.
    pub fn builder(backend: Arc<dyn Backend>) -> ExecCtxBuilder {
        ExecCtxBuilder {
            backend,
            backoff: None,
            text_model: None,
            image_model: None,
            web_search: false,
            pacing_delay: None,
            strict_profiles: true,
            event_handler: None,
        }
    }

    /// Wire a [`GeminiBackend`] from loaded [`Settings`].
    pub fn from_settings(settings: &Settings) -> Result<ExecCtxBuilder> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        let backend = GeminiBackend::new(settings.api_key.clone())
            .with_base_url(settings.base_url.clone())
            .with_client(client);
        Ok(Self::builder(Arc::new(backend))
            .backoff(BackoffConfig::standard().with_max_retries(settings.max_retries))
            .text_model(settings.text_model.clone())
            .image_model(settings.image_model.clone())
            .web_search(settings.web_search))
    }

    /// Issue one remote call through the rate-limit wrapper.
    ///
    /// `operation` names the call site in logs and [`Event::TransportRetry`].
    pub async fn call(
        &self,
        operation: &'static str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse> {
        let event_handler = self.event_handler.clone();
        let mut on_retry = |attempt: u32, delay: Duration, reason: &str| {
            tracing::warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason,
                "rate limited, backing off"
            );
            emit(
                &event_handler,
                Event::TransportRetry {
                    operation,
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    reason: reason.to_string(),
                },
            );
        };

        tracing::debug!(
            operation,
            backend = self.backend.name(),
            model = %request.model,
            "remote call"
        );
        backend::with_backoff(
            &self.backoff,
            || self.backend.generate(request),
            Some(&mut on_retry),
        )
        .await
    }

    pub(crate) fn emit(&self, event: Event) {
        emit(&self.event_handler, event);
    }
}

impl std::fmt::Debug for ExecCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCtx")
            .field("backend", &self.backend.name())
            .field("backoff", &self.backoff)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("web_search", &self.web_search)
            .field("pacing_delay", &self.pacing_delay)
            .field("strict_profiles", &self.strict_profiles)
            .field("has_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

/// Builder for [`ExecCtx`].
pub struct ExecCtxBuilder {
    backend: Arc<dyn Backend>,
    backoff: Option<BackoffConfig>,
    text_model: Option<String>,
    image_model: Option<String>,
    web_search: bool,
    pacing_delay: Option<Duration>,
    strict_profiles: bool,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ExecCtxBuilder {
    /// Replace the backend.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = backend;
        self
    }

    /// Set the rate-limit retry configuration. Default: [`BackoffConfig::standard()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    pub fn web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    /// Set the wait between frame generations. Default: 2 seconds.
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = Some(delay);
        self
    }

    /// Accept empty research/ideation results instead of failing the run.
    pub fn lenient_profiles(mut self) -> Self {
        self.strict_profiles = false;
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Build the execution context.
    pub fn build(self) -> ExecCtx {
        ExecCtx {
            backend: self.backend,
            backoff: self.backoff.unwrap_or_default(),
            text_model: self
                .text_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: self
                .image_model
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            web_search: self.web_search,
            pacing_delay: self.pacing_delay.unwrap_or(DEFAULT_PACING_DELAY),
            strict_profiles: self.strict_profiles,
            event_handler: self.event_handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockReply, Part};
    use crate::events::FnEventHandler;
    use std::sync::Mutex;

    #[test]
    fn test_builder_defaults() {
        let ctx = ExecCtx::builder(Arc::new(MockBackend::fixed(MockReply::empty()))).build();
        assert_eq!(ctx.backoff.max_retries, 3);
        assert_eq!(ctx.pacing_delay, DEFAULT_PACING_DELAY);
        assert_eq!(ctx.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(ctx.image_model, DEFAULT_IMAGE_MODEL);
        assert!(ctx.strict_profiles);
        assert!(!ctx.web_search);
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::new("k");
        settings.max_retries = 1;
        settings.web_search = true;
        let ctx = ExecCtx::from_settings(&settings).unwrap().build();
        assert_eq!(ctx.backend.name(), "gemini");
        assert_eq!(ctx.backoff.max_retries, 1);
        assert!(ctx.web_search);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_emits_transport_retry() {
        let mock = Arc::new(MockBackend::new(vec![
            MockReply::rate_limited(),
            MockReply::text("ok"),
        ]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ctx = ExecCtx::builder(mock.clone())
            .event_handler(Arc::new(FnEventHandler(move |event: Event| {
                if let Event::TransportRetry { operation, attempt, .. } = event {
                    sink.lock().unwrap().push((operation, attempt));
                }
            })))
            .build();

        let request = GenerateRequest::image("m", vec![Part::Text("x".into())]);
        let resp = ctx.call("frame", &request).await.unwrap();
        assert_eq!(resp.text(), "ok");
        assert_eq!(mock.call_count(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![("frame", 1)]);
    }
}

//! Event system for run lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe the pipeline. The
//! orchestrator emits events as stages start, concepts finish, retries happen
//! and edits complete. Implement [`EventHandler`] to drive progress UIs or
//! custom logging; for plain state, prefer [`Studio::subscribe`](crate::Studio::subscribe).

use crate::types::RunState;
use std::sync::Arc;

/// Events emitted during a run or an edit.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new run was accepted.
    RunStarted { run_id: u64, company_name: String },
    /// The run moved to a new in-progress state.
    StageStarted { run_id: u64, state: RunState },
    /// Frame generation for one concept is starting.
    ConceptStarted {
        run_id: u64,
        index: usize,
        title: String,
    },
    /// One concept attempt ended.
    ConceptFinished {
        run_id: u64,
        index: usize,
        ok: bool,
    },
    /// A rate-limited call is about to be retried.
    TransportRetry {
        /// Operation name (`"research"`, `"ideate"`, `"frame"`, `"edit"`).
        operation: &'static str,
        /// The retry number (1-indexed).
        attempt: u32,
        /// Delay before this retry in milliseconds.
        delay_ms: u64,
        /// Why the call is being retried.
        reason: String,
    },
    /// All concepts have been attempted.
    RunFinished { run_id: u64, frames: usize },
    /// Research or ideation failed.
    RunFailed { run_id: u64, message: String },
    /// An edit ended.
    EditFinished { index: usize, ok: bool },
}

/// Handler for pipeline events.
///
/// This is entirely optional; the pipeline works without an event handler.
///
/// # Example
///
/// ```
/// use brand_frames::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::ConceptFinished { index, ok, .. } => println!("concept {} ok={}", index, ok),
///             Event::RunFailed { message, .. } => println!("failed: {}", message),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when the pipeline emits an event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use brand_frames::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::TransportRetry { attempt, delay_ms, .. } = event {
///         eprintln!("retry {} in {}ms", attempt, delay_ms);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_without_handler_is_noop() {
        emit(&None, Event::EditFinished { index: 0, ok: true });
    }

    #[test]
    fn test_fn_handler_receives_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: Option<Arc<dyn EventHandler>> = Some(Arc::new(FnEventHandler(
            move |event: Event| {
                if let Event::ConceptFinished { index, .. } = event {
                    sink.lock().unwrap().push(index);
                }
            },
        )));

        emit(&handler, Event::ConceptFinished { run_id: 1, index: 2, ok: false });
        emit(&handler, Event::RunFinished { run_id: 1, frames: 0 });
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }
}

//! # Brand Frames
//!
//! Research a company's brand, propose layout concepts, and render branded
//! event-photo frames with a generative image API. A finished frame can then
//! be edited with a plain-language instruction.
//!
//! One run is strictly sequential: research, then ideation, then one frame
//! per concept with a fixed pacing delay between frames. Every remote call
//! goes through a single rate-limit backoff wrapper.
//!
//! ## Core Concepts
//!
//! - **[`ExecCtx`]**: shared execution context (backend, backoff, models,
//!   pacing delay, optional event handler).
//! - **[`Backend`](backend::Backend)**: provider abstraction with
//!   [`GeminiBackend`] for the real API and [`MockBackend`] for tests.
//! - **[`Pipeline`]**: drives one run and reports every transition as a
//!   [`StateUpdate`].
//! - **[`PipelineState`]**: the owned state of the active run, changed only
//!   by applying updates.
//! - **[`Studio`]**: the handle a UI talks to. It owns the state on a single
//!   task and exposes start-run, snapshot, subscribe and edit.
//!
//! ## Failure tiers
//!
//! | Where | Error | Effect |
//! |---|---|---|
//! | Any call | rate limited | retried with exponential backoff |
//! | Research / ideation | [`PipelineError::StageFatal`] | run ends in `Error` |
//! | One frame | [`PipelineError::ConceptFailure`] | logged, batch continues |
//! | Edit | [`PipelineError::EditFailure`] | reported, frame unchanged |
//!
//! ## Quick Start
//!
//! ```no_run
//! use brand_frames::{ExecCtx, RunRequest, Settings, Studio};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let studio = Studio::new(ExecCtx::from_settings(&settings)?.build());
//!
//!     let run_id = studio
//!         .start_run(RunRequest::new("Acme Coffee").with_event_title("Roastery Open Day"))
//!         .await?;
//!     let snapshot = studio.wait_for_run(run_id).await?;
//!     for frame in &snapshot.frames {
//!         println!("{} -> {} bytes", frame.title, frame.image.data.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod edit;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod frame;
pub mod ideation;
pub mod image;
pub mod parsing;
pub mod pipeline;
pub mod prompt;
pub mod research;
pub mod state;
pub mod studio;
pub mod types;

pub use backend::{BackoffConfig, GeminiBackend, MockBackend, MockReply};
pub use config::Settings;
pub use error::{PipelineError, Result, StateRejection};
pub use events::{Event, EventHandler, FnEventHandler};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use image::ImagePayload;
pub use pipeline::Pipeline;
pub use state::{PipelineState, StateUpdate};
pub use studio::Studio;
pub use types::{
    BrandProfile, EditRequest, GeneratedFrame, LayoutIdea, PhotoSize, RunRequest, RunState,
    Snapshot, Stage,
};

//! The presentation-facing handle.
//!
//! A [`Studio`] owns one background task that holds the [`PipelineState`].
//! Runs and edits never touch that state directly; they send
//! [`StateUpdate`]s over a channel, and the owner applies them one at a time
//! and publishes a fresh [`Snapshot`] after each accepted update.
//!
//! ```text
//! start_run ─► Started (acked) ─► spawn Pipeline::execute ─┐
//! edit ──────► EditStarted (acked) ─► edit_image ──┐        │ StateUpdate
//!                                                  ▼        ▼
//!                                         state owner task (PipelineState)
//!                                                  │
//!                                      watch::Sender<Snapshot> ─► subscribe()
//! ```

use crate::edit;
use crate::error::{PipelineError, Result, StateRejection};
use crate::events::Event;
use crate::exec_ctx::ExecCtx;
use crate::pipeline::Pipeline;
use crate::state::{PipelineState, StateUpdate};
use crate::types::{RunRequest, Snapshot};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};

type Ack = oneshot::Sender<std::result::Result<(), StateRejection>>;

struct Command {
    update: StateUpdate,
    ack: Option<Ack>,
}

/// Handle to the single-run pipeline.
///
/// Must be created inside a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use brand_frames::{ExecCtx, RunRequest, Settings, Studio};
///
/// # async fn demo() -> brand_frames::Result<()> {
/// let ctx = ExecCtx::from_settings(&Settings::from_env()?)?.build();
/// let studio = Studio::new(ctx);
/// let run_id = studio.start_run(RunRequest::new("Acme Coffee")).await?;
/// let snapshot = studio.wait_for_run(run_id).await?;
/// if let Some(frame) = snapshot.frames.first() {
///     studio.edit(frame.index, "make the border gold").await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Studio {
    ctx: Arc<ExecCtx>,
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    next_run_id: AtomicU64,
    /// Cancellation flag of the active run; held while a run is being started.
    active: Mutex<Option<Arc<AtomicBool>>>,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("ctx", &self.ctx)
            .field("snapshot", &*self.snapshots.borrow())
            .finish()
    }
}

impl Studio {
    /// Spawn the state owner and return a handle to it.
    pub fn new(ctx: impl Into<Arc<ExecCtx>>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(Snapshot::default());
        tokio::spawn(own_state(rx, publisher));
        Self {
            ctx: ctx.into(),
            commands,
            snapshots,
            next_run_id: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Start a new run, replacing any run in progress.
    ///
    /// When this returns, the state is already `Researching` with every
    /// previous result cleared. The run itself continues in the background;
    /// the superseded run, if any, stops issuing calls and its late results
    /// are dropped.
    pub async fn start_run(&self, request: RunRequest) -> Result<u64> {
        let request = request.validated()?;

        let mut active = self.active.lock().await;
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = Arc::new(AtomicBool::new(false));
        if let Some(previous) = active.replace(cancel.clone()) {
            previous.store(true, Ordering::Relaxed);
        }

        self.apply(StateUpdate::Started {
            run_id,
            request: request.clone(),
        })
        .await
        .map_err(|rejection| PipelineError::Other(format!("could not start run: {}", rejection)))?;
        drop(active);

        tracing::info!(
            run_id,
            company = %request.company_name,
            photo_size = %request.photo_size,
            "run started"
        );

        let pipeline = Pipeline::new(self.ctx.clone()).with_cancellation(cancel);
        let commands = self.commands.clone();
        let run = tokio::spawn(async move {
            let outcome = pipeline
                .execute(run_id, &request, |update| {
                    let _ = commands.send(Command { update, ack: None });
                })
                .await;
            match outcome {
                Ok(frames) => tracing::debug!(run_id, frames, "run task finished"),
                Err(PipelineError::Cancelled) => tracing::info!(run_id, "run superseded"),
                Err(e) => tracing::debug!(run_id, error = %e, "run task ended with error"),
            }
        });

        // A run task that dies without reporting must not leave the state
        // in progress forever.
        let commands = self.commands.clone();
        tokio::spawn(async move {
            if let Err(join_err) = run.await {
                if join_err.is_panic() {
                    tracing::error!(run_id, "run task panicked");
                    let _ = commands.send(Command {
                        update: StateUpdate::RunFailed {
                            run_id,
                            message: "internal error: run task panicked".to_string(),
                        },
                        ack: None,
                    });
                }
            }
        });

        Ok(run_id)
    }

    /// The current state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Wait until run `run_id` is finished or has been replaced.
    pub async fn wait_for_run(&self, run_id: u64) -> Result<Snapshot> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(|s| s.run_id != run_id || s.state.is_terminal())
            .await
            .map_err(|_| PipelineError::Other(StateRejection::Closed.to_string()))?;
        Ok((*snapshot).clone())
    }

    /// Edit the frame at concept `index` of the finished run.
    ///
    /// Only one edit may be in flight; a second one is refused with
    /// [`PipelineError::EditRejected`] before any remote call. A remote
    /// failure, or a new run starting meanwhile, yields
    /// [`PipelineError::EditFailure`] and leaves every stored frame as it was.
    pub async fn edit(&self, index: usize, instruction: &str) -> Result<()> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(PipelineError::InvalidInput(
                "edit instruction must not be empty".to_string(),
            ));
        }

        let run_id = self.snapshot().run_id;
        self.apply(StateUpdate::EditStarted {
            run_id,
            index,
            instruction: instruction.to_string(),
        })
        .await?;

        let current = self.snapshot();
        let original = (current.run_id == run_id)
            .then(|| current.frame(index))
            .flatten()
            .map(|f| f.image.clone());
        let Some(original) = original else {
            return Err(self
                .edit_failed(run_id, index, "the frame is no longer available".to_string())
                .await);
        };

        tracing::info!(run_id, index, instruction, "editing frame");
        let edited = match edit::edit_image(&self.ctx, &original, instruction).await {
            Ok(image) => image,
            Err(e) => return Err(self.edit_failed(run_id, index, e.to_string()).await),
        };

        if let Err(rejection) = self
            .apply(StateUpdate::EditComplete {
                run_id,
                index,
                image: edited,
            })
            .await
        {
            tracing::warn!(run_id, index, %rejection, "edit result discarded");
            self.ctx.emit(Event::EditFinished { index, ok: false });
            return Err(PipelineError::EditFailure {
                index,
                message: format!("result discarded: {}", rejection),
            });
        }

        self.ctx.emit(Event::EditFinished { index, ok: true });
        tracing::info!(run_id, index, "frame edited");
        Ok(())
    }

    async fn edit_failed(&self, run_id: u64, index: usize, message: String) -> PipelineError {
        tracing::warn!(run_id, index, error = %message, "edit failed");
        if let Err(rejection) = self.apply(StateUpdate::EditFailed { run_id, index }).await {
            tracing::debug!(%rejection, "edit failure not recorded");
        }
        self.ctx.emit(Event::EditFinished { index, ok: false });
        PipelineError::EditFailure { index, message }
    }

    async fn apply(&self, update: StateUpdate) -> std::result::Result<(), StateRejection> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command {
                update,
                ack: Some(ack),
            })
            .map_err(|_| StateRejection::Closed)?;
        done.await.map_err(|_| StateRejection::Closed)?
    }
}

/// The single writer of [`PipelineState`].
async fn own_state(
    mut commands: mpsc::UnboundedReceiver<Command>,
    publisher: watch::Sender<Snapshot>,
) {
    let mut state = PipelineState::new();
    while let Some(Command { update, ack }) = commands.recv().await {
        let name = update.name();
        let result = state.apply(update);
        match result {
            Ok(()) => {
                publisher.send_replace(state.snapshot());
            }
            Err(ref rejection) => tracing::debug!(update = name, %rejection, "update refused"),
        }
        if let Some(ack) = ack {
            let _ = ack.send(result);
        }
    }
}

use crate::{
    error::Result,
    events::Event,
    exec_ctx::ExecCtx,
    frame, ideation, research,
    state::{PipelineState, StateUpdate},
    types::{RunRequest, RunState, Snapshot, Stage},
    PipelineError,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Sequential executor for one run: research, ideation, then one frame per
/// concept with a pacing delay in between.
///
/// The pipeline never holds state of its own. Every result leaves as a
/// [`StateUpdate`] through the caller's callback, so a single owner decides
/// what becomes visible.
pub struct Pipeline {
    ctx: Arc<ExecCtx>,
    cancellation: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ctx", &self.ctx)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(ctx: Arc<ExecCtx>) -> Self {
        Self {
            ctx,
            cancellation: None,
        }
    }

    /// Stop issuing remote calls once `cancel` is set.
    ///
    /// A call already in flight runs to completion; its result is discarded.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(cancel);
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(ref cancel) = self.cancellation {
            if cancel.load(Ordering::Relaxed) {
                return Err(PipelineError::Cancelled);
            }
        }
        Ok(())
    }

    /// Run a whole request against a private [`PipelineState`] and return the
    /// final snapshot.
    ///
    /// A research or ideation failure is not an `Err` here: the snapshot is in
    /// [`RunState::Error`] with the message set. Only invalid input fails.
    pub async fn run(&self, request: RunRequest) -> Result<Snapshot> {
        let request = request.validated()?;
        let mut state = PipelineState::new();
        let run_id = 1;
        state.apply(StateUpdate::Started {
            run_id,
            request: request.clone(),
        })?;

        let outcome = self
            .execute(run_id, &request, |update| {
                if let Err(rejection) = state.apply(update) {
                    tracing::debug!(%rejection, "update refused");
                }
            })
            .await;
        match outcome {
            Ok(_) | Err(PipelineError::StageFatal { .. }) => Ok(state.snapshot()),
            Err(e) => Err(e),
        }
    }

    /// Drive run `run_id` from `Researching` to a terminal state.
    ///
    /// The caller must already have applied [`StateUpdate::Started`].
    /// `on_update` receives every following transition in order. Returns the
    /// number of frames produced, or the [`PipelineError::StageFatal`] that
    /// ended the run (after `RunFailed` was sent).
    pub async fn execute<F>(
        &self,
        run_id: u64,
        request: &RunRequest,
        mut on_update: F,
    ) -> Result<usize>
    where
        F: FnMut(StateUpdate),
    {
        let ctx = &self.ctx;
        ctx.emit(Event::RunStarted {
            run_id,
            company_name: request.company_name.clone(),
        });

        // Research
        self.check_cancelled()?;
        self.stage_started(run_id, RunState::Researching);
        let profile = match research::research_brand(ctx, &request.company_name).await {
            Ok(profile) => profile,
            Err(e) => return Err(self.fail(run_id, Stage::Research, e, &mut on_update)),
        };
        self.check_cancelled()?;
        on_update(StateUpdate::ResearchComplete {
            run_id,
            profile: profile.clone(),
        });

        // Ideation
        self.stage_started(run_id, RunState::Ideating);
        let ideas = match ideation::ideate(ctx, &profile).await {
            Ok(ideas) => ideas,
            Err(e) => return Err(self.fail(run_id, Stage::Ideation, e, &mut on_update)),
        };
        self.check_cancelled()?;
        on_update(StateUpdate::IdeationComplete {
            run_id,
            ideas: ideas.clone(),
        });

        // Generation, one concept at a time
        self.stage_started(run_id, RunState::Generating);
        let total = ideas.len();
        let mut produced = 0;
        for (index, idea) in ideas.iter().enumerate() {
            self.check_cancelled()?;
            ctx.emit(Event::ConceptStarted {
                run_id,
                index,
                title: idea.title.clone(),
            });
            tracing::info!(run_id, index, total, title = %idea.title, "generating frame");

            let result = frame::generate_frame(ctx, index, idea, &profile, request)
                .await
                .map_err(|e| PipelineError::ConceptFailure {
                    index,
                    message: e.to_string(),
                });
            self.check_cancelled()?;

            let ok = result.is_ok();
            let result = match result {
                Ok(frame) => {
                    produced += 1;
                    Ok(frame)
                }
                Err(failure) => {
                    tracing::warn!(run_id, index, error = %failure, "concept failed, continuing");
                    Err(failure.to_string())
                }
            };
            on_update(StateUpdate::ConceptComplete {
                run_id,
                index,
                result,
            });
            ctx.emit(Event::ConceptFinished { run_id, index, ok });

            if index + 1 < total {
                tokio::time::sleep(ctx.pacing_delay).await;
            }
        }

        on_update(StateUpdate::RunComplete { run_id });
        ctx.emit(Event::RunFinished {
            run_id,
            frames: produced,
        });
        tracing::info!(run_id, frames = produced, concepts = total, "run complete");
        Ok(produced)
    }

    fn stage_started(&self, run_id: u64, state: RunState) {
        tracing::info!(run_id, stage = %state, "stage started");
        self.ctx.emit(Event::StageStarted { run_id, state });
    }

    /// Classify a research or ideation error as fatal and report it.
    fn fail<F>(
        &self,
        run_id: u64,
        stage: Stage,
        err: PipelineError,
        on_update: &mut F,
    ) -> PipelineError
    where
        F: FnMut(StateUpdate),
    {
        let fatal = match err {
            e @ PipelineError::StageFatal { .. } => e,
            e @ PipelineError::Cancelled => return e,
            other => PipelineError::StageFatal {
                stage,
                message: other.to_string(),
            },
        };
        if self.check_cancelled().is_err() {
            return PipelineError::Cancelled;
        }
        let message = fatal.to_string();
        tracing::error!(run_id, error = %message, "run failed");
        on_update(StateUpdate::RunFailed {
            run_id,
            message: message.clone(),
        });
        self.ctx.emit(Event::RunFailed { run_id, message });
        fatal
    }
}

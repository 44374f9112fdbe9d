//! Owned pipeline state and its transitions.
//!
//! [`PipelineState`] is mutated only through [`PipelineState::apply`], one
//! [`StateUpdate`] at a time. Every update carries the id of the run that
//! produced it; updates from a replaced run are refused with
//! [`StateRejection::StaleRun`] so late results never leak into the display.

use crate::error::StateRejection;
use crate::image::ImagePayload;
use crate::types::{
    BrandProfile, EditRequest, GeneratedFrame, LayoutIdea, RunRequest, RunState, Snapshot,
};

/// One transition of the pipeline state.
#[derive(Debug, Clone)]
pub enum StateUpdate {
    /// A new run begins. Clears every result of the previous run.
    Started { run_id: u64, request: RunRequest },
    ResearchComplete { run_id: u64, profile: BrandProfile },
    IdeationComplete { run_id: u64, ideas: Vec<LayoutIdea> },
    /// One concept was attempted; `result` holds the frame or the failure message.
    ConceptComplete {
        run_id: u64,
        index: usize,
        result: std::result::Result<GeneratedFrame, String>,
    },
    /// Every concept has been attempted.
    RunComplete { run_id: u64 },
    /// Research or ideation failed, or the run task died.
    RunFailed { run_id: u64, message: String },
    EditStarted {
        run_id: u64,
        index: usize,
        instruction: String,
    },
    EditComplete {
        run_id: u64,
        index: usize,
        image: ImagePayload,
    },
    EditFailed { run_id: u64, index: usize },
}

impl StateUpdate {
    pub fn run_id(&self) -> u64 {
        match self {
            StateUpdate::Started { run_id, .. }
            | StateUpdate::ResearchComplete { run_id, .. }
            | StateUpdate::IdeationComplete { run_id, .. }
            | StateUpdate::ConceptComplete { run_id, .. }
            | StateUpdate::RunComplete { run_id }
            | StateUpdate::RunFailed { run_id, .. }
            | StateUpdate::EditStarted { run_id, .. }
            | StateUpdate::EditComplete { run_id, .. }
            | StateUpdate::EditFailed { run_id, .. } => *run_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StateUpdate::Started { .. } => "Started",
            StateUpdate::ResearchComplete { .. } => "ResearchComplete",
            StateUpdate::IdeationComplete { .. } => "IdeationComplete",
            StateUpdate::ConceptComplete { .. } => "ConceptComplete",
            StateUpdate::RunComplete { .. } => "RunComplete",
            StateUpdate::RunFailed { .. } => "RunFailed",
            StateUpdate::EditStarted { .. } => "EditStarted",
            StateUpdate::EditComplete { .. } => "EditComplete",
            StateUpdate::EditFailed { .. } => "EditFailed",
        }
    }
}

/// State of the single active run.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    run_id: u64,
    state: RunState,
    request: Option<RunRequest>,
    profile: Option<BrandProfile>,
    ideas: Vec<LayoutIdea>,
    frames: Vec<GeneratedFrame>,
    generated_count: usize,
    total_concepts: usize,
    error: Option<String>,
    editing: Option<EditRequest>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The request that started the active run.
    pub fn request(&self) -> Option<&RunRequest> {
        self.request.as_ref()
    }

    pub fn frame(&self, index: usize) -> Option<&GeneratedFrame> {
        self.frames.iter().find(|f| f.index == index)
    }

    /// Apply one update, or explain why it was refused.
    ///
    /// A refused update leaves the state untouched.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), StateRejection> {
        let run_id = update.run_id();
        if let StateUpdate::Started { request, .. } = update {
            if run_id <= self.run_id {
                return Err(StateRejection::StaleRun {
                    got: run_id,
                    current: self.run_id,
                });
            }
            *self = Self {
                run_id,
                state: RunState::Researching,
                request: Some(request),
                ..Self::default()
            };
            return Ok(());
        }

        if run_id != self.run_id {
            return Err(StateRejection::StaleRun {
                got: run_id,
                current: self.run_id,
            });
        }

        let name = update.name();
        match update {
            StateUpdate::Started { .. } => Ok(()),
            StateUpdate::ResearchComplete { profile, .. } => {
                self.expect_state(RunState::Researching, name)?;
                self.profile = Some(profile);
                self.state = RunState::Ideating;
                Ok(())
            }
            StateUpdate::IdeationComplete { ideas, .. } => {
                self.expect_state(RunState::Ideating, name)?;
                self.total_concepts = ideas.len();
                self.ideas = ideas;
                self.state = RunState::Generating;
                Ok(())
            }
            StateUpdate::ConceptComplete { index, result, .. } => {
                self.expect_state(RunState::Generating, name)?;
                if index >= self.total_concepts || self.generated_count >= self.total_concepts {
                    return Err(StateRejection::UnknownFrame(index));
                }
                self.generated_count += 1;
                if let Ok(frame) = result {
                    self.insert_frame(frame);
                }
                Ok(())
            }
            StateUpdate::RunComplete { .. } => {
                self.expect_state(RunState::Generating, name)?;
                self.state = RunState::Done;
                Ok(())
            }
            StateUpdate::RunFailed { message, .. } => {
                if !self.state.is_in_progress() {
                    return Err(self.invalid(name));
                }
                self.error = Some(message);
                self.state = RunState::Error;
                Ok(())
            }
            StateUpdate::EditStarted {
                index, instruction, ..
            } => {
                if !self.state.is_terminal() {
                    return Err(StateRejection::RunNotFinished(self.state.as_str()));
                }
                if let Some(ref busy) = self.editing {
                    return Err(StateRejection::EditInFlight(busy.index));
                }
                if self.frame(index).is_none() {
                    return Err(StateRejection::UnknownFrame(index));
                }
                self.editing = Some(EditRequest { index, instruction });
                Ok(())
            }
            StateUpdate::EditComplete { index, image, .. } => {
                self.expect_editing(index, name)?;
                let frame = self
                    .frames
                    .iter_mut()
                    .find(|f| f.index == index)
                    .ok_or(StateRejection::UnknownFrame(index))?;
                frame.image = image;
                self.editing = None;
                Ok(())
            }
            StateUpdate::EditFailed { index, .. } => {
                self.expect_editing(index, name)?;
                self.editing = None;
                Ok(())
            }
        }
    }

    /// Read-only copy for the presentation layer.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            run_id: self.run_id,
            state: self.state,
            profile: self.profile.clone(),
            ideas: self.ideas.clone(),
            frames: self.frames.clone(),
            generated_count: self.generated_count,
            total_concepts: self.total_concepts,
            error: self.error.clone(),
            editing: self.editing.clone(),
        }
    }

    fn insert_frame(&mut self, frame: GeneratedFrame) {
        self.frames.retain(|f| f.index != frame.index);
        self.frames.push(frame);
        self.frames.sort_by_key(|f| f.index);
    }

    fn expect_state(&self, expected: RunState, update: &'static str) -> Result<(), StateRejection> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(update))
        }
    }

    fn expect_editing(&self, index: usize, update: &'static str) -> Result<(), StateRejection> {
        match self.editing {
            Some(ref edit) if edit.index == index => Ok(()),
            _ => Err(self.invalid(update)),
        }
    }

    fn invalid(&self, update: &'static str) -> StateRejection {
        StateRejection::InvalidTransition {
            state: self.state.as_str(),
            update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idea(n: usize) -> LayoutIdea {
        LayoutIdea {
            title: format!("Idea {}", n),
            description: format!("Description {}", n),
        }
    }

    fn frame(index: usize, byte: u8) -> GeneratedFrame {
        GeneratedFrame::new(index, &idea(index), ImagePayload::new("image/png", vec![byte]))
    }

    /// A state in `Generating` for run 1 with three ideas.
    fn generating() -> PipelineState {
        let mut state = PipelineState::new();
        state
            .apply(StateUpdate::Started {
                run_id: 1,
                request: RunRequest::new("Acme"),
            })
            .unwrap();
        state
            .apply(StateUpdate::ResearchComplete {
                run_id: 1,
                profile: BrandProfile::default(),
            })
            .unwrap();
        state
            .apply(StateUpdate::IdeationComplete {
                run_id: 1,
                ideas: (0..3).map(idea).collect(),
            })
            .unwrap();
        state
    }

    /// A finished run 1 with frames 0, 1 and 2.
    fn done() -> PipelineState {
        let mut state = generating();
        for i in 0..3 {
            state
                .apply(StateUpdate::ConceptComplete {
                    run_id: 1,
                    index: i,
                    result: Ok(frame(i, i as u8)),
                })
                .unwrap();
        }
        state.apply(StateUpdate::RunComplete { run_id: 1 }).unwrap();
        state
    }

    #[test]
    fn test_started_clears_previous_run() {
        let mut state = done();
        state
            .apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 0,
                instruction: "gold".into(),
            })
            .unwrap();

        state
            .apply(StateUpdate::Started {
                run_id: 2,
                request: RunRequest::new("Other"),
            })
            .unwrap();
        let snap = state.snapshot();
        assert_eq!(snap.run_id, 2);
        assert_eq!(snap.state, RunState::Researching);
        assert!(snap.profile.is_none());
        assert!(snap.ideas.is_empty());
        assert!(snap.frames.is_empty());
        assert_eq!(snap.generated_count, 0);
        assert!(snap.error.is_none());
        assert!(snap.editing.is_none());
        assert_eq!(state.request().map(|r| r.company_name.as_str()), Some("Other"));
    }

    #[test]
    fn test_started_after_error_restarts() {
        let mut state = generating();
        state
            .apply(StateUpdate::RunFailed {
                run_id: 1,
                message: "boom".into(),
            })
            .unwrap();
        assert_eq!(state.state(), RunState::Error);
        state
            .apply(StateUpdate::Started {
                run_id: 2,
                request: RunRequest::new("Acme"),
            })
            .unwrap();
        assert_eq!(state.state(), RunState::Researching);
        assert!(state.snapshot().error.is_none());
    }

    #[test]
    fn test_started_with_old_id_rejected() {
        let mut state = generating();
        let err = state
            .apply(StateUpdate::Started {
                run_id: 1,
                request: RunRequest::new("Acme"),
            })
            .unwrap_err();
        assert_eq!(err, StateRejection::StaleRun { got: 1, current: 1 });
        assert_eq!(state.state(), RunState::Generating);
    }

    #[test]
    fn test_out_of_order_completion_stays_sorted() {
        let mut state = generating();
        for (i, index) in [2usize, 0, 1].into_iter().enumerate() {
            state
                .apply(StateUpdate::ConceptComplete {
                    run_id: 1,
                    index,
                    result: Ok(frame(index, 0)),
                })
                .unwrap();
            let indices: Vec<usize> = state.snapshot().frames.iter().map(|f| f.index).collect();
            let mut sorted = indices.clone();
            sorted.sort();
            assert_eq!(indices, sorted);
            assert_eq!(state.snapshot().generated_count, i + 1);
        }
        let indices: Vec<usize> = state.snapshot().frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_failed_concepts_count_but_add_nothing() {
        let mut state = generating();
        for index in 0..3 {
            state
                .apply(StateUpdate::ConceptComplete {
                    run_id: 1,
                    index,
                    result: Err("no image produced".into()),
                })
                .unwrap();
        }
        state.apply(StateUpdate::RunComplete { run_id: 1 }).unwrap();
        let snap = state.snapshot();
        assert_eq!(snap.state, RunState::Done);
        assert!(snap.frames.is_empty());
        assert_eq!(snap.generated_count, 3);
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_concept_beyond_total_rejected() {
        let mut state = generating();
        let err = state
            .apply(StateUpdate::ConceptComplete {
                run_id: 1,
                index: 3,
                result: Ok(frame(3, 0)),
            })
            .unwrap_err();
        assert_eq!(err, StateRejection::UnknownFrame(3));
        assert_eq!(state.snapshot().generated_count, 0);
    }

    #[test]
    fn test_stale_updates_rejected() {
        let mut state = generating();
        state
            .apply(StateUpdate::Started {
                run_id: 2,
                request: RunRequest::new("New"),
            })
            .unwrap();

        let err = state
            .apply(StateUpdate::ConceptComplete {
                run_id: 1,
                index: 0,
                result: Ok(frame(0, 0)),
            })
            .unwrap_err();
        assert_eq!(err, StateRejection::StaleRun { got: 1, current: 2 });
        assert!(state.snapshot().frames.is_empty());
        assert_eq!(state.state(), RunState::Researching);
    }

    #[test]
    fn test_transitions_are_forward_only() {
        let mut state = generating();
        let err = state
            .apply(StateUpdate::ResearchComplete {
                run_id: 1,
                profile: BrandProfile::default(),
            })
            .unwrap_err();
        assert!(matches!(err, StateRejection::InvalidTransition { state: "generating", .. }));

        let mut state = done();
        assert!(state
            .apply(StateUpdate::RunFailed {
                run_id: 1,
                message: "late".into()
            })
            .is_err());
        assert_eq!(state.state(), RunState::Done);
    }

    #[test]
    fn test_edit_replaces_only_target_image() {
        let mut state = done();
        let before = state.snapshot();

        state
            .apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 1,
                instruction: "make it gold".into(),
            })
            .unwrap();
        assert_eq!(state.snapshot().editing.map(|e| e.index), Some(1));

        let new_image = ImagePayload::new("image/jpeg", vec![42, 42]);
        state
            .apply(StateUpdate::EditComplete {
                run_id: 1,
                index: 1,
                image: new_image.clone(),
            })
            .unwrap();

        let after = state.snapshot();
        assert_eq!(after.state, RunState::Done);
        assert!(after.editing.is_none());
        assert_eq!(after.frames[0], before.frames[0]);
        assert_eq!(after.frames[2], before.frames[2]);
        let edited = after.frame(1).unwrap();
        assert_eq!(edited.image, new_image);
        assert_eq!(edited.index, 1);
        assert_eq!(edited.title, before.frames[1].title);
        assert_eq!(edited.description, before.frames[1].description);
    }

    #[test]
    fn test_edit_failure_leaves_frame_untouched() {
        let mut state = done();
        let before = state.snapshot();
        state
            .apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 0,
                instruction: "x".into(),
            })
            .unwrap();
        state.apply(StateUpdate::EditFailed { run_id: 1, index: 0 }).unwrap();

        let after = state.snapshot();
        assert_eq!(after.frames, before.frames);
        assert_eq!(after.state, RunState::Done);
        assert!(after.editing.is_none());
    }

    #[test]
    fn test_edit_guards() {
        let mut state = generating();
        assert_eq!(
            state.apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 0,
                instruction: "x".into()
            }),
            Err(StateRejection::RunNotFinished("generating"))
        );

        let mut state = done();
        assert_eq!(
            state.apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 7,
                instruction: "x".into()
            }),
            Err(StateRejection::UnknownFrame(7))
        );
        state
            .apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 0,
                instruction: "x".into(),
            })
            .unwrap();
        assert_eq!(
            state.apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 2,
                instruction: "y".into()
            }),
            Err(StateRejection::EditInFlight(0))
        );
        assert!(state
            .apply(StateUpdate::EditComplete {
                run_id: 1,
                index: 2,
                image: ImagePayload::new("image/png", vec![])
            })
            .is_err());
    }

    #[test]
    fn test_edit_allowed_after_error() {
        let mut state = generating();
        state
            .apply(StateUpdate::ConceptComplete {
                run_id: 1,
                index: 0,
                result: Ok(frame(0, 1)),
            })
            .unwrap();
        state
            .apply(StateUpdate::RunFailed {
                run_id: 1,
                message: "boom".into(),
            })
            .unwrap();
        assert!(state
            .apply(StateUpdate::EditStarted {
                run_id: 1,
                index: 0,
                instruction: "x".into()
            })
            .is_ok());
    }
}

use crate::types::Stage;
use thiserror::Error;

/// Errors produced by the pipeline and its components.
///
/// The run-level variants are deliberately split: [`PipelineError::StageFatal`]
/// ends a run, [`PipelineError::ConceptFailure`] costs one frame and the batch
/// continues, [`PipelineError::EditFailure`] is reported to the caller and
/// touches nothing.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered with a non-success status.
    ///
    /// `code` carries the provider's status string when the error body has
    /// one (e.g. `RESOURCE_EXHAUSTED`).
    #[error("HTTP {status}{}: {message}", code_suffix(.code))]
    Api {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Provider-specific status string.
        code: Option<String>,
        /// Error message or raw response body.
        message: String,
    },

    /// An image-synthesis response had no inline image part.
    #[error("no image produced{}", detail_suffix(.detail))]
    NoImage {
        /// Text the model returned instead, if any.
        detail: Option<String>,
    },

    /// An image-edit response had no inline image part.
    #[error("no edited image produced{}", detail_suffix(.detail))]
    NoEditedImage {
        /// Text the model returned instead, if any.
        detail: Option<String>,
    },

    /// A string that should be a `data:<mime>;base64,<data>` URI was not.
    #[error("invalid image data URI: {0}")]
    InvalidDataUri(String),

    /// Caller-supplied input was rejected before any remote call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration detected at build or load time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Research or ideation failed; the run is over.
    #[error("{stage} failed: {message}")]
    StageFatal { stage: Stage, message: String },

    /// One concept's frame could not be generated; the batch continues.
    #[error("Concept {index} failed: {message}")]
    ConceptFailure { index: usize, message: String },

    /// An edit of an existing frame failed; the frame is unchanged.
    #[error("Editing frame {index} failed: {message}")]
    EditFailure { index: usize, message: String },

    /// The edit was refused before any remote call was made.
    #[error("Edit rejected: {0}")]
    EditRejected(#[from] StateRejection),

    /// A newer run replaced this one before it finished.
    #[error("Run cancelled")]
    Cancelled,

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" {c}")).unwrap_or_default()
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.trim().is_empty() => format!(": {}", d.trim()),
        _ => String::new(),
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Other(err.to_string())
    }
}

/// Why the state owner refused an update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateRejection {
    /// The update belongs to a run that has since been replaced.
    #[error("update for run {got} ignored; current run is {current}")]
    StaleRun { got: u64, current: u64 },

    /// The update is not valid from the current run state.
    #[error("cannot apply {update} while {state}")]
    InvalidTransition {
        state: &'static str,
        update: &'static str,
    },

    /// No frame with this concept index exists.
    #[error("no frame at index {0}")]
    UnknownFrame(usize),

    /// Another edit is still in flight.
    #[error("an edit of frame {0} is already in progress")]
    EditInFlight(usize),

    /// Edits are only accepted once a run has finished.
    #[error("edits require a finished run (state is {0})")]
    RunNotFinished(&'static str),

    /// The state owner task is gone.
    #[error("state owner has shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_code() {
        let err = PipelineError::Api {
            status: 429,
            code: Some("RESOURCE_EXHAUSTED".into()),
            message: "Quota exceeded".into(),
        };
        assert_eq!(err.to_string(), "HTTP 429 RESOURCE_EXHAUSTED: Quota exceeded");

        let err = PipelineError::Api {
            status: 500,
            code: None,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn test_no_image_detail() {
        let bare = PipelineError::NoImage { detail: None };
        assert_eq!(bare.to_string(), "no image produced");

        let with = PipelineError::NoImage {
            detail: Some(" I can't draw that. ".into()),
        };
        assert_eq!(with.to_string(), "no image produced: I can't draw that.");
    }

    #[test]
    fn test_stage_fatal_names_stage() {
        let err = PipelineError::StageFatal {
            stage: Stage::Research,
            message: "HTTP 500: boom".into(),
        };
        assert_eq!(err.to_string(), "Brand research failed: HTTP 500: boom");
    }

    #[test]
    fn test_anyhow_maps_to_other() {
        let err: PipelineError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, PipelineError::Other(ref m) if m == "disk full"));
    }

    #[test]
    fn test_rejection_converts() {
        let err: PipelineError = StateRejection::EditInFlight(1).into();
        assert!(matches!(err, PipelineError::EditRejected(StateRejection::EditInFlight(1))));
    }
}

use crate::error::{PipelineError, Result};
use crate::image::ImagePayload;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of layout concepts requested from the ideator per run.
pub const CONCEPT_COUNT: usize = 3;

/// Photo size used when the caller does not choose one.
pub const DEFAULT_PHOTO_SIZE: &str = "1440x700";

/// Brand attributes gathered by the researcher.
///
/// Every field defaults to empty so a lenient parse of a malformed reply
/// still produces a value; [`BrandProfile::is_empty`] detects that case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrandProfile {
    pub industry: String,
    pub personality: String,
    pub target_audience: String,
    /// Hex codes or color names, most prominent first.
    pub colors: Vec<String>,
    pub design_style: String,
    pub typography: String,
    pub marketing_tone: String,
}

impl BrandProfile {
    /// True when no attribute carries any content.
    pub fn is_empty(&self) -> bool {
        [
            &self.industry,
            &self.personality,
            &self.target_audience,
            &self.design_style,
            &self.typography,
            &self.marketing_tone,
        ]
        .iter()
        .all(|s| s.trim().is_empty())
            && self.colors.iter().all(|c| c.trim().is_empty())
    }

    /// Colors joined for prompt text, or a neutral fallback.
    pub fn color_list(&self) -> String {
        let colors: Vec<&str> = self
            .colors
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if colors.is_empty() {
            "neutral tones".to_string()
        } else {
            colors.join(", ")
        }
    }
}

/// One proposed layout for a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutIdea {
    pub title: String,
    pub description: String,
}

/// A generated image for one layout concept.
///
/// `index` is the position of the originating [`LayoutIdea`]; it never
/// changes, and an edit only ever replaces `image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFrame {
    pub index: usize,
    pub title: String,
    pub description: String,
    pub image: ImagePayload,
}

impl GeneratedFrame {
    pub fn new(index: usize, idea: &LayoutIdea, image: ImagePayload) -> Self {
        Self {
            index,
            title: idea.title.clone(),
            description: idea.description.clone(),
            image,
        }
    }

    /// The image as a `data:<mime>;base64,<data>` URI.
    pub fn data_uri(&self) -> String {
        self.image.to_data_uri()
    }
}

/// Lifecycle of the single active run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Researching,
    Ideating,
    Generating,
    Done,
    Error,
}

impl RunState {
    /// Research, ideation or generation is under way.
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            RunState::Researching | RunState::Ideating | RunState::Generating
        )
    }

    /// The run has ended, successfully or not. Edits are allowed here.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Researching => "researching",
            RunState::Ideating => "ideating",
            RunState::Generating => "generating",
            RunState::Done => "done",
            RunState::Error => "error",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The two stages whose failure ends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Research,
    Ideation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Research => f.write_str("Brand research"),
            Stage::Ideation => f.write_str("Layout ideation"),
        }
    }
}

/// Width and height of the empty photo rectangle, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub width: u32,
    pub height: u32,
}

impl PhotoSize {
    /// Parse `"<width>x<height>"` (also accepts `X` and `×`).
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('×', "x");
        let (w, h) = normalized.split_once('x').ok_or_else(|| {
            PipelineError::InvalidInput(format!("photo size '{}' is not WxH", raw))
        })?;
        let parse = |s: &str| s.trim().parse::<u32>().ok().filter(|v| *v > 0);
        match (parse(w), parse(h)) {
            (Some(width), Some(height)) => Ok(Self { width, height }),
            _ => Err(PipelineError::InvalidInput(format!(
                "photo size '{}' needs positive integer width and height",
                raw
            ))),
        }
    }
}

impl Default for PhotoSize {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 700,
        }
    }
}

impl fmt::Display for PhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything the presentation layer supplies to start a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub company_name: String,
    pub photo_size: PhotoSize,
    pub event_title: Option<String>,
    /// The caller will overlay its own logo, so the logo tab stays blank.
    pub has_logo: bool,
}

impl RunRequest {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            photo_size: PhotoSize::default(),
            event_title: None,
            has_logo: false,
        }
    }

    pub fn with_photo_size(mut self, size: PhotoSize) -> Self {
        self.photo_size = size;
        self
    }

    pub fn with_event_title(mut self, title: impl Into<String>) -> Self {
        self.event_title = Some(title.into());
        self
    }

    pub fn with_logo(mut self, has_logo: bool) -> Self {
        self.has_logo = has_logo;
        self
    }

    /// Trim inputs and reject an empty company name.
    pub fn validated(mut self) -> Result<Self> {
        self.company_name = self.company_name.trim().to_string();
        if self.company_name.is_empty() {
            return Err(PipelineError::InvalidInput(
                "company name must not be empty".to_string(),
            ));
        }
        self.event_title = self
            .event_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(self)
    }
}

/// An edit in flight: which frame, and what the user asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub index: usize,
    pub instruction: String,
}

/// Read-only view of the pipeline handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Identifier of the active run; 0 before the first run.
    pub run_id: u64,
    pub state: RunState,
    pub profile: Option<BrandProfile>,
    pub ideas: Vec<LayoutIdea>,
    /// Always sorted by `index`.
    pub frames: Vec<GeneratedFrame>,
    /// Concepts attempted so far, successful or not.
    pub generated_count: usize,
    pub total_concepts: usize,
    pub error: Option<String>,
    pub editing: Option<EditRequest>,
}

impl Snapshot {
    pub fn frame(&self, index: usize) -> Option<&GeneratedFrame> {
        self.frames.iter().find(|f| f.index == index)
    }
}

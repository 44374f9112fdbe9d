//! Process configuration, read once at startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `GEMINI_API_KEY` (or `GOOGLE_API_KEY`, `API_KEY`) | required |
//! | `BRAND_FRAMES_BASE_URL` | `https://generativelanguage.googleapis.com` |
//! | `BRAND_FRAMES_TEXT_MODEL` | `gemini-2.5-flash` |
//! | `BRAND_FRAMES_IMAGE_MODEL` | `gemini-2.5-flash-image` |
//! | `BRAND_FRAMES_WEB_SEARCH` | `false` |
//! | `BRAND_FRAMES_MAX_RETRIES` | `3` |
//! | `BRAND_FRAMES_TIMEOUT_SECS` | `120` |

use crate::backend::gemini::DEFAULT_BASE_URL;
use crate::error::Result;
use crate::PipelineError;
use std::time::Duration;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Settings for talking to the provider.
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    /// Model for research and ideation.
    pub text_model: String,
    /// Model for frame synthesis and edits.
    pub image_model: String,
    /// Ground research with live web search.
    pub web_search: bool,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Settings {
    /// Defaults around a known API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            web_search: false,
            max_retries: 3,
            timeout: Duration::from_secs(120),
        }
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| get(*key))
            .ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "no API key set; export one of {}",
                    API_KEY_VARS.join(", ")
                ))
            })?;

        let mut settings = Self::new(api_key);
        if let Some(url) = get("BRAND_FRAMES_BASE_URL") {
            settings.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("BRAND_FRAMES_TEXT_MODEL") {
            settings.text_model = model;
        }
        if let Some(model) = get("BRAND_FRAMES_IMAGE_MODEL") {
            settings.image_model = model;
        }
        if let Some(flag) = get("BRAND_FRAMES_WEB_SEARCH") {
            settings.web_search = parse_bool("BRAND_FRAMES_WEB_SEARCH", &flag)?;
        }
        if let Some(n) = get("BRAND_FRAMES_MAX_RETRIES") {
            settings.max_retries = n.parse().map_err(|_| {
                PipelineError::InvalidConfig(format!(
                    "BRAND_FRAMES_MAX_RETRIES='{}' is not a count",
                    n
                ))
            })?;
        }
        if let Some(secs) = get("BRAND_FRAMES_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                PipelineError::InvalidConfig(format!(
                    "BRAND_FRAMES_TIMEOUT_SECS='{}' is not a number of seconds",
                    secs
                ))
            })?;
            settings.timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PipelineError::InvalidConfig(format!(
            "{}='{}' is not a boolean",
            key, other
        ))),
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .field("web_search", &self.web_search)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

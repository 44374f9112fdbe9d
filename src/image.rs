//! Image bytes and their `data:` URI form.
//!
//! Images cross the provider boundary as base64 inline data with a MIME type.
//! Inside the crate and towards display surfaces they are exchanged as
//! self-describing `data:<mimeType>;base64,<data>` URIs.

use crate::error::{PipelineError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw image bytes plus MIME type.
///
/// Serializes as its data URI so snapshots can be handed straight to a
/// display surface.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Build from a base64 string as it appears in provider JSON.
    pub fn from_base64(mime_type: impl Into<String>, encoded: &str) -> Result<Self> {
        let data = BASE64
            .decode(encoded.trim().as_bytes())
            .map_err(|e| PipelineError::InvalidDataUri(format!("base64 decode failed: {}", e)))?;
        Ok(Self::new(mime_type, data))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Parse a `data:<mime>;base64,<data>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| PipelineError::InvalidDataUri("missing 'data:' prefix".into()))?;
        let (header, encoded) = rest
            .split_once(',')
            .ok_or_else(|| PipelineError::InvalidDataUri("missing ',' separator".into()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            PipelineError::InvalidDataUri("only base64 data URIs are supported".into())
        })?;
        if mime_type.is_empty() {
            return Err(PipelineError::InvalidDataUri("empty MIME type".into()));
        }
        Self::from_base64(mime_type, encoded)
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Serialize for ImagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for ImagePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        ImagePayload::from_data_uri(&uri).map_err(serde::de::Error::custom)
    }
}

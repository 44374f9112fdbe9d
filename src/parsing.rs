//! Parsing utilities for structured model replies.
//!
//! With a response schema the provider usually returns clean JSON, but
//! grounded (web search) replies arrive as prose with an embedded object, and
//! a throttled or filtered reply can be empty. These helpers find the JSON
//! defensively and fall back to an empty object rather than failing.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Extract JSON content from markdown fenced code blocks.
///
/// Recognizes `` ```json ``, `` ```JSON ``, and plain `` ``` `` fences.
pub fn extract_json_block(text: &str) -> Option<String> {
    let markers = ["```json", "```JSON", "```"];
    for marker in markers {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(text[content_start..content_start + end].trim().to_string());
            }
        }
    }
    None
}

/// Try to locate a JSON object or array in text that may contain prose.
///
/// Tries, in order:
/// 1. The whole text
/// 2. Markdown code block extraction
/// 3. First `{` or `[` up to the last matching closer
pub fn extract_json_candidate(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(val) = serde_json::from_str::<Value>(trimmed) {
        return Some(val);
    }

    if let Some(block) = extract_json_block(trimmed) {
        if let Ok(val) = serde_json::from_str::<Value>(&block) {
            return Some(val);
        }
    }

    let idx = match (trimmed.find('{'), trimmed.find('[')) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let candidate = &trimmed[idx..];
    let close = if candidate.starts_with('{') { '}' } else { ']' };
    let end = candidate.rfind(close)?;
    serde_json::from_str::<Value>(&candidate[..=end]).ok()
}

/// Parse a reply expected to hold a JSON object.
///
/// Empty or unparseable text, or JSON that is not an object, yields `{}`.
/// This function never fails; callers decide whether an empty object is
/// acceptable.
pub fn parse_object_lenient(text: &str) -> Value {
    match extract_json_candidate(text) {
        Some(val @ Value::Object(_)) => val,
        _ => Value::Object(Map::new()),
    }
}

/// Parse a reply expected to hold a JSON array.
///
/// Also accepts an object wrapping a single array field (`{"ideas": [...]}`),
/// which models produce when the schema is restated in prose. Anything else
/// yields an empty array.
pub fn parse_array_lenient(text: &str) -> Value {
    match extract_json_candidate(text) {
        Some(val @ Value::Array(_)) => val,
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(_, v)| v)
            .find(Value::is_array)
            .unwrap_or_else(|| Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    }
}

/// Deserialize `value` into `T`, describing the failure with a short excerpt.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    let snippet = value.to_string();
    serde_json::from_value(value).map_err(|e| {
        let end = snippet
            .char_indices()
            .nth(200)
            .map_or(snippet.len(), |(i, _)| i);
        format!("{} (value, truncated: {})", e, &snippet[..end])
    })
}

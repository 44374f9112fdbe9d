//! Backend for the Gemini `generateContent` REST API.
//!
//! Endpoint: `{base}/v1beta/models/{model}:generateContent`.
//! Auth: `x-goog-api-key` header.
//! Structured output: `generationConfig.responseMimeType` + `responseSchema`.
//! Image output: `generationConfig.responseModalities = ["IMAGE"]`.

use super::{Backend, GenerateRequest, GenerateResponse, OutputKind, Part};
use crate::error::Result;
use crate::image::ImagePayload;
use crate::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Backend for the Gemini API.
///
/// # Example
///
/// ```
/// use brand_frames::backend::GeminiBackend;
///
/// let backend = GeminiBackend::new("AIza...");
/// let proxied = GeminiBackend::new("AIza...").with_base_url("http://localhost:8080/");
/// ```
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.api_key.chars().count() > 6 {
            let prefix: String = self.api_key.chars().take(6).collect();
            format!("{}***", prefix)
        } else {
            "***".to_string()
        };
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &key)
            .finish()
    }
}

impl GeminiBackend {
    /// Create a backend against the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point at another host (proxy, emulator). Trailing slashes are dropped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn build_part(part: &Part) -> Value {
        match part {
            Part::Text(text) => json!({ "text": text }),
            Part::Image(image) => json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": image.to_base64(),
                }
            }),
        }
    }

    /// Build the request body for `:generateContent`.
    fn build_body(request: &GenerateRequest) -> Value {
        let parts: Vec<Value> = request.parts.iter().map(Self::build_part).collect();
        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
        });

        let mut generation_config = serde_json::Map::new();
        match request.output {
            OutputKind::Json => {
                // The API refuses a response schema alongside the search tool;
                // the prompt restates the schema in that case.
                if !request.web_search {
                    generation_config
                        .insert("responseMimeType".into(), json!("application/json"));
                    if let Some(ref schema) = request.response_schema {
                        generation_config.insert("responseSchema".into(), schema.clone());
                    }
                }
            }
            OutputKind::Image => {
                generation_config.insert("responseModalities".into(), json!(["IMAGE"]));
                if let Some(ref ratio) = request.aspect_ratio {
                    generation_config
                        .insert("imageConfig".into(), json!({ "aspectRatio": ratio }));
                }
            }
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }

        if request.web_search {
            body["tools"] = json!([{ "googleSearch": {} }]);
        }

        body
    }

    /// Build the reqwest request with the auth header.
    fn build_http_request(&self, url: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
    }

    /// Map a non-success body (`{"error": {code, message, status}}`) to an error.
    fn parse_error_body(status: u16, body: &str) -> PipelineError {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));
        let code = error
            .and_then(|e| e.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string());
        PipelineError::Api {
            status,
            code,
            message,
        }
    }

    /// Read the first candidate's parts.
    fn parse_response(status: u16, json_resp: &Value) -> Result<GenerateResponse> {
        let candidate = json_resp.get("candidates").and_then(|c| c.get(0));
        let finish_reason = candidate
            .and_then(|c| c.get("finishReason"))
            .and_then(Value::as_str)
            .or_else(|| {
                json_resp
                    .get("promptFeedback")
                    .and_then(|f| f.get("blockReason"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string);

        let raw_parts = candidate
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut parts = Vec::with_capacity(raw_parts.len());
        for part in &raw_parts {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                parts.push(Part::Text(text.to_string()));
                continue;
            }
            let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
                continue;
            };
            let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
            if data.is_empty() {
                continue;
            }
            let mime_type = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            parts.push(Part::Image(ImagePayload::from_base64(mime_type, data)?));
        }

        Ok(GenerateResponse {
            parts,
            status,
            finish_reason,
        })
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = self.endpoint(&request.model);
        let body = Self::build_body(request);

        let resp = self.build_http_request(&url, &body).send().await?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::parse_error_body(status, &text));
        }

        let json_resp: Value = resp.json().await?;
        Self::parse_response(status, &json_resp)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

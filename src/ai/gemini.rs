use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AiError, AiResult, GenerationRequest, ImageGenerator, ImagePayload, RequestPart};
use crate::config::{self, AppConfig};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const FINISH_REASON_STOP: &str = "STOP";
const ERROR_BODY_PREVIEW_CHARS: usize = 240;

#[derive(Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Applies config overrides on top of the defaults; the key comes from the environment.
    pub fn from_config(app_config: &AppConfig) -> AiResult<Self> {
        let api_key = config::api_key_from_env().ok_or(AiError::MissingApiKey)?;
        let mut settings = Self::new(api_key);
        if let Some(endpoint) = non_empty(app_config.endpoint.as_deref()) {
            settings.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty(app_config.model.as_deref()) {
            settings.model = model.to_string();
        }
        if let Some(secs) = app_config.request_timeout_secs.filter(|secs| *secs > 0) {
            settings.timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// `generateContent` client for Gemini image models.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: HttpClient,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> AiResult<Self> {
        let http = HttpClient::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint, self.settings.model
        )
    }
}

impl ImageGenerator for GeminiClient {
    fn generate(&self, request: &GenerationRequest) -> AiResult<ImagePayload> {
        tracing::debug!(
            model = %self.settings.model,
            parts = request.parts.len(),
            images = request.image_count(),
            "sending generation request"
        );
        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.settings.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body(request))
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(AiError::Http {
                status: status.as_u16(),
                message: preview(&body),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|err| AiError::MalformedResponse {
                message: err.to_string(),
            })?;
        let payload = classify_response(parsed)?;
        tracing::info!(
            mime_type = %payload.mime_type,
            bytes = payload.bytes.len(),
            "generation returned an image"
        );
        Ok(payload)
    }
}

fn preview(body: &str) -> String {
    body.trim().chars().take(ERROR_BODY_PREVIEW_CHARS).collect()
}

pub(super) fn request_body(request: &GenerationRequest) -> Value {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            RequestPart::Image { bytes, mime_type } => json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": BASE64.encode(bytes),
                }
            }),
            RequestPart::Text(text) => json!({ "text": text }),
        })
        .collect::<Vec<_>>();
    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] },
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Block reason first, then the first inline image, then an abnormal finish
/// reason, and finally whatever text the model sent instead.
fn classify_response(response: GenerateContentResponse) -> AiResult<ImagePayload> {
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let reason = match feedback.block_reason_message {
                Some(message) if !message.trim().is_empty() => format!("{reason}. {message}"),
                _ => reason,
            };
            tracing::warn!(%reason, "generation request blocked");
            return Err(AiError::Blocked { reason });
        }
    }

    let candidate = response.candidates.into_iter().next().unwrap_or_default();
    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default();

    if let Some(inline) = parts.iter().find_map(|part| part.inline_data.as_ref()) {
        let bytes = BASE64
            .decode(inline.data.as_bytes())
            .map_err(|err| AiError::MalformedResponse {
                message: format!("invalid base64 image data: {err}"),
            })?;
        return Ok(ImagePayload {
            bytes,
            mime_type: inline.mime_type.clone(),
        });
    }

    if let Some(reason) = candidate
        .finish_reason
        .filter(|reason| reason != FINISH_REASON_STOP)
    {
        tracing::warn!(%reason, "generation stopped early");
        return Err(AiError::StoppedEarly { reason });
    }

    let text = parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = (!text.trim().is_empty()).then_some(text);
    tracing::warn!(has_text = text.is_some(), "model returned no image");
    Err(AiError::NoImage { text })
}

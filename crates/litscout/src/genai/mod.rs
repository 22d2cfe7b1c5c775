//! Text-generation capability.
//!
//! Speaks a Gemini-style `generateContent` endpoint: auth via `?key=` query
//! parameter, `contents`/`parts` request body, candidate text extraction.
//! Every call goes through the credential pool with rotation-first retry;
//! quota-exceeded responses mark the offending credential exhausted for the
//! remainder of its 24h window.
//!
//! Callers are responsible for extracting structured data (JSON) from the
//! returned text and must degrade gracefully on malformed output; the
//! [`extract_json`] helper tolerates fenced code blocks and leading prose.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::config::Config;
use crate::error::{ApiError, ApiResult, EngineResult};
use crate::pool::CredentialPool;
use crate::retry::{RetryPolicy, call_with_rotation};

/// An inline image attached to a prompt (secondary mode).
#[derive(Debug, Clone)]
pub struct InlineImage {
    /// MIME type, e.g. "image/png".
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data_b64: String,
}

/// Plain-text generation capability consumed by the planner, scorer,
/// orchestrator (translation, paraphrases), and nothing else.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a plain prompt.
    async fn generate(&self, prompt: &str) -> EngineResult<String>;

    /// Generate text for a prompt with inline images. The default
    /// implementation ignores the images.
    async fn generate_with_images(
        &self,
        prompt: &str,
        _images: &[InlineImage],
    ) -> EngineResult<String> {
        self.generate(prompt).await
    }
}

/// Production text-generation client.
pub struct GenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    pool: Arc<CredentialPool>,
    policy: RetryPolicy,
}

impl GenAiClient {
    /// Create a client from configuration and a credential pool.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config, pool: Arc<CredentialPool>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::config::api::USER_AGENT)
            .timeout(config.genai_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.genai_api_url.clone(),
            model: config.genai_model.clone(),
            pool,
            policy: RetryPolicy::standard(),
        })
    }

    /// Build the request body: prompt text plus optional inline images.
    fn request_body(prompt: &str, images: &[InlineImage]) -> Value {
        let mut parts = vec![json!({ "text": prompt })];
        for image in images {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": image.data_b64,
                }
            }));
        }
        json!({ "contents": [{ "parts": parts }] })
    }

    /// One call with one credential; classification happens here.
    async fn generate_once(&self, key: &str, body: &Value) -> ApiResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response =
            self.client.post(&url).query(&[("key", key)]).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let value: Value = response.json().await?;
        let text = extract_candidate_text(&value).ok_or_else(|| {
            ApiError::UnexpectedStatus {
                status: status.as_u16(),
                message: "response contained no candidate text".to_string(),
            }
        })?;
        Ok(text)
    }
}

#[async_trait::async_trait]
impl TextGenerator for GenAiClient {
    async fn generate(&self, prompt: &str) -> EngineResult<String> {
        let body = Self::request_body(prompt, &[]);
        call_with_rotation(&self.pool, self.policy, |cred| {
            let body = body.clone();
            async move { self.generate_once(&cred.key, &body).await }
        })
        .await
    }

    async fn generate_with_images(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> EngineResult<String> {
        let body = Self::request_body(prompt, images);
        call_with_rotation(&self.pool, self.policy, |cred| {
            let body = body.clone();
            async move { self.generate_once(&cred.key, &body).await }
        })
        .await
    }
}

impl std::fmt::Debug for GenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiClient")
            .field("model", &self.model)
            .field("credentials", &self.pool.len())
            .finish()
    }
}

/// Map a non-success generation response to an [`ApiError`].
///
/// Quota detection prefers the structured error status
/// (`RESOURCE_EXHAUSTED`) and falls back to matching the provider's
/// daily-limit wording; message matching alone is fragile.
fn classify_failure(status: u16, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let structured_status = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/status"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(Value::as_str)
        .map_or_else(|| body.to_string(), ToString::to_string);

    match status {
        429 => {
            if structured_status == "RESOURCE_EXHAUSTED" || is_daily_quota_message(&message) {
                ApiError::quota_exceeded(message)
            } else {
                ApiError::rate_limited(30)
            }
        }
        503 => ApiError::overloaded(message),
        400 => ApiError::bad_request(message),
        404 => ApiError::not_found(message),
        500..=599 => ApiError::server(status, message),
        _ => ApiError::UnexpectedStatus { status, message },
    }
}

/// Last-resort quota detection against the provider's wording.
fn is_daily_quota_message(message: &str) -> bool {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r"(?i)exceeded your (current|daily) (quota|limit)|quota exceeded")
            .expect("valid quota regex")
    });
    re.is_match(message)
}

/// Pull the concatenated candidate text out of a generation response.
fn extract_candidate_text(value: &Value) -> Option<String> {
    let parts = value.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String =
        parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
    if text.is_empty() { None } else { Some(text) }
}

/// Extract a JSON value from model output.
///
/// Tolerates ```json fences and prose around the payload: the outermost
/// `{...}` or `[...]` span is tried when a direct parse fails.
#[must_use]
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    // Strip a fenced block if present.
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            if let Ok(value) = serde_json::from_str(after[..end].trim()) {
                return Some(value);
            }
        }
    }

    // Outermost object or array span.
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                    return Some(value);
                }
            }
        }
    }
    None
}

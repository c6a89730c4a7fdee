//! OpenAI-compatible chat-completions client.
//!
//! Works against OpenAI, OpenRouter and local servers that speak the same
//! `/v1/chat/completions` protocol.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use policyqa_core::config::GenerationSettings;
use policyqa_core::error::{Error, GenerationError, Result};
use policyqa_core::traits::Generator;
use policyqa_core::types::CompletionRequest;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

const OPENROUTER_REFERER: &str = "https://github.com/policyqa/policyqa";
const OPENROUTER_TITLE: &str = "Policy Q&A";
/// Provider error bodies are cut to this many characters.
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Configured,
    OpenRouter,
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
    pub source: CredentialSource,
}

/// Pick the API key and base URL.
///
/// Order: `generation.api_key`, then `OPENROUTER_API_KEY`, then
/// `OPENAI_API_KEY`. A configured `base_url` always wins over the provider
/// default. `lookup` reads environment variables.
pub fn resolve_credentials(
    settings: &GenerationSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Credentials> {
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let (api_key, source) = if let Some(key) = non_empty(settings.api_key.clone()) {
        (key, CredentialSource::Configured)
    } else if let Some(key) = non_empty(lookup("OPENROUTER_API_KEY")) {
        (key, CredentialSource::OpenRouter)
    } else if let Some(key) = non_empty(lookup("OPENAI_API_KEY")) {
        (key, CredentialSource::OpenAi)
    } else {
        return Err(Error::InvalidConfig(
            "no API key: set generation.api_key, OPENROUTER_API_KEY or OPENAI_API_KEY".into(),
        ));
    };

    let default_base = match source {
        CredentialSource::OpenRouter => OPENROUTER_BASE_URL,
        CredentialSource::Configured | CredentialSource::OpenAi => OPENAI_BASE_URL,
    };
    let base_url = non_empty(settings.base_url.clone()).unwrap_or_else(|| default_base.to_string());
    Ok(Credentials { api_key, base_url, source })
}

/// Resolve the chat completions endpoint from the base URL.
pub fn endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct LlmClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl LlmClient {
    /// Build a client from settings, reading provider keys from the process
    /// environment. Fails on a missing key or model.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let credentials = resolve_credentials(settings, |k| std::env::var(k).ok())?;
        Self::new(settings, credentials)
    }

    pub fn new(settings: &GenerationSettings, credentials: Credentials) -> Result<Self> {
        if settings.model.trim().is_empty() {
            return Err(Error::InvalidConfig("generation.model must not be empty".into()));
        }

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))
            .map_err(|_| Error::InvalidConfig("API key contains invalid header characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        if credentials.source == CredentialSource::OpenRouter {
            headers.insert("http-referer", HeaderValue::from_static(OPENROUTER_REFERER));
            headers.insert("x-title", HeaderValue::from_static(OPENROUTER_TITLE));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        let endpoint = endpoint(&credentials.base_url);
        info!(%endpoint, model = %settings.model, source = ?credentials.source, "generation provider configured");
        Ok(Self { client, endpoint, model: settings.model.clone() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(e.to_string())
    } else {
        GenerationError::Network(e.to_string())
    }
}

fn status_error(status: StatusCode, body: String) -> GenerationError {
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => GenerationError::Quota(body),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationError::Timeout(body),
        _ => GenerationError::Provider { status: status.as_u16(), body },
    }
}

/// Text of `choices[0].message.content`, verbatim. Blank answers are rejected.
fn extract_content(raw: &str) -> std::result::Result<String, GenerationError> {
    let parsed: ChatResponse =
        serde_json::from_str(raw).map_err(|e| GenerationError::Malformed(format!("invalid JSON: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| GenerationError::Malformed("response has no message content".into()))
}

#[async_trait]
impl Generator for LlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                Message { role: "system".into(), content: request.system_prompt.clone() },
                Message { role: "user".into(), content: request.user_prompt.clone() },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;
        debug!(status = status.as_u16(), bytes = text.len(), "completion response");

        if !status.is_success() {
            return Err(status_error(status, text));
        }
        extract_content(&text)
    }
}

/// LLM Client: the single point of entry for all model calls in Survey Assist.
///
/// No other module may call a model API directly. The backend is chosen per
/// request (`llm` field of a classification request); each backend is only
/// available when its API key is configured.
use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmBackendConfig;

pub mod prompts;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Backends a caller can ask for. Serialized as `"chat-gpt"` / `"gemini"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LlmBackend {
    ChatGpt,
    Gemini,
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmBackend::ChatGpt => f.write_str("chat-gpt"),
            LlmBackend::Gemini => f.write_str("gemini"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(serde_json::Error),

    /// The provider answered 2xx but not with its documented response body.
    #[error("Unexpected provider response: {0}")]
    InvalidEnvelope(serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM backend '{0}' is not configured")]
    NotConfigured(LlmBackend),
}

impl LlmError {
    /// True when the model answered but its text could not be used.
    /// Callers degrade these into an unclassified result instead of failing the request.
    pub fn is_output_error(&self) -> bool {
        matches!(self, LlmError::Parse(_) | LlmError::EmptyContent)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Backend-neutral view of a completed model call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: Option<String>,
    pub usage: Usage,
}

impl LlmResponse {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types: Gemini generateContent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContentOut<'a>,
    contents: Vec<GeminiContentOut<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContentOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentIn>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentIn {
    #[serde(default)]
    parts: Vec<GeminiPartIn>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartIn {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types: OpenAI chat completions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: ChatResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Both providers report failures as `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single LLM client used by all services in Survey Assist.
/// Wraps the configured provider APIs with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    gemini: Option<LlmBackendConfig>,
    openai: Option<LlmBackendConfig>,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl LlmClient {
    pub fn new(
        gemini: Option<LlmBackendConfig>,
        openai: Option<LlmBackendConfig>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            gemini,
            openai,
            max_retries: MAX_RETRIES,
            retry_base_delay: Duration::from_millis(1000),
        })
    }

    /// Overrides the retry budget. `max_retries` counts total attempts.
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_base_delay = base_delay;
        self
    }

    /// Model name the given backend is configured with, if any.
    pub fn model_name(&self, backend: LlmBackend) -> Option<&str> {
        self.backend_config(backend).map(|c| c.model.as_str())
    }

    fn backend_config(&self, backend: LlmBackend) -> Option<&LlmBackendConfig> {
        match backend {
            LlmBackend::Gemini => self.gemini.as_ref(),
            LlmBackend::ChatGpt => self.openai.as_ref(),
        }
    }

    fn build_request(
        &self,
        backend: LlmBackend,
        config: &LlmBackendConfig,
        prompt: &str,
        system: &str,
    ) -> reqwest::RequestBuilder {
        let base_url = config.base_url.trim_end_matches('/');
        match backend {
            LlmBackend::Gemini => {
                let body = GeminiRequest {
                    system_instruction: GeminiContentOut {
                        role: None,
                        parts: vec![GeminiPartOut { text: system }],
                    },
                    contents: vec![GeminiContentOut {
                        role: Some("user"),
                        parts: vec![GeminiPartOut { text: prompt }],
                    }],
                    generation_config: GeminiGenerationConfig {
                        temperature: 0.0,
                        response_mime_type: "application/json",
                    },
                };
                self.client
                    .post(format!(
                        "{base_url}/v1beta/models/{}:generateContent",
                        config.model
                    ))
                    .header("x-goog-api-key", &config.api_key)
                    .json(&body)
            }
            LlmBackend::ChatGpt => {
                let body = ChatRequest {
                    model: &config.model,
                    temperature: 0.0,
                    messages: vec![
                        ChatMessage {
                            role: "system",
                            content: system,
                        },
                        ChatMessage {
                            role: "user",
                            content: prompt,
                        },
                    ],
                    response_format: ChatResponseFormat {
                        format_type: "json_object",
                    },
                };
                self.client
                    .post(format!("{base_url}/v1/chat/completions"))
                    .bearer_auth(&config.api_key)
                    .json(&body)
            }
        }
    }

    /// Makes a raw call to the selected backend, returning the normalised response.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(
        &self,
        backend: LlmBackend,
        prompt: &str,
        system: &str,
    ) -> Result<LlmResponse, LlmError> {
        let config = self
            .backend_config(backend)
            .ok_or(LlmError::NotConfigured(backend))?;

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff: base, 2*base, 4*base
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "{backend} call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .build_request(backend, config, prompt, system)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            let body = response.text().await?;

            if status.as_u16() == 429 || status.is_server_error() {
                warn!("{backend} API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let message = serde_json::from_str::<ProviderError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response = parse_body(backend, &body)?;

            debug!(
                "{backend} call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.max_retries,
        }))
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        backend: LlmBackend,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(backend, prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

fn parse_body(backend: LlmBackend, body: &str) -> Result<LlmResponse, LlmError> {
    match backend {
        LlmBackend::Gemini => {
            let parsed: GeminiResponse =
                serde_json::from_str(body).map_err(LlmError::InvalidEnvelope)?;
            let text = parsed
                .candidates
                .into_iter()
                .filter_map(|c| c.content)
                .flat_map(|c| c.parts)
                .find_map(|p| p.text);
            let usage = parsed
                .usage_metadata
                .map(|u| Usage {
                    input_tokens: u.prompt_token_count,
                    output_tokens: u.candidates_token_count,
                })
                .unwrap_or_default();
            Ok(LlmResponse { text, usage })
        }
        LlmBackend::ChatGpt => {
            let parsed: ChatResponse =
                serde_json::from_str(body).map_err(LlmError::InvalidEnvelope)?;
            let text = parsed
                .choices
                .into_iter()
                .find_map(|c| c.message.content);
            let usage = parsed
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default();
            Ok(LlmResponse { text, usage })
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

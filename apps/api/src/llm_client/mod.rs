/// LLM client: the single point of entry for all text-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Generators, the document analyzer and the chat service depend on the
/// `TextCompletion` trait; `LlmClient` is the production implementation.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ModelSettings;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Latency/quality tier of a call. Each tier resolves to a configured model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Slowest, most elaborated prose (Complete strategy).
    Thorough,
    /// Default for batched generation, analysis and chat.
    Balanced,
    /// Ultra-fast generation.
    Fast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One text-completion request. Owned so it can be moved into spawned tasks.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub tier: ModelTier,
    pub system: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Single user prompt under a system prompt.
    pub fn prompt(tier: ModelTier, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            tier,
            system: system.into(),
            messages: vec![ChatTurn::user(prompt)],
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.3,
        }
    }

    /// Multi-turn conversation under a system prompt.
    pub fn conversation(tier: ModelTier, system: impl Into<String>, turns: Vec<ChatTurn>) -> Self {
        Self {
            tier,
            system: system.into(),
            messages: turns,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.3,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Text of the last user turn, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }
}

/// Black-box text completion. Implemented by `LlmClient` in production and by
/// scripted doubles in tests.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Calls the model and deserializes the text response as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn complete_json<T: DeserializeOwned>(
    llm: &dyn TextCompletion,
    request: CompletionRequest,
) -> Result<T, LlmError> {
    let text = llm.complete(request).await?;
    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);
    serde_json::from_str(text).map_err(LlmError::Parse)
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: Role,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic and tier-to-model mapping.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    models: ModelSettings,
}

impl LlmClient {
    pub fn new(api_key: String, models: ModelSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(180))
                .build()?,
            api_key,
            models,
        })
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Thorough => &self.models.thorough,
            ModelTier::Balanced => &self.models.balanced,
            ModelTier::Fast => &self.models.fast,
        }
    }

    /// Makes a raw call to the Messages API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, request: &CompletionRequest) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: self.model_for(request.tier),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: normalize_turns(&request.messages),
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
                request_body.model,
                llm_response.usage.input_tokens,
                llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let response = self.call(&request).await?;
        match response.text() {
            Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(LlmError::EmptyContent),
        }
    }
}

/// The Messages API requires the conversation to open with a user turn and to
/// alternate roles. Leading assistant turns (e.g. a seeded greeting) are
/// dropped and consecutive same-role turns are merged.
fn normalize_turns(turns: &[ChatTurn]) -> Vec<AnthropicMessage<'_>> {
    let mut out: Vec<AnthropicMessage<'_>> = Vec::with_capacity(turns.len());
    for turn in turns.iter().skip_while(|t| t.role == Role::Assistant) {
        match out.last_mut() {
            Some(prev) if prev.role == turn.role => {
                let merged = format!("{}\n\n{}", prev.content, turn.content);
                prev.content = std::borrow::Cow::Owned(merged);
            }
            _ => out.push(AnthropicMessage {
                role: turn.role,
                content: std::borrow::Cow::Borrowed(turn.content.as_str()),
            }),
        }
    }
    out
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


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_normalize_turns_drops_leading_assistant_greeting() {
        let turns = vec![
            ChatTurn::assistant("Olá! Sou seu assistente."),
            ChatTurn::user("O que é um ETP?"),
        ];
        let normalized = normalize_turns(&turns);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].role, Role::User);
        assert_eq!(normalized[0].content, "O que é um ETP?");
    }

    #[test]
    fn test_normalize_turns_merges_consecutive_roles() {
        let turns = vec![
            ChatTurn::user("primeira"),
            ChatTurn::user("segunda"),
            ChatTurn::assistant("resposta"),
        ];
        let normalized = normalize_turns(&turns);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].content, "primeira\n\nsegunda");
        assert_eq!(normalized[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_complete_json_parses_fenced_output() {
        #[derive(Deserialize)]
        struct Out {
            confidence: f32,
        }
        let llm = testing::ScriptedCompletion::fixed("```json\n{\"confidence\": 0.8}\n```");
        let out: Out = complete_json(
            &llm,
            CompletionRequest::prompt(ModelTier::Balanced, "sys", "prompt"),
        )
        .await
        .unwrap();
        assert!((out.confidence - 0.8).abs() < f32::EPSILON);
    }
}

//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy):
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field, not a message
//!
//! Cache hits are read from `usage.cache_read_input_tokens`, which is
//! non-zero when a prompt prefix was served from Anthropic's prompt cache.

use async_trait::async_trait;
use serde::Deserialize;
use stratachat_core::error::ProviderError;
use stratachat_core::provider::*;
use stratachat_core::turn::Role;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    model: String,
    tier: ProviderTier,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        tier: ProviderTier,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            tier,
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Extract system messages from the message list.
    /// Anthropic takes the system prompt as a top-level field, not in messages.
    fn extract_system(messages: &[PromptMessage]) -> (Option<String>, Vec<&PromptMessage>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut non_system: Vec<&PromptMessage> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                _ => non_system.push(msg),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, non_system)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn tier(&self) -> ProviderTier {
        self.tier
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let (system, messages) = Self::extract_system(&request.messages);

        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::Assistant => "assistant",
                        _ => "user",
                    },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": api_messages,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
        });

        if let Some(system) = system {
            body["system"] = serde_json::json!(system);
        }

        debug!(model = %self.model, "Sending Anthropic completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout("Request to 'anthropic' timed out".into())
                } else {
                    ProviderError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic returned error");
            return Err(ProviderError::Unavailable(format!(
                "'anthropic' returned HTTP {status}"
            )));
        }

        let api_response: AnthropicResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {e}"))
        })?;

        let text: String = api_response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
            })
            .collect::<Vec<_>>()
            .join("");

        let cache_hit = api_response
            .usage
            .as_ref()
            .map(|u| u.cache_read_input_tokens > 0)
            .unwrap_or(false);

        Ok(CompletionResponse {
            text,
            model: api_response.model,
            prompt_tokens: api_response.usage.as_ref().map(|u| u.input_tokens),
            completion_tokens: api_response.usage.as_ref().map(|u| u.output_tokens),
            cache_hit,
        })
    }
}

// ── API wire types ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    cache_read_input_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_system_splits_messages() {
        let messages = vec![
            PromptMessage::system("You are helpful."),
            PromptMessage::user("Hi"),
            PromptMessage::assistant("Hello!"),
            PromptMessage::system("Stay concise."),
        ];
        let (system, rest) = AnthropicProvider::extract_system(&messages);
        assert_eq!(system.as_deref(), Some("You are helpful.\n\nStay concise."));
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn no_system_messages_yields_none() {
        let messages = vec![PromptMessage::user("Hi")];
        let (system, rest) = AnthropicProvider::extract_system(&messages);
        assert!(system.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn response_parses_text_blocks_and_cache_usage() {
        let json = r#"{
            "content": [{"type": "text", "text": "Hello "}, {"type": "text", "text": "world"}],
            "model": "claude-sonnet-4",
            "usage": {"input_tokens": 50, "output_tokens": 4, "cache_read_input_tokens": 30}
        }"#;
        let resp: AnthropicResponse = serde_json::from_str(json).unwrap();
        let text: String = resp
            .content
            .iter()
            .map(|ContentBlock::Text { text }| text.as_str())
            .collect();
        assert_eq!(text, "Hello world");
        assert_eq!(resp.usage.unwrap().cache_read_input_tokens, 30);
    }
}

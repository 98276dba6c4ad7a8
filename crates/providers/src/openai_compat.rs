//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, DeepSeek, Groq, Ollama, vLLM, and any
//! endpoint exposing `/v1/chat/completions`. This handles the vast majority
//! of hosted models.
//!
//! Error translation: 429 → `RateLimited`, client timeout → `Timeout`,
//! network / 5xx / auth failures → `Unavailable`, unparsable or empty
//! bodies → `InvalidResponse`. Cache hits are read from the
//! `prompt_tokens_details.cached_tokens` usage field when the endpoint
//! reports it.

use async_trait::async_trait;
use serde::Deserialize;
use stratachat_core::error::ProviderError;
use stratachat_core::provider::*;
use stratachat_core::turn::Role;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider pinned to one model and tier.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    tier: ProviderTier,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        tier: ProviderTier,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            tier,
            client,
        })
    }

    /// Get the default base URL for well-known providers.
    pub fn default_base_url(provider_name: &str) -> String {
        match provider_name {
            "openrouter" => "https://openrouter.ai/api/v1".into(),
            "openai" => "https://api.openai.com/v1".into(),
            "deepseek" => "https://api.deepseek.com/v1".into(),
            "groq" => "https://api.groq.com/openai/v1".into(),
            "together" => "https://api.together.xyz/v1".into(),
            "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
            "ollama" => "http://localhost:11434/v1".into(),
            "vllm" => "http://localhost:8000/v1".into(),
            _ => format!("https://{provider_name}.api.example.com/v1"),
        }
    }

    fn to_api_messages(messages: &[PromptMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::System => "system",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
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
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(format!("Request to '{}' timed out", self.name))
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
            warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
            return Err(ProviderError::Unavailable(format!(
                "'{}' returned HTTP {status}",
                self.name
            )));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {e}"))
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let cache_hit = api_response
            .usage
            .as_ref()
            .and_then(|u| u.prompt_tokens_details.as_ref())
            .map(|d| d.cached_tokens > 0)
            .unwrap_or(false);

        Ok(CompletionResponse {
            text: choice.message.content.unwrap_or_default(),
            model: api_response.model,
            prompt_tokens: api_response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: api_response.usage.as_ref().map(|u| u.completion_tokens),
            cache_hit,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// ── API wire types ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    model: String,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    #[serde(default)]
    prompt_tokens_details: Option<ApiPromptTokensDetails>,
}

#[derive(Deserialize)]
struct ApiPromptTokensDetails {
    #[serde(default)]
    cached_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_base_urls() {
        assert!(OpenAiCompatProvider::default_base_url("openrouter").contains("openrouter.ai"));
        assert!(OpenAiCompatProvider::default_base_url("openai").contains("api.openai.com"));
        assert!(OpenAiCompatProvider::default_base_url("ollama").contains("localhost:11434"));
        assert!(OpenAiCompatProvider::default_base_url("groq").contains("groq.com"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let p = OpenAiCompatProvider::new(
            "openai",
            "https://api.openai.com/v1/",
            "sk-test",
            "gpt-4o-mini",
            ProviderTier::Fast,
        )
        .unwrap();
        assert_eq!(p.base_url, "https://api.openai.com/v1");
        assert_eq!(p.model(), "gpt-4o-mini");
        assert_eq!(p.tier(), ProviderTier::Fast);
    }

    #[test]
    fn usage_parses_cached_tokens() {
        let json = r#"{
            "choices": [{"message": {"content": "hi"}}],
            "model": "gpt-4o-mini",
            "usage": {
                "prompt_tokens": 120,
                "completion_tokens": 8,
                "prompt_tokens_details": {"cached_tokens": 100}
            }
        }"#;
        let resp: ApiResponse = serde_json::from_str(json).unwrap();
        let cached = resp
            .usage
            .as_ref()
            .and_then(|u| u.prompt_tokens_details.as_ref())
            .map(|d| d.cached_tokens)
            .unwrap();
        assert_eq!(cached, 100);
    }

    #[test]
    fn usage_without_details_parses() {
        let json = r#"{
            "choices": [{"message": {"content": "hi"}}],
            "model": "llama-3.1-8b",
            "usage": {"prompt_tokens": 10, "completion_tokens": 2}
        }"#;
        let resp: ApiResponse = serde_json::from_str(json).unwrap();
        assert!(
            resp.usage
                .as_ref()
                .unwrap()
                .prompt_tokens_details
                .is_none()
        );
    }
}

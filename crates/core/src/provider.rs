//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a prompt to an LLM and get text back. The
//! router drives providers through this trait without knowing which backend
//! is behind it — pure polymorphism over an ordered fallback chain.
//!
//! Implementations: OpenAI-compatible, Anthropic native, local fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbedError, ProviderError};
use crate::token;
use crate::turn::Role;

/// Which rung of the routing ladder a provider occupies.
///
/// Chains are assembled from tiers, not from concrete provider names: new
/// providers are added by registering a variant under a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    /// Cheap, low-latency general model. Also serves the classifier.
    Fast,
    /// Mid-range model for technical/medium queries.
    Mid,
    /// Expensive model with strong multi-step reasoning.
    Reasoning,
    /// Always-available terminal fallback; appended to every chain.
    Guaranteed,
}

impl std::fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Mid => write!(f, "mid"),
            Self::Reasoning => write!(f, "reasoning"),
            Self::Guaranteed => write!(f, "guaranteed"),
        }
    }
}

/// One message in a completion prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
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

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Configuration for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The prompt, as an ordered message list
    pub messages: Vec<PromptMessage>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    /// Build a single-message user request.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![PromptMessage::user(prompt)],
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Prompt tokens consumed, when the provider reports usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,

    /// Completion tokens produced, when the provider reports usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,

    /// Provider-reported signal that an equivalent prompt prefix was served
    /// from the provider's own result cache rather than freshly computed.
    /// Opaque to us — we record it, we never compute it.
    #[serde(default)]
    pub cache_hit: bool,
}

impl CompletionResponse {
    /// Prompt tokens, falling back to a text-length estimate over the
    /// request when the provider reports no usage.
    pub fn prompt_tokens_or_estimate(&self, request: &CompletionRequest) -> u32 {
        self.prompt_tokens.unwrap_or_else(|| {
            request
                .messages
                .iter()
                .map(|m| token::estimate_turn_tokens(&m.content))
                .sum::<usize>() as u32
        })
    }

    /// Completion tokens, falling back to a text-length estimate.
    pub fn completion_tokens_or_estimate(&self) -> u32 {
        self.completion_tokens
            .unwrap_or_else(|| token::estimate_tokens(&self.text) as u32)
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this. Each implementation enforces its own
/// request shape and translates provider-specific errors into the uniform
/// [`ProviderError`] taxonomy; the router must not special-case any
/// provider's error format.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter", "anthropic").
    fn name(&self) -> &str;

    /// The model this provider instance targets.
    fn model(&self) -> &str;

    /// Which routing tier this provider serves.
    fn tier(&self) -> ProviderTier;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError>;

    /// Health check — can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// The embedding capability — turns text into a vector for the cold index.
///
/// Best-effort from the core's perspective: a failed embed disables semantic
/// recall for that request, nothing more.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text into a dense vector.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_from_prompt() {
        let req = CompletionRequest::from_prompt("hello").with_max_tokens(100);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, Role::User);
        assert_eq!(req.max_tokens, Some(100));
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn response_token_fallback_estimates() {
        let req = CompletionRequest::from_prompt("12345678"); // 2 tokens + 4 overhead
        let resp = CompletionResponse {
            text: "abcd".into(), // 1 token
            model: "test".into(),
            prompt_tokens: None,
            completion_tokens: None,
            cache_hit: false,
        };
        assert_eq!(resp.prompt_tokens_or_estimate(&req), 6);
        assert_eq!(resp.completion_tokens_or_estimate(), 1);
    }

    #[test]
    fn response_token_reported_wins() {
        let req = CompletionRequest::from_prompt("hi");
        let resp = CompletionResponse {
            text: "ok".into(),
            model: "test".into(),
            prompt_tokens: Some(42),
            completion_tokens: Some(7),
            cache_hit: true,
        };
        assert_eq!(resp.prompt_tokens_or_estimate(&req), 42);
        assert_eq!(resp.completion_tokens_or_estimate(), 7);
        assert!(resp.cache_hit);
    }

    #[test]
    fn tier_display() {
        assert_eq!(ProviderTier::Fast.to_string(), "fast");
        assert_eq!(ProviderTier::Reasoning.to_string(), "reasoning");
        assert_eq!(ProviderTier::Guaranteed.to_string(), "guaranteed");
    }
}

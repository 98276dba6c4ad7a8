//! Local guaranteed-available provider.
//!
//! The terminal element of every fallback chain: a deterministic, in-process
//! responder that never fails, so `route` only errors when every configured
//! remote provider is unreachable AND this one is somehow absent. It produces
//! an honest "degraded" acknowledgement rather than pretending to be an LLM.

use async_trait::async_trait;
use stratachat_core::error::ProviderError;
use stratachat_core::provider::*;
use stratachat_core::turn::Role;

/// An always-available in-process fallback provider.
pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &str {
        "local-fallback"
    }

    fn tier(&self) -> ProviderTier {
        ProviderTier::Guaranteed
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let preview: String = last_user.chars().take(80).collect();
        let text = format!(
            "All upstream models are currently unreachable, so this is a degraded \
             local response. Your message was received: \"{preview}\". Please retry \
             shortly for a full answer."
        );

        Ok(CompletionResponse {
            text,
            model: "local-fallback".into(),
            prompt_tokens: None,
            completion_tokens: None,
            cache_hit: false,
        })
    }
}

//! Provider decorator that reports every completion to the ledger.
//!
//! The router records its own routed attempts; auxiliary callers — the
//! classifier, the memory summarizer — go through this wrapper so their
//! spend lands in the same ledger without each caller knowing about it.

use std::sync::Arc;

use async_trait::async_trait;
use stratachat_core::error::ProviderError;
use stratachat_core::provider::{CompletionRequest, CompletionResponse, Provider, ProviderTier};

use crate::ledger::UsageLedger;
use crate::model::UsageRecord;

/// Wraps a provider so every `complete()` call, successful or failed, is
/// appended to the usage ledger.
pub struct RecordingProvider {
    inner: Arc<dyn Provider>,
    ledger: Arc<UsageLedger>,
}

impl RecordingProvider {
    pub fn wrap(inner: Arc<dyn Provider>, ledger: Arc<UsageLedger>) -> Arc<dyn Provider> {
        Arc::new(Self { inner, ledger })
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn tier(&self) -> ProviderTier {
        self.inner.tier()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        match self.inner.complete(request.clone()).await {
            Ok(response) => {
                let prompt_tokens = response.prompt_tokens_or_estimate(&request);
                let completion_tokens = response.completion_tokens_or_estimate();
                let cost =
                    self.ledger
                        .compute_cost(&response.model, prompt_tokens, completion_tokens);
                self.ledger.record(UsageRecord::success(
                    self.inner.name(),
                    response.model.clone(),
                    prompt_tokens,
                    completion_tokens,
                    response.cache_hit,
                    cost,
                ));
                Ok(response)
            }
            Err(e) => {
                self.ledger.record(UsageRecord::failure(
                    self.inner.name(),
                    self.inner.model(),
                    e.to_string(),
                ));
                Err(e)
            }
        }
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}

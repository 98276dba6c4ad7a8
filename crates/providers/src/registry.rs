//! Provider registry: the configured model pool, grouped by tier.
//!
//! The registry holds ordered provider lists for each capability tier plus a
//! guaranteed terminal provider that never fails. Fallback chains are built
//! from these lists; configuration order within a tier is preference order.

use std::sync::Arc;

use stratachat_config::{AppConfig, ProviderEntry};
use stratachat_core::error::ProviderError;
use stratachat_core::provider::{Provider, ProviderTier};
use tracing::{info, warn};

use crate::anthropic::AnthropicProvider;
use crate::local::LocalProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// The configured providers, grouped by tier in preference order.
pub struct ProviderRegistry {
    fast: Vec<Arc<dyn Provider>>,
    mid: Vec<Arc<dyn Provider>>,
    reasoning: Vec<Arc<dyn Provider>>,
    guaranteed: Arc<dyn Provider>,
}

impl ProviderRegistry {
    /// Builds a registry from configuration. Entries with an unrecognized
    /// tier are skipped with a warning rather than aborting startup.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let mut fast: Vec<Arc<dyn Provider>> = Vec::new();
        let mut mid: Vec<Arc<dyn Provider>> = Vec::new();
        let mut reasoning: Vec<Arc<dyn Provider>> = Vec::new();

        for entry in &config.providers {
            let tier = match entry.tier.as_str() {
                "fast" => ProviderTier::Fast,
                "mid" => ProviderTier::Mid,
                "reasoning" => ProviderTier::Reasoning,
                other => {
                    warn!(provider = %entry.name, tier = %other, "Skipping provider with unknown tier");
                    continue;
                }
            };

            let provider = build_provider(entry, tier, &config.api_key)?;
            info!(provider = %entry.name, model = %entry.model, tier = %tier, "Registered provider");

            match tier {
                ProviderTier::Fast => fast.push(provider),
                ProviderTier::Mid => mid.push(provider),
                ProviderTier::Reasoning => reasoning.push(provider),
                ProviderTier::Guaranteed => unreachable!(),
            }
        }

        Ok(Self {
            fast,
            mid,
            reasoning,
            guaranteed: Arc::new(LocalProvider::new()),
        })
    }

    /// Builds an empty registry for tests; only the guaranteed provider is set.
    pub fn with_guaranteed(guaranteed: Arc<dyn Provider>) -> Self {
        Self {
            fast: Vec::new(),
            mid: Vec::new(),
            reasoning: Vec::new(),
            guaranteed,
        }
    }

    pub fn push(&mut self, provider: Arc<dyn Provider>) {
        match provider.tier() {
            ProviderTier::Fast => self.fast.push(provider),
            ProviderTier::Mid => self.mid.push(provider),
            ProviderTier::Reasoning => self.reasoning.push(provider),
            ProviderTier::Guaranteed => self.guaranteed = provider,
        }
    }

    /// Providers in the given tier, in preference order.
    pub fn tier(&self, tier: ProviderTier) -> &[Arc<dyn Provider>] {
        match tier {
            ProviderTier::Fast => &self.fast,
            ProviderTier::Mid => &self.mid,
            ProviderTier::Reasoning => &self.reasoning,
            ProviderTier::Guaranteed => std::slice::from_ref(&self.guaranteed),
        }
    }

    /// The terminal provider appended to every fallback chain.
    pub fn guaranteed(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.guaranteed)
    }

    /// First provider in the fast tier, used for classification. Falls back
    /// to the guaranteed provider when no fast model is configured.
    pub fn classifier_provider(&self) -> Arc<dyn Provider> {
        self.fast
            .first()
            .map(Arc::clone)
            .unwrap_or_else(|| self.guaranteed())
    }

    pub fn len(&self) -> usize {
        self.fast.len() + self.mid.len() + self.reasoning.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false // the guaranteed provider is always present
    }
}

fn build_provider(
    entry: &ProviderEntry,
    tier: ProviderTier,
    default_key: &Option<String>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = entry
        .api_key
        .clone()
        .or_else(|| default_key.clone())
        .unwrap_or_default();

    if entry.name == "anthropic" {
        let provider = AnthropicProvider::new(api_key, entry.model.clone(), tier)?;
        let provider = match &entry.api_url {
            Some(url) => provider.with_base_url(url.clone()),
            None => provider,
        };
        return Ok(Arc::new(provider));
    }

    let base_url = entry
        .api_url
        .clone()
        .unwrap_or_else(|| OpenAiCompatProvider::default_base_url(&entry.name));

    Ok(Arc::new(OpenAiCompatProvider::new(
        entry.name.clone(),
        base_url,
        api_key,
        entry.model.clone(),
        tier,
    )?))
}

//! Fallback chain assembly.
//!
//! The chain is derived from classification, never from concrete provider
//! names, so adding a provider to a tier changes routing without touching
//! this logic.

use std::sync::Arc;

use stratachat_core::classify::{Classification, Complexity, TopicType};
use stratachat_core::provider::{Provider, ProviderTier};
use stratachat_providers::ProviderRegistry;

/// Build the ordered fallback chain for a classified query.
///
/// Chain shape by classification:
/// - deep reasoning or complex → reasoning, mid, fast
/// - medium, or any technical query → mid, fast
/// - simple → fast
///
/// The guaranteed provider is always appended last, and duplicate provider
/// names are removed keeping the earliest (highest-priority) occurrence.
pub fn build_chain(
    registry: &ProviderRegistry,
    classification: &Classification,
) -> Vec<Arc<dyn Provider>> {
    let tiers: &[ProviderTier] =
        if classification.requires_deep_reasoning || classification.complexity == Complexity::Complex
        {
            &[ProviderTier::Reasoning, ProviderTier::Mid, ProviderTier::Fast]
        } else if classification.complexity == Complexity::Medium
            || classification.topic_type == TopicType::Technical
        {
            &[ProviderTier::Mid, ProviderTier::Fast]
        } else {
            &[ProviderTier::Fast]
        };

    let mut chain: Vec<Arc<dyn Provider>> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for tier in tiers {
        for provider in registry.tier(*tier) {
            if !seen.iter().any(|n| n == provider.name()) {
                seen.push(provider.name().to_string());
                chain.push(Arc::clone(provider));
            }
        }
    }

    let guaranteed = registry.guaranteed();
    if !seen.iter().any(|n| n == guaranteed.name()) {
        chain.push(guaranteed);
    }

    chain
}

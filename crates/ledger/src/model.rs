//! Data model for usage records and aggregate statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One provider attempt, as recorded in the ledger.
///
/// Failed attempts carry zero token counts and an `error` string; they
/// still count toward per-provider attempt totals but not toward the
/// cache hit rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// When the attempt completed (or failed).
    pub timestamp: DateTime<Utc>,
    /// Provider name (e.g. "openrouter", "anthropic", "local").
    pub provider: String,
    /// Model the attempt targeted.
    pub model: String,
    /// Input tokens consumed (reported or estimated).
    pub prompt_tokens: u32,
    /// Output tokens produced (reported or estimated).
    pub completion_tokens: u32,
    /// Whether the provider served the prompt from its cache.
    pub cache_hit: bool,
    /// Estimated cost in USD.
    pub estimated_cost_usd: f64,
    /// Failure reason, when the attempt did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UsageRecord {
    /// A successful attempt with token usage and cost.
    pub fn success(
        provider: impl Into<String>,
        model: impl Into<String>,
        prompt_tokens: u32,
        completion_tokens: u32,
        cache_hit: bool,
        estimated_cost_usd: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: provider.into(),
            model: model.into(),
            prompt_tokens,
            completion_tokens,
            cache_hit,
            estimated_cost_usd,
            error: None,
        }
    }

    /// A failed attempt. No tokens were billed.
    pub fn failure(
        provider: impl Into<String>,
        model: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: provider.into(),
            model: model.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            cache_hit: false,
            estimated_cost_usd: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Total tokens, input plus output.
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Aggregate ledger statistics, recomputed on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Number of routed queries (one per user request, not per attempt).
    pub total_queries: u64,
    /// Total provider attempts, successes and failures alike.
    pub total_attempts: u64,
    /// Failed attempts.
    pub failed_attempts: u64,
    /// Cache hit rate over successful attempts, in [0, 1].
    pub cache_hit_rate: f64,
    /// Total input tokens across successful attempts.
    pub total_prompt_tokens: u64,
    /// Total output tokens across successful attempts.
    pub total_completion_tokens: u64,
    /// Total spend so far in USD.
    pub total_cost_usd: f64,
    /// Naive monthly extrapolation: spend per elapsed hour times 720.
    pub estimated_monthly_cost_usd: f64,
    /// Per-provider attempt counts.
    pub attempts_by_provider: Vec<ProviderAttemptCount>,
}

/// Attempt counts for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAttemptCount {
    pub provider: String,
    pub attempts: u64,
    pub failures: u64,
}

//! Thread-safe in-memory usage ledger.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::debug;

use crate::model::{LedgerStats, ProviderAttemptCount, UsageRecord};
use crate::pricing::PricingTable;

/// Hours in the 30-day month used for cost extrapolation.
const HOURS_PER_MONTH: f64 = 720.0;

/// The usage ledger.
///
/// Appends are cheap; statistics are recomputed from the record list on
/// each `stats()` call. A query is counted once per routed user request,
/// regardless of how many fallback attempts it took.
pub struct UsageLedger {
    pricing: PricingTable,
    records: RwLock<Vec<UsageRecord>>,
    queries: AtomicU64,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::with_pricing(PricingTable::with_defaults())
    }

    pub fn with_pricing(pricing: PricingTable) -> Self {
        Self {
            pricing,
            records: RwLock::new(Vec::new()),
            queries: AtomicU64::new(0),
        }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Count one routed user request. Called once per routing decision,
    /// before any provider attempts.
    pub fn note_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Append a provider attempt record.
    pub fn record(&self, record: UsageRecord) {
        debug!(
            provider = %record.provider,
            model = %record.model,
            tokens = record.total_tokens(),
            cost = record.estimated_cost_usd,
            success = record.succeeded(),
            "Recording usage"
        );
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.push(record);
    }

    /// Compute cost for a call using the pricing table.
    pub fn compute_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        self.pricing.compute_cost(model, input_tokens, output_tokens)
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<UsageRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.iter().rev().take(limit).cloned().collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Aggregate statistics over everything recorded so far.
    ///
    /// The monthly estimate extrapolates total spend linearly over a
    /// 720-hour month. Elapsed time is measured from the first record,
    /// not process start, and clamped to at least one minute so a single
    /// expensive call right away doesn't produce an absurd projection.
    pub fn stats(&self) -> LedgerStats {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());

        let mut total_attempts = 0u64;
        let mut failed_attempts = 0u64;
        let mut successes = 0u64;
        let mut cache_hits = 0u64;
        let mut total_prompt = 0u64;
        let mut total_completion = 0u64;
        let mut total_cost = 0.0f64;
        let mut by_provider: HashMap<String, (u64, u64)> = HashMap::new();

        for r in records.iter() {
            total_attempts += 1;
            let entry = by_provider.entry(r.provider.clone()).or_insert((0, 0));
            entry.0 += 1;

            if r.succeeded() {
                successes += 1;
                if r.cache_hit {
                    cache_hits += 1;
                }
                total_prompt += r.prompt_tokens as u64;
                total_completion += r.completion_tokens as u64;
                total_cost += r.estimated_cost_usd;
            } else {
                failed_attempts += 1;
                entry.1 += 1;
            }
        }

        let cache_hit_rate = if successes > 0 {
            cache_hits as f64 / successes as f64
        } else {
            0.0
        };

        let elapsed_secs = records
            .first()
            .map(|r| Utc::now().signed_duration_since(r.timestamp).num_seconds())
            .unwrap_or(0)
            .max(60) as f64;
        let estimated_monthly_cost_usd = total_cost / (elapsed_secs / 3600.0) * HOURS_PER_MONTH;

        let mut attempts_by_provider: Vec<ProviderAttemptCount> = by_provider
            .into_iter()
            .map(|(provider, (attempts, failures))| ProviderAttemptCount {
                provider,
                attempts,
                failures,
            })
            .collect();
        attempts_by_provider.sort_by(|a, b| b.attempts.cmp(&a.attempts));

        LedgerStats {
            total_queries: self.queries.load(Ordering::Relaxed),
            total_attempts,
            failed_attempts,
            cache_hit_rate,
            total_prompt_tokens: total_prompt,
            total_completion_tokens: total_completion,
            total_cost_usd: total_cost,
            estimated_monthly_cost_usd,
            attempts_by_provider,
        }
    }
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ledger_stats() {
        let ledger = UsageLedger::new();
        let stats = ledger.stats();
        assert_eq!(stats.total_queries, 0);
        assert_eq!(stats.total_attempts, 0);
        assert!((stats.cache_hit_rate - 0.0).abs() < 1e-10);
        assert!((stats.total_cost_usd - 0.0).abs() < 1e-10);
    }

    #[test]
    fn queries_counted_per_request_not_per_attempt() {
        let ledger = UsageLedger::new();
        ledger.note_query();
        // One request, three fallback attempts.
        ledger.record(UsageRecord::failure("openrouter", "llama", "timeout"));
        ledger.record(UsageRecord::failure("anthropic", "claude", "rate limited"));
        ledger.record(UsageRecord::success("local", "local-fallback", 10, 20, false, 0.0));

        let stats = ledger.stats();
        assert_eq!(stats.total_queries, 1);
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.failed_attempts, 2);
    }

    #[test]
    fn cache_hit_rate_over_successes_only() {
        let ledger = UsageLedger::new();
        ledger.record(UsageRecord::success("a", "m", 100, 50, true, 0.001));
        ledger.record(UsageRecord::success("a", "m", 100, 50, false, 0.001));
        ledger.record(UsageRecord::failure("b", "m", "unavailable"));

        let stats = ledger.stats();
        assert!((stats.cache_hit_rate - 0.5).abs() < 1e-10);
    }

    #[test]
    fn failed_attempts_dont_bill() {
        let ledger = UsageLedger::new();
        ledger.record(UsageRecord::success("a", "m", 1000, 500, false, 0.01));
        ledger.record(UsageRecord::failure("b", "m", "timeout"));

        let stats = ledger.stats();
        assert!((stats.total_cost_usd - 0.01).abs() < 1e-10);
        assert_eq!(stats.total_prompt_tokens, 1000);
        assert_eq!(stats.total_completion_tokens, 500);
    }

    #[test]
    fn monthly_extrapolation_is_clamped() {
        let ledger = UsageLedger::new();
        ledger.record(UsageRecord::success("a", "m", 1000, 500, false, 0.60));

        // Right after the first record, elapsed is clamped to one minute:
        // 0.60 / (1/60 h) * 720 h = 0.60 * 60 * 720 at most.
        let stats = ledger.stats();
        assert!(stats.estimated_monthly_cost_usd > 0.0);
        assert!(stats.estimated_monthly_cost_usd <= 0.60 * 60.0 * 720.0 + 1e-6);
    }

    #[test]
    fn monthly_extrapolation_measured_from_first_record() {
        let ledger = UsageLedger::new();
        let mut record = UsageRecord::success("a", "m", 1000, 500, false, 1.0);
        record.timestamp = Utc::now() - chrono::Duration::hours(2);
        ledger.record(record);

        // One dollar over two hours projects to 360 for a 720-hour month,
        // no matter how long the ledger idled before that first call.
        let monthly = ledger.stats().estimated_monthly_cost_usd;
        assert!((monthly - 360.0).abs() < 1.0);
    }

    #[test]
    fn per_provider_breakdown() {
        let ledger = UsageLedger::new();
        ledger.record(UsageRecord::failure("openrouter", "llama", "timeout"));
        ledger.record(UsageRecord::success("openrouter", "llama", 10, 5, false, 0.0001));
        ledger.record(UsageRecord::success("anthropic", "claude", 10, 5, false, 0.001));

        let stats = ledger.stats();
        let or = stats
            .attempts_by_provider
            .iter()
            .find(|p| p.provider == "openrouter")
            .unwrap();
        assert_eq!(or.attempts, 2);
        assert_eq!(or.failures, 1);
    }

    #[test]
    fn recent_returns_newest_first() {
        let ledger = UsageLedger::new();
        for i in 0..5 {
            ledger.record(UsageRecord::success("p", format!("model-{i}"), 1, 1, false, 0.0));
        }
        let recent = ledger.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].model, "model-4");
        assert_eq!(recent[1].model, "model-3");
    }
}

//! The router — walks the fallback chain until a provider answers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use stratachat_core::classify::Classification;
use stratachat_core::error::{AttemptFailure, ProviderError, RouteError};
use stratachat_core::provider::{CompletionRequest, PromptMessage, Provider};
use stratachat_ledger::{UsageLedger, UsageRecord};
use stratachat_providers::ProviderRegistry;
use tracing::{info, warn};

use crate::chain::build_chain;
use crate::classifier::QueryClassifier;

/// One provider attempt within a routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub model: String,
    pub succeeded: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The outcome of routing one query: what the classifier said, every
/// attempt made, and the winning response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub classification: Classification,
    pub attempts: Vec<ProviderAttempt>,
    /// Provider that produced the final response.
    pub provider: String,
    /// Model that produced the final response.
    pub model: String,
    pub response_text: String,
    /// Whether the winning response was served from the provider's cache.
    pub cache_hit: bool,
    /// Input tokens of the winning attempt, reported or estimated.
    pub prompt_tokens: u32,
    /// Output tokens of the winning attempt, reported or estimated.
    pub completion_tokens: u32,
}

/// Classification-driven fallback router.
///
/// Owns ledger recording: every attempt, successful or failed, lands in
/// the usage ledger exactly once, and each routed query is counted once
/// regardless of how many attempts it takes.
pub struct Router {
    registry: Arc<ProviderRegistry>,
    classifier: QueryClassifier,
    ledger: Arc<UsageLedger>,
    request_timeout: Duration,
}

impl Router {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        classifier: QueryClassifier,
        ledger: Arc<UsageLedger>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            classifier,
            ledger,
            request_timeout,
        }
    }

    /// Route one query. `query` is the raw user text used for
    /// classification; `messages` is the full assembled prompt.
    pub async fn route(
        &self,
        query: &str,
        messages: Vec<PromptMessage>,
        temperature: f32,
    ) -> Result<RoutingDecision, RouteError> {
        self.ledger.note_query();

        let classification = self.classifier.classify(query).await;
        let chain = build_chain(&self.registry, &classification);

        let request = CompletionRequest {
            messages,
            temperature,
            max_tokens: Some(classification.estimated_tokens.max(256)),
        };

        let mut attempts: Vec<ProviderAttempt> = Vec::new();

        for (i, provider) in chain.iter().enumerate() {
            info!(
                provider = %provider.name(),
                model = %provider.model(),
                attempt = i + 1,
                total = chain.len(),
                "Trying provider"
            );

            let started = Instant::now();
            let outcome =
                tokio::time::timeout(self.request_timeout, provider.complete(request.clone()))
                    .await;
            let latency_ms = started.elapsed().as_millis() as u64;

            let error = match outcome {
                Ok(Ok(response)) if response.text.trim().is_empty() => {
                    // A blank completion is as useless as a refused one.
                    ProviderError::InvalidResponse("provider returned empty text".into())
                }
                Ok(Ok(response)) => {
                    let prompt_tokens = response.prompt_tokens_or_estimate(&request);
                    let completion_tokens = response.completion_tokens_or_estimate();
                    let cost = self.ledger.compute_cost(
                        &response.model,
                        prompt_tokens,
                        completion_tokens,
                    );
                    self.ledger.record(UsageRecord::success(
                        provider.name(),
                        response.model.clone(),
                        prompt_tokens,
                        completion_tokens,
                        response.cache_hit,
                        cost,
                    ));

                    return Ok(RoutingDecision {
                        classification,
                        provider: provider.name().to_string(),
                        model: response.model.clone(),
                        cache_hit: response.cache_hit,
                        prompt_tokens,
                        completion_tokens,
                        response_text: response.text,
                        attempts: {
                            attempts.push(ProviderAttempt {
                                provider: provider.name().to_string(),
                                model: provider.model().to_string(),
                                succeeded: true,
                                latency_ms,
                                error: None,
                            });
                            attempts
                        },
                    });
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "no response within {}s",
                    self.request_timeout.as_secs()
                )),
            };

            warn!(
                provider = %provider.name(),
                error = %error,
                latency_ms,
                "Provider failed, trying next"
            );
            self.ledger.record(UsageRecord::failure(
                provider.name(),
                provider.model(),
                error.to_string(),
            ));
            attempts.push(ProviderAttempt {
                provider: provider.name().to_string(),
                model: provider.model().to_string(),
                succeeded: false,
                latency_ms,
                error: Some(error.to_string()),
            });
        }

        Err(RouteError::AllProvidersExhausted {
            attempts: attempts
                .into_iter()
                .map(|a| AttemptFailure {
                    provider: a.provider,
                    reason: a.error.unwrap_or_else(|| "unknown".into()),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use stratachat_core::provider::{CompletionResponse, ProviderTier};

    struct SucceedingProvider {
        name: String,
        tier: ProviderTier,
        calls: Mutex<usize>,
    }

    impl SucceedingProvider {
        fn new(name: &str, tier: ProviderTier) -> Self {
            Self {
                name: name.into(),
                tier,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for SucceedingProvider {
        fn name(&self) -> &str {
            &self.name
        }
        fn model(&self) -> &str {
            "test-model"
        }
        fn tier(&self) -> ProviderTier {
            self.tier
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Ok(CompletionResponse {
                text: format!("answer from {}", self.name),
                model: "test-model".into(),
                prompt_tokens: Some(100),
                completion_tokens: Some(50),
                cache_hit: false,
            })
        }
    }

    struct FailingProvider {
        name: String,
        tier: ProviderTier,
        calls: Mutex<usize>,
    }

    impl FailingProvider {
        fn new(name: &str, tier: ProviderTier) -> Self {
            Self {
                name: name.into(),
                tier,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            &self.name
        }
        fn model(&self) -> &str {
            "broken-model"
        }
        fn tier(&self) -> ProviderTier {
            self.tier
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Err(ProviderError::Unavailable("synthetic outage".into()))
        }
    }

    struct BlankProvider;

    #[async_trait]
    impl Provider for BlankProvider {
        fn name(&self) -> &str {
            "blank"
        }
        fn model(&self) -> &str {
            "blank-model"
        }
        fn tier(&self) -> ProviderTier {
            ProviderTier::Fast
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                text: "   \n".into(),
                model: "blank-model".into(),
                prompt_tokens: None,
                completion_tokens: None,
                cache_hit: false,
            })
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }
        fn model(&self) -> &str {
            "hanging-model"
        }
        fn tier(&self) -> ProviderTier {
            ProviderTier::Fast
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    /// Guaranteed-tier stub: never fails, so exhaustion tests swap in a
    /// failing one instead.
    struct FailingGuaranteed;

    #[async_trait]
    impl Provider for FailingGuaranteed {
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
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Err(ProviderError::Unavailable("even the floor gave out".into()))
        }
    }

    struct SucceedingGuaranteed;

    #[async_trait]
    impl Provider for SucceedingGuaranteed {
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
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                text: "degraded answer".into(),
                model: "local-fallback".into(),
                prompt_tokens: None,
                completion_tokens: None,
                cache_hit: false,
            })
        }
    }

    fn router_with(
        providers: Vec<Arc<dyn Provider>>,
        guaranteed: Arc<dyn Provider>,
        classifier_reply: &str,
    ) -> (Router, Arc<UsageLedger>) {
        let mut registry = ProviderRegistry::with_guaranteed(guaranteed);
        for p in providers {
            registry.push(p);
        }
        let registry = Arc::new(registry);
        let ledger = Arc::new(UsageLedger::new());

        // Classifier backed by a canned fast response so chain selection
        // is deterministic in tests.
        let classifier = QueryClassifier::new(
            Arc::new(CannedClassifier {
                reply: classifier_reply.to_string(),
            }),
            Duration::from_secs(5),
        );

        (
            Router::new(
                Arc::clone(&registry),
                classifier,
                Arc::clone(&ledger),
                Duration::from_millis(200),
            ),
            ledger,
        )
    }

    struct CannedClassifier {
        reply: String,
    }

    #[async_trait]
    impl Provider for CannedClassifier {
        fn name(&self) -> &str {
            "clf"
        }
        fn model(&self) -> &str {
            "clf-model"
        }
        fn tier(&self) -> ProviderTier {
            ProviderTier::Fast
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                text: self.reply.clone(),
                model: "clf-model".into(),
                prompt_tokens: None,
                completion_tokens: None,
                cache_hit: false,
            })
        }
    }

    const SIMPLE: &str = r#"{"complexity": "simple", "topic_type": "dialogue"}"#;

    #[tokio::test]
    async fn first_healthy_provider_wins() {
        let fast = Arc::new(SucceedingProvider::new("fast-a", ProviderTier::Fast));
        let (router, _) = router_with(
            vec![Arc::clone(&fast) as Arc<dyn Provider>],
            Arc::new(SucceedingGuaranteed),
            SIMPLE,
        );

        let decision = router
            .route("hello", vec![PromptMessage::user("hello")], 0.7)
            .await
            .unwrap();

        assert_eq!(decision.provider, "fast-a");
        assert_eq!(decision.attempts.len(), 1);
        assert!(decision.attempts[0].succeeded);
        assert_eq!(decision.prompt_tokens, 100);
        assert_eq!(decision.completion_tokens, 50);
        assert_eq!(*fast.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn failure_falls_through_in_order() {
        let broken = Arc::new(FailingProvider::new("broken", ProviderTier::Fast));
        let healthy = Arc::new(SucceedingProvider::new("healthy", ProviderTier::Fast));
        let (router, ledger) = router_with(
            vec![
                Arc::clone(&broken) as Arc<dyn Provider>,
                Arc::clone(&healthy) as Arc<dyn Provider>,
            ],
            Arc::new(SucceedingGuaranteed),
            SIMPLE,
        );

        let decision = router
            .route("hello", vec![PromptMessage::user("hello")], 0.7)
            .await
            .unwrap();

        assert_eq!(decision.provider, "healthy");
        assert_eq!(decision.attempts.len(), 2);
        assert!(!decision.attempts[0].succeeded);
        assert!(decision.attempts[1].succeeded);
        assert_eq!(*broken.calls.lock().unwrap(), 1);

        let stats = ledger.stats();
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.failed_attempts, 1);
    }

    #[tokio::test]
    async fn blank_response_counts_as_failure() {
        let (router, _) = router_with(
            vec![Arc::new(BlankProvider) as Arc<dyn Provider>],
            Arc::new(SucceedingGuaranteed),
            SIMPLE,
        );

        let decision = router
            .route("hello", vec![PromptMessage::user("hello")], 0.7)
            .await
            .unwrap();

        assert_eq!(decision.provider, "local");
        assert!(!decision.attempts[0].succeeded);
        assert!(
            decision.attempts[0]
                .error
                .as_deref()
                .unwrap()
                .contains("empty")
        );
    }

    #[tokio::test]
    async fn hanging_provider_is_timed_out() {
        let (router, _) = router_with(
            vec![Arc::new(HangingProvider) as Arc<dyn Provider>],
            Arc::new(SucceedingGuaranteed),
            SIMPLE,
        );

        let decision = router
            .route("hello", vec![PromptMessage::user("hello")], 0.7)
            .await
            .unwrap();

        assert_eq!(decision.provider, "local");
        assert!(
            decision.attempts[0]
                .error
                .as_deref()
                .unwrap()
                .contains("no response within")
        );
    }

    #[tokio::test]
    async fn total_exhaustion_records_every_attempt() {
        let (router, ledger) = router_with(
            vec![Arc::new(FailingProvider::new("broken", ProviderTier::Fast)) as Arc<dyn Provider>],
            Arc::new(FailingGuaranteed),
            SIMPLE,
        );

        let err = router
            .route("hello", vec![PromptMessage::user("hello")], 0.7)
            .await
            .unwrap_err();

        match err {
            RouteError::AllProvidersExhausted { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].provider, "broken");
                assert_eq!(attempts[1].provider, "local");
            }
        }

        let stats = ledger.stats();
        assert_eq!(stats.total_queries, 1);
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.failed_attempts, 2);
    }

    #[tokio::test]
    async fn complex_classification_walks_the_ladder() {
        let reasoning = Arc::new(FailingProvider::new("reason-a", ProviderTier::Reasoning));
        let mid = Arc::new(SucceedingProvider::new("mid-a", ProviderTier::Mid));
        let (router, _) = router_with(
            vec![
                Arc::clone(&reasoning) as Arc<dyn Provider>,
                Arc::clone(&mid) as Arc<dyn Provider>,
            ],
            Arc::new(SucceedingGuaranteed),
            r#"{"complexity": "complex", "requires_deep_reasoning": true}"#,
        );

        let decision = router
            .route("prove it", vec![PromptMessage::user("prove it")], 0.7)
            .await
            .unwrap();

        assert_eq!(decision.provider, "mid-a");
        assert_eq!(*reasoning.calls.lock().unwrap(), 1);
    }
}

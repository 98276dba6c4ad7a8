//! Query classification via a cheap fast-tier model.
//!
//! Classification is advisory: it only picks which fallback chain to walk.
//! Any failure — the classifier timing out, erroring, or returning prose
//! instead of JSON — degrades to `Classification::default()` and the
//! request proceeds. A classifier outage must never take down chat.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use stratachat_core::classify::{Classification, Complexity, TopicType};
use stratachat_core::provider::{CompletionRequest, Provider};
use tracing::{debug, warn};

const CLASSIFIER_INSTRUCTION: &str = "\
You are a query classifier. Respond with ONLY a JSON object, no prose:
{\"complexity\": \"simple\"|\"medium\"|\"complex\",
 \"topic_type\": \"dialogue\"|\"technical\"|\"creative\"|\"factual\"|\"analytical\",
 \"requires_memory\": true|false,
 \"requires_deep_reasoning\": true|false,
 \"estimated_tokens\": <expected response length in tokens, 50-4000>}

Classify this query:
";

/// Classifies queries with a fast-tier model under a short timeout.
pub struct QueryClassifier {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl QueryClassifier {
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Classify a query. Infallible: all failure modes collapse into the
    /// default classification.
    pub async fn classify(&self, query: &str) -> Classification {
        let request = CompletionRequest::from_prompt(format!("{CLASSIFIER_INSTRUCTION}{query}"))
            .with_temperature(0.0)
            .with_max_tokens(150);

        let response =
            match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(error = %e, "Classifier call failed, using default classification");
                    return Classification::default();
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.timeout.as_secs(),
                        "Classifier timed out, using default classification"
                    );
                    return Classification::default();
                }
            };

        match parse_classification(&response.text) {
            Some(classification) => {
                debug!(?classification, "Query classified");
                classification
            }
            None => {
                warn!("Classifier returned unparsable output, using default classification");
                Classification::default()
            }
        }
    }
}

/// Wire format the classifier model is asked to produce. Every field is
/// optional so a partially-valid object still yields a usable result.
#[derive(Deserialize)]
struct ClassifierWire {
    #[serde(default)]
    complexity: Option<String>,
    #[serde(default)]
    topic_type: Option<String>,
    #[serde(default)]
    requires_memory: Option<bool>,
    #[serde(default)]
    requires_deep_reasoning: Option<bool>,
    #[serde(default)]
    estimated_tokens: Option<u32>,
}

/// Extract and parse the first `{...}` block in the model output. Models
/// often wrap JSON in markdown fences or add commentary; we tolerate both.
fn parse_classification(text: &str) -> Option<Classification> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    let wire: ClassifierWire = serde_json::from_str(&text[start..=end]).ok()?;
    let defaults = Classification::default();

    let complexity = match wire.complexity.as_deref() {
        Some("simple") => Complexity::Simple,
        Some("medium") => Complexity::Medium,
        Some("complex") => Complexity::Complex,
        _ => defaults.complexity,
    };

    let topic_type = match wire.topic_type.as_deref() {
        Some("dialogue") => TopicType::Dialogue,
        Some("technical") => TopicType::Technical,
        Some("creative") => TopicType::Creative,
        Some("factual") => TopicType::Factual,
        Some("analytical") => TopicType::Analytical,
        _ => defaults.topic_type,
    };

    Some(Classification {
        complexity,
        topic_type,
        requires_memory: wire.requires_memory.unwrap_or(defaults.requires_memory),
        requires_deep_reasoning: wire
            .requires_deep_reasoning
            .unwrap_or(defaults.requires_deep_reasoning),
        estimated_tokens: wire
            .estimated_tokens
            .unwrap_or(defaults.estimated_tokens)
            .clamp(50, 4000),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stratachat_core::error::ProviderError;
    use stratachat_core::provider::{CompletionResponse, ProviderTier};

    struct CannedProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-model"
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
                model: "canned-model".into(),
                prompt_tokens: None,
                completion_tokens: None,
                cache_hit: false,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        fn model(&self) -> &str {
            "failing-model"
        }
        fn tier(&self) -> ProviderTier {
            ProviderTier::Fast
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Err(ProviderError::Unavailable("down".into()))
        }
    }

    fn classifier(reply: &str) -> QueryClassifier {
        QueryClassifier::new(
            Arc::new(CannedProvider {
                reply: reply.into(),
            }),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn parses_well_formed_json() {
        let c = classifier(
            r#"{"complexity": "complex", "topic_type": "technical",
                "requires_memory": false, "requires_deep_reasoning": true,
                "estimated_tokens": 1200}"#,
        );
        let result = c.classify("prove this theorem").await;
        assert_eq!(result.complexity, Complexity::Complex);
        assert_eq!(result.topic_type, TopicType::Technical);
        assert!(!result.requires_memory);
        assert!(result.requires_deep_reasoning);
        assert_eq!(result.estimated_tokens, 1200);
    }

    #[tokio::test]
    async fn tolerates_markdown_fences() {
        let c = classifier(
            "```json\n{\"complexity\": \"simple\", \"topic_type\": \"dialogue\"}\n```",
        );
        let result = c.classify("hi").await;
        assert_eq!(result.complexity, Complexity::Simple);
        // Unspecified fields fall back to defaults.
        assert!(result.requires_memory);
    }

    #[tokio::test]
    async fn prose_output_degrades_to_default() {
        let c = classifier("I think this query is fairly simple.");
        let result = c.classify("hi").await;
        assert_eq!(result, Classification::default());
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_default() {
        let c = QueryClassifier::new(Arc::new(FailingProvider), Duration::from_secs(5));
        let result = c.classify("hi").await;
        assert_eq!(result, Classification::default());
    }

    #[tokio::test]
    async fn estimated_tokens_clamped() {
        let c = classifier(r#"{"estimated_tokens": 999999}"#);
        let result = c.classify("hi").await;
        assert_eq!(result.estimated_tokens, 4000);
    }

    #[test]
    fn unknown_enum_values_fall_back() {
        let parsed = parse_classification(
            r#"{"complexity": "galactic", "topic_type": "quantum"}"#,
        )
        .unwrap();
        let defaults = Classification::default();
        assert_eq!(parsed.complexity, defaults.complexity);
        assert_eq!(parsed.topic_type, defaults.topic_type);
    }
}

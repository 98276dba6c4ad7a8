//! The chat engine — ties memory, routing, and the ledger together.
//!
//! One `chat()` call: assemble tiered context, route to a provider through
//! the fallback chain, then record both sides of the exchange back into
//! memory. The engine is `Arc`-shared across the gateway and CLI.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratachat_config::AppConfig;
use stratachat_core::classify::Classification;
use stratachat_core::error::Error;
use stratachat_core::provider::PromptMessage;
use stratachat_core::{SessionId, Turn};
use stratachat_ledger::{LedgerStats, PricingTable, RecordingProvider, UsageLedger};
use stratachat_memory::{InMemoryVectorIndex, TieredMemory};
use stratachat_providers::{ProviderRegistry, build_embedder};
use stratachat_router::{ProviderAttempt, QueryClassifier, Router};
use tracing::debug;

const SYSTEM_PREAMBLE: &str =
    "You are StrataChat, a helpful assistant with tiered conversational memory.";

/// The reply returned for one chat call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub cache_hit: bool,
    pub classification: Classification,
    /// Every provider attempt made for this reply, in order.
    pub attempts: Vec<ProviderAttempt>,
    /// Prompt plus completion tokens of the winning attempt.
    pub tokens: u32,
    /// Approximate tokens of memory context included in the prompt.
    pub memory_tokens: usize,
}

/// The top-level orchestrator.
pub struct ChatEngine {
    memory: Arc<TieredMemory>,
    router: Router,
    ledger: Arc<UsageLedger>,
    default_temperature: f32,
}

impl ChatEngine {
    /// Wire up an engine from configuration: registry, ledger with pricing
    /// overrides, classifier and summarizer on the fast tier, embedder and
    /// in-process vector index behind the memory manager.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let registry = Arc::new(ProviderRegistry::from_config(config)?);
        let ledger = Arc::new(UsageLedger::with_pricing(PricingTable::from_config(config)));

        let request_timeout = Duration::from_secs(config.routing.request_timeout_secs);

        // Classification and summarization ride the fast tier; wrapping the
        // provider keeps their spend in the same ledger as routed attempts.
        let fast_provider =
            RecordingProvider::wrap(registry.classifier_provider(), Arc::clone(&ledger));
        let classifier = QueryClassifier::new(
            Arc::clone(&fast_provider),
            Duration::from_secs(config.routing.classifier_timeout_secs),
        );

        let memory = Arc::new(TieredMemory::new(
            Arc::new(InMemoryVectorIndex::new()),
            build_embedder(config),
            fast_provider,
            config.memory.clone(),
            request_timeout,
        ));

        let router = Router::new(
            Arc::clone(&registry),
            classifier,
            Arc::clone(&ledger),
            request_timeout,
        );

        Ok(Self {
            memory,
            router,
            ledger,
            default_temperature: config.default_temperature,
        })
    }

    /// Assemble the parts directly; used by tests and embedders.
    pub fn new(
        memory: Arc<TieredMemory>,
        router: Router,
        ledger: Arc<UsageLedger>,
        default_temperature: f32,
    ) -> Self {
        Self {
            memory,
            router,
            ledger,
            default_temperature,
        }
    }

    /// Handle one user message in a session.
    ///
    /// Memory is recorded only after routing succeeds, so a fully failed
    /// request leaves the session exactly as it was.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatReply, Error> {
        let sid = SessionId::new(session_id);

        let context = self.memory.context_for(&sid, message, true).await;
        debug!(
            session = %sid,
            hot_turns = context.turns.len(),
            recalled = context.recalled.len(),
            memory_tokens = context.memory_tokens,
            "Assembled context"
        );

        let mut messages: Vec<PromptMessage> = Vec::new();

        let mut preamble = String::from(SYSTEM_PREAMBLE);
        if let Some(summary) = &context.warm_summary {
            preamble.push_str("\n\nSummary of the conversation so far:\n");
            preamble.push_str(summary);
        }
        if !context.recalled.is_empty() {
            preamble.push_str("\n\nRelevant memories from earlier in this session:\n");
            for memory in &context.recalled {
                preamble.push_str("- ");
                preamble.push_str(&memory.text);
                preamble.push('\n');
            }
        }
        messages.push(PromptMessage::system(preamble));

        for turn in &context.turns {
            messages.push(PromptMessage {
                role: turn.role,
                content: turn.text.clone(),
            });
        }
        messages.push(PromptMessage::user(message));

        let decision = self
            .router
            .route(message, messages, self.default_temperature)
            .await?;

        self.memory.record(&sid, Turn::user(message)).await;
        self.memory
            .record(&sid, Turn::assistant(decision.response_text.clone()))
            .await;

        Ok(ChatReply {
            text: decision.response_text,
            provider: decision.provider,
            model: decision.model,
            cache_hit: decision.cache_hit,
            classification: decision.classification,
            attempts: decision.attempts,
            tokens: decision.prompt_tokens + decision.completion_tokens,
            memory_tokens: context.memory_tokens,
        })
    }

    /// Aggregate usage statistics.
    pub fn stats(&self) -> LedgerStats {
        self.ledger.stats()
    }

    /// Drop a session's hot and warm memory. Idempotent.
    pub fn clear_session(&self, session_id: &str) {
        self.memory.clear(&SessionId::new(session_id));
    }

    pub fn session_count(&self) -> usize {
        self.memory.session_count()
    }
}

//! The tiered memory manager.
//!
//! Owns the session map and drives the hot → warm → cold flow. Per-session
//! state sits behind its own async mutex so sessions never contend with
//! each other; the outer map lock is held only for lookup and insert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use stratachat_config::MemoryConfig;
use stratachat_core::provider::{CompletionRequest, Embedder, Provider};
use stratachat_core::token;
use stratachat_core::{RecalledMemory, SessionId, Turn, VectorIndex};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::session::{SessionState, WarmSummary};

const SUMMARY_PROMPT: &str = "\
Condense the conversation below into a compact summary of facts, names, \
decisions, and context worth remembering. Keep it under 200 words. Merge \
the prior summary if one is given; drop nothing a future reply might need.\n";

/// Everything the memory tiers contribute to one prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The warm summary, when one exists.
    pub warm_summary: Option<String>,
    /// Hot-tier turns, oldest first.
    pub turns: Vec<Turn>,
    /// Cold-tier recalls above the score threshold, best first.
    pub recalled: Vec<RecalledMemory>,
    /// Approximate token total across all three parts.
    pub memory_tokens: usize,
}

/// One session's slot in the map. `last_active` lives outside the state
/// mutex so LRU eviction never has to lock a session to rank it.
struct SessionSlot {
    state: Mutex<SessionState>,
    last_active_ms: AtomicI64,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::new()),
            last_active_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    fn touch(&self) {
        self.last_active_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// The tiered memory manager.
pub struct TieredMemory {
    sessions: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
    index: Arc<dyn VectorIndex>,
    embedder: Option<Arc<dyn Embedder>>,
    summarizer: Arc<dyn Provider>,
    config: MemoryConfig,
    summarize_timeout: Duration,
}

impl TieredMemory {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Option<Arc<dyn Embedder>>,
        summarizer: Arc<dyn Provider>,
        config: MemoryConfig,
        summarize_timeout: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            index,
            embedder,
            summarizer,
            config,
            summarize_timeout,
        }
    }

    /// Assemble context for a query: warm summary, hot turns, and (when an
    /// embedder is available and recall is wanted) cold-tier memories.
    ///
    /// An embedding failure skips recall with a warning; it never fails the
    /// request.
    pub async fn context_for(
        &self,
        session_id: &SessionId,
        query: &str,
        include_recall: bool,
    ) -> AssembledContext {
        // Read-only: an unknown session gets empty hot/warm context without
        // allocating state for it.
        let (warm_summary, turns, mut memory_tokens) = match self.peek_slot(session_id) {
            Some(slot) => {
                let state = slot.state.lock().await;
                let warm = state.warm.as_ref().map(|w| w.text.clone());
                let warm_tokens = state.warm.as_ref().map_or(0, WarmSummary::approx_tokens);
                (
                    warm,
                    state.hot.snapshot(),
                    warm_tokens + state.hot.total_tokens(),
                )
            }
            None => (None, Vec::new(), 0),
        };

        let recalled = if include_recall {
            self.recall(session_id, query, &turns, warm_summary.as_deref())
                .await
        } else {
            Vec::new()
        };
        memory_tokens += recalled
            .iter()
            .map(|r| token::estimate_tokens(&r.text))
            .sum::<usize>();

        AssembledContext {
            warm_summary,
            turns,
            recalled,
            memory_tokens,
        }
    }

    async fn recall(
        &self,
        session_id: &SessionId,
        query: &str,
        hot_turns: &[Turn],
        warm_summary: Option<&str>,
    ) -> Vec<RecalledMemory> {
        let Some(embedder) = &self.embedder else {
            return Vec::new();
        };

        let embedding = match embedder.embed(query).await {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, skipping cold recall");
                return Vec::new();
            }
        };

        match self
            .index
            .query(session_id, &embedding, self.config.recall_limit)
            .await
        {
            Ok(results) => results
                .into_iter()
                .filter(|r| r.score >= self.config.recall_min_score)
                .filter(|r| !hot_turns.iter().any(|t| t.text == r.text))
                .filter(|r| warm_summary.is_none_or(|w| !w.contains(r.text.as_str())))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Cold index query failed, skipping recall");
                Vec::new()
            }
        }
    }

    /// Record one turn: append to hot, kick off a detached cold-index
    /// write, and fold hot into warm if the buffer overflows the budget.
    pub async fn record(&self, session_id: &SessionId, turn: Turn) {
        let slot = self.slot(session_id);
        slot.touch();

        self.spawn_index_write(session_id, &turn);

        let mut state = slot.state.lock().await;
        state.touch();
        state.hot.push(turn);

        if state.hot.over_budget(self.config.hot_budget_tokens) {
            self.fold(session_id, &mut state).await;
        }
    }

    /// The detached cold-tier write. Failures are logged and dropped — the
    /// turn is already safe in hot.
    fn spawn_index_write(&self, session_id: &SessionId, turn: &Turn) {
        let Some(embedder) = &self.embedder else {
            return;
        };
        let embedder = Arc::clone(embedder);
        let index = Arc::clone(&self.index);
        let session_id = session_id.clone();
        let text = turn.text.clone();

        tokio::spawn(async move {
            let embedding = match embedder.embed(&text).await {
                Ok(e) => e,
                Err(e) => {
                    warn!(session = %session_id, error = %e, "Cold index write skipped: embed failed");
                    return;
                }
            };
            if let Err(e) = index.upsert(&session_id, &text, embedding).await {
                warn!(session = %session_id, error = %e, "Cold index write failed");
            }
        });
    }

    /// Fold the oldest hot turns into the warm summary.
    ///
    /// Nothing is removed from hot until the summarizer has succeeded: a
    /// failed or blank summarization leaves the buffer oversized and is
    /// retried on the next record.
    async fn fold(&self, session_id: &SessionId, state: &mut SessionState) -> bool {
        let split = state
            .hot
            .fold_split(self.config.keep_recent_turns, self.config.hot_budget_tokens);
        if split == 0 {
            return false;
        }

        let mut prompt = String::from(SUMMARY_PROMPT);
        if let Some(warm) = &state.warm {
            prompt.push_str("\nPrior summary:\n");
            prompt.push_str(&warm.text);
            prompt.push('\n');
        }
        prompt.push_str("\nConversation:\n");
        for turn in state.hot.iter().take(split) {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.text));
        }

        let request = CompletionRequest::from_prompt(prompt)
            .with_temperature(0.3)
            .with_max_tokens(512);

        let summary =
            match tokio::time::timeout(self.summarize_timeout, self.summarizer.complete(request))
                .await
            {
                Ok(Ok(response)) if !response.text.trim().is_empty() => response.text,
                Ok(Ok(_)) => {
                    warn!(session = %session_id, "Summarizer returned blank text, fold deferred");
                    return false;
                }
                Ok(Err(e)) => {
                    warn!(session = %session_id, error = %e, "Summarization failed, fold deferred");
                    return false;
                }
                Err(_) => {
                    warn!(
                        session = %session_id,
                        timeout_secs = self.summarize_timeout.as_secs(),
                        "Summarization timed out, fold deferred"
                    );
                    return false;
                }
            };

        match &mut state.warm {
            Some(warm) => warm.refold(summary),
            None => state.warm = Some(WarmSummary::new(summary)),
        }
        let evicted = state.hot.evict_front(split);
        info!(
            session = %session_id,
            folded_turns = evicted.len(),
            hot_tokens = state.hot.total_tokens(),
            "Folded hot turns into warm summary"
        );
        true
    }

    /// Force a fold now, regardless of budget. Returns whether anything
    /// was folded.
    pub async fn summarize(&self, session_id: &SessionId) -> bool {
        let Some(slot) = self.peek_slot(session_id) else {
            return false;
        };
        let mut state = slot.state.lock().await;
        self.fold(session_id, &mut state).await
    }

    /// Drop a session's hot and warm state. Idempotent; clearing an unknown
    /// session is a no-op. Cold entries are retained — the index exposes no
    /// deletion.
    pub fn clear(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if sessions.remove(session_id).is_some() {
            debug!(session = %session_id, "Cleared session memory");
        }
    }

    /// Number of sessions with live hot/warm state.
    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn peek_slot(&self, session_id: &SessionId) -> Option<Arc<SessionSlot>> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).map(|slot| {
            slot.touch();
            Arc::clone(slot)
        })
    }

    fn slot(&self, session_id: &SessionId) -> Arc<SessionSlot> {
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = sessions.get(session_id) {
                slot.touch();
                return Arc::clone(slot);
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if !sessions.contains_key(session_id) && sessions.len() >= self.config.max_sessions {
            self.evict_lru(&mut sessions);
        }
        Arc::clone(
            sessions
                .entry(session_id.clone())
                .or_insert_with(|| Arc::new(SessionSlot::new())),
        )
    }

    /// Drop the least-recently-active session's hot/warm state. Its cold
    /// partition survives for recall if the session ever returns.
    fn evict_lru(&self, sessions: &mut HashMap<SessionId, Arc<SessionSlot>>) {
        let lru = sessions
            .iter()
            .min_by_key(|(_, slot)| slot.last_active_ms.load(Ordering::Relaxed))
            .map(|(id, _)| id.clone());
        if let Some(id) = lru {
            sessions.remove(&id);
            info!(session = %id, "Evicted idle session at capacity");
        }
    }
}

//! In-process vector index — the cold tier's default backing store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use stratachat_core::error::IndexError;
use stratachat_core::index::{ColdEntry, RecalledMemory, VectorIndex};
use stratachat_core::turn::SessionId;
use tokio::sync::RwLock;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal.
/// Returns 0.0 if either vector is zero-length, empty, or the lengths
/// don't match.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// An in-memory vector index partitioned by session.
///
/// Brute-force scan per query. Fine for the session scale this serves;
/// a real ANN store would implement the same trait.
pub struct InMemoryVectorIndex {
    partitions: RwLock<HashMap<SessionId, Vec<ColdEntry>>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        session_id: &SessionId,
        text: &str,
        embedding: Vec<f32>,
    ) -> Result<(), IndexError> {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(session_id.clone())
            .or_default()
            .push(ColdEntry {
                session_id: session_id.clone(),
                text: text.to_string(),
                embedding,
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn query(
        &self,
        session_id: &SessionId,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RecalledMemory>, IndexError> {
        let partitions = self.partitions.read().await;
        let Some(entries) = partitions.get(session_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<RecalledMemory> = entries
            .iter()
            .map(|e| RecalledMemory {
                text: e.text.clone(),
                score: cosine_similarity(&e.embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self, session_id: &SessionId) -> Result<usize, IndexError> {
        let partitions = self.partitions.read().await;
        Ok(partitions.get(session_id).map_or(0, Vec::len))
    }
}

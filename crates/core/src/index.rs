//! Vector index trait — the cold-tier nearest-neighbor store.
//!
//! The index is an opaque collaborator: the memory manager upserts every
//! recorded turn and queries top-K by embedding similarity. Both operations
//! are best-effort from the core's perspective — persistence, sharding, and
//! durability are the implementation's concern.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::turn::SessionId;

/// A write-once cold-tier entry. Never mutated; may be semantically
/// superseded but not deleted by normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColdEntry {
    pub session_id: SessionId,
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A scored recall candidate returned from an index query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalledMemory {
    pub text: String,
    /// Cosine similarity to the query embedding, higher is closer.
    pub score: f32,
}

/// The nearest-neighbor store behind the cold tier.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append a new entry to a session's partition.
    async fn upsert(
        &self,
        session_id: &SessionId,
        text: &str,
        embedding: Vec<f32>,
    ) -> std::result::Result<(), IndexError>;

    /// Top-k entries in a session's partition, ordered by descending
    /// similarity to `embedding`.
    async fn query(
        &self,
        session_id: &SessionId,
        embedding: &[f32],
        k: usize,
    ) -> std::result::Result<Vec<RecalledMemory>, IndexError>;

    /// Number of entries stored for a session.
    async fn count(&self, session_id: &SessionId) -> std::result::Result<usize, IndexError>;
}

//! Tiered conversational memory for StrataChat.
//!
//! Three tiers per session:
//! - **hot**: recent turns kept verbatim in a token-budgeted buffer
//! - **warm**: a rolling summary that absorbs turns folded out of hot
//! - **cold**: embedded turns in a vector index for semantic recall
//!
//! The manager assembles context from all three, records new turns, and
//! folds hot into warm when the budget overflows.

pub mod hot;
pub mod index;
pub mod manager;
pub mod session;

pub use hot::HotBuffer;
pub use index::{InMemoryVectorIndex, cosine_similarity};
pub use manager::{AssembledContext, TieredMemory};
pub use session::{SessionState, WarmSummary};

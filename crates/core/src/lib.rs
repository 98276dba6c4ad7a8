//! # StrataChat Core
//!
//! Domain types, traits, and error definitions for the StrataChat
//! conversational memory & adaptive routing engine. This crate has **zero
//! framework dependencies** — it defines the domain model that all other
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability (LLM completion, embedding, vector storage) is
//! defined as a trait here. Implementations live in their respective crates.
//! This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod classify;
pub mod error;
pub mod index;
pub mod provider;
pub mod token;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use classify::{Classification, Complexity, TopicType};
pub use error::{EmbedError, Error, IndexError, ProviderError, Result, RouteError};
pub use index::{ColdEntry, RecalledMemory, VectorIndex};
pub use provider::{
    CompletionRequest, CompletionResponse, Embedder, PromptMessage, Provider, ProviderTier,
};
pub use turn::{Role, SessionId, Turn};

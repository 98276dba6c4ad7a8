//! LLM provider implementations for StrataChat.
//!
//! All providers implement the `stratachat_core::Provider` trait and
//! translate their native error formats into the uniform four-variant
//! taxonomy. The tier registry groups them into the ordered lists the
//! router builds fallback chains from.

pub mod anthropic;
pub mod embedding;
pub mod local;
pub mod openai_compat;
pub mod registry;

pub use anthropic::AnthropicProvider;
pub use embedding::{OpenAiEmbedder, build_embedder};
pub use local::LocalProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::ProviderRegistry;

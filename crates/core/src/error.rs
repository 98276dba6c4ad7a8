//! Error types for the StrataChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all StrataChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Routing errors ---
    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    // --- Embedding errors ---
    #[error("Embedding error: {0}")]
    Embed(#[from] EmbedError),

    // --- Vector index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// The uniform failure signal every concrete provider translates into.
///
/// The router never special-cases a provider's native error format: whatever
/// the backend returns (HTTP status, connection error, malformed body) is
/// mapped to one of these four variants at the provider boundary.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

/// Errors from the ordered fallback router.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Every candidate in the chain failed. Carries the ordered per-provider
    /// failure list so an operator can diagnose which providers were tried.
    #[error("All providers exhausted after {} attempts", attempts.len())]
    AllProvidersExhausted { attempts: Vec<AttemptFailure> },
}

/// One failed attempt in an exhausted chain.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub provider: String,
    pub reason: String,
}

/// Errors from the embedding capability.
#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the vector index collaborator.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Index write failed: {0}")]
    WriteFailed(String),

    #[error("Index query failed: {0}")]
    QueryFailed(String),
}

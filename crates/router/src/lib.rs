//! Query classification and adaptive provider routing.
//!
//! Every user query is classified by a cheap fast-tier model, a fallback
//! chain is assembled from the classification, and the chain is walked in
//! order until a provider returns usable text. The guaranteed local
//! provider terminates every chain, so routing degrades rather than dies.

pub mod chain;
pub mod classifier;
pub mod route;

pub use chain::build_chain;
pub use classifier::QueryClassifier;
pub use route::{ProviderAttempt, Router, RoutingDecision};

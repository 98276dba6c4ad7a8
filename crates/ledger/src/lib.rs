//! Usage and cost ledger for StrataChat.
//!
//! Every provider attempt — successful or failed — is appended here as a
//! `UsageRecord`. The ledger computes aggregate statistics on demand:
//! query counts, cache hit rate, total spend, and a naive monthly cost
//! extrapolation.

pub mod ledger;
pub mod model;
pub mod pricing;
pub mod recording;

pub use ledger::UsageLedger;
pub use model::{LedgerStats, UsageRecord};
pub use pricing::{ModelPricing, PricingTable};
pub use recording::RecordingProvider;

/// Ledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Failed to serialize ledger data: {0}")]
    Serialization(String),
}

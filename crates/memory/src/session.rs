//! Per-session memory state: hot buffer plus warm summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratachat_core::token;

use crate::hot::HotBuffer;

/// The warm tier — a rolling summary of everything folded out of hot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmSummary {
    pub text: String,
    /// How many folds produced this summary.
    pub folds: u32,
    pub updated_at: DateTime<Utc>,
}

impl WarmSummary {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            folds: 1,
            updated_at: Utc::now(),
        }
    }

    /// Replace the summary text after another fold.
    pub fn refold(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.folds += 1;
        self.updated_at = Utc::now();
    }

    pub fn approx_tokens(&self) -> usize {
        token::estimate_tokens(&self.text)
    }
}

/// All mutable memory state for one session. Guarded by a per-session
/// async mutex in the manager; never shared across sessions.
#[derive(Debug, Default)]
pub struct SessionState {
    pub hot: HotBuffer,
    pub warm: Option<WarmSummary>,
    pub last_active: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self) {
        self.last_active = Some(Utc::now());
    }
}

//! Turn and session domain types.
//!
//! These are the core value objects that flow through the entire system:
//! a user message becomes a [`Turn`], turns accumulate in a session's hot
//! buffer, get folded into its warm summary, and are indexed into cold
//! storage for semantic recall.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::token;

/// Unique identifier for a chat session. Supplied by the caller; sessions
/// are created lazily on first use of a new identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The role of a turn's speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions (summaries, preambles)
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single conversation turn. Immutable once created; owned by the session
/// that created it. Copies (not moves) may be embedded into the cold index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: Role,

    /// The text content
    pub text: String,

    /// When this turn was created
    pub created_at: DateTime<Utc>,

    /// Heuristic token count (4 chars ≈ 1 token, plus message overhead),
    /// computed once at construction and used for hot-budget accounting.
    pub approx_tokens: usize,
}

impl Turn {
    /// Create a turn with the given role, computing the token estimate.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        let text = text.into();
        let approx_tokens = token::estimate_turn_tokens(&text);
        Self {
            role,
            text,
            created_at: Utc::now(),
            approx_tokens,
        }
    }

    /// Create a new user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create a new assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Create a new system turn.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }
}

//! Query classification types.
//!
//! A classification is structured metadata describing a query's complexity,
//! topic, and memory needs. The router uses it to select the fallback chain;
//! it is produced by one cheap-model call and degrades to a safe default when
//! that call fails in any way.

use serde::{Deserialize, Serialize};

/// How hard the query is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// What kind of query this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    /// Everyday conversation, greetings, chit-chat
    Dialogue,
    /// Programming, engineering, scientific detail
    Technical,
    /// Writing, brainstorming, open-ended generation
    Creative,
    /// Lookup-style questions with a factual answer
    Factual,
    /// Multi-step analysis, comparison, planning
    Analytical,
}

/// Structured metadata about an incoming query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub complexity: Complexity,

    #[serde(rename = "topic_type")]
    pub topic_type: TopicType,

    pub requires_memory: bool,

    pub requires_deep_reasoning: bool,

    pub estimated_tokens: u32,
}

impl Default for Classification {
    /// The documented fallback used whenever classification fails:
    /// medium/dialogue, memory on, deep reasoning off, 500 tokens.
    fn default() -> Self {
        Self {
            complexity: Complexity::Medium,
            topic_type: TopicType::Dialogue,
            requires_memory: true,
            requires_deep_reasoning: false,
            estimated_tokens: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classification_matches_contract() {
        let c = Classification::default();
        assert_eq!(c.complexity, Complexity::Medium);
        assert_eq!(c.topic_type, TopicType::Dialogue);
        assert!(c.requires_memory);
        assert!(!c.requires_deep_reasoning);
        assert_eq!(c.estimated_tokens, 500);
    }

    #[test]
    fn classification_parses_from_json() {
        let json = r#"{
            "complexity": "complex",
            "topic_type": "technical",
            "requires_memory": false,
            "requires_deep_reasoning": true,
            "estimated_tokens": 1200
        }"#;
        let c: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(c.complexity, Complexity::Complex);
        assert_eq!(c.topic_type, TopicType::Technical);
        assert!(c.requires_deep_reasoning);
        assert_eq!(c.estimated_tokens, 1200);
    }

    #[test]
    fn complexity_serializes_lowercase() {
        let json = serde_json::to_string(&Complexity::Simple).unwrap();
        assert_eq!(json, "\"simple\"");
    }
}

//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token.
//! This approximation is accurate within ~10% for BPE tokenizers
//! (GPT-4, Claude, Llama) on English text. It is used everywhere a provider
//! does not report exact usage: hot-buffer accounting, cost estimation for
//! usage-less responses, and classification token hints.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for one conversation turn including per-message overhead.
///
/// Each turn costs ~4 tokens of overhead for role name, delimiters, and
/// formatting markers in the API wire format.
pub fn estimate_turn_tokens(text: &str) -> usize {
    const OVERHEAD: usize = 4;
    OVERHEAD + estimate_tokens(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn hundred_chars() {
        let text = "a".repeat(100);
        assert_eq!(estimate_tokens(&text), 25);
    }

    #[test]
    fn turn_includes_overhead() {
        // 4 chars → 1 token + 4 overhead = 5
        assert_eq!(estimate_turn_tokens("test"), 5);
    }
}

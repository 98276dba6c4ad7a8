//! The hot tier — recent turns verbatim, under a token budget.

use std::collections::VecDeque;

use stratachat_core::Turn;

/// A token-budgeted FIFO of verbatim turns.
///
/// The buffer itself never drops turns; it only reports overflow and
/// computes the fold split. Eviction is the manager's call, because turns
/// leaving the buffer must land in the warm summary first.
#[derive(Debug, Default)]
pub struct HotBuffer {
    turns: VecDeque<Turn>,
    total_tokens: usize,
}

impl HotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.total_tokens += turn.approx_tokens;
        self.turns.push_back(turn);
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn over_budget(&self, budget: usize) -> bool {
        self.total_tokens > budget
    }

    /// Turns in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// How many turns from the front would be evicted by a fold that keeps
    /// the newest turns up to `keep_recent` turns *and* `budget` tokens,
    /// whichever limit bites first.
    ///
    /// The newest turn is always kept even if it alone exceeds the budget;
    /// there is nothing newer to keep instead.
    pub fn fold_split(&self, keep_recent: usize, budget: usize) -> usize {
        let mut kept = 0usize;
        let mut kept_tokens = 0usize;

        for turn in self.turns.iter().rev() {
            if kept >= keep_recent {
                break;
            }
            if kept > 0 && kept_tokens + turn.approx_tokens > budget {
                break;
            }
            kept += 1;
            kept_tokens += turn.approx_tokens;
        }

        self.turns.len() - kept
    }

    /// Remove and return the oldest `n` turns.
    pub fn evict_front(&mut self, n: usize) -> Vec<Turn> {
        let evicted: Vec<Turn> = self.turns.drain(..n.min(self.turns.len())).collect();
        self.total_tokens -= evicted.iter().map(|t| t.approx_tokens).sum::<usize>();
        evicted
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.total_tokens = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn_with_tokens(tokens: usize) -> Turn {
        // estimate_turn_tokens = 4 + ceil(len/4), so len = (tokens-4)*4
        Turn::user("x".repeat((tokens - 4) * 4))
    }

    #[test]
    fn push_accumulates_tokens() {
        let mut hot = HotBuffer::new();
        hot.push(turn_with_tokens(10));
        hot.push(turn_with_tokens(20));
        assert_eq!(hot.total_tokens(), 30);
        assert_eq!(hot.len(), 2);
    }

    #[test]
    fn over_budget_detection() {
        let mut hot = HotBuffer::new();
        hot.push(turn_with_tokens(50));
        assert!(!hot.over_budget(50));
        assert!(hot.over_budget(49));
    }

    #[test]
    fn fold_split_respects_keep_recent() {
        let mut hot = HotBuffer::new();
        for _ in 0..10 {
            hot.push(turn_with_tokens(10));
        }
        // Budget is generous, so the count limit bites: keep 3, evict 7.
        assert_eq!(hot.fold_split(3, 10_000), 7);
    }

    #[test]
    fn fold_split_respects_token_budget() {
        let mut hot = HotBuffer::new();
        for _ in 0..10 {
            hot.push(turn_with_tokens(10));
        }
        // 25-token budget keeps only the 2 newest 10-token turns.
        assert_eq!(hot.fold_split(100, 25), 8);
    }

    #[test]
    fn fold_split_keeps_oversized_newest_turn() {
        let mut hot = HotBuffer::new();
        hot.push(turn_with_tokens(10));
        hot.push(turn_with_tokens(500));
        // The newest turn alone busts the budget but is still kept.
        assert_eq!(hot.fold_split(10, 100), 1);
    }

    #[test]
    fn evict_front_updates_tokens() {
        let mut hot = HotBuffer::new();
        hot.push(turn_with_tokens(10));
        hot.push(turn_with_tokens(20));
        hot.push(turn_with_tokens(30));

        let evicted = hot.evict_front(2);
        assert_eq!(evicted.len(), 2);
        assert_eq!(hot.len(), 1);
        assert_eq!(hot.total_tokens(), 30);
    }

    #[test]
    fn clear_resets() {
        let mut hot = HotBuffer::new();
        hot.push(turn_with_tokens(10));
        hot.clear();
        assert!(hot.is_empty());
        assert_eq!(hot.total_tokens(), 0);
    }
}

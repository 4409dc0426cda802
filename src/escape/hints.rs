//! Hint ledger: which puzzles had their hint revealed this session.

use serde::{Deserialize, Serialize};

use super::types::{Puzzle, PuzzleId};

/// Result of a hint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintReveal {
    pub text: String,
    /// `true` only on the first reveal for this puzzle.
    pub first_reveal: bool,
}

/// Append-only, reveal-ordered set of puzzle ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintLedger {
    revealed: Vec<PuzzleId>,
}

impl HintLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_revealed(revealed: Vec<PuzzleId>) -> Self {
        let mut ledger = Self::new();
        for id in revealed {
            if !ledger.is_revealed(id) {
                ledger.revealed.push(id);
            }
        }
        ledger
    }

    /// Return the puzzle's static hint, recording the puzzle on first request.
    pub fn request_hint(&mut self, puzzle: &Puzzle) -> HintReveal {
        let first_reveal = !self.is_revealed(puzzle.id);
        if first_reveal {
            self.revealed.push(puzzle.id);
        }
        HintReveal {
            text: puzzle.hint.clone(),
            first_reveal,
        }
    }

    pub fn is_revealed(&self, puzzle_id: PuzzleId) -> bool {
        self.revealed.contains(&puzzle_id)
    }

    pub fn len(&self) -> usize {
        self.revealed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revealed.is_empty()
    }

    pub fn revealed(&self) -> &[PuzzleId] {
        &self.revealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::types::PuzzleKind;

    #[test]
    fn repeated_requests_record_once() {
        let puzzle = Puzzle::new(0, "Keypad", PuzzleKind::Code, "1234")
            .with_hint("Count the beakers.");
        let mut ledger = HintLedger::new();

        let first = ledger.request_hint(&puzzle);
        assert!(first.first_reveal);
        for _ in 0..5 {
            let again = ledger.request_hint(&puzzle);
            assert!(!again.first_reveal);
            assert_eq!(again.text, first.text);
        }
        assert_eq!(ledger.revealed(), &[0]);
    }

    #[test]
    fn restore_drops_duplicates() {
        let ledger = HintLedger::from_revealed(vec![2, 0, 2]);
        assert_eq!(ledger.revealed(), &[2, 0]);
        assert_eq!(ledger.len(), 2);
    }
}

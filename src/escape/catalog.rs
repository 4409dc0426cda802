//! Static, ordered puzzle definitions plus the items they reference.
//!
//! The catalog is resolved and validated once at session start and is never
//! mutated afterwards; sessions hold it behind an `Arc` so restarts and
//! snapshot restores share the same definitions.

use std::collections::BTreeMap;

use crate::escape::errors::EscapeError;
use crate::escape::types::{Item, ItemId, Puzzle, PuzzleId};
use crate::validation::validate_catalog;

#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleCatalog {
    puzzles: Vec<Puzzle>,
    items: BTreeMap<ItemId, Item>,
    item_grants: BTreeMap<PuzzleId, ItemId>,
}

impl PuzzleCatalog {
    /// Build a catalog, rejecting content that would break session invariants
    /// (duplicate ids, dangling item references, terminal puzzles without a
    /// solving verb).
    pub fn new(
        puzzles: Vec<Puzzle>,
        items: Vec<Item>,
        item_grants: BTreeMap<PuzzleId, ItemId>,
    ) -> Result<Self, EscapeError> {
        validate_catalog(&puzzles, &items, &item_grants)
            .map_err(EscapeError::InvalidCatalog)?;
        let items = items.into_iter().map(|i| (i.id.clone(), i)).collect();
        Ok(Self {
            puzzles,
            items,
            item_grants,
        })
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    pub fn puzzles(&self) -> &[Puzzle] {
        &self.puzzles
    }

    pub fn get(&self, index: usize) -> Option<&Puzzle> {
        self.puzzles.get(index)
    }

    pub fn index_of(&self, puzzle_id: PuzzleId) -> Option<usize> {
        self.puzzles.iter().position(|p| p.id == puzzle_id)
    }

    pub fn puzzle(&self, puzzle_id: PuzzleId) -> Option<&Puzzle> {
        self.puzzles.iter().find(|p| p.id == puzzle_id)
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.puzzles.len()
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.get(item_id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Item granted when `puzzle_id` is solved, if any.
    pub fn grant_for(&self, puzzle_id: PuzzleId) -> Option<&ItemId> {
        self.item_grants.get(&puzzle_id)
    }

    pub fn item_grants(&self) -> &BTreeMap<PuzzleId, ItemId> {
        &self.item_grants
    }
}

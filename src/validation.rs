//! Content and input validation: catalog integrity checks, room layout checks,
//! player name rules, and filesystem-safe names.

use std::collections::{BTreeMap, HashSet};

use crate::escape::terminal::{is_builtin_verb, normalize_command};
use crate::escape::types::{Item, ItemId, Puzzle, PuzzleId, PuzzleKind, Room};

/// Player name validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlayerNameError {
    #[error("Player name is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Player name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Player name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Player name contains path separators (/ or \\)")]
    PathTraversal,
}

const PLAYER_NAME_MIN: usize = 2;
const PLAYER_NAME_MAX: usize = 30;

/// Validate and normalize a player name (trimmed; storage keys lowercase it).
pub fn validate_player_name(name: &str) -> Result<String, PlayerNameError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < PLAYER_NAME_MIN {
        return Err(PlayerNameError::TooShort {
            min: PLAYER_NAME_MIN,
        });
    }
    if len > PLAYER_NAME_MAX {
        return Err(PlayerNameError::TooLong {
            max: PLAYER_NAME_MAX,
        });
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(PlayerNameError::PathTraversal);
    }
    let bad: String = trimmed
        .chars()
        .filter(|c| c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    if !bad.is_empty() {
        return Err(PlayerNameError::InvalidCharacters {
            chars: bad.escape_debug().to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Generate safe filename from a player name using URL encoding
pub fn safe_filename(name: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    utf8_percent_encode(name, NON_ALPHANUMERIC).to_string()
}

/// Check the puzzle list, item table and grant mapping for consistency.
/// Returns a human-readable reason on the first problem found.
pub fn validate_catalog(
    puzzles: &[Puzzle],
    items: &[Item],
    item_grants: &BTreeMap<PuzzleId, ItemId>,
) -> Result<(), String> {
    if puzzles.is_empty() {
        return Err("catalog has no puzzles".to_string());
    }

    let mut item_ids = HashSet::new();
    for item in items {
        if item.id.trim().is_empty() {
            return Err("item with empty id".to_string());
        }
        if !item_ids.insert(item.id.as_str()) {
            return Err(format!("duplicate item id '{}'", item.id));
        }
    }

    let mut puzzle_ids = HashSet::new();
    for puzzle in puzzles {
        if !puzzle_ids.insert(puzzle.id) {
            return Err(format!("duplicate puzzle id {}", puzzle.id));
        }
        if let Some(required) = &puzzle.required_item_id {
            if !item_ids.contains(required.as_str()) {
                return Err(format!(
                    "puzzle {} requires unknown item '{}'",
                    puzzle.id, required
                ));
            }
        }
        match &puzzle.kind {
            PuzzleKind::Terminal(script) => {
                let verb = script.solving_verb.as_str();
                if verb.trim().is_empty() {
                    return Err(format!("terminal puzzle {} has no solving verb", puzzle.id));
                }
                if normalize_command(verb) != verb {
                    return Err(format!(
                        "terminal puzzle {} solving verb '{}' must be lowercase with single spaces",
                        puzzle.id, verb
                    ));
                }
                if is_builtin_verb(verb) {
                    return Err(format!(
                        "terminal puzzle {} cannot use built-in verb '{}' as solution",
                        puzzle.id, verb
                    ));
                }
                if script.command(verb).is_none() {
                    return Err(format!(
                        "terminal puzzle {} does not list its solving verb '{}'",
                        puzzle.id, verb
                    ));
                }
            }
            PuzzleKind::Code | PuzzleKind::Sequence | PuzzleKind::Order | PuzzleKind::Switches => {
                if puzzle.solution.is_empty() {
                    return Err(format!("puzzle {} has an empty solution", puzzle.id));
                }
            }
        }
    }

    for (puzzle_id, item_id) in item_grants {
        if !puzzle_ids.contains(puzzle_id) {
            return Err(format!("item grant for unknown puzzle {}", puzzle_id));
        }
        if !item_ids.contains(item_id.as_str()) {
            return Err(format!(
                "puzzle {} grants unknown item '{}'",
                puzzle_id, item_id
            ));
        }
    }

    // An item needed by a puzzle must be obtainable from an earlier one.
    for (index, puzzle) in puzzles.iter().enumerate() {
        let Some(required) = &puzzle.required_item_id else {
            continue;
        };
        let earlier = puzzles[..index]
            .iter()
            .any(|p| item_grants.get(&p.id) == Some(required));
        if !earlier {
            return Err(format!(
                "puzzle {} requires '{}' but no earlier puzzle grants it",
                puzzle.id, required
            ));
        }
    }

    Ok(())
}

/// Check room ids, coordinates (percentages) and connection targets.
pub fn validate_rooms(rooms: &[Room]) -> Result<(), String> {
    let mut ids = HashSet::new();
    for room in rooms {
        if !ids.insert(room.id.as_str()) {
            return Err(format!("duplicate room id '{}'", room.id));
        }
        if !(0.0..=100.0).contains(&room.x) || !(0.0..=100.0).contains(&room.y) {
            return Err(format!(
                "room '{}' position ({}, {}) is outside 0-100%",
                room.id, room.x, room.y
            ));
        }
    }
    for room in rooms {
        for target in &room.connections {
            if target == &room.id {
                return Err(format!("room '{}' connects to itself", room.id));
            }
            if !ids.contains(target.as_str()) {
                return Err(format!(
                    "room '{}' connects to unknown room '{}'",
                    room.id, target
                ));
            }
        }
    }
    Ok(())
}

//! Console command parsing and rendering for `escapekit play`.
//!
//! Verbs are case-insensitive; arguments keep the case the player typed because
//! answers are matched exactly.

use crate::escape::catalog::PuzzleCatalog;
use crate::escape::inventory::{format_inventory_compact, format_item_examination, InventoryStore};
use crate::escape::session::{CommandOutcome, RejectReason, SessionSnapshot, SolveOutcome};
use crate::escape::terminal::format_transcript;
use crate::escape::timer::format_clock;
use crate::escape::types::{PuzzleStatus, SessionState};

/// Console command categories for parsing and routing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayCommand {
    Start,
    Solve(String),   // SOLVE 4721
    Hint,            // HINT - hint for the puzzle on screen
    Go(usize),       // GO 2 - view puzzle #2 (1-based)
    Look,            // LOOK - redraw the puzzle on screen
    Inventory,       // I, INV
    Examine(String), // X item
    Map,
    Pause,
    Resume,
    Restart,
    Terminal(String), // TERM analyze, > analyze
    Status,
    Achievements,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_play_command(input: &str) -> PlayCommand {
    let trimmed = input.trim();
    if let Some(rest) = trimmed.strip_prefix('>') {
        return PlayCommand::Terminal(rest.trim().to_string());
    }
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };

    match verb.to_uppercase().as_str() {
        "START" | "BEGIN" => PlayCommand::Start,
        "SOLVE" | "ANSWER" | "A" => {
            if rest.is_empty() {
                PlayCommand::Unknown("Usage: SOLVE <answer>".to_string())
            } else {
                PlayCommand::Solve(rest.to_string())
            }
        }
        "HINT" | "H" => PlayCommand::Hint,
        "GO" | "G" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => PlayCommand::Go(n - 1),
            _ => PlayCommand::Unknown("Usage: GO <puzzle number>".to_string()),
        },
        "LOOK" | "L" => PlayCommand::Look,
        "I" | "INV" | "INVENTORY" => PlayCommand::Inventory,
        "X" | "EXAMINE" => {
            if rest.is_empty() {
                PlayCommand::Unknown("Usage: X <item>".to_string())
            } else {
                PlayCommand::Examine(rest.to_string())
            }
        }
        "MAP" | "M" => PlayCommand::Map,
        "PAUSE" => PlayCommand::Pause,
        "RESUME" => PlayCommand::Resume,
        "RESTART" => PlayCommand::Restart,
        "TERM" | "T" => PlayCommand::Terminal(rest.to_string()),
        "STATUS" | "ST" => PlayCommand::Status,
        "ACH" | "ACHIEVEMENTS" => PlayCommand::Achievements,
        "HELP" | "?" => PlayCommand::Help,
        "QUIT" | "Q" | "EXIT" => PlayCommand::Quit,
        _ => PlayCommand::Unknown(format!("Unknown command: {}. Type HELP.", trimmed)),
    }
}

pub fn play_help() -> &'static str {
    "Commands:\n\
     START          begin the countdown\n\
     SOLVE <answer> answer the active puzzle\n\
     HINT           reveal the hint for the puzzle on screen\n\
     GO <n>         view an unlocked puzzle\n\
     LOOK           show the puzzle on screen\n\
     INV / X <item> inventory / examine an item\n\
     MAP            room map\n\
     TERM <cmd>     type into a terminal puzzle (or: > cmd)\n\
     PAUSE RESUME RESTART STATUS ACH QUIT"
}

/// The puzzle currently on screen, with its status and any terminal output.
pub fn format_puzzle_view(snapshot: &SessionSnapshot, catalog: &PuzzleCatalog) -> String {
    let index = snapshot.current_puzzle_index;
    let Some(puzzle) = catalog.get(index) else {
        return "No puzzle selected.".to_string();
    };
    let status = if snapshot.solved_puzzle_ids.contains(&puzzle.id) {
        PuzzleStatus::Solved
    } else {
        PuzzleStatus::Active
    };
    let mut out = format!(
        "[{}/{}] {} ({}){}\n{}",
        index + 1,
        catalog.len(),
        puzzle.title,
        puzzle.kind.label(),
        if status == PuzzleStatus::Solved { " - solved" } else { "" },
        puzzle.description
    );
    if let Some(required) = &puzzle.required_item_id {
        let name = catalog.item(required).map(|i| i.name.as_str()).unwrap_or(required);
        out.push_str(&format!("\nRequires: {}", name));
    }
    if snapshot.hints_used.contains(&puzzle.id) && !puzzle.hint.is_empty() {
        out.push_str(&format!("\nHint: {}", puzzle.hint));
    }
    if puzzle.is_terminal() && !snapshot.terminal_transcript.is_empty() {
        out.push('\n');
        out.push_str(&format_transcript(&snapshot.terminal_transcript));
    }
    out
}

/// One-line session summary: state, clock, progress.
pub fn format_session_status(snapshot: &SessionSnapshot, catalog: &PuzzleCatalog) -> String {
    format!(
        "{} | {} left | solved {}/{} | hints {} | items {}",
        snapshot.state,
        format_clock(snapshot.time_remaining),
        snapshot.solved_puzzle_ids.len(),
        catalog.len(),
        snapshot.hints_used.len(),
        snapshot.inventory.len()
    )
}

pub fn format_inventory_view(snapshot: &SessionSnapshot, catalog: &PuzzleCatalog) -> String {
    let inventory = InventoryStore::from_items(snapshot.inventory.clone());
    format_inventory_compact(&inventory, catalog)
}

/// Examine by item id or case-insensitive display name.
pub fn format_examine_view(snapshot: &SessionSnapshot, catalog: &PuzzleCatalog, target: &str) -> String {
    let inventory = InventoryStore::from_items(snapshot.inventory.clone());
    let item_id = catalog
        .items()
        .find(|i| i.id == target || i.name.eq_ignore_ascii_case(target))
        .map(|i| i.id.clone())
        .unwrap_or_else(|| target.to_string());
    format_item_examination(&inventory, catalog, &item_id)
        .unwrap_or_else(|| format!("You aren't carrying '{}'.", target))
}

pub fn describe_rejection(reason: &RejectReason, catalog: &PuzzleCatalog) -> String {
    match reason {
        RejectReason::NotInProgress(SessionState::Introduction) => {
            "The clock hasn't started. Type START.".to_string()
        }
        RejectReason::NotInProgress(SessionState::Paused) => {
            "The session is paused. Type RESUME.".to_string()
        }
        RejectReason::NotInProgress(state) => format!("The session is {}.", state),
        RejectReason::UnknownPuzzle => "No such puzzle.".to_string(),
        RejectReason::NotActive => "That puzzle can't be attempted right now.".to_string(),
        RejectReason::AlreadySolved => "Already solved.".to_string(),
        RejectReason::MissingItem(item) => {
            let name = catalog.item(item).map(|i| i.name.as_str()).unwrap_or(item);
            format!("You need the {} first.", name)
        }
    }
}

pub fn describe_solve(outcome: &SolveOutcome, catalog: &PuzzleCatalog) -> Option<String> {
    match outcome {
        // Success details arrive as session events.
        SolveOutcome::Solved { .. } => None,
        SolveOutcome::Incorrect { .. } => None,
        SolveOutcome::Rejected(reason) => Some(describe_rejection(reason, catalog)),
    }
}

pub fn describe_command(outcome: &CommandOutcome, catalog: &PuzzleCatalog) -> Option<String> {
    match outcome {
        CommandOutcome::Handled { .. } => None,
        CommandOutcome::Rejected(RejectReason::NotActive) => {
            Some("There is no terminal here.".to_string())
        }
        CommandOutcome::Rejected(reason) => Some(describe_rejection(reason, catalog)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_are_case_insensitive_but_answers_are_not() {
        assert_eq!(parse_play_command("solve ATGcca"), PlayCommand::Solve("ATGcca".into()));
        assert_eq!(parse_play_command("  Start "), PlayCommand::Start);
        assert_eq!(parse_play_command("inv"), PlayCommand::Inventory);
        assert_eq!(parse_play_command("x UV Flashlight"), PlayCommand::Examine("UV Flashlight".into()));
    }

    #[test]
    fn go_is_one_based() {
        assert_eq!(parse_play_command("GO 1"), PlayCommand::Go(0));
        assert!(matches!(parse_play_command("GO 0"), PlayCommand::Unknown(_)));
        assert!(matches!(parse_play_command("GO"), PlayCommand::Unknown(_)));
    }

    #[test]
    fn terminal_shorthand() {
        assert_eq!(parse_play_command("> analyze"), PlayCommand::Terminal("analyze".into()));
        assert_eq!(parse_play_command("TERM sequence"), PlayCommand::Terminal("sequence".into()));
        assert!(matches!(parse_play_command("SOLVE"), PlayCommand::Unknown(_)));
        assert!(matches!(parse_play_command("dance"), PlayCommand::Unknown(_)));
    }
}

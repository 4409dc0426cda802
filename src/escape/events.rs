//! Events produced by a game session for presentation and persistence layers.
//!
//! The session is a pure producer: events are queued during an operation and
//! drained by whoever drives the session.

use serde::{Deserialize, Serialize};

use super::types::{ItemId, PuzzleId, SessionState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SessionEvent {
    PuzzleUnlocked { puzzle_id: PuzzleId, index: usize },
    PuzzleSolved { puzzle_id: PuzzleId, index: usize },
    PuzzleFailed { puzzle_id: PuzzleId, penalty_secs: u32, time_remaining: u32 },
    ItemAcquired { item_id: ItemId, puzzle_id: PuzzleId },
    HintRevealed { puzzle_id: PuzzleId },
    TimerWarning { time_remaining: u32 },
    TimerExpired,
    SessionCompleted { time_used: u32, hints_used: u32 },
    AchievementUnlocked { achievement_id: String, title: String },
    /// Lifecycle change (start, pause, resume, restart).
    StateChanged { from: SessionState, to: SessionState },
}

impl SessionEvent {
    /// Short single-line description for console output.
    pub fn describe(&self) -> String {
        match self {
            SessionEvent::PuzzleUnlocked { index, .. } => {
                format!("Puzzle {} unlocked.", index + 1)
            }
            SessionEvent::PuzzleSolved { index, .. } => format!("Puzzle {} solved!", index + 1),
            SessionEvent::PuzzleFailed { penalty_secs, .. } => {
                format!("Incorrect. -{}s penalty.", penalty_secs)
            }
            SessionEvent::ItemAcquired { item_id, .. } => format!("You obtained: {}", item_id),
            SessionEvent::HintRevealed { .. } => "Hint revealed.".to_string(),
            SessionEvent::TimerWarning { time_remaining } => format!(
                "Warning: only {} left!",
                super::timer::format_clock(*time_remaining)
            ),
            SessionEvent::TimerExpired => "Time is up. The lab stays sealed.".to_string(),
            SessionEvent::SessionCompleted { time_used, hints_used } => format!(
                "You escaped in {} using {} hint(s)!",
                super::timer::format_clock(*time_used),
                hints_used
            ),
            SessionEvent::AchievementUnlocked { title, .. } => {
                format!("Achievement unlocked: {}", title)
            }
            SessionEvent::StateChanged { to, .. } => format!("Session {}.", to),
        }
    }
}

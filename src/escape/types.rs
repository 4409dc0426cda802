use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub const PROGRESS_SCHEMA_VERSION: u8 = 1;
pub const SNAPSHOT_SCHEMA_VERSION: u8 = 1;
pub const SUMMARY_SCHEMA_VERSION: u8 = 1;

/// Puzzles are numbered by the catalog author; ids are stable across catalog edits.
pub type PuzzleId = u32;
pub type ItemId = String;
pub type RoomId = String;

// ============================================================================
// Catalog content
// ============================================================================

/// One scripted command a terminal puzzle understands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalCommandSpec {
    pub verb: String,
    pub help: String,
    /// Lines printed (as system output) when the verb is issued.
    pub responses: Vec<String>,
}

impl TerminalCommandSpec {
    pub fn new(verb: &str, help: &str, responses: &[&str]) -> Self {
        Self {
            verb: verb.to_ascii_lowercase(),
            help: help.to_string(),
            responses: responses.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Command table for a terminal puzzle. `help` and `exit` are built in; the
/// solving verb must also appear in `commands` so it shows up in help output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalScript {
    pub solving_verb: String,
    #[serde(default)]
    pub banner: Vec<String>,
    pub commands: Vec<TerminalCommandSpec>,
}

impl TerminalScript {
    pub fn command(&self, verb: &str) -> Option<&TerminalCommandSpec> {
        self.commands.iter().find(|c| c.verb == verb)
    }
}

/// How a puzzle is verified. Adding a variant forces every matcher to handle it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleKind {
    /// Numeric/alphanumeric code typed into a keypad.
    Code,
    /// Symbols entered in a fixed sequence.
    Sequence,
    /// Elements arranged into the canonical order.
    Order,
    /// Solved by issuing the solving verb to the embedded terminal.
    Terminal(TerminalScript),
    /// Bank of on/off switches set to a pattern.
    Switches,
}

impl PuzzleKind {
    pub fn label(&self) -> &'static str {
        match self {
            PuzzleKind::Code => "code",
            PuzzleKind::Sequence => "sequence",
            PuzzleKind::Order => "order",
            PuzzleKind::Terminal(_) => "terminal",
            PuzzleKind::Switches => "switches",
        }
    }

    pub fn terminal_script(&self) -> Option<&TerminalScript> {
        match self {
            PuzzleKind::Terminal(script) => Some(script),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Puzzle {
    pub id: PuzzleId,
    pub title: String,
    pub description: String,
    pub hint: String,
    pub solution: String,
    pub kind: PuzzleKind,
    pub required_item_id: Option<ItemId>,
    pub image: Option<String>,
}

impl Puzzle {
    pub fn new(id: PuzzleId, title: &str, kind: PuzzleKind, solution: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: String::new(),
            hint: String::new(),
            solution: solution.to_string(),
            kind,
            required_item_id: None,
            image: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = hint.to_string();
        self
    }

    pub fn requiring(mut self, item_id: &str) -> Self {
        self.required_item_id = Some(item_id.to_string());
        self
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, PuzzleKind::Terminal(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
}

impl Item {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Map location. `x`/`y` are percentages of the map canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub connections: BTreeSet<RoomId>,
}

impl Room {
    pub fn new(id: &str, name: &str, x: f32, y: f32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            x,
            y,
            connections: BTreeSet::new(),
        }
    }

    pub fn connected_to(mut self, rooms: &[&str]) -> Self {
        self.connections
            .extend(rooms.iter().map(|r| r.to_string()));
        self
    }
}

// ============================================================================
// Session state
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Introduction,
    InProgress,
    Paused,
    Completed,
    Expired,
}

impl SessionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Expired)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Introduction => "introduction",
            SessionState::InProgress => "in progress",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-puzzle status, derived from the unlock and solve sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleStatus {
    Locked,
    Active,
    Solved,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    System,
    User,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub source: TranscriptSource,
    pub text: String,
}

impl TranscriptEntry {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            source: TranscriptSource::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            source: TranscriptSource::User,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            source: TranscriptSource::Error,
            text: text.into(),
        }
    }
}

// ============================================================================
// Achievements
// ============================================================================

/// Declarative unlock condition, evaluated against the current session and the
/// player's lifetime history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementRule {
    /// Any puzzle solved, ever
    FirstPuzzleSolved,
    /// Lifetime puzzle solves reach N
    PuzzlesSolved { required: u32 },
    /// Lifetime completed sessions reach N
    SessionsCompleted { required: u32 },
    /// Session completed with remaining/duration >= min_ratio
    Efficiency { min_ratio: f32 },
    /// Session completed without revealing any hint
    NoHints,
    /// Session completed using at most N seconds
    CompletedWithin { seconds: u32 },
    /// Session completed holding every catalog item
    AllItemsCollected,
}

impl AchievementRule {
    /// Rules that can only fire on the session-completed evaluation.
    pub fn needs_completion(&self) -> bool {
        matches!(
            self,
            AchievementRule::SessionsCompleted { .. }
                | AchievementRule::Efficiency { .. }
                | AchievementRule::NoHints
                | AchievementRule::CompletedWithin { .. }
                | AchievementRule::AllItemsCollected
        )
    }
}

/// Achievement template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub rule: AchievementRule,
    /// Hidden achievements don't show until unlocked
    #[serde(default)]
    pub hidden: bool,
}

impl AchievementRecord {
    pub fn new(id: &str, title: &str, description: &str, rule: AchievementRule) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            rule,
            hidden: false,
        }
    }

    pub fn as_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// A player's unlock of one achievement. Never removed once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerAchievement {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
    pub session_id: Option<String>,
}

impl PlayerAchievement {
    pub fn new(achievement_id: &str, session_id: Option<&str>) -> Self {
        Self {
            achievement_id: achievement_id.to_string(),
            unlocked_at: Utc::now(),
            session_id: session_id.map(str::to_string),
        }
    }
}

/// Lifetime history for one player; feeds history-based achievement rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerProgress {
    pub player: String,
    pub sessions_started: u32,
    pub sessions_completed: u32,
    pub sessions_expired: u32,
    pub puzzles_solved: u32,
    pub best_time_secs: Option<u32>,
    pub achievements: Vec<PlayerAchievement>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl PlayerProgress {
    pub fn new(player: &str) -> Self {
        Self {
            player: player.to_string(),
            sessions_started: 0,
            sessions_completed: 0,
            sessions_expired: 0,
            puzzles_solved: 0,
            best_time_secs: None,
            achievements: Vec::new(),
            updated_at: Utc::now(),
            schema_version: PROGRESS_SCHEMA_VERSION,
        }
    }

    pub fn has_achievement(&self, achievement_id: &str) -> bool {
        self.achievements
            .iter()
            .any(|a| a.achievement_id == achievement_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// End-of-session record handed to the persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub player: String,
    pub outcome: SessionState,
    pub time_used: u32,
    pub hints_used: u32,
    pub inventory_size: u32,
    pub puzzles_solved: u32,
    pub puzzle_count: u32,
    pub achievements_unlocked: Vec<String>,
    pub finished_at: DateTime<Utc>,
    pub schema_version: u8,
}

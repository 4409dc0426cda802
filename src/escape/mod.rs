//! Escape-room progression engine.
//! A [`GameSession`] owns one playthrough (timer, unlocked puzzles, inventory,
//! hints, terminal transcript) and reports what happened as [`SessionEvent`]s.
//! [`SessionRunner`] drives it on a tokio task; [`EscapeStore`] keeps lifetime
//! progress and results in sled.

pub mod achievement;
pub mod catalog;
pub mod commands;
pub mod errors;
pub mod events;
pub mod hints;
pub mod inventory;
pub mod rooms;
pub mod runner;
pub mod seed_loader;
pub mod session;
pub mod state;
pub mod storage;
pub mod terminal;
pub mod timer;
pub mod types;

pub use achievement::{format_achievement_list, AchievementEvaluator, EvaluationContext};
pub use catalog::PuzzleCatalog;
pub use commands::{parse_play_command, PlayCommand};
pub use errors::EscapeError;
pub use events::SessionEvent;
pub use hints::{HintLedger, HintReveal};
pub use inventory::{format_inventory_compact, format_item_examination, InventoryStore};
pub use rooms::{format_room_map, RoomGraph};
pub use runner::{SessionCommand, SessionHandle, SessionRunner};
pub use seed_loader::{
    load_achievements_from_json, load_catalog_from_json, write_achievements_json,
    write_catalog_json, LoadedContent,
};
pub use session::{
    solution_matches, CommandOutcome, GameSession, RejectReason, SessionConfig, SessionSnapshot,
    SolveOutcome,
};
pub use state::{
    seed_starter_achievements, starter_catalog, starter_room_graph, STARTER_TERMINAL_VERB,
};
pub use storage::{EscapeStore, EscapeStoreBuilder, SessionSink};
pub use terminal::{format_transcript, normalize_command, CommandInterpreter, TerminalOutcome};
pub use timer::{format_clock, Timer, TimerSignal};
pub use types::*;

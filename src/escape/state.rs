//! Built-in starter content: the "Sealed Genetics Lab" escape room and the
//! default achievement table. Used when no catalog file is configured and as
//! the source for `escapekit init`.

use std::collections::BTreeMap;

use crate::escape::catalog::PuzzleCatalog;
use crate::escape::errors::EscapeError;
use crate::escape::rooms::RoomGraph;
use crate::escape::types::{
    AchievementRecord, AchievementRule, Item, ItemId, Puzzle, PuzzleId, PuzzleKind, Room,
    TerminalCommandSpec, TerminalScript,
};

pub const STARTER_TERMINAL_VERB: &str = "mutation";

pub fn starter_items() -> Vec<Item> {
    vec![
        Item::new(
            "uv_flashlight",
            "UV Flashlight",
            "A pocket torch with a violet lens. Reveals markings invisible in normal light.",
        ),
        Item::new(
            "lab_keycard",
            "Lab Keycard",
            "A scuffed access card labelled CONTAINMENT - LEVEL 2.",
        ),
    ]
}

pub fn starter_item_grants() -> BTreeMap<PuzzleId, ItemId> {
    let mut grants = BTreeMap::new();
    grants.insert(0, "uv_flashlight".to_string());
    grants.insert(2, "lab_keycard".to_string());
    grants
}

fn genome_terminal() -> TerminalScript {
    TerminalScript {
        solving_verb: STARTER_TERMINAL_VERB.to_string(),
        banner: vec![
            "GENLAB OS 2.4 - restricted console".to_string(),
            "Type 'help' for available commands.".to_string(),
        ],
        commands: vec![
            TerminalCommandSpec::new(
                "analyze",
                "Analyze the loaded sample",
                &[
                    "Sample GX-7 loaded.",
                    "Anomaly detected at locus 12: base pair substitution.",
                ],
            ),
            TerminalCommandSpec::new(
                "sequence",
                "Print the sample sequence",
                &["ATG CCA TGA", "Reference: ATG CGA TGA"],
            ),
            TerminalCommandSpec::new(
                STARTER_TERMINAL_VERB,
                "Apply the corrective mutation",
                &[
                    "Applying corrective mutation at locus 12...",
                    "Sequence verified. Containment lock released.",
                ],
            ),
        ],
    }
}

pub fn starter_puzzles() -> Vec<Puzzle> {
    vec![
        Puzzle::new(0, "Freezer Keypad", PuzzleKind::Code, "4721")
            .with_description("The sample freezer is locked with a four-digit keypad. Sticky notes cover the door.")
            .with_hint("Only the notes written in red ink matter. Read them left to right.")
            .with_image("freezer.png"),
        Puzzle::new(1, "DNA Sequencer", PuzzleKind::Sequence, "ATGCCA")
            .with_description("The sequencer wants six bases. Faint glowing letters are smeared on the bench.")
            .with_hint("The UV flashlight shows the letters in the right order."),
        Puzzle::new(2, "Specimen Shelf", PuzzleKind::Order, "3-1-4-2")
            .with_description("Four specimen jars must be arranged by age before the shelf drawer opens.")
            .with_hint("Labels show the collection year; oldest goes first."),
        Puzzle::new(3, "Genome Terminal", PuzzleKind::Terminal(genome_terminal()), "MUTATION")
            .with_description("A console controls the containment lock. It only responds to lab commands.")
            .with_hint("Analyze the sample first. The fix is a single word the terminal understands."),
        Puzzle::new(4, "Containment Breaker", PuzzleKind::Switches, "10110")
            .with_description("Five breaker switches behind a card reader. Set them to release the exit door.")
            .with_hint("The wiring diagram on the keycard shows which switches are live.")
            .requiring("lab_keycard"),
    ]
}

pub fn starter_rooms() -> Vec<Room> {
    vec![
        Room::new("reception", "Reception", 10.0, 50.0).connected_to(&["cold_storage", "main_lab"]),
        Room::new("cold_storage", "Cold Storage", 30.0, 20.0).connected_to(&["main_lab"]),
        Room::new("main_lab", "Main Lab", 45.0, 55.0).connected_to(&["archive", "server_room"]),
        Room::new("archive", "Specimen Archive", 60.0, 85.0),
        Room::new("server_room", "Server Room", 70.0, 30.0).connected_to(&["containment"]),
        Room::new("containment", "Containment", 90.0, 50.0),
    ]
}

pub fn starter_catalog() -> Result<PuzzleCatalog, EscapeError> {
    PuzzleCatalog::new(starter_puzzles(), starter_items(), starter_item_grants())
}

pub fn starter_room_graph() -> Result<RoomGraph, EscapeError> {
    RoomGraph::new(starter_rooms())
}

/// Default achievement table.
pub fn seed_starter_achievements() -> Vec<AchievementRecord> {
    use AchievementRule::*;

    vec![
        AchievementRecord::new(
            "first_steps",
            "First Steps",
            "Solve your first puzzle",
            FirstPuzzleSolved,
        ),
        AchievementRecord::new(
            "puzzle_veteran",
            "Puzzle Veteran",
            "Solve 25 puzzles across all sessions",
            PuzzlesSolved { required: 25 },
        ),
        AchievementRecord::new(
            "escape_artist",
            "Escape Artist",
            "Escape the room for the first time",
            SessionsCompleted { required: 1 },
        ),
        AchievementRecord::new(
            "regular",
            "Regular",
            "Escape three times",
            SessionsCompleted { required: 3 },
        ),
        AchievementRecord::new(
            "efficient_mind",
            "Efficient Mind",
            "Escape with at least 90% of the clock left",
            Efficiency { min_ratio: 0.9 },
        ),
        AchievementRecord::new(
            "no_help_needed",
            "No Help Needed",
            "Escape without revealing a hint",
            NoHints,
        ),
        AchievementRecord::new(
            "collector",
            "Collector",
            "Escape holding every item in the room",
            AllItemsCollected,
        ),
        AchievementRecord::new(
            "speed_runner",
            "Speed Runner",
            "Escape in under ten minutes",
            CompletedWithin { seconds: 600 },
        )
        .as_hidden(),
    ]
}

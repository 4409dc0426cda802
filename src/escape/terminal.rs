//! Command interpreter for terminal puzzles.
//!
//! Input is normalized (trimmed, lowercased, inner whitespace collapsed) and
//! matched against the active puzzle's command table. Every accepted line is
//! echoed into the transcript, which is append-only for the whole session.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::escape::types::{TerminalScript, TranscriptEntry};
use crate::logutil::escape_log;

/// Parsed terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Help,
    Exit,
    /// The puzzle's solving verb
    Solve,
    /// Any other verb from the puzzle's table
    Scripted(String),
    Unknown(String),
}

/// What a submission did, as seen by the owning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// Empty input; nothing recorded.
    Ignored,
    Responded,
    /// Solving verb accepted; the session must run its solve path.
    Solved,
    Closed,
    Unknown,
}

pub fn normalize_command(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Verbs every terminal answers itself; a script cannot redefine them.
pub const HELP_VERBS: [&str; 2] = ["help", "?"];
pub const EXIT_VERBS: [&str; 3] = ["exit", "quit", "logout"];

pub fn is_builtin_verb(verb: &str) -> bool {
    HELP_VERBS.contains(&verb) || EXIT_VERBS.contains(&verb)
}

pub fn parse_command(script: &TerminalScript, normalized: &str) -> TerminalCommand {
    match normalized {
        verb if HELP_VERBS.contains(&verb) => TerminalCommand::Help,
        verb if EXIT_VERBS.contains(&verb) => TerminalCommand::Exit,
        verb if verb == script.solving_verb => TerminalCommand::Solve,
        verb if script.command(verb).is_some() => TerminalCommand::Scripted(verb.to_string()),
        other => TerminalCommand::Unknown(other.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInterpreter {
    transcript: Vec<TranscriptEntry>,
    open: bool,
}

impl CommandInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_transcript(transcript: Vec<TranscriptEntry>) -> Self {
        Self {
            transcript,
            open: false,
        }
    }

    /// Connect to a terminal: prints the banner. No-op if already connected.
    pub fn open(&mut self, script: &TerminalScript) {
        if self.open {
            return;
        }
        self.open = true;
        for line in &script.banner {
            self.transcript.push(TranscriptEntry::system(line.clone()));
        }
    }

    /// Disconnect without output (puzzle solved or session reset elsewhere).
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn submit(&mut self, script: &TerminalScript, raw: &str) -> TerminalOutcome {
        let normalized = normalize_command(raw);
        if normalized.is_empty() {
            return TerminalOutcome::Ignored;
        }
        self.open(script);
        self.transcript.push(TranscriptEntry::user(normalized.clone()));

        let command = parse_command(script, &normalized);
        debug!("terminal command: {} -> {:?}", escape_log(&normalized), command);
        match command {
            TerminalCommand::Help => {
                self.system("Available commands:");
                for spec in &script.commands {
                    self.system(format!("  {} - {}", spec.verb, spec.help));
                }
                self.system("  help - show this list");
                self.system("  exit - close the terminal");
                TerminalOutcome::Responded
            }
            TerminalCommand::Exit => {
                self.system("Connection closed.");
                self.open = false;
                TerminalOutcome::Closed
            }
            TerminalCommand::Solve => {
                self.respond(script, &script.solving_verb);
                TerminalOutcome::Solved
            }
            TerminalCommand::Scripted(verb) => {
                self.respond(script, &verb);
                TerminalOutcome::Responded
            }
            TerminalCommand::Unknown(other) => {
                self.transcript.push(TranscriptEntry::error(format!(
                    "Command not recognized: {}. Type 'help' for a list of commands.",
                    other
                )));
                TerminalOutcome::Unknown
            }
        }
    }

    fn respond(&mut self, script: &TerminalScript, verb: &str) {
        if let Some(spec) = script.command(verb) {
            for line in &spec.responses {
                self.transcript.push(TranscriptEntry::system(line.clone()));
            }
        }
    }

    fn system(&mut self, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry::system(text));
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// Render transcript entries as terminal lines (`>` for input, `!` for errors).
pub fn format_transcript(entries: &[TranscriptEntry]) -> String {
    use crate::escape::types::TranscriptSource;
    entries
        .iter()
        .map(|e| match e.source {
            TranscriptSource::System => e.text.clone(),
            TranscriptSource::User => format!("> {}", e.text),
            TranscriptSource::Error => format!("! {}", e.text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

//! # escapekit - escape-room progression engine
//!
//! escapekit runs timed escape-room sessions: an ordered chain of puzzles
//! (keypad codes, sequences, orderings, switch banks and scripted terminals),
//! items granted along the way, a countdown with penalties and a low-time
//! warning, one-time hints, and achievements tracked across sessions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use escapekit::escape::{
//!     seed_starter_achievements, starter_catalog, AchievementEvaluator, GameSession,
//!     PlayerProgress, SessionConfig,
//! };
//!
//! # fn main() -> Result<(), escapekit::escape::EscapeError> {
//! let catalog = Arc::new(starter_catalog()?);
//! let achievements =
//!     AchievementEvaluator::new(seed_starter_achievements(), PlayerProgress::new("ada"));
//! let mut session = GameSession::new("ada", catalog, SessionConfig::default(), achievements);
//! session.start()?;
//! session.attempt_solve(0, "4721");
//! for event in session.take_events() {
//!     println!("{}", event.describe());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`escape`] - session aggregate, puzzles, timer, terminal, achievements, storage
//! - [`config`] - `config.toml` loading and validation
//! - [`validation`] - catalog integrity checks and safe names
//! - [`logutil`] - log-safe rendering of player input

pub mod config;
pub mod escape;
pub mod logutil;
pub mod validation;

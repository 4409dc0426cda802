//! Shared fixtures for integration tests.

use std::sync::Arc;

use escapekit::escape::{
    seed_starter_achievements, starter_catalog, AchievementEvaluator, GameSession, PlayerProgress,
    PuzzleCatalog, SessionConfig,
};

/// Answers for the starter catalog, in puzzle order.
#[allow(dead_code)]
pub const STARTER_ANSWERS: [&str; 5] = ["4721", "ATGCCA", "3-1-4-2", "MUTATION", "10110"];

#[allow(dead_code)]
pub fn catalog() -> Arc<PuzzleCatalog> {
    Arc::new(starter_catalog().expect("starter catalog"))
}

#[allow(dead_code)]
pub fn evaluator(player: &str) -> AchievementEvaluator {
    AchievementEvaluator::new(seed_starter_achievements(), PlayerProgress::new(player))
}

/// A started session on the starter catalog with the default one-hour clock.
#[allow(dead_code)]
pub fn started_session() -> GameSession {
    let mut session = GameSession::new("ada", catalog(), SessionConfig::default(), evaluator("ada"));
    session.start().expect("start");
    session.take_events();
    session
}

/// Integration tests for the sled store and the async runner working together:
/// results are recorded once, progress carries achievements across sessions,
/// and an abandoned session can be resumed.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{catalog, STARTER_ANSWERS};
use escapekit::escape::{
    seed_starter_achievements, AchievementEvaluator, EscapeStore, EscapeStoreBuilder, GameSession,
    SessionConfig, SessionEvent, SessionRunner, SessionSink, SessionState, SolveOutcome,
};
use tempfile::tempdir;
use tokio_test::assert_ok;

fn session_for(store: &EscapeStore, player: &str) -> GameSession {
    let progress = store.load_or_new_progress(player).unwrap();
    let evaluator = AchievementEvaluator::new(seed_starter_achievements(), progress);
    match store.get_snapshot(player).unwrap() {
        Some(snapshot) => {
            GameSession::restore(snapshot, catalog(), SessionConfig::default(), evaluator).unwrap()
        }
        None => GameSession::new(player, catalog(), SessionConfig::default(), evaluator),
    }
}

#[tokio::test(start_paused = true)]
async fn completed_run_is_recorded_and_achievements_persist() {
    let dir = tempdir().unwrap();
    let store = Arc::new(
        EscapeStoreBuilder::new(dir.path().join("db"))
            .with_summary_export(dir.path().join("results"))
            .open()
            .unwrap(),
    );

    for round in 0..2 {
        let session = session_for(&store, "ada");
        let sink: Arc<dyn SessionSink> = store.clone();
        let (handle, mut events, join) =
            SessionRunner::spawn(session, Duration::from_secs(1), Some(sink));
        assert_ok!(handle.start().await);
        for (id, answer) in STARTER_ANSWERS.iter().enumerate() {
            let outcome = handle.solve(id as u32, answer).await.unwrap();
            assert!(matches!(outcome, SolveOutcome::Solved { .. }));
        }
        assert_eq!(handle.snapshot().await.unwrap().state, SessionState::Completed);
        assert_ok!(handle.quit().await);
        let finished = join.await.unwrap();
        assert_eq!(finished.state(), SessionState::Completed);

        let mut unlocked = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::AchievementUnlocked { achievement_id, .. } = event {
                unlocked.push(achievement_id);
            }
        }
        if round == 0 {
            assert!(unlocked.contains(&"first_steps".to_string()));
        } else {
            assert!(!unlocked.contains(&"first_steps".to_string()));
        }
    }

    let progress = store.get_progress("ada").unwrap();
    assert_eq!(progress.sessions_completed, 2);
    assert_eq!(progress.sessions_started, 2);
    assert_eq!(progress.puzzles_solved, 10);
    assert_eq!(
        progress
            .achievements
            .iter()
            .filter(|a| a.achievement_id == "first_steps")
            .count(),
        1
    );

    let summaries = store.list_summaries("ada").unwrap();
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|s| s.outcome == SessionState::Completed));
    assert!(summaries[0].achievements_unlocked.contains(&"escape_artist".to_string()));
    assert!(summaries[1].achievements_unlocked.is_empty());
    assert!(store.get_snapshot("ada").unwrap().is_none());

    let exported = std::fs::read_dir(dir.path().join("results")).unwrap().count();
    assert_eq!(exported, 2);
}

#[tokio::test(start_paused = true)]
async fn abandoned_session_resumes_where_it_stopped() {
    let dir = tempdir().unwrap();
    let store = Arc::new(EscapeStoreBuilder::new(dir.path()).open().unwrap());

    let session = session_for(&store, "bob");
    let sink: Arc<dyn SessionSink> = store.clone();
    let (handle, _events, join) = SessionRunner::spawn(session, Duration::from_secs(1), Some(sink));
    handle.start().await.unwrap();
    handle.solve(0, "4721").await.unwrap();
    handle.solve(1, "AAAAAA").await.unwrap();
    handle.hint(1).await.unwrap();
    let before = handle.snapshot().await.unwrap();
    handle.quit().await.unwrap();
    join.await.unwrap();

    let saved = store.get_snapshot("bob").unwrap().expect("checkpoint written");
    assert_eq!(saved.unlocked_puzzle_ids, vec![0, 1]);
    assert_eq!(saved.time_remaining, before.time_remaining);
    assert_eq!(saved.hints_used, vec![1]);

    let mut resumed = session_for(&store, "bob");
    assert_eq!(resumed.id(), before.session_id);
    assert_eq!(resumed.state(), SessionState::InProgress);
    assert!(resumed.has_item("uv_flashlight"));
    assert!(matches!(
        resumed.attempt_solve(1, "ATGCCA"),
        SolveOutcome::Solved { .. }
    ));
    // The solve in the first sitting was persisted with the checkpoint.
    assert_eq!(resumed.achievements().progress().puzzles_solved, 2);
}

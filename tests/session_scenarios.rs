/// End-to-end playthroughs of the starter lab: solving, penalties, expiry,
/// terminal puzzles, hints and completion.
mod common;

use common::{started_session, STARTER_ANSWERS};
use escapekit::escape::{
    CommandOutcome, PuzzleStatus, SessionEvent, SessionState, SolveOutcome, TerminalOutcome,
    TranscriptSource,
};

#[test]
fn scenario_a_correct_answer_unlocks_next_and_grants_item() {
    let mut session = started_session();
    let outcome = session.attempt_solve(0, "4721");
    assert_eq!(
        outcome,
        SolveOutcome::Solved {
            puzzle_id: 0,
            unlocked_index: Some(1),
            item_granted: Some("uv_flashlight".to_string()),
            completed: false,
        }
    );
    assert_eq!(session.unlocked_puzzle_ids(), &[0, 1]);
    assert!(session.has_item("uv_flashlight"));
    assert_eq!(session.current_puzzle_index(), 1);

    let events = session.take_events();
    let solved = events
        .iter()
        .position(|e| matches!(e, SessionEvent::PuzzleSolved { puzzle_id: 0, .. }))
        .unwrap();
    let unlocked = events
        .iter()
        .position(|e| matches!(e, SessionEvent::PuzzleUnlocked { puzzle_id: 1, .. }))
        .unwrap();
    let item = events
        .iter()
        .position(|e| matches!(e, SessionEvent::ItemAcquired { .. }))
        .unwrap();
    let achievement = events
        .iter()
        .position(|e| matches!(e, SessionEvent::AchievementUnlocked { .. }))
        .unwrap();
    assert!(solved < unlocked && unlocked < item && item < achievement);
}

#[test]
fn scenario_b_wrong_answer_costs_a_minute() {
    let mut session = started_session();
    let outcome = session.attempt_solve(0, "0000");
    assert_eq!(
        outcome,
        SolveOutcome::Incorrect {
            penalty_secs: 60,
            time_remaining: 3540
        }
    );
    assert_eq!(session.time_remaining(), 3540);
    assert_eq!(session.unlocked_puzzle_ids(), &[0]);
    assert!(session.inventory().is_empty());
    assert_eq!(
        session.take_events(),
        vec![SessionEvent::PuzzleFailed {
            puzzle_id: 0,
            penalty_secs: 60,
            time_remaining: 3540
        }]
    );
}

#[test]
fn scenario_c_countdown_expires_once() {
    let mut session = started_session();
    for _ in 0..3600 {
        session.tick();
    }
    assert_eq!(session.state(), SessionState::Expired);
    assert_eq!(session.time_remaining(), 0);

    // Further ticks after expiry change nothing.
    for _ in 0..10 {
        session.tick();
    }
    let events = session.take_events();
    assert_eq!(
        events.iter().filter(|e| **e == SessionEvent::TimerExpired).count(),
        1
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::TimerWarning { .. }))
            .count(),
        1
    );
    assert!(events.contains(&SessionEvent::TimerWarning { time_remaining: 300 }));
    assert_eq!(session.achievements().progress().sessions_expired, 1);
}

fn play_to_terminal() -> escapekit::escape::GameSession {
    let mut session = started_session();
    for (id, answer) in STARTER_ANSWERS.iter().enumerate().take(3) {
        assert!(matches!(
            session.attempt_solve(id as u32, answer),
            SolveOutcome::Solved { .. }
        ));
    }
    assert_eq!(session.puzzle_status(3), Some(PuzzleStatus::Active));
    session.take_events();
    session
}

#[test]
fn scenario_d_terminal_verb_matches_typed_answer() {
    let mut typed = play_to_terminal();
    let mut terminal = play_to_terminal();

    let typed_outcome = typed.attempt_solve(3, "MUTATION");
    let command_outcome = terminal.submit_command("mutation");
    match command_outcome {
        CommandOutcome::Handled {
            outcome: TerminalOutcome::Solved,
            solve: Some(solve),
        } => assert_eq!(solve, typed_outcome),
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(typed.unlocked_puzzle_ids(), terminal.unlocked_puzzle_ids());
    assert_eq!(typed.inventory(), terminal.inventory());
    assert_eq!(typed.time_remaining(), terminal.time_remaining());
    assert_eq!(typed.current_puzzle_index(), terminal.current_puzzle_index());
    assert_eq!(typed.take_events(), terminal.take_events());

    // Only the terminal route writes to the transcript.
    assert!(typed.transcript().is_empty());
    assert!(terminal
        .transcript()
        .iter()
        .any(|e| e.source == TranscriptSource::User && e.text == "mutation"));
}

#[test]
fn terminal_exploration_has_no_penalty() {
    let mut session = play_to_terminal();
    let before = session.time_remaining();
    for line in ["help", "analyze", "rm -rf /", "", "exit"] {
        assert!(matches!(session.submit_command(line), CommandOutcome::Handled { .. }));
    }
    assert_eq!(session.time_remaining(), before);
    assert_eq!(session.unlocked_puzzle_ids().len(), 4);
    let errors = session
        .transcript()
        .iter()
        .filter(|e| e.source == TranscriptSource::Error)
        .count();
    assert_eq!(errors, 1);

    // Wrong typed answer for a terminal puzzle is still penalized.
    assert!(matches!(
        session.attempt_solve(3, "analyze"),
        SolveOutcome::Incorrect { .. }
    ));
}

#[test]
fn scenario_e_hint_is_counted_once() {
    let mut session = started_session();
    let first = session.request_hint(0).unwrap();
    let second = session.request_hint(0).unwrap();
    assert_eq!(first, second);
    assert_eq!(session.hints().revealed(), &[0]);
    assert_eq!(
        session
            .take_events()
            .iter()
            .filter(|e| matches!(e, SessionEvent::HintRevealed { .. }))
            .count(),
        1
    );
    // Locked puzzle hints are refused.
    assert!(session.request_hint(2).is_none());
    assert_eq!(session.hints().len(), 1);
}

#[test]
fn scenario_f_full_run_completes_and_unlocks_once() {
    let mut session = started_session();
    for (id, answer) in STARTER_ANSWERS.iter().enumerate() {
        session.tick();
        let outcome = session.attempt_solve(id as u32, answer);
        assert!(matches!(outcome, SolveOutcome::Solved { .. }), "puzzle {}", id);
    }
    assert_eq!(session.state(), SessionState::Completed);
    assert!(!session.is_clock_running());
    assert!(session.active_index().is_none());

    let events = session.take_events();
    let mut unlocked: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::AchievementUnlocked { achievement_id, .. } => Some(achievement_id.as_str()),
            _ => None,
        })
        .collect();
    let total = unlocked.len();
    unlocked.sort();
    unlocked.dedup();
    assert_eq!(unlocked.len(), total, "an achievement fired twice");
    for id in ["first_steps", "escape_artist", "efficient_mind", "no_help_needed", "collector", "speed_runner"] {
        assert!(unlocked.contains(&id), "missing {}", id);
    }
    assert!(events.contains(&SessionEvent::SessionCompleted {
        time_used: 5,
        hints_used: 0
    }));

    let summary = session.summary();
    assert_eq!(summary.outcome, SessionState::Completed);
    assert_eq!(summary.puzzles_solved, 5);
    assert_eq!(summary.inventory_size, 2);
    assert_eq!(summary.time_used, 5);

    let progress = session.achievements().progress();
    assert_eq!(progress.sessions_completed, 1);
    assert_eq!(progress.best_time_secs, Some(5));
    assert_eq!(progress.puzzles_solved, 5);
}

#[test]
fn double_solve_changes_nothing() {
    let mut session = started_session();
    session.attempt_solve(0, "4721");
    session.take_events();
    let inventory = session.inventory().clone();
    let remaining = session.time_remaining();
    let unlocked = session.unlocked_puzzle_ids().to_vec();

    for answer in ["4721", "wrong"] {
        assert_eq!(
            session.attempt_solve(0, answer),
            SolveOutcome::Rejected(escapekit::escape::RejectReason::AlreadySolved)
        );
    }
    assert_eq!(session.inventory(), &inventory);
    assert_eq!(session.time_remaining(), remaining);
    assert_eq!(session.unlocked_puzzle_ids(), unlocked.as_slice());
    assert!(session.take_events().is_empty());
}

#[test]
fn restart_returns_to_introduction_and_replays() {
    let mut session = started_session();
    session.attempt_solve(0, "4721");
    session.attempt_solve(1, "nope");
    session.restart();
    assert_eq!(session.state(), SessionState::Introduction);
    assert_eq!(session.time_remaining(), 3600);
    assert!(!session.is_clock_running());
    session.tick();
    assert_eq!(session.time_remaining(), 3600);

    session.start().unwrap();
    assert!(matches!(session.attempt_solve(0, "4721"), SolveOutcome::Solved { .. }));
    // first_steps was earned in the first run and is not reported again.
    assert!(!session
        .take_events()
        .iter()
        .any(|e| matches!(e, SessionEvent::AchievementUnlocked { .. })));
    assert_eq!(session.achievements().progress().sessions_started, 2);
}

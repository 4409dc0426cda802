//! Async driver that owns a [`GameSession`] on its own tokio task.
//!
//! The runner multiplexes two inputs with `tokio::select!`: a one-second
//! interval (only armed while the session clock runs) and a command channel fed
//! by [`SessionHandle`]. Events produced by either path are forwarded to an
//! unbounded channel for the presentation layer. When a session finishes the
//! summary goes to the configured [`SessionSink`] exactly once.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::escape::errors::EscapeError;
use crate::escape::events::SessionEvent;
use crate::escape::session::{CommandOutcome, GameSession, SessionSnapshot, SolveOutcome};
use crate::escape::storage::SessionSink;
use crate::escape::types::{PlayerProgress, PuzzleId};

const COMMAND_QUEUE: usize = 32;

/// Requests accepted by a running session. Each carries its reply channel.
#[derive(Debug)]
pub enum SessionCommand {
    Start(oneshot::Sender<Result<(), EscapeError>>),
    Pause(oneshot::Sender<Result<(), EscapeError>>),
    Resume(oneshot::Sender<Result<(), EscapeError>>),
    Restart(oneshot::Sender<()>),
    Solve {
        puzzle_id: PuzzleId,
        answer: String,
        reply: oneshot::Sender<SolveOutcome>,
    },
    Hint {
        puzzle_id: PuzzleId,
        reply: oneshot::Sender<Option<String>>,
    },
    Navigate {
        index: usize,
        reply: oneshot::Sender<bool>,
    },
    Terminal {
        line: String,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Progress(oneshot::Sender<PlayerProgress>),
    /// Checkpoint an unfinished session and stop the runner.
    Quit,
}

/// Cloneable front end for a spawned [`SessionRunner`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn send(&self, command: SessionCommand) -> Result<(), EscapeError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| EscapeError::RunnerStopped)
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, EscapeError> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply)).await?;
        rx.await.map_err(|_| EscapeError::RunnerStopped)
    }

    pub async fn start(&self) -> Result<(), EscapeError> {
        self.call(SessionCommand::Start).await?
    }

    pub async fn pause(&self) -> Result<(), EscapeError> {
        self.call(SessionCommand::Pause).await?
    }

    pub async fn resume(&self) -> Result<(), EscapeError> {
        self.call(SessionCommand::Resume).await?
    }

    pub async fn restart(&self) -> Result<(), EscapeError> {
        self.call(SessionCommand::Restart).await
    }

    pub async fn solve(&self, puzzle_id: PuzzleId, answer: &str) -> Result<SolveOutcome, EscapeError> {
        let answer = answer.to_string();
        self.call(|reply| SessionCommand::Solve {
            puzzle_id,
            answer,
            reply,
        })
        .await
    }

    pub async fn hint(&self, puzzle_id: PuzzleId) -> Result<Option<String>, EscapeError> {
        self.call(|reply| SessionCommand::Hint { puzzle_id, reply })
            .await
    }

    pub async fn navigate(&self, index: usize) -> Result<bool, EscapeError> {
        self.call(|reply| SessionCommand::Navigate { index, reply })
            .await
    }

    pub async fn terminal(&self, line: &str) -> Result<CommandOutcome, EscapeError> {
        let line = line.to_string();
        self.call(|reply| SessionCommand::Terminal { line, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, EscapeError> {
        self.call(SessionCommand::Snapshot).await
    }

    /// Lifetime progress including unlocks from the running session.
    pub async fn progress(&self) -> Result<PlayerProgress, EscapeError> {
        self.call(SessionCommand::Progress).await
    }

    pub async fn quit(&self) -> Result<(), EscapeError> {
        self.send(SessionCommand::Quit).await
    }
}

pub struct SessionRunner {
    session: GameSession,
    tick_interval: Duration,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    sink: Option<Arc<dyn SessionSink>>,
    finish_recorded: bool,
}

impl SessionRunner {
    /// Spawn the runner. The join handle yields the session back once the
    /// runner stops (after `quit` or when every handle is dropped).
    pub fn spawn(
        session: GameSession,
        tick_interval: Duration,
        sink: Option<Arc<dyn SessionSink>>,
    ) -> (
        SessionHandle,
        mpsc::UnboundedReceiver<SessionEvent>,
        JoinHandle<GameSession>,
    ) {
        let (tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (events, events_rx) = mpsc::unbounded_channel();
        let finish_recorded = session.state().is_finished();
        let runner = SessionRunner {
            session,
            tick_interval,
            commands,
            events,
            sink,
            finish_recorded,
        };
        let join = tokio::spawn(runner.run());
        (SessionHandle { tx }, events_rx, join)
    }

    async fn run(mut self) -> GameSession {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.reset();
        info!(
            "session runner started: session={} tick={}ms",
            self.session.id(),
            self.tick_interval.as_millis()
        );

        loop {
            let clock_running = self.session.is_clock_running();
            tokio::select! {
                _ = ticker.tick(), if clock_running => {
                    self.session.tick();
                }

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("all session handles dropped");
                        self.checkpoint();
                        break;
                    };
                    if matches!(command, SessionCommand::Quit) {
                        self.checkpoint();
                        break;
                    }
                    self.handle(command);
                    if !clock_running && self.session.is_clock_running() {
                        // Start/resume: the first second counts from now.
                        ticker.reset();
                    }
                }
            }
            self.flush();
        }

        self.flush();
        info!("session runner stopped: session={}", self.session.id());
        self.session
    }

    fn handle(&mut self, command: SessionCommand) {
        let session = &mut self.session;
        match command {
            SessionCommand::Start(reply) => {
                let _ = reply.send(session.start());
            }
            SessionCommand::Pause(reply) => {
                let result = session.pause();
                let paused = result.is_ok();
                let _ = reply.send(result);
                if paused {
                    self.checkpoint();
                }
            }
            SessionCommand::Resume(reply) => {
                let _ = reply.send(session.resume());
            }
            SessionCommand::Restart(reply) => {
                session.restart();
                self.finish_recorded = false;
                let _ = reply.send(());
            }
            SessionCommand::Solve {
                puzzle_id,
                answer,
                reply,
            } => {
                let _ = reply.send(session.attempt_solve(puzzle_id, &answer));
            }
            SessionCommand::Hint { puzzle_id, reply } => {
                let _ = reply.send(session.request_hint(puzzle_id));
            }
            SessionCommand::Navigate { index, reply } => {
                let _ = reply.send(session.navigate_to(index));
            }
            SessionCommand::Terminal { line, reply } => {
                let _ = reply.send(session.submit_command(&line));
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(session.snapshot());
            }
            SessionCommand::Progress(reply) => {
                let _ = reply.send(session.achievements().progress().clone());
            }
            SessionCommand::Quit => {}
        }
    }

    /// Forward queued events and record a newly finished session.
    fn flush(&mut self) {
        for event in self.session.take_events() {
            // Receiver gone just means nobody is watching.
            let _ = self.events.send(event);
        }
        if self.session.state().is_finished() && !self.finish_recorded {
            self.finish_recorded = true;
            if let Some(sink) = &self.sink {
                let summary = self.session.summary();
                if let Err(e) = sink.session_finished(&summary, self.session.achievements().progress()) {
                    warn!("failed to record session {}: {}", summary.session_id, e);
                }
            }
        }
    }

    fn checkpoint(&self) {
        if self.session.state().is_finished() {
            return;
        }
        if let Some(sink) = &self.sink {
            let snapshot = self.session.snapshot();
            if let Err(e) = sink.checkpoint(&snapshot, self.session.achievements().progress()) {
                warn!("failed to checkpoint session {}: {}", snapshot.session_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::achievement::AchievementEvaluator;
    use crate::escape::session::SessionConfig;
    use crate::escape::state::{seed_starter_achievements, starter_catalog};
    use crate::escape::types::{SessionState, SessionSummary};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        finished: Mutex<Vec<SessionSummary>>,
        checkpoints: Mutex<Vec<SessionSnapshot>>,
    }

    impl SessionSink for MemorySink {
        fn session_finished(
            &self,
            summary: &SessionSummary,
            _progress: &PlayerProgress,
        ) -> Result<(), EscapeError> {
            self.finished.lock().unwrap().push(summary.clone());
            Ok(())
        }

        fn checkpoint(
            &self,
            snapshot: &SessionSnapshot,
            _progress: &PlayerProgress,
        ) -> Result<(), EscapeError> {
            self.checkpoints.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    fn session(duration_secs: u32) -> GameSession {
        let config = SessionConfig {
            duration_secs,
            low_time_warning_secs: 2,
            ..SessionConfig::default()
        };
        GameSession::new(
            "ada",
            Arc::new(starter_catalog().unwrap()),
            config,
            AchievementEvaluator::new(seed_starter_achievements(), PlayerProgress::new("ada")),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn clock_only_runs_while_in_progress() {
        let (handle, _events, join) = SessionRunner::spawn(session(60), Duration::from_secs(1), None);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 60);

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 55);

        handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 55);

        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().await.unwrap().time_remaining, 54);

        handle.quit().await.unwrap();
        let session = join.await.unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_recorded_once() {
        let sink = Arc::new(MemorySink::default());
        let (handle, mut events, join) = SessionRunner::spawn(
            session(5),
            Duration::from_secs(1),
            Some(sink.clone() as Arc<dyn SessionSink>),
        );
        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(8)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, SessionState::Expired);
        assert_eq!(snap.time_remaining, 0);
        assert!(matches!(
            handle.solve(0, "4721").await.unwrap(),
            SolveOutcome::Rejected(_)
        ));

        handle.quit().await.unwrap();
        join.await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&SessionEvent::TimerWarning { time_remaining: 2 }));
        assert_eq!(
            seen.iter().filter(|e| **e == SessionEvent::TimerExpired).count(),
            1
        );
        assert_eq!(sink.finished.lock().unwrap().len(), 1);
        assert!(sink.checkpoints.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn quit_checkpoints_unfinished_session() {
        let sink = Arc::new(MemorySink::default());
        let (handle, _events, join) = SessionRunner::spawn(
            session(600),
            Duration::from_secs(1),
            Some(sink.clone() as Arc<dyn SessionSink>),
        );
        handle.start().await.unwrap();
        assert!(matches!(
            handle.solve(0, "4721").await.unwrap(),
            SolveOutcome::Solved { .. }
        ));
        handle.quit().await.unwrap();
        join.await.unwrap();

        let checkpoints = sink.checkpoints.lock().unwrap();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].unlocked_puzzle_ids, vec![0, 1]);
        assert!(handle.snapshot().await.is_err());
    }
}

/// Achievement evaluation for escape-room sessions
///
/// Rules are declarative ([`AchievementRule`]) and are checked after every
/// puzzle solve and once more when a session completes. Unlocking is keyed by
/// the achievement id and is idempotent: an unlocked achievement is never
/// re-locked and never reported twice.
use log::info;

use crate::escape::types::{AchievementRecord, AchievementRule, PlayerAchievement, PlayerProgress};

/// Snapshot of the session facts rules are evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext<'a> {
    pub session_id: &'a str,
    pub completed: bool,
    pub time_used: u32,
    pub time_remaining: u32,
    pub configured_duration: u32,
    pub hints_used: u32,
    pub inventory_size: u32,
    pub catalog_items: u32,
}

impl EvaluationContext<'_> {
    /// Fraction of the countdown still left, in `[0, 1]`.
    pub fn efficiency(&self) -> f32 {
        if self.configured_duration == 0 {
            return 0.0;
        }
        self.time_remaining as f32 / self.configured_duration as f32
    }
}

/// Holds the rule table and the player's lifetime progress.
#[derive(Debug, Clone)]
pub struct AchievementEvaluator {
    rules: Vec<AchievementRecord>,
    progress: PlayerProgress,
}

impl AchievementEvaluator {
    pub fn new(rules: Vec<AchievementRecord>, progress: PlayerProgress) -> Self {
        Self { rules, progress }
    }

    pub fn rules(&self) -> &[AchievementRecord] {
        &self.rules
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    pub fn is_unlocked(&self, achievement_id: &str) -> bool {
        self.progress.has_achievement(achievement_id)
    }

    pub fn record_session_started(&mut self) {
        self.progress.sessions_started += 1;
        self.progress.touch();
    }

    pub fn record_session_expired(&mut self) {
        self.progress.sessions_expired += 1;
        self.progress.touch();
    }

    /// Count a solve, then evaluate. Returns newly unlocked achievements.
    pub fn record_puzzle_solved(&mut self, ctx: &EvaluationContext<'_>) -> Vec<AchievementRecord> {
        self.progress.puzzles_solved += 1;
        self.progress.touch();
        self.evaluate(ctx)
    }

    /// Count a completed session, then evaluate (completion-only rules included).
    pub fn record_session_completed(&mut self, ctx: &EvaluationContext<'_>) -> Vec<AchievementRecord> {
        self.progress.sessions_completed += 1;
        self.progress.best_time_secs = Some(match self.progress.best_time_secs {
            Some(best) => best.min(ctx.time_used),
            None => ctx.time_used,
        });
        self.progress.touch();
        self.evaluate(ctx)
    }

    /// Check every locked rule against `ctx` and the lifetime progress.
    pub fn evaluate(&mut self, ctx: &EvaluationContext<'_>) -> Vec<AchievementRecord> {
        let met: Vec<AchievementRecord> = self
            .rules
            .iter()
            .filter(|record| !self.progress.has_achievement(&record.id))
            .filter(|record| rule_met(&record.rule, ctx, &self.progress))
            .cloned()
            .collect();

        met.into_iter()
            .filter(|record| self.unlock(&record.id, Some(ctx.session_id)))
            .collect()
    }

    /// Record an unlock. Returns `false` for unknown ids and ids already unlocked.
    pub fn unlock(&mut self, achievement_id: &str, session_id: Option<&str>) -> bool {
        if self.progress.has_achievement(achievement_id)
            || !self.rules.iter().any(|r| r.id == achievement_id)
        {
            return false;
        }
        info!(
            "achievement unlocked: player={} id={}",
            self.progress.player, achievement_id
        );
        self.progress
            .achievements
            .push(PlayerAchievement::new(achievement_id, session_id));
        self.progress.touch();
        true
    }

    /// Achievements a player can see: all non-hidden ones plus unlocked hidden ones.
    pub fn visible_achievements(&self) -> Vec<(&AchievementRecord, Option<&PlayerAchievement>)> {
        self.rules
            .iter()
            .map(|record| {
                let unlock = self
                    .progress
                    .achievements
                    .iter()
                    .find(|a| a.achievement_id == record.id);
                (record, unlock)
            })
            .filter(|(record, unlock)| !record.hidden || unlock.is_some())
            .collect()
    }
}

fn rule_met(rule: &AchievementRule, ctx: &EvaluationContext<'_>, progress: &PlayerProgress) -> bool {
    if rule.needs_completion() && !ctx.completed {
        return false;
    }
    match rule {
        AchievementRule::FirstPuzzleSolved => progress.puzzles_solved >= 1,
        AchievementRule::PuzzlesSolved { required } => progress.puzzles_solved >= *required,
        AchievementRule::SessionsCompleted { required } => progress.sessions_completed >= *required,
        AchievementRule::Efficiency { min_ratio } => ctx.efficiency() >= *min_ratio,
        AchievementRule::NoHints => ctx.hints_used == 0,
        AchievementRule::CompletedWithin { seconds } => ctx.time_used <= *seconds,
        AchievementRule::AllItemsCollected => {
            ctx.catalog_items > 0 && ctx.inventory_size >= ctx.catalog_items
        }
    }
}

/// One line per visible achievement, `[x]` when unlocked.
pub fn format_achievement_list(evaluator: &AchievementEvaluator) -> String {
    let visible = evaluator.visible_achievements();
    if visible.is_empty() {
        return "No achievements defined.".to_string();
    }
    visible
        .iter()
        .map(|(record, unlock)| {
            format!(
                "[{}] {} - {}",
                if unlock.is_some() { "x" } else { " " },
                record.title,
                record.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

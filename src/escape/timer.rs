//! Countdown clock with pause/resume, penalties and a one-shot low-time warning.
//!
//! The timer only counts; it does not schedule anything. The session runner
//! calls [`Timer::tick`] once per second and the owning session translates the
//! returned [`TimerSignal`] into state transitions and events.

use serde::{Deserialize, Serialize};

/// What a tick or penalty did to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// Clock not running (paused, stopped, or already at zero); nothing changed.
    Idle,
    /// Time was removed; still above the warning threshold or warning already sent.
    Ticked { remaining: u32 },
    /// Time was removed and the warning threshold was crossed for the first time.
    Warning { remaining: u32 },
    /// Time reached zero. Returned exactly once per countdown.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    configured: u32,
    remaining: u32,
    warning_threshold: u32,
    warning_fired: bool,
    running: bool,
}

impl Timer {
    pub fn new(configured: u32, warning_threshold: u32) -> Self {
        Self {
            configured,
            remaining: configured,
            warning_threshold,
            warning_fired: false,
            running: false,
        }
    }

    /// Rebuild a stopped clock from saved values, clamping `remaining` into range.
    pub fn restore(configured: u32, warning_threshold: u32, remaining: u32, warning_fired: bool) -> Self {
        Self {
            configured,
            remaining: remaining.min(configured),
            warning_threshold,
            warning_fired,
            running: false,
        }
    }

    pub fn start(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    /// Freeze the clock. Returns `false` if it was not running.
    pub fn pause(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Unfreeze the clock. Returns `false` if it was already running or expired.
    pub fn resume(&mut self) -> bool {
        if self.running || self.remaining == 0 {
            return false;
        }
        self.running = true;
        true
    }

    /// Stop for good (session completed). Remaining time is kept for the summary.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.remaining = self.configured;
        self.warning_fired = false;
        self.running = false;
    }

    /// Count down one second.
    pub fn tick(&mut self) -> TimerSignal {
        if !self.running {
            return TimerSignal::Idle;
        }
        self.subtract(1)
    }

    /// Remove `seconds`, floored at zero. Applies while paused too, but never
    /// after the clock has reached zero.
    pub fn apply_penalty(&mut self, seconds: u32) -> TimerSignal {
        if self.remaining == 0 {
            return TimerSignal::Idle;
        }
        self.subtract(seconds)
    }

    fn subtract(&mut self, seconds: u32) -> TimerSignal {
        self.remaining = self.remaining.saturating_sub(seconds);
        if self.remaining == 0 {
            self.running = false;
            self.warning_fired = true;
            return TimerSignal::Expired;
        }
        if !self.warning_fired && self.remaining <= self.warning_threshold {
            self.warning_fired = true;
            return TimerSignal::Warning {
                remaining: self.remaining,
            };
        }
        TimerSignal::Ticked {
            remaining: self.remaining,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn configured(&self) -> u32 {
        self.configured
    }

    pub fn time_used(&self) -> u32 {
        self.configured - self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn warning_fired(&self) -> bool {
        self.warning_fired
    }

    pub fn warning_threshold(&self) -> u32 {
        self.warning_threshold
    }
}

/// `MM:SS` countdown display; hours roll into minutes.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

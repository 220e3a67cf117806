use serde::{Deserialize, Serialize};

use super::pomodoro::PomodoroMode;
use super::settings::TimerSettings;

/// The persisted part of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_work_session: bool,
    pub remaining: u32,
}

impl TimerState {
    pub fn fresh(mode: PomodoroMode, settings: &TimerSettings) -> Self {
        Self {
            is_work_session: mode.is_work(),
            remaining: settings.duration_for(mode),
        }
    }

    pub fn mode(&self) -> PomodoroMode {
        PomodoroMode::from_work_flag(self.is_work_session)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer is paused; nothing changed.
    Idle,
    /// One second was taken off the current session.
    Counted,
    /// The session ran out and the timer moved on to `next`.
    Completed {
        ended: PomodoroMode,
        next: PomodoroMode,
    },
}

/// Countdown plus the runtime-only running flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    state: TimerState,
    running: bool,
}

impl Timer {
    pub fn new(settings: &TimerSettings) -> Self {
        Self::from_state(TimerState::fresh(PomodoroMode::Work, settings))
    }

    /// Restore a stored countdown. Restored timers are always paused.
    pub fn from_state(state: TimerState) -> Self {
        Self {
            state,
            running: false,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn mode(&self) -> PomodoroMode {
        self.state.mode()
    }

    pub fn remaining(&self) -> u32 {
        self.state.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick(&mut self, settings: &TimerSettings) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        if self.state.remaining > 1 {
            self.state.remaining -= 1;
            return TickOutcome::Counted;
        }

        let ended = self.mode();
        let next = ended.toggled();
        self.state = TimerState::fresh(next, settings);
        TickOutcome::Completed { ended, next }
    }

    pub fn start(&mut self, settings: &TimerSettings) {
        if self.state.remaining == 0 {
            self.state.remaining = settings.duration_for(self.mode());
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self, settings: &TimerSettings) {
        if self.running {
            self.pause();
        } else {
            self.start(settings);
        }
    }

    pub fn reset(&mut self, settings: &TimerSettings) {
        self.state = TimerState::fresh(self.mode(), settings);
        self.running = false;
    }

    pub fn switch(&mut self, settings: &TimerSettings) {
        self.select_mode(self.mode().toggled(), settings);
    }

    pub fn select_mode(&mut self, mode: PomodoroMode, settings: &TimerSettings) {
        self.state = TimerState::fresh(mode, settings);
        self.running = false;
    }

    /// Refill the active session from new settings without touching the
    /// session kind or the running flag.
    pub fn apply_settings(&mut self, settings: &TimerSettings) {
        self.state.remaining = settings.duration_for(self.mode());
    }
}

use serde::{Deserialize, Serialize};

pub const TICK_INTERVAL_MS: u64 = 1000; // One countdown step per second
pub const POMODORO_WORK_MINUTES: u32 = 25; // Default Pomodoro work time
pub const POMODORO_BREAK_MINUTES: u32 = 5; // Default Pomodoro break time
pub const WORK_MINUTES_RANGE: (u32, u32) = (1, 180);
pub const BREAK_MINUTES_RANGE: (u32, u32) = (1, 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PomodoroMode {
    Work,
    Break,
}

impl PomodoroMode {
    pub fn from_work_flag(is_work_session: bool) -> Self {
        if is_work_session {
            PomodoroMode::Work
        } else {
            PomodoroMode::Break
        }
    }

    pub fn is_work(&self) -> bool {
        matches!(self, PomodoroMode::Work)
    }

    pub fn toggled(&self) -> Self {
        match self {
            PomodoroMode::Work => PomodoroMode::Break,
            PomodoroMode::Break => PomodoroMode::Work,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PomodoroMode::Work => "WORK",
            PomodoroMode::Break => "BREAK",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            PomodoroMode::Work => "💼",
            PomodoroMode::Break => "☕",
        }
    }
}

/// Render seconds as `MM:SS`, letting minutes grow past two digits.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

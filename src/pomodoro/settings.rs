use serde::{Deserialize, Serialize};

use super::pomodoro::{
    BREAK_MINUTES_RANGE, POMODORO_BREAK_MINUTES, POMODORO_WORK_MINUTES, PomodoroMode,
    WORK_MINUTES_RANGE,
};

/// Configured session lengths, stored in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub work_duration: u32,
    pub break_duration: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_duration: POMODORO_WORK_MINUTES * 60,
            break_duration: POMODORO_BREAK_MINUTES * 60,
        }
    }
}

impl TimerSettings {
    /// Build settings from minute values, clamping each to its allowed range.
    pub fn from_minutes(work_minutes: u32, break_minutes: u32) -> Self {
        Self {
            work_duration: clamp_minutes(work_minutes, WORK_MINUTES_RANGE) * 60,
            break_duration: clamp_minutes(break_minutes, BREAK_MINUTES_RANGE) * 60,
        }
    }

    /// Clamp second values read from storage into the minute ranges.
    pub fn clamped(self) -> Self {
        Self {
            work_duration: clamp_seconds(self.work_duration, WORK_MINUTES_RANGE),
            break_duration: clamp_seconds(self.break_duration, BREAK_MINUTES_RANGE),
        }
    }

    pub fn duration_for(&self, mode: PomodoroMode) -> u32 {
        match mode {
            PomodoroMode::Work => self.work_duration,
            PomodoroMode::Break => self.break_duration,
        }
    }

    pub fn work_minutes(&self) -> u32 {
        self.work_duration / 60
    }

    pub fn break_minutes(&self) -> u32 {
        self.break_duration / 60
    }
}

fn clamp_minutes(minutes: u32, (min, max): (u32, u32)) -> u32 {
    minutes.clamp(min, max)
}

fn clamp_seconds(seconds: u32, (min, max): (u32, u32)) -> u32 {
    seconds.clamp(min * 60, max * 60)
}

//! The single owner of timer, settings and task list state.
//!
//! Every user action and every tick goes through [`Controller`]; each method
//! rewrites whichever stored records it changed before returning.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use crate::pomodoro::timer::TickOutcome;
use crate::pomodoro::{PomodoroMode, Timer, TimerSettings};
use crate::storage::Persistence;
use crate::tasks::{Task, TaskStore};

/// Raised by a tick that ran a session out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCompleted {
    pub ended: PomodoroMode,
    pub next: PomodoroMode,
    /// Task credited with the pomodoro, as it looks after crediting.
    pub credited: Option<Task>,
    pub at: DateTime<Local>,
}

impl SessionCompleted {
    pub fn message(&self, settings: &TimerSettings) -> String {
        match self.ended {
            PomodoroMode::Work => {
                let credit = match &self.credited {
                    Some(task) => format!(" \"{}\" now has {} 🍅.", task.name, task.pomodoros),
                    None => String::new(),
                };
                format!(
                    "Work session complete!{credit} Time for a {}-minute break.",
                    settings.break_minutes()
                )
            }
            PomodoroMode::Break => format!(
                "Break is over! Starting {}-minute work session.",
                settings.work_minutes()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub mode: PomodoroMode,
    pub is_work_session: bool,
    pub remaining: u32,
    pub running: bool,
}

/// Read-only copy of everything a front end shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub settings: TimerSettings,
    pub timer: TimerView,
    pub tasks: Vec<Task>,
    pub selected_task_id: Option<String>,
}

pub struct Controller {
    settings: TimerSettings,
    timer: Timer,
    tasks: TaskStore,
    persistence: Persistence,
}

impl Controller {
    /// Restore state from storage. The restored timer is paused.
    pub fn load(persistence: Persistence) -> Self {
        let loaded = persistence.load();
        Self {
            settings: loaded.settings,
            timer: Timer::from_state(loaded.timer),
            tasks: TaskStore::from_tasks(loaded.tasks),
            persistence,
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.timer.state();
        Snapshot {
            settings: self.settings,
            timer: TimerView {
                mode: state.mode(),
                is_work_session: state.is_work_session,
                remaining: state.remaining,
                running: self.timer.is_running(),
            },
            tasks: self.tasks.tasks().to_vec(),
            selected_task_id: self.tasks.selected_id().map(str::to_string),
        }
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Option<SessionCompleted> {
        let (ended, next) = match self.timer.tick(&self.settings) {
            TickOutcome::Idle => return None,
            TickOutcome::Counted => {
                self.save_timer();
                return None;
            }
            TickOutcome::Completed { ended, next } => (ended, next),
        };
        self.save_timer();

        let credited = if ended.is_work() {
            self.credit_selected()
        } else {
            None
        };
        info!(
            ended = ended.as_str(),
            next = next.as_str(),
            credited = ?credited.as_ref().map(|t| &t.name),
            "session complete"
        );
        Some(SessionCompleted {
            ended,
            next,
            credited,
            at: Local::now(),
        })
    }

    fn credit_selected(&mut self) -> Option<Task> {
        let id = self.tasks.selected_id()?.to_string();
        if !self.tasks.credit_pomodoro(&id) {
            return None;
        }
        self.save_tasks();
        self.tasks.get(&id).cloned()
    }

    pub fn start(&mut self) {
        self.update_timer(|timer, settings| timer.start(settings));
    }

    pub fn pause(&mut self) {
        self.update_timer(|timer, _| timer.pause());
    }

    pub fn toggle(&mut self) {
        self.update_timer(|timer, settings| timer.toggle(settings));
    }

    pub fn reset(&mut self) {
        self.update_timer(|timer, settings| timer.reset(settings));
    }

    pub fn switch_session(&mut self) {
        self.update_timer(|timer, settings| timer.switch(settings));
    }

    pub fn select_mode(&mut self, mode: PomodoroMode) {
        self.update_timer(|timer, settings| timer.select_mode(mode, settings));
    }

    /// Set both session lengths in minutes, clamped to their ranges, and
    /// refill the active session.
    pub fn update_durations(&mut self, work_minutes: u32, break_minutes: u32) {
        let settings = TimerSettings::from_minutes(work_minutes, break_minutes);
        if settings != self.settings {
            self.settings = settings;
            self.persistence.save_settings(&self.settings);
        }
        self.update_timer(|timer, settings| timer.apply_settings(settings));
    }

    pub fn add_task(&mut self, name: &str) -> Option<String> {
        let id = self.tasks.add(name)?;
        debug!(%id, "task added");
        self.save_tasks();
        Some(id)
    }

    pub fn toggle_task(&mut self, id: &str) {
        if self.tasks.toggle_done(id) {
            self.save_tasks();
        }
    }

    pub fn rename_task(&mut self, id: &str, name: &str) {
        if self.tasks.rename(id, name) {
            self.save_tasks();
        }
    }

    pub fn delete_task(&mut self, id: &str) {
        if self.tasks.delete(id) {
            debug!(%id, "task deleted");
            self.save_tasks();
        }
    }

    pub fn select_task(&mut self, id: &str) {
        self.tasks.select(id);
    }

    pub fn clear_selection(&mut self) {
        self.tasks.clear_selection();
    }

    fn update_timer(&mut self, change: impl FnOnce(&mut Timer, &TimerSettings)) {
        let before = self.timer.state();
        change(&mut self.timer, &self.settings);
        if self.timer.state() != before {
            self.save_timer();
        }
    }

    fn save_timer(&mut self) {
        self.persistence.save_timer(&self.timer.state());
    }

    fn save_tasks(&mut self) {
        self.persistence.save_tasks(self.tasks.tasks());
    }
}

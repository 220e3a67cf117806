use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::kv::KeyValueStore;
use crate::error::StorageError;
use crate::pomodoro::{PomodoroMode, TimerSettings, TimerState};
use crate::tasks::Task;

pub const SETTINGS_KEY: &str = "pomotask.settings";
pub const TIMER_KEY: &str = "pomotask.timer";
pub const TASKS_KEY: &str = "pomotask.tasks";

/// Everything read back at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub settings: TimerSettings,
    pub timer: TimerState,
    pub tasks: Vec<Task>,
}

/// Mirrors settings, timer state and the task list into a key-value store.
///
/// Loading never fails: every record, and every field inside it, falls back
/// to its default on its own. Saving overwrites the whole record and only
/// logs failures.
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn load(&self) -> Loaded {
        let settings = self
            .read_record(SETTINGS_KEY)
            .map(|value| parse_settings(&value))
            .unwrap_or_default();
        let timer = match self.read_record(TIMER_KEY) {
            Some(value) => parse_timer(&value, &settings),
            None => TimerState::fresh(PomodoroMode::Work, &settings),
        };
        let tasks = self
            .read_record(TASKS_KEY)
            .map(|value| parse_tasks(&value))
            .unwrap_or_default();

        debug!(
            work = settings.work_duration,
            brk = settings.break_duration,
            tasks = tasks.len(),
            "loaded stored state"
        );
        Loaded {
            settings,
            timer,
            tasks,
        }
    }

    pub fn save_settings(&mut self, settings: &TimerSettings) {
        self.write_record(SETTINGS_KEY, settings);
    }

    pub fn save_timer(&mut self, timer: &TimerState) {
        self.write_record(TIMER_KEY, timer);
    }

    pub fn save_tasks(&mut self, tasks: &[Task]) {
        self.write_record(TASKS_KEY, tasks);
    }

    fn read_record(&self, key: &str) -> Option<Value> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("{e}; using defaults");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("cannot parse {key}: {e}; using defaults");
                None
            }
        }
    }

    fn write_record<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        if let Err(e) = self.try_write_record(key, value) {
            error!("cannot persist state: {e}");
        }
    }

    fn try_write_record<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &json)
    }
}

fn field_u32(value: &Value, field: &str) -> Option<u32> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn parse_settings(value: &Value) -> TimerSettings {
    let defaults = TimerSettings::default();
    TimerSettings {
        work_duration: field_u32(value, "workDuration").unwrap_or(defaults.work_duration),
        break_duration: field_u32(value, "breakDuration").unwrap_or(defaults.break_duration),
    }
    .clamped()
}

fn parse_timer(value: &Value, settings: &TimerSettings) -> TimerState {
    let is_work_session = value
        .get("isWorkSession")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let full = settings.duration_for(PomodoroMode::from_work_flag(is_work_session));
    let remaining = field_u32(value, "remaining").map_or(full, |r| r.min(full));
    TimerState {
        is_work_session,
        remaining,
    }
}

fn parse_tasks(value: &Value) -> Vec<Task> {
    let Some(entries) = value.as_array() else {
        warn!("stored task list is not an array; starting empty");
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match Task::deserialize(entry) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!("dropping malformed task entry: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store_with(entries: &[(&str, &str)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (key, value) in entries {
            store.set(key, value).unwrap();
        }
        store
    }

    #[test]
    fn empty_store_loads_defaults() {
        let loaded = Persistence::new(MemoryStore::new()).load();
        assert_eq!(loaded.settings, TimerSettings::default());
        assert_eq!(
            loaded.timer,
            TimerState {
                is_work_session: true,
                remaining: 1500
            }
        );
        assert!(loaded.tasks.is_empty());
    }

    #[test]
    fn malformed_record_does_not_block_others() {
        let store = store_with(&[
            (SETTINGS_KEY, "{not json"),
            (TIMER_KEY, r#"{"isWorkSession":false,"remaining":42}"#),
            (
                TASKS_KEY,
                r#"[{"id":"a","name":"Alpha","done":true,"pomodoros":3}]"#,
            ),
        ]);
        let loaded = Persistence::new(store).load();
        assert_eq!(loaded.settings, TimerSettings::default());
        assert_eq!(
            loaded.timer,
            TimerState {
                is_work_session: false,
                remaining: 42
            }
        );
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].pomodoros, 3);
    }

    #[test]
    fn settings_fall_back_per_field_and_clamp() {
        let store = store_with(&[(SETTINGS_KEY, r#"{"workDuration":99999,"breakDuration":"x"}"#)]);
        let loaded = Persistence::new(store).load();
        assert_eq!(loaded.settings.work_duration, 180 * 60);
        assert_eq!(loaded.settings.break_duration, 300);
    }

    #[test]
    fn timer_falls_back_to_full_session() {
        let store = store_with(&[
            (SETTINGS_KEY, r#"{"workDuration":1200,"breakDuration":600}"#),
            (TIMER_KEY, r#"{"isWorkSession":false,"remaining":-3}"#),
        ]);
        let loaded = Persistence::new(store).load();
        assert_eq!(
            loaded.timer,
            TimerState {
                is_work_session: false,
                remaining: 600
            }
        );
    }

    #[test]
    fn oversized_remaining_is_clamped_to_session_length() {
        let store = store_with(&[(TIMER_KEY, r#"{"isWorkSession":true,"remaining":99999}"#)]);
        let loaded = Persistence::new(store).load();
        assert_eq!(loaded.timer.remaining, 1500);
    }

    #[test]
    fn malformed_task_entries_are_dropped_individually() {
        let store = store_with(&[(
            TASKS_KEY,
            r#"[{"id":"a","name":"Alpha","done":false,"pomodoros":0},
                {"id":"b"},
                42,
                {"id":"c","name":"Gamma","done":false,"pomodoros":1}]"#,
        )]);
        let loaded = Persistence::new(store).load();
        let ids: Vec<&str> = loaded.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn task_entries_missing_counters_are_kept_with_defaults() {
        let store = store_with(&[(
            TASKS_KEY,
            r#"[{"id":"a","name":"Old task","done":true},{"id":"b","name":"Older task"}]"#,
        )]);
        let loaded = Persistence::new(store).load();
        assert_eq!(loaded.tasks.len(), 2);
        assert!(loaded.tasks[0].done);
        assert_eq!(loaded.tasks[0].pomodoros, 0);
        assert!(!loaded.tasks[1].done);
    }

    #[test]
    fn non_array_task_record_loads_empty() {
        let store = store_with(&[(TASKS_KEY, r#"{"id":"a"}"#)]);
        assert!(Persistence::new(store).load().tasks.is_empty());
    }

    #[test]
    fn saved_records_load_back() {
        let store = MemoryStore::new();
        let mut persistence = Persistence::new(store.clone());
        let settings = TimerSettings::from_minutes(50, 10);
        let timer = TimerState {
            is_work_session: false,
            remaining: 77,
        };
        let tasks = vec![Task::new("Write report")];
        persistence.save_settings(&settings);
        persistence.save_timer(&timer);
        persistence.save_tasks(&tasks);

        let loaded = Persistence::new(store).load();
        assert_eq!(
            loaded,
            Loaded {
                settings,
                timer,
                tasks
            }
        );
    }
}

//! Shared handle that front ends drive, plus the tick driver.
//!
//! The tick driver is a tokio task that only exists while the timer runs.
//! After every command the registration is reconciled with the controller's
//! running flag, so at most one ticker is ever alive.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, interval_at};
use tracing::{debug, info, warn};

use crate::commands::Command;
use crate::controller::{Controller, SessionCompleted, Snapshot};
use crate::error::CommandError;
use crate::notify::send_notification;
use crate::pomodoro::TimerSettings;
use crate::pomodoro::pomodoro::TICK_INTERVAL_MS;

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// How task references in a command are matched against the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLookup {
    /// Only an exact id matches. Used for machine clients.
    Exact,
    /// Exact id, then 1-based list position, then unique id prefix.
    Typed,
}

#[derive(Clone)]
pub struct App {
    controller: Arc<Mutex<Controller>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    updates: broadcast::Sender<Snapshot>,
    notifications: bool,
}

impl App {
    pub fn new(controller: Controller, notifications: bool) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            ticker: Arc::new(Mutex::new(None)),
            updates,
            notifications,
        }
    }

    pub fn controller(&self) -> MutexGuard<'_, Controller> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.controller().snapshot()
    }

    /// Snapshots published after every tick and every applied command.
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    /// Apply a command whose task fields carry exact ids.
    pub fn apply(&self, command: Command) -> Result<Snapshot, CommandError> {
        self.apply_with(command, TaskLookup::Exact)
    }

    /// Apply a command typed at the prompt, where tasks may be named by
    /// position or id prefix.
    pub fn apply_typed(&self, command: Command) -> Result<Snapshot, CommandError> {
        self.apply_with(command, TaskLookup::Typed)
    }

    fn apply_with(
        &self,
        command: Command,
        lookup: TaskLookup,
    ) -> Result<Snapshot, CommandError> {
        let snapshot = {
            let mut controller = self.controller();
            match command {
                Command::Start => controller.start(),
                Command::Pause => controller.pause(),
                Command::Toggle => controller.toggle(),
                Command::Reset => controller.reset(),
                Command::Switch => controller.switch_session(),
                Command::SetMode { mode } => controller.select_mode(mode),
                Command::SetDurations {
                    work_minutes,
                    break_minutes,
                } => controller.update_durations(work_minutes, break_minutes),
                Command::AddTask { name } => {
                    controller.add_task(&name);
                }
                Command::ToggleTask { id } => {
                    let id = resolve(&controller, &id, lookup)?;
                    controller.toggle_task(&id);
                }
                Command::DeleteTask { id } => {
                    let id = resolve(&controller, &id, lookup)?;
                    controller.delete_task(&id);
                }
                Command::RenameTask { id, name } => {
                    let id = resolve(&controller, &id, lookup)?;
                    controller.rename_task(&id, &name);
                }
                Command::SelectTask { id } => {
                    let id = resolve(&controller, &id, lookup)?;
                    controller.select_task(&id);
                }
                Command::ClearSelection => controller.clear_selection(),
                Command::Status => {}
            }
            controller.snapshot()
        };
        self.sync_ticker();
        let _ = self.updates.send(snapshot.clone());
        Ok(snapshot)
    }

    /// Register a ticker when running with none alive; clear it when paused.
    fn sync_ticker(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        let running = self.controller().is_running();
        let alive = ticker.as_ref().is_some_and(|handle| !handle.is_finished());

        if running && !alive {
            *ticker = Some(self.spawn_ticker());
            debug!("tick driver registered");
        } else if !running {
            if let Some(handle) = ticker.take() {
                handle.abort();
                debug!("tick driver cleared");
            }
        }
    }

    fn spawn_ticker(&self) -> JoinHandle<()> {
        let app = self.clone();
        tokio::spawn(async move {
            let period = Duration::from_millis(TICK_INTERVAL_MS);
            let mut interval = interval_at(Instant::now() + period, period);

            loop {
                interval.tick().await;
                let (event, settings, snapshot) = {
                    let mut controller = app.controller();
                    if !controller.is_running() {
                        break;
                    }
                    let event = controller.tick();
                    (event, *controller.settings(), controller.snapshot())
                };

                // No subscribers is fine.
                let _ = app.updates.send(snapshot);
                if let Some(event) = event {
                    app.announce(&event, &settings);
                }
            }
        })
    }

    fn announce(&self, event: &SessionCompleted, settings: &TimerSettings) {
        let message = event.message(settings);
        println!(
            "\n🔔 [{}] {}\n{} Now in {} mode",
            event.at.format("%H:%M:%S"),
            message,
            event.next.emoji(),
            event.next.as_str()
        );
        info!("{message}");

        if self.notifications {
            if let Err(e) = send_notification(event, &message) {
                warn!("failed to send notification: {e}");
            }
        }
    }
}

fn resolve(
    controller: &Controller,
    reference: &str,
    lookup: TaskLookup,
) -> Result<String, CommandError> {
    let tasks = controller.tasks();
    let id = match lookup {
        TaskLookup::Exact => tasks.get(reference).map(|task| task.id.clone()),
        TaskLookup::Typed => tasks.resolve(reference),
    };
    id.ok_or_else(|| CommandError::UnknownTask(reference.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pomodoro::PomodoroMode;
    use crate::storage::{MemoryStore, Persistence};

    fn app() -> App {
        App::new(Controller::load(Persistence::new(MemoryStore::new())), false)
    }

    fn ticker_registered(app: &App) -> bool {
        app.ticker
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn wait_secs(secs: f64) {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_while_running() {
        let app = app();
        app.apply(Command::Start).unwrap();
        assert!(ticker_registered(&app));

        wait_secs(3.5).await;
        assert_eq!(app.snapshot().timer.remaining, 1497);

        app.apply(Command::Pause).unwrap();
        assert!(!ticker_registered(&app));
        wait_secs(5.0).await;
        assert_eq!(app.snapshot().timer.remaining, 1497);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_start_keeps_a_single_ticker() {
        let app = app();
        app.apply(Command::Start).unwrap();
        app.apply(Command::Start).unwrap();
        app.apply(Command::Toggle).unwrap();
        app.apply(Command::Toggle).unwrap();

        wait_secs(2.5).await;
        assert_eq!(app.snapshot().timer.remaining, 1498);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_the_ticker() {
        let app = app();
        app.apply(Command::Start).unwrap();
        wait_secs(2.5).await;
        let snapshot = app.apply(Command::Reset).unwrap();
        assert!(!snapshot.timer.running);
        assert_eq!(snapshot.timer.remaining, 1500);
        assert!(!ticker_registered(&app));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_focus_session_credits_selected_task() {
        let app = app();
        app.apply(Command::SetDurations {
            work_minutes: 1,
            break_minutes: 1,
        })
        .unwrap();
        app.apply(Command::AddTask {
            name: "Write report".to_string(),
        })
        .unwrap();
        app.apply_typed(Command::SelectTask {
            id: "1".to_string(),
        })
        .unwrap();
        app.apply(Command::Start).unwrap();

        wait_secs(60.5).await;
        let snapshot = app.snapshot();
        assert_eq!(snapshot.timer.mode, PomodoroMode::Break);
        assert_eq!(snapshot.timer.remaining, 60);
        assert!(snapshot.timer.running);
        assert_eq!(snapshot.tasks[0].pomodoros, 1);

        wait_secs(60.0).await;
        let snapshot = app.snapshot();
        assert_eq!(snapshot.timer.mode, PomodoroMode::Work);
        assert_eq!(snapshot.tasks[0].pomodoros, 1);
    }

    #[test]
    fn commands_are_published_to_subscribers() {
        let app = app();
        let mut updates = app.subscribe();
        app.apply(Command::AddTask {
            name: "Write report".to_string(),
        })
        .unwrap();

        let snapshot = updates.try_recv().unwrap();
        assert_eq!(snapshot.tasks.len(), 1);
        assert!(!snapshot.timer.running);
    }

    #[test]
    fn exact_lookup_ignores_positions_and_prefixes() {
        let app = app();
        let id = app
            .apply(Command::AddTask {
                name: "Write report".to_string(),
            })
            .unwrap()
            .tasks[0]
            .id
            .clone();

        for reference in ["1".to_string(), id[..4].to_string()] {
            assert_eq!(
                app.apply(Command::ToggleTask {
                    id: reference.clone()
                })
                .unwrap_err(),
                CommandError::UnknownTask(reference)
            );
        }
        assert!(!app.snapshot().tasks[0].done);

        let snapshot = app
            .apply_typed(Command::ToggleTask {
                id: "1".to_string(),
            })
            .unwrap();
        assert!(snapshot.tasks[0].done);
        let snapshot = app.apply(Command::ToggleTask { id }).unwrap();
        assert!(!snapshot.tasks[0].done);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_published_to_subscribers() {
        let app = app();
        app.apply(Command::Start).unwrap();
        let mut updates = app.subscribe();

        let snapshot = updates.recv().await.unwrap();
        assert_eq!(snapshot.timer.remaining, 1499);
    }

    #[test]
    fn unknown_task_reference_is_reported() {
        let app = app();
        assert_eq!(
            app.apply(Command::DeleteTask {
                id: "7".to_string()
            })
            .unwrap_err(),
            CommandError::UnknownTask("7".to_string())
        );
    }
}

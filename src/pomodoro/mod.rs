pub mod pomodoro;
pub mod settings;
pub mod timer;

pub use pomodoro::PomodoroMode;
pub use settings::TimerSettings;
pub use timer::{Timer, TimerState};

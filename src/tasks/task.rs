use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub pomodoros: u32,
}

impl Task {
    /// A new open task with a random id. `name` is expected to be trimmed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            done: false,
            pomodoros: 0,
        }
    }
}

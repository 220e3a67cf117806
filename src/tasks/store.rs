use std::collections::HashSet;

use super::task::Task;

/// Ordered task list plus the task credited with finished focus sessions.
///
/// Every mutator returns whether the list itself changed, so callers know
/// when the stored copy needs rewriting. Unknown ids are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    tasks: Vec<Task>,
    selected: Option<String>,
}

impl TaskStore {
    /// Build a store from loaded tasks, keeping the first of any repeated id.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut seen = HashSet::new();
        let tasks = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id.clone()))
            .collect();
        Self {
            tasks,
            selected: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Prepend a task named `name`. Blank names are ignored.
    pub fn add(&mut self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let task = Task::new(name);
        let id = task.id.clone();
        self.tasks.insert(0, task);
        Some(id)
    }

    pub fn toggle_done(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.done = !task.done;
                true
            }
            None => false,
        }
    }

    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.get_mut(id) {
            Some(task) => {
                task.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.tasks.len() != before
    }

    pub fn select(&mut self, id: &str) {
        if self.get(id).is_some() {
            self.selected = Some(id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn credit_pomodoro(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.pomodoros = task.pomodoros.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Map a typed reference to a task id: an exact id, a 1-based list
    /// position, or a prefix matching exactly one id.
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Some(task) = self.get(reference) {
            return Some(task.id.clone());
        }
        if let Ok(position) = reference.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|index| self.tasks.get(index))
                .map(|t| t.id.clone());
        }

        let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Some(task.id.clone()),
            _ => None,
        }
    }
}

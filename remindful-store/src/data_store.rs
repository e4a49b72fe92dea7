//! Task CRUD on top of a [`StoreBackend`].
//!
//! All tasks live under a single `tasks` key as a JSON array. Every
//! read-modify-write starts from a refreshed backend, so edits made by
//! another process since the last read are kept.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use remindful_core::{NewTask, Reminder, StoreError, Task, TaskStore, TaskUpdate};
use serde_json::Value;
use tracing::debug;

use crate::backend::StoreBackend;

const TASKS_KEY: &str = "tasks";

pub struct DataStore<B> {
    backend: B,
    /// Serializes read-modify-write cycles on the task list.
    write_lock: Mutex<()>,
}

impl<B: StoreBackend> DataStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current task list, reloaded first if another process changed it.
    pub fn get_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.backend.refresh()?;
        match self.backend.get(TASKS_KEY)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v) => serde_json::from_value(v).map_err(StoreError::backend),
        }
    }

    pub fn set_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let value = serde_json::to_value(tasks).map_err(StoreError::backend)?;
        self.backend.set(TASKS_KEY, value)?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.get_tasks()?.into_iter().find(|t| t.id == id))
    }

    /// Create a task. The title is trimmed and must not be empty; a requested
    /// reminder starts enabled with `next_trigger = trigger_at`.
    pub fn add_task(&self, new: NewTask) -> Result<Task, StoreError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidTask("task title cannot be empty".to_string()));
        }

        let now = Utc::now();
        let mut task = Task::new(uuid::Uuid::new_v4().to_string(), title, now);
        task.description = new.description;
        task.priority = new.priority.unwrap_or_default();
        task.scope = new.scope.unwrap_or_default();
        task.reminder = new.reminder.map(Reminder::from);
        task.subtasks = new.subtasks;
        task.tags = new.tags;
        task.due_date = new.due_date;
        task.group_id = new.group_id;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tasks = self.get_tasks()?;
        tasks.push(task.clone());
        self.set_tasks(&tasks)?;

        debug!(task_id = %task.id, "task added");
        Ok(task)
    }

    pub fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tasks = self.get_tasks()?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        update.apply(task, Utc::now());
        let updated = task.clone();
        self.set_tasks(&tasks)?;
        Ok(updated)
    }

    pub fn delete_task(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tasks = self.get_tasks()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.set_tasks(&tasks)?;
        debug!(task_id = id, "task deleted");
        Ok(())
    }

    /// Put the listed tasks first, in the given order, with `order` set to
    /// their index. Unknown ids are skipped; unlisted tasks follow in their
    /// current order.
    pub fn reorder_tasks(&self, ordered_ids: &[String]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let tasks = self.get_tasks()?;
        let mut by_id: HashMap<String, Task> =
            tasks.iter().map(|t| (t.id.clone(), t.clone())).collect();

        let mut reordered = Vec::with_capacity(tasks.len());
        for id in ordered_ids {
            if let Some(mut task) = by_id.remove(id) {
                task.order = u32::try_from(reordered.len()).ok();
                reordered.push(task);
            }
        }
        reordered.extend(tasks.into_iter().filter(|t| by_id.contains_key(&t.id)));

        self.set_tasks(&reordered)
    }
}

impl<B: StoreBackend> TaskStore for DataStore<B> {
    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        DataStore::get_task(self, id)
    }

    fn get_tasks(&self) -> Result<Vec<Task>, StoreError> {
        DataStore::get_tasks(self)
    }

    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        DataStore::update_task(self, id, update)
    }
}

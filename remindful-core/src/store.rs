//! Task store port consumed by the reminder scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::reminders::Reminder;
use crate::task::{Priority, SubTask, Task, TaskScope, TaskStatus};

/// Partial update applied by [`TaskStore::update_task`].
///
/// `None` leaves a field untouched. For the nullable fields the inner
/// `Option` distinguishes "clear" (`Some(None)`) from "set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub scope: Option<TaskScope>,
    pub reminder: Option<Option<Reminder>>,
    pub subtasks: Option<Vec<SubTask>>,
    pub tags: Option<Vec<String>>,
    pub order: Option<Option<u32>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub group_id: Option<Option<String>>,
}

impl TaskUpdate {
    pub fn reminder(reminder: Reminder) -> Self {
        Self {
            reminder: Some(Some(reminder)),
            ..Self::default()
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Apply onto `task`, stamping `updated_at`. `id` and `created_at` are
    /// never touched.
    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(scope) = self.scope {
            task.scope = scope;
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
        if let Some(subtasks) = self.subtasks {
            task.subtasks = subtasks;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(group_id) = self.group_id {
            task.group_id = group_id;
        }
        task.updated_at = now;
    }
}

/// Read/write access to persisted tasks.
///
/// Implementations are expected to be fast and local.
pub trait TaskStore: Send + Sync {
    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    fn get_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Apply `update` and return the stored result.
    /// Unknown ids fail with [`StoreError::NotFound`].
    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError>;
}

impl<S: TaskStore + ?Sized> TaskStore for std::sync::Arc<S> {
    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        (**self).get_task(id)
    }

    fn get_tasks(&self) -> Result<Vec<Task>, StoreError> {
        (**self).get_tasks()
    }

    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        (**self).update_task(id, update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn apply_preserves_identity_and_stamps_updated_at() {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let mut t = Task::new("t1", "old", created).with_description("notes");

        TaskUpdate {
            title: Some("new".to_string()),
            description: Some(None),
            ..TaskUpdate::default()
        }
        .apply(&mut t, later);

        assert_eq!(t.id, "t1");
        assert_eq!(t.title, "new");
        assert_eq!(t.description, None);
        assert_eq!(t.created_at, created);
        assert_eq!(t.updated_at, later);
    }

    #[test]
    fn empty_update_only_touches_updated_at() {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut t = Task::new("t1", "same", created).with_priority(Priority::High);
        let before = t.clone();
        TaskUpdate::default().apply(&mut t, created);
        assert_eq!(t, before);
    }
}

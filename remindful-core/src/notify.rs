//! Notification sink port + payload rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task};

/// Delivered notifications kept in the history, newest first.
pub const HISTORY_LIMIT: usize = 100;

/// Receives the task snapshot when one of its reminders fires.
///
/// Must not call back into the scheduler.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, task: &Task);
}

impl<F> NotificationSink for F
where
    F: Fn(&Task) + Send + Sync,
{
    fn notify(&self, task: &Task) {
        self(task)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

pub fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "High priority",
        Priority::Medium => "Medium priority",
        Priority::Low => "Low priority",
    }
}

pub fn build_notification_payload(task: &Task) -> NotificationPayload {
    NotificationPayload {
        title: task.title.clone(),
        body: priority_label(task.priority).to_string(),
    }
}

/// Summary of open high-priority tasks, shown once at startup.
pub fn startup_alert(tasks: &[Task]) -> Option<NotificationPayload> {
    let open: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.priority == Priority::High && !t.is_completed())
        .collect();

    if open.is_empty() {
        return None;
    }

    let noun = if open.len() == 1 { "task" } else { "tasks" };
    Some(NotificationPayload {
        title: format!("{} high priority {noun}", open.len()),
        body: open
            .iter()
            .map(|t| t.title.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reminder,
    Alert,
}

/// One delivered notification, as kept in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl NotificationRecord {
    pub fn reminder(task: &Task, payload: &NotificationPayload, at: DateTime<Utc>) -> Self {
        Self {
            id: format!("reminder-{}-{}", task.id, at.timestamp_millis()),
            title: payload.title.clone(),
            body: payload.body.clone(),
            priority: task.priority,
            kind: NotificationKind::Reminder,
            timestamp: at,
            read: false,
        }
    }

    /// Startup alerts are always about high-priority work.
    pub fn alert(payload: &NotificationPayload, at: DateTime<Utc>) -> Self {
        Self {
            id: format!("startup-{}", at.timestamp_millis()),
            title: payload.title.clone(),
            body: payload.body.clone(),
            priority: Priority::High,
            kind: NotificationKind::Alert,
            timestamp: at,
            read: false,
        }
    }
}

/// Put `record` first and drop whatever falls past [`HISTORY_LIMIT`].
pub fn push_history(history: &mut Vec<NotificationRecord>, record: NotificationRecord) {
    history.insert(0, record);
    history.truncate(HISTORY_LIMIT);
}

/// Returns whether a record with `id` exists.
pub fn mark_read(history: &mut [NotificationRecord], id: &str) -> bool {
    let mut found = false;
    for record in history.iter_mut().filter(|r| r.id == id) {
        record.read = true;
        found = true;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::TimeZone;

    fn task(id: &str, priority: Priority, status: TaskStatus) -> Task {
        Task::new(id, format!("title {id}"), Utc::now())
            .with_priority(priority)
            .with_status(status)
    }

    #[test]
    fn payload_uses_title_and_priority_label() {
        let p = build_notification_payload(&task("a", Priority::Medium, TaskStatus::Pending));
        assert_eq!(p.title, "title a");
        assert_eq!(p.body, "Medium priority");
    }

    #[test]
    fn startup_alert_lists_open_high_priority_only() {
        let tasks = vec![
            task("a", Priority::High, TaskStatus::Pending),
            task("b", Priority::High, TaskStatus::Completed),
            task("c", Priority::Low, TaskStatus::Pending),
            task("d", Priority::High, TaskStatus::InProgress),
        ];
        let alert = startup_alert(&tasks).unwrap();
        assert_eq!(alert.title, "2 high priority tasks");
        assert_eq!(alert.body, "title a, title d");
    }

    fn record(n: i64) -> NotificationRecord {
        let payload = NotificationPayload {
            title: format!("n{n}"),
            body: "Low priority".to_string(),
        };
        NotificationRecord::alert(&payload, Utc.timestamp_millis_opt(n).unwrap())
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let mut history = Vec::new();
        for n in 0..(HISTORY_LIMIT as i64 + 5) {
            push_history(&mut history, record(n));
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].title, "n104");
        assert_eq!(history[HISTORY_LIMIT - 1].title, "n5");
    }

    #[test]
    fn mark_read_flags_only_the_matching_record() {
        let mut history = vec![record(2), record(1)];
        assert!(mark_read(&mut history, "startup-1"));
        assert!(!history[0].read);
        assert!(history[1].read);
        assert!(!mark_read(&mut history, "startup-9"));
    }

    #[test]
    fn reminder_record_carries_task_priority() {
        let t = task("a", Priority::Medium, TaskStatus::Pending);
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let r = NotificationRecord::reminder(&t, &build_notification_payload(&t), at);
        assert_eq!(r.id, "reminder-a-1700000000000");
        assert_eq!(r.priority, Priority::Medium);
        assert_eq!(r.kind, NotificationKind::Reminder);
        assert_eq!(r.body, "Medium priority");
        assert!(!r.read);
    }

    #[test]
    fn startup_alert_is_silent_without_high_priority_work() {
        let tasks = vec![task("b", Priority::High, TaskStatus::Completed)];
        assert_eq!(startup_alert(&tasks), None);
        assert_eq!(startup_alert(&[]), None);
    }
}

//! remindful-core: task model and the reminder scheduler.

pub mod clock;
pub mod error;
pub mod filters;
pub mod notify;
pub mod reminders;
pub mod scheduler;
pub mod store;
pub mod task;
pub mod testing;
pub mod time;
pub mod timer;

pub use clock::{Clock, SystemClock};
pub use error::StoreError;
pub use filters::{PriorityFilter, filter_by_priority, group_by_status_and_priority};
pub use notify::{
    HISTORY_LIMIT, NotificationKind, NotificationPayload, NotificationRecord, NotificationSink,
    build_notification_payload, mark_read, push_history, startup_alert,
};
pub use reminders::{
    MS_PER_DAY, MS_PER_WEEK, NewReminder, Reminder, RepeatInterval, compute_next_trigger,
};
pub use scheduler::{ArmedJob, ReminderScheduler};
pub use store::{TaskStore, TaskUpdate};
pub use task::{NewTask, Priority, SubTask, Task, TaskScope, TaskStatus};
pub use timer::{ScheduleDescriptor, Timer, TimerCallback, TimerHandle};

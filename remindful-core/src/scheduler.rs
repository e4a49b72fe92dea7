//! Reminder scheduler: turns persisted reminders into armed timer jobs.
//!
//! The scheduler owns exactly one piece of state, the map from task id to the
//! job currently armed for it. Reminder fields (`enabled`, `next_trigger`)
//! live in the task store and are rewritten on every firing.
//!
//! Every public operation and every firing runs to completion while holding
//! the job-map lock, so operations on one task apply in invocation order and
//! a cancel issued after a schedule always wins.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::notify::NotificationSink;
use crate::reminders::{Reminder, RepeatInterval};
use crate::store::{TaskStore, TaskUpdate};
use crate::task::Task;
use crate::timer::{ScheduleDescriptor, Timer, TimerCallback, TimerHandle};

/// Job currently armed for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedJob {
    pub task_id: String,
    pub fire_at: DateTime<Utc>,
}

struct ActiveJob {
    /// Distinguishes this arming from earlier ones for the same task.
    job_id: u64,
    fire_at: DateTime<Utc>,
    handle: Box<dyn TimerHandle>,
}

impl ActiveJob {
    fn stop(self) {
        self.handle.stop();
    }
}

#[derive(Default)]
struct JobTable {
    active: HashMap<String, ActiveJob>,
    last_job_id: u64,
}

struct Shared<S, N, T> {
    store: S,
    sink: N,
    timer: T,
    clock: Arc<dyn Clock>,
    jobs: Mutex<JobTable>,
}

/// Arms, re-arms and cancels reminder jobs for tasks.
///
/// Cloning yields another handle to the same scheduler.
pub struct ReminderScheduler<S, N, T> {
    shared: Arc<Shared<S, N, T>>,
}

impl<S, N, T> Clone for ReminderScheduler<S, N, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, N, T> ReminderScheduler<S, N, T>
where
    S: TaskStore + 'static,
    N: NotificationSink + 'static,
    T: Timer + 'static,
{
    pub fn new(store: S, sink: N, timer: T) -> Self {
        Self::with_clock(store, sink, timer, SystemClock)
    }

    pub fn with_clock(store: S, sink: N, timer: T, clock: impl Clock + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                sink,
                timer,
                clock: Arc::new(clock),
                jobs: Mutex::new(JobTable::default()),
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Arm a job for `task_id`, retiring any job it already has.
    ///
    /// Disabled reminders and reminders whose `next_trigger` is not in the
    /// future are dropped silently; overdue reminders are never fired on
    /// catch-up.
    pub fn schedule_reminder(&self, task_id: &str, reminder: &Reminder) {
        let mut jobs = self.lock_jobs();
        self.arm(&mut jobs, task_id, reminder);
    }

    /// Stop the job for `task_id` (if any) and persist its reminder as
    /// disabled (if the task still has one). Unknown ids are a no-op.
    pub fn cancel_reminder(&self, task_id: &str) -> Result<(), StoreError> {
        let mut jobs = self.lock_jobs();
        if let Some(job) = jobs.active.remove(task_id) {
            job.stop();
            debug!(task_id, "reminder job stopped");
        }

        let Some(reminder) = self
            .shared
            .store
            .get_task(task_id)?
            .and_then(|t| t.reminder)
        else {
            return Ok(());
        };

        match self
            .shared
            .store
            .update_task(task_id, TaskUpdate::reminder(reminder.disabled()))
        {
            Ok(_) => {
                info!(task_id, "reminder cancelled");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(task_id, "task vanished while cancelling its reminder");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drop every armed job and rebuild them from the store.
    ///
    /// This is the startup recovery path; calling it repeatedly converges on
    /// the same set of jobs.
    pub fn reschedule_all(&self) -> Result<(), StoreError> {
        let mut jobs = self.lock_jobs();
        for (_, job) in jobs.active.drain() {
            job.stop();
        }

        let tasks = self.shared.store.get_tasks()?;
        for task in &tasks {
            if let Some(reminder) = task.reminder.as_ref().filter(|r| r.enabled) {
                self.arm(&mut jobs, &task.id, reminder);
            }
        }

        info!(
            tasks = tasks.len(),
            armed = jobs.active.len(),
            "rescheduled reminders from store"
        );
        Ok(())
    }

    pub fn active_job_count(&self) -> usize {
        self.lock_jobs().active.len()
    }

    /// Armed jobs, earliest first.
    pub fn armed_jobs(&self) -> Vec<ArmedJob> {
        let jobs = self.lock_jobs();
        let mut out: Vec<ArmedJob> = jobs
            .active
            .iter()
            .map(|(task_id, job)| ArmedJob {
                task_id: task_id.clone(),
                fire_at: job.fire_at,
            })
            .collect();
        out.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.task_id.cmp(&b.task_id)));
        out
    }

    fn lock_jobs(&self) -> MutexGuard<'_, JobTable> {
        self.shared.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self, jobs: &mut JobTable, task_id: &str, reminder: &Reminder) {
        if let Some(old) = jobs.active.remove(task_id) {
            old.stop();
            debug!(task_id, "superseded armed reminder job");
        }

        if !reminder.enabled {
            debug!(task_id, "reminder disabled; not arming");
            return;
        }

        let now = self.shared.clock.now();
        if reminder.next_trigger <= now {
            debug!(
                task_id,
                next_trigger = %reminder.next_trigger,
                "reminder is not in the future; not arming"
            );
            return;
        }

        jobs.last_job_id += 1;
        let job_id = jobs.last_job_id;
        let descriptor = ScheduleDescriptor::at(reminder.next_trigger);
        let handle = self
            .shared
            .timer
            .schedule(descriptor, fire_callback(Arc::downgrade(&self.shared), task_id, job_id));

        jobs.active.insert(
            task_id.to_string(),
            ActiveJob {
                job_id,
                fire_at: reminder.next_trigger,
                handle,
            },
        );
        info!(task_id, job_id, %descriptor, repeat = %reminder.repeat, "reminder armed");
    }

    /// Timer callback body for job `job_id` of `task_id`.
    fn handle_trigger(&self, task_id: &str, job_id: u64) -> Result<(), StoreError> {
        let mut jobs = self.lock_jobs();

        // A firing from a job that was since superseded, cancelled or cleared.
        let current = jobs.active.get(task_id).map(|j| j.job_id);
        if current != Some(job_id) {
            debug!(task_id, job_id, ?current, "ignoring firing of retired job");
            return Ok(());
        }
        if let Some(job) = jobs.active.remove(task_id) {
            job.stop();
        }

        let task = self.shared.store.get_task(task_id)?;
        let Some((task, reminder)) = task.and_then(|t| {
            let r = t.reminder.clone()?;
            Some((t, r))
        }) else {
            debug!(task_id, "task or its reminder is gone; dropping job");
            return Ok(());
        };
        if !reminder.enabled {
            debug!(task_id, "reminder was disabled in the store; dropping job");
            return Ok(());
        }

        self.deliver(&task);

        match reminder.repeat {
            RepeatInterval::Once => {
                self.shared
                    .store
                    .update_task(task_id, TaskUpdate::reminder(reminder.disabled()))?;
                info!(task_id, "one-shot reminder fired and disabled");
            }
            RepeatInterval::Daily | RepeatInterval::Weekly => match reminder.advanced() {
                Some(next) => {
                    self.shared
                        .store
                        .update_task(task_id, TaskUpdate::reminder(next.clone()))?;
                    debug!(task_id, next_trigger = %next.next_trigger, "repeating reminder advanced");
                    self.arm(&mut jobs, task_id, &next);
                }
                None => {
                    warn!(task_id, next_trigger = %reminder.next_trigger, "next trigger out of range; disabling");
                    self.shared
                        .store
                        .update_task(task_id, TaskUpdate::reminder(reminder.disabled()))?;
                }
            },
        }

        Ok(())
    }

    fn deliver(&self, task: &Task) {
        let sink = &self.shared.sink;
        if panic::catch_unwind(AssertUnwindSafe(|| sink.notify(task))).is_err() {
            error!(task_id = %task.id, "notification sink panicked");
        }
    }
}

fn fire_callback<S, N, T>(shared: Weak<Shared<S, N, T>>, task_id: &str, job_id: u64) -> TimerCallback
where
    S: TaskStore + 'static,
    N: NotificationSink + 'static,
    T: Timer + 'static,
{
    let task_id = task_id.to_string();
    Arc::new(move || match shared.upgrade() {
        Some(shared) => ReminderScheduler { shared }.handle_trigger(&task_id, job_id),
        None => Ok(()),
    })
}

//! Deterministic doubles for the scheduler's ports.
//!
//! Exposed outside `cfg(test)` so downstream crates can drive the scheduler
//! in their own tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::StoreError;
use crate::store::{TaskStore, TaskUpdate};
use crate::task::Task;
use crate::timer::{ScheduleDescriptor, Timer, TimerCallback, TimerHandle};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

struct FakeJob {
    descriptor: ScheduleDescriptor,
    callback: TimerCallback,
    stopped: Arc<AtomicBool>,
}

/// Timer that never fires on its own; tests fire jobs by index.
///
/// Clones share the same job list.
#[derive(Clone, Default)]
pub struct FakeTimer {
    jobs: Arc<Mutex<Vec<FakeJob>>>,
}

struct FakeHandle {
    stopped: Arc<AtomicBool>,
}

impl TimerHandle for FakeHandle {
    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl Timer for FakeTimer {
    fn schedule(
        &self,
        descriptor: ScheduleDescriptor,
        callback: TimerCallback,
    ) -> Box<dyn TimerHandle> {
        let stopped = Arc::new(AtomicBool::new(false));
        lock(&self.jobs).push(FakeJob {
            descriptor,
            callback,
            stopped: Arc::clone(&stopped),
        });
        Box::new(FakeHandle { stopped })
    }
}

impl FakeTimer {
    /// Number of jobs ever scheduled.
    pub fn job_count(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// Number of jobs not yet stopped.
    pub fn active_count(&self) -> usize {
        lock(&self.jobs)
            .iter()
            .filter(|j| !j.stopped.load(Ordering::SeqCst))
            .count()
    }

    pub fn is_stopped(&self, index: usize) -> bool {
        lock(&self.jobs)
            .get(index)
            .is_some_and(|j| j.stopped.load(Ordering::SeqCst))
    }

    pub fn descriptor(&self, index: usize) -> Option<ScheduleDescriptor> {
        lock(&self.jobs).get(index).map(|j| j.descriptor)
    }

    /// Run the callback of job `index`, stopped or not. Unknown indexes are
    /// a no-op.
    pub fn fire(&self, index: usize) -> Result<(), StoreError> {
        // Release the job list before calling back: the callback may schedule.
        let callback = lock(&self.jobs).get(index).map(|j| Arc::clone(&j.callback));
        match callback {
            Some(cb) => cb(),
            None => Ok(()),
        }
    }

    /// Fire the most recently scheduled job that is still active.
    pub fn fire_latest(&self) -> Result<(), StoreError> {
        let callback = lock(&self.jobs)
            .iter()
            .rev()
            .find(|j| !j.stopped.load(Ordering::SeqCst))
            .map(|j| Arc::clone(&j.callback));
        match callback {
            Some(cb) => cb(),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    tasks: BTreeMap<String, Task>,
    updates: usize,
    fail_writes: bool,
}

/// In-memory [`TaskStore`]. Clones share the same tasks.
#[derive(Clone, Default)]
pub struct MemoryTaskStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTaskStore {
    pub fn insert(&self, task: Task) {
        lock(&self.state).tasks.insert(task.id.clone(), task);
    }

    pub fn remove(&self, id: &str) -> Option<Task> {
        lock(&self.state).tasks.remove(id)
    }

    /// Successful `update_task` calls so far.
    pub fn update_count(&self) -> usize {
        lock(&self.state).updates
    }

    /// Make every subsequent `update_task` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

impl TaskStore for MemoryTaskStore {
    fn get_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(lock(&self.state).tasks.get(id).cloned())
    }

    fn get_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(lock(&self.state).tasks.values().cloned().collect())
    }

    fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, StoreError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(StoreError::backend(std::io::Error::other("writes disabled")));
        }
        let task = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply(task, Utc::now());
        let out = task.clone();
        state.updates += 1;
        Ok(out)
    }
}

/// Sink that records every task it is handed. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingSink {
    seen: Arc<Mutex<Vec<Task>>>,
}

impl RecordingSink {
    pub fn tasks(&self) -> Vec<Task> {
        lock(&self.seen).clone()
    }

    pub fn task_ids(&self) -> Vec<String> {
        lock(&self.seen).iter().map(|t| t.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.seen).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.seen).is_empty()
    }
}

impl crate::notify::NotificationSink for RecordingSink {
    fn notify(&self, task: &Task) {
        lock(&self.seen).push(task.clone());
    }
}
